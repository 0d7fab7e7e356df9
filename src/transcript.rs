//! Conversation transcript and its on-disk store.
//!
//! The transcript is persisted as one opaque blob: a 4-byte little-endian format
//! version followed by the bincode encoding of the turn sequence. Anything that does not
//! decode cleanly is discarded on load and replaced by an empty transcript.

use crate::error::{ApiError, StorageError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current on-disk format version.
const TRANSCRIPT_FORMAT_VERSION: u32 = 1;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Human,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Human => f.write_str("Human"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    Human(String),
    Assistant(String),
}

impl Turn {
    pub fn role(&self) -> Role {
        match self {
            Turn::Human(_) => Role::Human,
            Turn::Assistant(_) => Role::Assistant,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Turn::Human(text) | Turn::Assistant(text) => text,
        }
    }
}

/// Chronologically ordered turns of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Append one question and its answer.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::Human(question.into()));
        self.turns.push(Turn::Assistant(answer.into()));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}

/// Encode a transcript into the versioned blob format.
pub fn encode_transcript(transcript: &Transcript) -> Result<Vec<u8>, StorageError> {
    let payload = bincode::serialize(&transcript.turns).map_err(|e| StorageError::Encode {
        what: "transcript",
        reason: e.to_string(),
    })?;
    let mut bytes = Vec::with_capacity(4 + payload.len());
    bytes.extend_from_slice(&TRANSCRIPT_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a versioned blob, rejecting unknown versions, unknown turn variants and
/// trailing bytes.
pub fn decode_transcript(bytes: &[u8]) -> Result<Transcript, StorageError> {
    if bytes.len() < 4 {
        return Err(StorageError::InvalidFormat(
            "transcript file too short".to_string(),
        ));
    }
    let version = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if version != TRANSCRIPT_FORMAT_VERSION {
        return Err(StorageError::InvalidFormat(format!(
            "unsupported transcript version: {}",
            version
        )));
    }

    let payload = &bytes[4..];
    let turns: Vec<Turn> = bincode::deserialize(payload).map_err(|e| StorageError::Decode {
        what: "transcript",
        reason: e.to_string(),
    })?;

    let consumed = bincode::serialized_size(&turns).map_err(|e| StorageError::Decode {
        what: "transcript",
        reason: e.to_string(),
    })?;
    if consumed != payload.len() as u64 {
        return Err(StorageError::InvalidFormat(format!(
            "{} unexpected trailing bytes in transcript",
            payload.len() as u64 - consumed.min(payload.len() as u64)
        )));
    }

    Ok(Transcript { turns })
}

/// What happened when a transcript was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Restored,
    NotFound,
    /// Stored state was unreadable and has been replaced by an empty transcript
    Discarded(String),
}

/// File-backed transcript persistence for one user.
pub struct TranscriptStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the default per-user location.
    pub fn open_default() -> Result<Self, ApiError> {
        Ok(Self::new(crate::config::paths::transcript_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored transcript; never fails.
    pub fn load(&self) -> Transcript {
        self.load_with_status().0
    }

    /// Load the stored transcript and report whether it was restored, absent or
    /// discarded.
    pub fn load_with_status(&self) -> (Transcript, LoadStatus) {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No stored transcript");
            return (Transcript::new(), LoadStatus::NotFound);
        }

        let decoded = fs::read(&self.path)
            .map_err(StorageError::from)
            .and_then(|bytes| decode_transcript(&bytes));
        match decoded {
            Ok(transcript) => {
                debug!(turns = transcript.len(), "Transcript restored");
                (transcript, LoadStatus::Restored)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Discarding unreadable transcript, starting a new one: {}",
                    e
                );
                (Transcript::new(), LoadStatus::Discarded(e.to_string()))
            }
        }
    }

    /// Replace the stored transcript with `transcript`.
    ///
    /// Writes a temporary file and renames it over the old one.
    pub fn save(&self, transcript: &Transcript) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = encode_transcript(transcript)?;
        let temp_path = self.path.with_extension("bin.tmp");
        fs::write(&temp_path, &bytes)?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::IoError(e)
        })?;

        debug!(turns = transcript.len(), path = %self.path.display(), "Transcript saved");
        Ok(())
    }

    /// Save, logging a warning instead of failing. Returns whether the save succeeded.
    pub fn persist(&self, transcript: &Transcript) -> bool {
        match self.save(transcript) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to save transcript: {}", e);
                false
            }
        }
    }

    /// Delete the stored transcript. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Transcript cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}
