//! Settings and transcript stores at their default locations.

use crate::integration::test_utils::with_assistant_home;
use kube_assistant::config::paths;
use kube_assistant::settings::{ProviderKind, SettingsStore, SettingsUpdate};
use kube_assistant::transcript::{LoadStatus, Transcript, TranscriptStore};
use tempfile::TempDir;

#[test]
fn test_default_locations_follow_assistant_home() {
    let test_dir = TempDir::new().unwrap();

    with_assistant_home(&test_dir, || {
        let settings = SettingsStore::open_default().unwrap();
        let transcripts = TranscriptStore::open_default().unwrap();

        assert_eq!(settings.path(), test_dir.path().join(paths::SETTINGS_FILE));
        assert_eq!(
            transcripts.path(),
            test_dir.path().join(paths::TRANSCRIPT_FILE)
        );
        assert_eq!(
            paths::default_log_file().unwrap(),
            test_dir.path().join(paths::LOG_FILE)
        );
    });
}

#[test]
fn test_settings_survive_reopening() {
    let test_dir = TempDir::new().unwrap();

    with_assistant_home(&test_dir, || {
        let store = SettingsStore::open_default().unwrap();
        store.set_provider(ProviderKind::Azure).unwrap();
        store
            .update(SettingsUpdate::Azure {
                api_key: Some("azure-key-0042".to_string()),
                endpoint: Some("https://example.openai.azure.com/".to_string()),
                deployment: None,
                api_version: None,
            })
            .unwrap();
    });

    with_assistant_home(&test_dir, || {
        let record = SettingsStore::open_default().unwrap().load();
        assert_eq!(record.provider, ProviderKind::Azure);
        assert_eq!(record.azure.api_key, "azure-key-0042");
        assert_eq!(record.azure.api_version, "2023-05-15");
        assert!(record.openai.api_key.is_empty());
    });
}

#[test]
fn test_settings_file_is_plain_json() {
    let test_dir = TempDir::new().unwrap();
    let store = SettingsStore::new(test_dir.path().join("settings.json"));
    store
        .update(SettingsUpdate::OpenAi {
            api_key: None,
            model: Some("gpt-4o-mini".to_string()),
        })
        .unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["provider"], "openai");
    assert_eq!(value["openai"]["model"], "gpt-4o-mini");
    assert_eq!(value["azure"]["api_version"], "2023-05-15");
}

#[test]
fn test_transcript_round_trips_through_file() {
    let test_dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(test_dir.path().join("nested").join("transcript.bin"));

    let mut transcript = Transcript::new();
    transcript.record_exchange("why is web-1 pending?", "No node has enough memory.");
    transcript.record_exchange("which nodes exist?", "node-a and node-b");
    store.save(&transcript).unwrap();

    let (loaded, status) = store.load_with_status();
    assert_eq!(status, LoadStatus::Restored);
    assert_eq!(loaded, transcript);
}

#[test]
fn test_truncated_transcript_is_discarded() {
    let test_dir = TempDir::new().unwrap();
    let store = TranscriptStore::new(test_dir.path().join("transcript.bin"));

    let mut transcript = Transcript::new();
    transcript.record_exchange("list pods", "web-1");
    store.save(&transcript).unwrap();

    let bytes = std::fs::read(store.path()).unwrap();
    std::fs::write(store.path(), &bytes[..bytes.len() - 3]).unwrap();

    let (loaded, status) = store.load_with_status();
    assert!(loaded.is_empty());
    assert!(matches!(status, LoadStatus::Discarded(_)));
}
