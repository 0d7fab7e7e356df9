//! CLI presentation: text formatters for command results.

use crate::transcript::Transcript;

pub fn format_config_view(redacted_json: &str) -> String {
    format!("Current Configuration:\n{}", redacted_json)
}

pub fn format_history(transcript: &Transcript) -> String {
    if transcript.is_empty() {
        return "No conversation history stored".to_string();
    }
    transcript
        .iter()
        .map(|turn| format!("{}: {}", turn.role(), turn.text().trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_history_cleared(removed: bool) -> String {
    if removed {
        "Conversation history cleared".to_string()
    } else {
        "No conversation history to clear".to_string()
    }
}
