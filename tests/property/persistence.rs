//! Property tests for transcript encoding and settings updates

use kube_assistant::settings::{SettingsRecord, SettingsUpdate};
use kube_assistant::transcript::{decode_transcript, encode_transcript, Transcript, Turn};
use proptest::prelude::*;

fn turn() -> impl Strategy<Value = Turn> {
    prop_oneof![
        "\\PC{0,60}".prop_map(Turn::Human),
        "\\PC{0,60}".prop_map(Turn::Assistant),
    ]
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[A-Za-z0-9-]{1,16}")
}

proptest! {
    /// Stored transcripts decode to exactly the turns that were encoded.
    #[test]
    fn test_transcript_encoding_is_lossless(turns in prop::collection::vec(turn(), 0..20)) {
        let transcript = Transcript::from_turns(turns);
        let bytes = encode_transcript(&transcript).unwrap();
        prop_assert_eq!(decode_transcript(&bytes).unwrap(), transcript);
    }

    /// Any truncation of a non-empty blob is rejected rather than misread.
    #[test]
    fn test_truncated_transcripts_are_rejected(
        turns in prop::collection::vec(turn(), 1..10),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = encode_transcript(&Transcript::from_turns(turns)).unwrap();
        let len = cut.index(bytes.len());
        prop_assert!(decode_transcript(&bytes[..len]).is_err());
    }

    /// Updating one provider section never touches the other or the active provider.
    #[test]
    fn test_updates_are_isolated_per_section(
        key in optional_text(),
        model in optional_text(),
        endpoint in optional_text(),
        deployment in optional_text(),
    ) {
        let original = SettingsRecord::default();

        let mut openai = original.clone();
        openai.apply(SettingsUpdate::OpenAi { api_key: key.clone(), model: model.clone() });
        prop_assert_eq!(&openai.azure, &original.azure);
        prop_assert_eq!(openai.provider, original.provider);
        if let Some(key) = &key {
            prop_assert_eq!(&openai.openai.api_key, key);
        }

        let mut azure = original.clone();
        azure.apply(SettingsUpdate::Azure {
            api_key: key,
            endpoint,
            deployment: deployment.clone(),
            api_version: None,
        });
        prop_assert_eq!(&azure.openai, &original.openai);
        prop_assert_eq!(&azure.azure.api_version, &original.azure.api_version);
        match deployment {
            Some(d) => prop_assert_eq!(azure.azure.deployment, d),
            None => prop_assert_eq!(azure.azure.deployment, original.azure.deployment),
        }
    }
}
