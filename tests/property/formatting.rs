//! Property tests for command normalization, output preview and credential masking

use kube_assistant::display::{classify_output, preview, pretty_json, RenderedOutput};
use kube_assistant::runner::normalize_command;
use kube_assistant::settings::redact;
use proptest::prelude::*;

fn word() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9./=-]{0,11}"
}

/// The binary appears exactly once at the front, whether or not the input had it.
#[test]
fn test_normalization_prefixes_binary_once() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(word(), 1..6), any::<bool>()),
            |(words, prefixed)| {
                prop_assume!(words[0] != "kubectl");
                let mut raw = words.join(" ");
                if prefixed {
                    raw = format!("kubectl {}", raw);
                }

                let argv = normalize_command(&raw, "kubectl").unwrap();
                prop_assert_eq!(&argv[0], "kubectl");
                prop_assert_eq!(&argv[1..], &words[..]);
                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    /// Whitespace around a command never changes the argument vector.
    #[test]
    fn test_normalization_ignores_surrounding_whitespace(
        words in prop::collection::vec(word(), 1..5),
        left in "[ \t]{0,3}",
        right in "[ \t\n]{0,3}",
    ) {
        let raw = words.join(" ");
        let padded = format!("{}{}{}", left, raw, right);
        prop_assert_eq!(
            normalize_command(&padded, "kubectl").unwrap(),
            normalize_command(&raw, "kubectl").unwrap()
        );
    }

    /// The preview plus the omitted line count always accounts for every line.
    #[test]
    fn test_preview_loses_no_lines(
        lines in prop::collection::vec("[^\n]{0,20}", 1..40),
        limit in 1usize..25,
    ) {
        let text = lines.join("\n");
        let (shown, omitted) = preview(&text, limit);

        let shown_lines = shown.split('\n').count();
        prop_assert_eq!(shown_lines + omitted, lines.len());
        prop_assert!(shown_lines <= limit);
        prop_assert!(text.starts_with(&shown));
        if lines.len() <= limit {
            prop_assert_eq!(omitted, 0);
            prop_assert_eq!(shown, text);
        }
    }

    /// Masked credentials never reveal more than the final four characters.
    #[test]
    fn test_redaction_shape(secret in "\\PC{0,40}") {
        let masked = redact(&secret);
        let count = secret.chars().count();

        if count == 0 {
            prop_assert_eq!(masked, "");
        } else if count <= 4 {
            prop_assert_eq!(masked, "***");
        } else {
            prop_assert!(masked.starts_with("***"));
            prop_assert_eq!(masked.chars().count(), 7);
            prop_assert!(secret.ends_with(&masked[3..]));
        }
    }

    /// Any JSON object is recognised and its pretty form parses back to the same value.
    #[test]
    fn test_json_objects_are_recognised(
        entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
    ) {
        let value = serde_json::Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::from(v)))
                .collect(),
        );
        let compact = value.to_string();

        match classify_output(&compact, 10) {
            RenderedOutput::Json(parsed) => {
                prop_assert_eq!(&parsed, &value);
                let reparsed: serde_json::Value =
                    serde_json::from_str(&pretty_json(&parsed)).unwrap();
                prop_assert_eq!(reparsed, value);
            }
            other => prop_assert!(false, "expected json, got {:?}", other),
        }
    }
}
