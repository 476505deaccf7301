//! Operator notification seam.
//!
//! The core is UI-agnostic: whoever embeds it supplies a sink that can reach
//! a human (native notification, toast, status line). `LogSink` is the
//! default for headless use and tests.

use crate::suggestion::SuggestionKey;

/// Surface a human-readable message to the operator.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Routes notifications through the `log` facade.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, title: &str, body: &str) {
        log::info!("{}: {}", title, body);
    }
}

/// One success message per applied suggestion key.
pub fn notify_applied(sink: &dyn NotificationSink, key: &SuggestionKey) {
    sink.notify("Insight applied", &format!("Saved {}.", key));
}

/// One failure message per failed suggestion key.
///
/// The reason is arbitrary text (it embeds validation messages and entity
/// ids), so truncation must land on a char boundary.
pub fn notify_apply_failed(sink: &dyn NotificationSink, key: &SuggestionKey, error: &str) {
    let body = if error.chars().count() > 100 {
        let short: String = error.chars().take(100).collect();
        format!("{}: {}...", key, short)
    } else {
        format!("{}: {}", key, error)
    };
    sink.notify("Insight could not be applied", &body);
}

/// Batch-level completion, reported once when a batch closes with at least
/// one applied suggestion.
pub fn notify_batch_complete(sink: &dyn NotificationSink, applied: usize) {
    let body = if applied == 1 {
        "1 insight applied.".to_string()
    } else {
        format!("{} insights applied.", applied)
    };
    sink.notify("Review complete", &body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::EntityKind;
    use std::sync::Mutex;

    /// Captures messages for assertions.
    pub struct RecordingSink {
        pub messages: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, title: &str, body: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    #[test]
    fn test_failure_body_truncated() {
        let sink = RecordingSink::new();
        let key = SuggestionKey::for_index(EntityKind::Goal, 0);
        let long_error = "x".repeat(300);
        notify_apply_failed(&sink, &key, &long_error);

        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.ends_with("..."));
        assert!(messages[0].1.len() < 150);
    }

    #[test]
    fn test_failure_body_multibyte_reason() {
        let sink = RecordingSink::new();
        let key = SuggestionKey::for_index(EntityKind::Goal, 0);

        // 40 chars but 120 bytes — short enough to keep whole
        notify_apply_failed(&sink, &key, &"€".repeat(40));
        // 200 chars — truncated, and the cut must not split a char
        notify_apply_failed(&sink, &key, &"€".repeat(200));

        let messages = sink.messages.lock().unwrap();
        assert!(messages[0].1.contains(&"€".repeat(40)));
        assert!(messages[1].1.ends_with("..."));
        assert!(messages[1].1.contains(&"€".repeat(100)));
        assert!(!messages[1].1.contains(&"€".repeat(101)));
    }

    #[test]
    fn test_batch_complete_wording() {
        let sink = RecordingSink::new();
        notify_batch_complete(&sink, 1);
        notify_batch_complete(&sink, 3);

        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages[0].1, "1 insight applied.");
        assert_eq!(messages[1].1, "3 insights applied.");
    }
}
