//! Notification payloads.

use serde::{Deserialize, Serialize};

/// Unread notification counter returned by `GET /notifications/unread-count`.
///
/// Older backend builds answer with `{"count": n}`, newer ones with
/// `{"unread_count": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnreadCount {
    #[serde(alias = "count", default)]
    pub unread_count: u64,
}

impl UnreadCount {
    #[must_use]
    pub const fn new(unread_count: u64) -> Self {
        Self { unread_count }
    }

    #[must_use]
    pub const fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_both_field_names() {
        let a: UnreadCount = serde_json::from_str(r#"{"unread_count":3}"#).unwrap_or_default();
        let b: UnreadCount = serde_json::from_str(r#"{"count":3}"#).unwrap_or_default();
        assert_eq!(a, UnreadCount::new(3));
        assert_eq!(b, UnreadCount::new(3));
        assert!(a.has_unread());
    }
}
