//! Index entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry in the on-disk LRU index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LruEntry {
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serialization() {
        let entry = LruEntry {
            key: "alice:square_192".to_string(),
            value: "/cache/avatar-abc123".to_string(),
            created_at: Utc::now(),
            last_access: Utc::now(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("alice:square_192"));
        assert!(json.contains("/cache/avatar-abc123"));

        let deserialized: LruEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.key, entry.key);
        assert_eq!(deserialized.value, entry.value);
    }
}
