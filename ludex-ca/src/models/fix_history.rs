//! Fix history entries
//!
//! Per-game memory of every remediation attempt, so a candidate offered once
//! is never offered again. Entries only ever grow; forgetting is an explicit
//! clear operation on the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything tried so far for one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixHistoryEntry {
    #[serde(default)]
    pub tried_candidate_ids: BTreeSet<String>,
    #[serde(default)]
    pub tried_urls: BTreeSet<String>,
    #[serde(default)]
    pub last_attempt_time: Option<DateTime<Utc>>,
}

impl FixHistoryEntry {
    pub fn contains_candidate(&self, candidate_id: &str) -> bool {
        self.tried_candidate_ids.contains(candidate_id)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.tried_urls.contains(url)
    }

    /// Add one committed attempt; sets never shrink
    pub fn record(&mut self, candidate_id: &str, url: &str, when: DateTime<Utc>) {
        self.tried_candidate_ids.insert(candidate_id.to_string());
        self.tried_urls.insert(url.to_string());
        self.last_attempt_time = Some(when);
    }

    pub fn attempt_count(&self) -> usize {
        self.tried_candidate_ids.len()
    }
}

/// On-disk shape of one history entry, covering the legacy schema
///
/// Early history files stored a bare array of candidate ids per game. Decoding
/// accepts both shapes; `upgrade` lifts a legacy entry into the current one
/// with empty URL and timestamp fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredHistoryEntry {
    Current(FixHistoryEntry),
    Legacy(Vec<String>),
}

impl StoredHistoryEntry {
    /// Convert to the current schema; the flag reports whether this entry
    /// was in the legacy shape and the file needs rewriting
    pub fn upgrade(self) -> (FixHistoryEntry, bool) {
        match self {
            StoredHistoryEntry::Current(entry) => (entry, false),
            StoredHistoryEntry::Legacy(candidate_ids) => {
                let entry = FixHistoryEntry {
                    tried_candidate_ids: candidate_ids.into_iter().collect(),
                    tried_urls: BTreeSet::new(),
                    last_attempt_time: None,
                };
                (entry, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_without_shrinking() {
        let mut entry = FixHistoryEntry::default();
        entry.record("cand-1", "https://cdn.example/a.png", Utc::now());
        entry.record("cand-2", "https://cdn.example/b.png", Utc::now());
        entry.record("cand-1", "https://cdn.example/a.png", Utc::now());

        assert_eq!(entry.attempt_count(), 2);
        assert!(entry.contains_candidate("cand-1"));
        assert!(entry.contains_url("https://cdn.example/b.png"));
        assert!(entry.last_attempt_time.is_some());
    }

    #[test]
    fn decodes_current_schema() {
        let json = r#"{
            "triedCandidateIds": ["10", "11"],
            "triedUrls": ["https://cdn.example/10.png"],
            "lastAttemptTime": "2026-08-01T12:00:00Z"
        }"#;
        let stored: StoredHistoryEntry = serde_json::from_str(json).unwrap();
        let (entry, was_legacy) = stored.upgrade();
        assert!(!was_legacy);
        assert_eq!(entry.attempt_count(), 2);
        assert!(entry.contains_url("https://cdn.example/10.png"));
    }

    #[test]
    fn decodes_legacy_bare_array() {
        let stored: StoredHistoryEntry = serde_json::from_str(r#"["10", "11", "12"]"#).unwrap();
        let (entry, was_legacy) = stored.upgrade();
        assert!(was_legacy);
        assert_eq!(entry.attempt_count(), 3);
        assert!(entry.contains_candidate("12"));
        assert!(entry.tried_urls.is_empty());
        assert!(entry.last_attempt_time.is_none());
    }

    #[test]
    fn decodes_partial_current_entry_with_defaults() {
        let stored: StoredHistoryEntry = serde_json::from_str(r#"{"triedCandidateIds": ["5"]}"#).unwrap();
        let (entry, was_legacy) = stored.upgrade();
        assert!(!was_legacy);
        assert!(entry.contains_candidate("5"));
        assert!(entry.tried_urls.is_empty());
    }
}
