//! Remediation requests and outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One game whose cover should be replaced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRequest {
    pub game_id: i64,
    /// Library title, used for search when no Steam app id is known or the
    /// id lookup misses
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_app_id: Option<u32>,
}

/// A committed single-cover fix
#[derive(Debug, Clone)]
pub struct FixSuccess {
    pub game_id: i64,
    pub candidate_id: String,
    pub resolved_url: String,
    pub local_path: PathBuf,
}

/// Outcome of one item in a batch fix
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFixItem {
    pub game_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one batch fix
///
/// `items` has one row per input request, in input order, regardless of how
/// individual items fared.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFixReport {
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<BatchFixItem>,
}

/// Poll snapshot of a running batch fix
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixProgress {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub current_game_id: Option<i64>,
    pub started_at: DateTime<Utc>,
}

impl FixProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            failed: 0,
            current_game_id: None,
            started_at: Utc::now(),
        }
    }
}
