//! Audit report
//!
//! The durable outcome of one full audit run. Each run produces exactly one
//! report; persistence replaces the previous snapshot wholesale, there is no
//! merging with earlier runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AuditProgress, CoverAnalysis};

/// Summary and per-cover verdicts for one completed audit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub total: usize,
    pub passed: usize,
    pub flagged: usize,
    /// Covers that could not be read or decoded
    pub failed: usize,
    /// Analysis tasks that died before producing a verdict
    pub errors: usize,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
    /// Worst covers first: ascending score, ties broken by game id
    pub results: Vec<CoverAnalysis>,
}

impl AuditReport {
    /// Assemble a report from final session counters and the collected
    /// verdicts, sorting results worst-first
    pub fn from_run(progress: &AuditProgress, mut results: Vec<CoverAnalysis>, duration_ms: u64) -> Self {
        results.sort_by(|a, b| a.score.cmp(&b.score).then(a.game_id.cmp(&b.game_id)));
        Self {
            total: progress.total,
            passed: progress.passed,
            flagged: progress.flagged,
            failed: progress.failed,
            errors: progress.errors,
            duration_ms,
            completed_at: Utc::now(),
            results,
        }
    }

    /// The `n` lowest-scoring covers
    pub fn worst(&self, n: usize) -> &[CoverAnalysis] {
        &self.results[..self.results.len().min(n)]
    }
}
