//! Audit session state
//!
//! Tracks one run of the cover audit from enumeration through completion.
//! Poll-only: the orchestrator publishes a fresh snapshot after every settled
//! batch and callers read it at their own pace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of an audit run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditPhase {
    /// Enumerating cover files under the covers directory
    Scanning,
    /// Worker pool is analyzing covers batch by batch
    Analyzing,
    Completed,
    Failed,
}

impl AuditPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditPhase::Completed | AuditPhase::Failed)
    }
}

/// Counters for a running audit
///
/// `completed` always equals `passed + flagged + failed + errors`: every
/// enumerated cover lands in exactly one bucket. `failed` counts unreadable
/// covers, `errors` analysis tasks that died.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditProgress {
    pub total: usize,
    pub completed: usize,
    pub passed: usize,
    pub flagged: usize,
    pub failed: usize,
    pub errors: usize,
    pub percentage: f64,
    pub elapsed_seconds: u64,
    pub estimated_remaining_seconds: Option<u64>,
}

/// One audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSession {
    pub session_id: Uuid,
    pub phase: AuditPhase,
    pub covers_dir: String,
    pub progress: AuditProgress,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl AuditSession {
    /// Create a new session in the SCANNING phase
    pub fn new(covers_dir: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phase: AuditPhase::Scanning,
            covers_dir,
            progress: AuditProgress::default(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to a new phase; terminal phases stamp `ended_at`
    pub fn transition_to(&mut self, phase: AuditPhase) {
        tracing::debug!(
            session_id = %self.session_id,
            from = ?self.phase,
            to = ?phase,
            "Audit phase transition"
        );
        self.phase = phase;
        if phase.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Record the enumeration result and enter the ANALYZING phase
    pub fn begin_analysis(&mut self, total: usize) {
        self.progress.total = total;
        self.refresh_derived();
        self.transition_to(AuditPhase::Analyzing);
    }

    /// Fold one settled batch into the counters
    ///
    /// This is the only place counters move during an audit, so a poll can
    /// never observe a half-applied batch.
    pub fn record_batch(&mut self, passed: usize, flagged: usize, failed: usize, errors: usize) {
        self.progress.passed += passed;
        self.progress.flagged += flagged;
        self.progress.failed += failed;
        self.progress.errors += errors;
        self.progress.completed += passed + flagged + failed + errors;
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        let p = &mut self.progress;
        p.percentage = if p.total > 0 {
            (p.completed as f64 / p.total as f64) * 100.0
        } else {
            0.0
        };
        p.elapsed_seconds = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
        p.estimated_remaining_seconds = if p.completed > 0 && p.total >= p.completed {
            let remaining = (p.total - p.completed) as f64;
            Some((remaining * p.elapsed_seconds as f64 / p.completed as f64) as u64)
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_session_starts_scanning() {
        let session = AuditSession::new("/library/covers".to_string());
        assert_eq!(session.phase, AuditPhase::Scanning);
        assert_eq!(session.progress.completed, 0);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn batches_partition_completed() {
        let mut session = AuditSession::new("/library/covers".to_string());
        session.begin_analysis(100);
        session.record_batch(40, 8, 1, 1);
        session.record_batch(45, 5, 0, 0);

        let p = session.progress;
        assert_eq!(p.completed, 100);
        assert_eq!(p.passed + p.flagged + p.failed + p.errors, p.completed);
        assert!((p.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn eta_scales_with_remaining_work() {
        let mut session = AuditSession::new("/library/covers".to_string());
        session.begin_analysis(100);
        // Pretend 10 seconds elapsed for 50 completed covers
        session.started_at = Utc::now() - Duration::seconds(10);
        session.record_batch(50, 0, 0, 0);

        let eta = session.progress.estimated_remaining_seconds.unwrap();
        assert!((9..=11).contains(&eta), "eta was {eta}");
    }

    #[test]
    fn eta_unknown_before_first_batch() {
        let mut session = AuditSession::new("/library/covers".to_string());
        session.begin_analysis(100);
        assert!(session.progress.estimated_remaining_seconds.is_none());
    }

    #[test]
    fn terminal_transition_stamps_end_time() {
        let mut session = AuditSession::new("/library/covers".to_string());
        session.transition_to(AuditPhase::Failed);
        assert!(session.phase.is_terminal());
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn phase_serializes_uppercase() {
        assert_eq!(serde_json::to_value(AuditPhase::Analyzing).unwrap(), "ANALYZING");
        assert_eq!(serde_json::to_value(AuditPhase::Completed).unwrap(), "COMPLETED");
    }
}
