//! Data models for the cover audit service
//!
//! Analysis verdicts, audit session state, the persisted report shape, and
//! the per-game fix history entries.

pub mod audit_report;
pub mod audit_session;
pub mod cover_analysis;
pub mod fix_history;
pub mod fix_outcome;

pub use audit_report::AuditReport;
pub use audit_session::{AuditPhase, AuditProgress, AuditSession};
pub use cover_analysis::{CoverAnalysis, CoverIssue, CoverMetrics, REVIEW_THRESHOLD};
pub use fix_history::{FixHistoryEntry, StoredHistoryEntry};
pub use fix_outcome::{BatchFixItem, BatchFixReport, FixProgress, FixRequest, FixSuccess};
