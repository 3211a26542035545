//! Audit report snapshot persistence
//!
//! One JSON document (`cover-audit.json` under the library root) holding the
//! most recent completed audit. Every save replaces it wholesale.

use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::AuditReport;
use crate::store::{io_error, json_error, write_json_atomic, StoreError};

/// Store for the persisted audit report snapshot
pub struct AuditReportStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditReportStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the persisted snapshot with this report
    pub async fn save(&self, report: &AuditReport) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        write_json_atomic(&self.path, report).await?;
        tracing::info!(path = %self.path.display(), total = report.total, "Audit report saved");
        Ok(())
    }

    /// Latest persisted report, or `None` when no audit has completed yet
    pub async fn load(&self) -> Result<Option<AuditReport>, StoreError> {
        let _guard = self.lock.lock().await;
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let report = serde_json::from_slice(&raw).map_err(|e| json_error(&self.path, e))?;
        Ok(Some(report))
    }
}
