//! On-disk JSON persistence
//!
//! Both durable documents (the audit report snapshot and the fix history)
//! follow the same discipline: writes go through a sibling temp file and a
//! rename, so a reader never observes a half-written document.

pub mod history;
pub mod reports;

pub use history::FixHistoryStore;
pub use reports::AuditReportStore;

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.to_path_buf(), source }
}

pub(crate) fn json_error(path: &Path, source: serde_json::Error) -> StoreError {
    StoreError::Malformed { path: path.to_path_buf(), source }
}

/// Write `value` as pretty JSON via a temp file in the same directory
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| json_error(path, e))?;
    let tmp = sibling_temp_path(path);
    tokio::fs::write(&tmp, &json).await.map_err(|e| io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| io_error(path, e))?;
    Ok(())
}

/// Temp file next to the target, keeping the rename on one filesystem
fn sibling_temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_is_a_sibling() {
        let tmp = sibling_temp_path(Path::new("/library/fix-history.json"));
        assert_eq!(tmp, Path::new("/library/fix-history.json.tmp"));
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("doc.json");
        write_json_atomic(&target, &serde_json::json!({"ok": true})).await.unwrap();

        assert!(target.exists());
        assert!(!dir.path().join("doc.json.tmp").exists());
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&target).unwrap()).unwrap();
        assert_eq!(raw["ok"], true);
    }
}
