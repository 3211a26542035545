//! Service-level errors

use thiserror::Error;

use crate::services::{ScanError, SourceError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("A cover audit is already in progress")]
    AuditInProgress,

    #[error("A batch fix is already in progress")]
    FixInProgress,

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Asset source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Common(#[from] ludex_common::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
