//! Service modules for the audit and remediation workflows
//!
//! The audit path runs scanner, metrics extraction, and scoring under the
//! orchestrator; the remediation path drives the asset source and cache
//! through the remediation engine.

pub mod asset_cache;
pub mod asset_source;
pub mod audit_orchestrator;
pub mod cover_scanner;
pub mod metrics_extractor;
pub mod remediation;
pub mod scorer;
pub mod steamgriddb_client;

pub use asset_cache::{AssetCache, CacheError, DiskAssetCache};
pub use asset_source::{AssetClass, AssetSource, CoverCandidate, SourceError, SourceGame};
pub use audit_orchestrator::{AuditConfig, AuditOrchestrator};
pub use cover_scanner::{CoverFile, CoverScanner, ScanError};
pub use metrics_extractor::{MetricsError, MetricsExtractor};
pub use remediation::{FixError, RemediationEngine};
pub use scorer::{analyze_cover, score_metrics};
pub use steamgriddb_client::SteamGridDbClient;
