//! ludex-ca: Cover Audit service
//!
//! Audits game cover art for quality defects (pillarboxing, uniform filler
//! bands, visible seams), keeps an append-only history of remediation
//! attempts, and replaces bad covers with art from SteamGridDB. Talks to
//! the rest of Ludex through the shared on-disk library contract.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::Error;
