//! Shared types and utilities for Ludex services
//!
//! Every Ludex service resolves the same library root, shares the same
//! on-disk layout ([`config::LibraryPaths`]) and speaks the same error
//! vocabulary. Service-specific configuration layers on top in each
//! service crate.

pub mod config;
pub mod error;
pub mod human_time;

pub use error::{Error, Result};
