//! Service configuration
//!
//! The library root is resolved by `ludex-common` (command line, then
//! `LUDEX_ROOT`, then the shared config file, then the OS default). Settings
//! specific to this service layer on top: environment first, then the
//! service TOML file `ludex-ca.toml`, then compiled defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ludex_common::config::{read_toml_config, service_config_path, LibraryPaths};

use crate::services::audit_orchestrator::{default_worker_count, DEFAULT_BATCH_SIZE};
use crate::error::Error;

/// Environment variable carrying the SteamGridDB API key
pub const API_KEY_ENV: &str = "LUDEX_SGDB_API_KEY";

/// Service config file stem, resolving to `<config dir>/ludex/ludex-ca.toml`
pub const SERVICE_NAME: &str = "ludex-ca";

/// On-disk shape of `ludex-ca.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaTomlConfig {
    pub steamgriddb_api_key: Option<String>,
    pub worker_count: Option<usize>,
    pub batch_size: Option<usize>,
}

/// Resolved runtime configuration for the service
#[derive(Debug, Clone)]
pub struct CaConfig {
    pub paths: LibraryPaths,
    pub worker_count: usize,
    pub batch_size: usize,
    steamgriddb_api_key: Option<String>,
}

impl CaConfig {
    /// Resolve configuration for an already-resolved library root
    pub fn load(library_root: PathBuf) -> Self {
        let file = match service_config_path(SERVICE_NAME) {
            Some(path) if path.exists() => match read_toml_config::<CaTomlConfig>(&path) {
                Ok(config) => {
                    tracing::debug!(path = %path.display(), "Loaded service config file");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable service config file");
                    CaTomlConfig::default()
                }
            },
            _ => CaTomlConfig::default(),
        };

        let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        if env_key.is_some() && file.steamgriddb_api_key.is_some() {
            tracing::warn!(
                "SteamGridDB API key set in both {} and {}.toml; the environment value wins",
                API_KEY_ENV,
                SERVICE_NAME
            );
        }
        let steamgriddb_api_key = env_key.or(file.steamgriddb_api_key);

        Self {
            paths: LibraryPaths::new(library_root),
            worker_count: file.worker_count.unwrap_or_else(default_worker_count),
            batch_size: file.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            steamgriddb_api_key,
        }
    }

    /// The API key, or a configuration error explaining where to put one
    pub fn require_api_key(&self) -> Result<&str, Error> {
        self.steamgriddb_api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "No SteamGridDB API key configured.\n\
                 Set the {} environment variable, or add\n\
                 \n\
                     steamgriddb_api_key = \"<your key>\"\n\
                 \n\
                 to {}.toml in the Ludex config directory.\n\
                 Keys are issued at https://www.steamgriddb.com/profile/preferences/api",
                API_KEY_ENV, SERVICE_NAME
            ))
        })
    }
}
