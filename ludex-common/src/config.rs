//! Configuration loading and library root resolution

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the library root
pub const LIBRARY_ROOT_ENV: &str = "LUDEX_ROOT";

/// Shared TOML configuration (`~/.config/ludex/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Library root folder override
    pub library_root: Option<String>,
}

/// Library root resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. `LUDEX_ROOT` environment variable
/// 3. Shared TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_library_root(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(LIBRARY_ROOT_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: Shared TOML config file
    if let Some(config_path) = shared_config_path() {
        if let Ok(config) = read_toml_config::<TomlConfig>(&config_path) {
            if let Some(root) = config.library_root {
                return PathBuf::from(root);
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_library_root()
}

/// Path of the shared config file (`<config dir>/ludex/config.toml`)
pub fn shared_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ludex").join("config.toml"))
}

/// Path of a per-service config file (`<config dir>/ludex/<service>.toml`)
pub fn service_config_path(service: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ludex").join(format!("{}.toml", service)))
}

/// OS-dependent default library root
fn default_library_root() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/ludex (or /var/lib/ludex for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("ludex"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ludex"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/ludex
        dirs::data_dir()
            .map(|d| d.join("ludex"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ludex"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\ludex
        dirs::data_local_dir()
            .map(|d| d.join("ludex"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ludex"))
    } else {
        PathBuf::from("./ludex_data")
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write a TOML config file atomically (write temp, then rename)
pub fn write_toml_config<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(value)
        .map_err(|e| Error::Config(format!("Encode {} failed: {}", path.display(), e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Resolved on-disk layout of one Ludex library
///
/// The covers directory plus the two JSON state files are the contract every
/// Ludex service shares; all paths derive from the single resolved root.
#[derive(Debug, Clone)]
pub struct LibraryPaths {
    root: PathBuf,
}

impl LibraryPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cover art directory: `<root>/covers/<gameId>.<ext>`
    pub fn covers_dir(&self) -> PathBuf {
        self.root.join("covers")
    }

    /// Persisted audit snapshot: `<root>/cover-audit.json`
    pub fn audit_report_path(&self) -> PathBuf {
        self.root.join("cover-audit.json")
    }

    /// Persisted fix history ledger: `<root>/fix-history.json`
    pub fn fix_history_path(&self) -> PathBuf {
        self.root.join("fix-history.json")
    }

    /// Create the root and covers directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.covers_dir())?;
        Ok(())
    }
}
