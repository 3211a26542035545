//! Cover installation
//!
//! Downloads a chosen candidate and installs it as the game's cover file.
//! Downloads stream to a hidden temp file in the covers directory and land
//! with a rename, so the audit never sees a partial cover, and stale
//! variants of the same game under other extensions are removed afterwards.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::services::cover_scanner::COVER_EXTENSIONS;

const DOWNLOAD_TIMEOUT_SECS: u64 = 60;
/// Fallback when the URL does not reveal a usable extension
const DEFAULT_EXTENSION: &str = "png";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create HTTP client: {0}")]
    Init(String),
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for downloaded covers
#[async_trait]
pub trait AssetCache: Send + Sync {
    /// Install the file at `url` as the canonical cover for `game_id`,
    /// returning the final local path
    async fn store_cover(&self, game_id: i64, url: &str) -> Result<PathBuf, CacheError>;
}

/// Cache that writes covers into the library covers directory
pub struct DiskAssetCache {
    covers_dir: PathBuf,
    client: reqwest::Client,
}

impl DiskAssetCache {
    pub fn new(covers_dir: PathBuf) -> Result<Self, CacheError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| CacheError::Init(e.to_string()))?;
        Ok(Self { covers_dir, client })
    }
}

#[async_trait]
impl AssetCache for DiskAssetCache {
    async fn store_cover(&self, game_id: i64, url: &str) -> Result<PathBuf, CacheError> {
        let ext = extension_from_url(url);
        let final_path = self.covers_dir.join(format!("{game_id}.{ext}"));
        // Leading dot keeps the temp file invisible to the cover scanner
        let temp_path = self.covers_dir.join(format!(".{game_id}.download.tmp"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(url, e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(url, format!("HTTP status {}", response.status())));
        }

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(download_error(url, e.to_string()));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(io_error(&temp_path, e));
            }
        }
        file.flush().await.map_err(|e| io_error(&temp_path, e))?;
        drop(file);

        tokio::fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| io_error(&final_path, e))?;
        prune_stale_variants(&self.covers_dir, game_id, ext).await;

        tracing::info!(game_id, path = %final_path.display(), "Installed replacement cover");
        Ok(final_path)
    }
}

fn download_error(url: &str, reason: String) -> CacheError {
    CacheError::Download { url: url.to_string(), reason }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io { path: path.to_path_buf(), source }
}

/// Infer the cover extension from the URL path, defaulting to png
fn extension_from_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    COVER_EXTENSIONS.iter().find(|e| **e == ext).copied().unwrap_or(DEFAULT_EXTENSION)
}

/// Remove leftover cover files for the same game under other extensions
async fn prune_stale_variants(covers_dir: &Path, game_id: i64, keep_ext: &str) {
    for ext in COVER_EXTENSIONS {
        if *ext == keep_ext {
            continue;
        }
        let stale = covers_dir.join(format!("{game_id}.{ext}"));
        match tokio::fs::remove_file(&stale).await {
            Ok(()) => tracing::debug!(game_id, path = %stale.display(), "Removed stale cover variant"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(game_id, path = %stale.display(), error = %e, "Could not remove stale cover variant")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extension_inferred_from_url_path() {
        assert_eq!(extension_from_url("https://cdn.example/a/cover.png"), "png");
        assert_eq!(extension_from_url("https://cdn.example/a/cover.JPG"), "jpg");
        assert_eq!(extension_from_url("https://cdn.example/cover.webp?token=abc"), "webp");
        assert_eq!(extension_from_url("https://cdn.example/cover.jpeg#frag"), "jpeg");
        assert_eq!(extension_from_url("https://cdn.example/no-extension"), "png");
        assert_eq!(extension_from_url("https://cdn.example/archive.gif"), "png");
    }

    #[tokio::test]
    async fn prune_removes_other_extensions_only() {
        let dir = TempDir::new().unwrap();
        for name in ["5.png", "5.jpg", "5.webp", "6.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        prune_stale_variants(dir.path(), 5, "jpg").await;

        assert!(dir.path().join("5.jpg").exists());
        assert!(!dir.path().join("5.png").exists());
        assert!(!dir.path().join("5.webp").exists());
        assert!(dir.path().join("6.png").exists());
    }
}
