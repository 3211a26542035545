//! Fix history persistence
//!
//! One JSON document (`fix-history.json` under the library root) keyed by
//! game id. Legacy bare-array entries are upgraded to the current schema on
//! first read and the file is rewritten once.

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::{FixHistoryEntry, StoredHistoryEntry};
use crate::store::{io_error, json_error, write_json_atomic, StoreError};

type HistoryMap = BTreeMap<i64, FixHistoryEntry>;

/// Single-writer store for per-game fix history
pub struct FixHistoryStore {
    path: PathBuf,
    // Every public operation takes this first, so read-modify-write cycles
    // from concurrent fixes cannot interleave
    lock: Mutex<()>,
}

impl FixHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full history map; a missing file is an empty history
    pub async fn load_all(&self) -> Result<HistoryMap, StoreError> {
        let _guard = self.lock.lock().await;
        self.load_locked().await
    }

    /// History for one game, defaulting to an empty entry
    pub async fn entry_for(&self, game_id: i64) -> Result<FixHistoryEntry, StoreError> {
        let _guard = self.lock.lock().await;
        let mut history = self.load_locked().await?;
        Ok(history.remove(&game_id).unwrap_or_default())
    }

    /// Record one committed attempt; entries only ever grow
    pub async fn record_attempt(&self, game_id: i64, candidate_id: &str, url: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut history = self.load_locked().await?;
        history.entry(game_id).or_default().record(candidate_id, url, Utc::now());
        write_json_atomic(&self.path, &history).await?;
        tracing::debug!(game_id, candidate_id, "Recorded fix attempt");
        Ok(())
    }

    /// Forget one game's attempts; returns whether anything was recorded
    pub async fn clear_game(&self, game_id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut history = self.load_locked().await?;
        let removed = history.remove(&game_id).is_some();
        if removed {
            write_json_atomic(&self.path, &history).await?;
            tracing::info!(game_id, "Cleared fix history for game");
        }
        Ok(removed)
    }

    /// Forget every game's attempts
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        write_json_atomic(&self.path, &HistoryMap::new()).await?;
        tracing::info!(path = %self.path.display(), "Cleared all fix history");
        Ok(())
    }

    /// Read and decode the file, upgrading legacy entries in place.
    /// Callers must hold `lock`.
    async fn load_locked(&self) -> Result<HistoryMap, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HistoryMap::new()),
            Err(e) => return Err(io_error(&self.path, e)),
        };

        let stored: BTreeMap<i64, StoredHistoryEntry> =
            serde_json::from_slice(&raw).map_err(|e| json_error(&self.path, e))?;

        let mut history = HistoryMap::new();
        let mut upgraded = 0usize;
        for (game_id, entry) in stored {
            let (entry, was_legacy) = entry.upgrade();
            if was_legacy {
                upgraded += 1;
            }
            history.insert(game_id, entry);
        }

        if upgraded > 0 {
            write_json_atomic(&self.path, &history).await?;
            tracing::info!(
                path = %self.path.display(),
                upgraded,
                "Upgraded legacy fix history entries to current schema"
            );
        }

        Ok(history)
    }
}
