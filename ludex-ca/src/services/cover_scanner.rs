//! Cover directory scanner
//!
//! Enumerates the flat covers directory and maps filenames back to game ids.
//! Cover files are named `<gameId>.<ext>`; anything else in the directory is
//! ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Recognized cover extensions, in preference order when a game has more
/// than one cover file on disk
pub const COVER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// One cover file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverFile {
    pub game_id: i64,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Covers directory not found: {0}")]
    PathNotFound(PathBuf),
    #[error("Covers path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("IO error while scanning covers: {0}")]
    Io(String),
}

/// Scanner for the library covers directory
pub struct CoverScanner;

impl CoverScanner {
    pub fn new() -> Self {
        Self
    }

    /// Enumerate cover files under `covers_dir`, one per game
    ///
    /// Subdirectories are not descended into. When a game has several cover
    /// files with different extensions, the earliest entry in
    /// [`COVER_EXTENSIONS`] wins. Results are sorted by game id.
    pub fn scan(&self, covers_dir: &Path) -> Result<Vec<CoverFile>, ScanError> {
        if !covers_dir.exists() {
            return Err(ScanError::PathNotFound(covers_dir.to_path_buf()));
        }
        if !covers_dir.is_dir() {
            return Err(ScanError::NotADirectory(covers_dir.to_path_buf()));
        }

        tracing::debug!(covers_dir = %covers_dir.display(), "Scanning covers directory");

        let mut by_game: BTreeMap<i64, (usize, PathBuf)> = BTreeMap::new();
        for entry in WalkDir::new(covers_dir).min_depth(1).max_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| ScanError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some((game_id, rank)) = parse_cover_name(path) else {
                tracing::debug!(path = %path.display(), "Skipping non-cover file");
                continue;
            };
            match by_game.get(&game_id) {
                Some((existing_rank, existing_path)) if *existing_rank <= rank => {
                    tracing::warn!(
                        game_id,
                        kept = %existing_path.display(),
                        ignored = %path.display(),
                        "Duplicate cover files for game, keeping preferred extension"
                    );
                }
                Some((_, existing_path)) => {
                    tracing::warn!(
                        game_id,
                        kept = %path.display(),
                        ignored = %existing_path.display(),
                        "Duplicate cover files for game, keeping preferred extension"
                    );
                    by_game.insert(game_id, (rank, path.to_path_buf()));
                }
                None => {
                    by_game.insert(game_id, (rank, path.to_path_buf()));
                }
            }
        }

        let covers: Vec<CoverFile> = by_game
            .into_iter()
            .map(|(game_id, (_, path))| CoverFile { game_id, path })
            .collect();
        tracing::info!(covers_dir = %covers_dir.display(), count = covers.len(), "Cover scan complete");
        Ok(covers)
    }
}

impl Default for CoverScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `<gameId>.<ext>` into the id and the extension's preference rank
fn parse_cover_name(path: &Path) -> Option<(i64, usize)> {
    let stem = path.file_stem()?.to_str()?;
    let game_id: i64 = stem.parse().ok()?;
    if game_id < 0 {
        return None;
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let rank = COVER_EXTENSIONS.iter().position(|e| *e == ext)?;
    Some((game_id, rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn finds_only_well_named_covers() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "1.png");
        touch(dir.path(), "23.jpg");
        touch(dir.path(), "7.webp");
        touch(dir.path(), "readme.txt");
        touch(dir.path(), "cover.png");
        touch(dir.path(), "-3.png");
        touch(dir.path(), ".9.download.tmp");
        fs::create_dir(dir.path().join("backup")).unwrap();
        touch(&dir.path().join("backup"), "5.png");

        let covers = CoverScanner::new().scan(dir.path()).unwrap();
        let ids: Vec<i64> = covers.iter().map(|c| c.game_id).collect();
        assert_eq!(ids, vec![1, 7, 23]);
    }

    #[test]
    fn duplicate_extensions_resolved_by_preference() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "5.png");
        touch(dir.path(), "5.jpg");
        touch(dir.path(), "6.webp");
        touch(dir.path(), "6.jpeg");

        let covers = CoverScanner::new().scan(dir.path()).unwrap();
        assert_eq!(covers.len(), 2);
        assert!(covers[0].path.ends_with("5.jpg"));
        assert!(covers[1].path.ends_with("6.jpeg"));
    }

    #[test]
    fn uppercase_extensions_are_recognized() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "12.PNG");

        let covers = CoverScanner::new().scan(dir.path()).unwrap();
        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].game_id, 12);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("covers");
        assert!(matches!(
            CoverScanner::new().scan(&missing),
            Err(ScanError::PathNotFound(_))
        ));
    }

    #[test]
    fn file_path_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "1.png");
        assert!(matches!(
            CoverScanner::new().scan(&dir.path().join("1.png")),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn empty_directory_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        let covers = CoverScanner::new().scan(dir.path()).unwrap();
        assert!(covers.is_empty());
    }
}
