//! Asset source abstraction
//!
//! Remediation reaches the outside world only through this trait, so the
//! engine can be exercised against canned sources and the concrete HTTP
//! client stays swappable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Art classes a source can offer for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Cover,
    Hero,
    Logo,
}

impl AssetClass {
    /// Path segment used by the SteamGridDB style APIs
    pub fn api_segment(&self) -> &'static str {
        match self {
            AssetClass::Cover => "grids",
            AssetClass::Hero => "heroes",
            AssetClass::Logo => "logos",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetClass::Cover => "cover",
            AssetClass::Hero => "hero",
            AssetClass::Logo => "logo",
        };
        write!(f, "{name}")
    }
}

/// A game as known to the source's own catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGame {
    pub id: i64,
    pub name: String,
}

/// One downloadable art option for a resolved game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverCandidate {
    /// Source-assigned id, stable across queries; this is what the fix
    /// history remembers
    pub id: String,
    pub quality_score: f64,
    pub is_adult: bool,
    pub is_humor: bool,
    pub url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Asset source API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response from asset source: {0}")]
    Parse(String),
    #[error("Asset source rate limit exceeded")]
    RateLimited,
}

/// External catalog of game identities and cover art
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Resolve a game by its Steam app id; `Ok(None)` when the source does
    /// not know the id
    async fn lookup_by_steam_app_id(&self, steam_app_id: u32) -> Result<Option<SourceGame>, SourceError>;

    /// Fuzzy title search, best matches first; an empty result means no match
    async fn search_by_title(&self, title: &str) -> Result<Vec<SourceGame>, SourceError>;

    /// Every candidate of one asset class for a resolved game
    async fn list_candidates(&self, game: &SourceGame, class: AssetClass) -> Result<Vec<CoverCandidate>, SourceError>;
}
