//! SteamGridDB API client
//!
//! Implements [`AssetSource`] against the SteamGridDB v2 API:
//! - Bearer token authentication
//! - Rate limited to one request per 500ms
//! - Cover candidates come from the 600x900 portrait grid pool
//!
//! API reference: <https://www.steamgriddb.com/api/v2>

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::services::{AssetClass, AssetSource, CoverCandidate, SourceError, SourceGame};

const API_BASE: &str = "https://www.steamgriddb.com/api/v2";
const USER_AGENT: &str = "Ludex/0.1 (https://github.com/ludex-app/ludex)";
const RATE_LIMIT_MS: u64 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Grid dimensions treated as covers
const COVER_DIMENSIONS: &str = "600x900";

/// Spaces successive requests at least `min_interval` apart
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Block until enough time has passed since the previous request
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Standard SteamGridDB response wrapper.
/// `data` must stay a plain `Option`: a `default` attribute here would
/// require `T: Default`, which the payload types do not implement.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiGame {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAsset {
    id: i64,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    nsfw: bool,
    #[serde(default)]
    humor: bool,
    url: String,
    #[serde(default)]
    thumb: String,
}

impl From<ApiGame> for SourceGame {
    fn from(game: ApiGame) -> Self {
        SourceGame { id: game.id, name: game.name }
    }
}

impl From<ApiAsset> for CoverCandidate {
    fn from(asset: ApiAsset) -> Self {
        CoverCandidate {
            id: asset.id.to_string(),
            quality_score: asset.score,
            is_adult: asset.nsfw,
            is_humor: asset.humor,
            url: asset.url,
            thumbnail_url: asset.thumb,
        }
    }
}

/// HTTP client for SteamGridDB
pub struct SteamGridDbClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    api_key: String,
}

impl SteamGridDbClient {
    pub fn new(api_key: String) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
            api_key,
        })
    }

    /// GET an API path and unwrap the response envelope.
    /// `Ok(None)` means the resource does not exist (HTTP 404).
    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, SourceError> {
        self.rate_limiter.wait().await;

        let url = format!("{API_BASE}{path}");
        tracing::debug!(%url, "SteamGridDB request");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let envelope: Envelope<T> =
                    response.json().await.map_err(|e| SourceError::Parse(e.to_string()))?;
                if !envelope.success {
                    let message = envelope.errors.unwrap_or_default().join("; ");
                    return Err(SourceError::Api { status: 200, message });
                }
                match envelope.data {
                    Some(data) => Ok(Some(data)),
                    None => Err(SourceError::Parse("successful response without data".to_string())),
                }
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(SourceError::Api { status: status.as_u16(), message })
            }
        }
    }
}

#[async_trait::async_trait]
impl AssetSource for SteamGridDbClient {
    async fn lookup_by_steam_app_id(&self, steam_app_id: u32) -> Result<Option<SourceGame>, SourceError> {
        let game: Option<ApiGame> = self.get_data(&format!("/games/steam/{steam_app_id}")).await?;
        Ok(game.map(SourceGame::from))
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<SourceGame>, SourceError> {
        let path = format!("/search/autocomplete/{}", urlencoding::encode(title));
        let games: Option<Vec<ApiGame>> = self.get_data(&path).await?;
        Ok(games.unwrap_or_default().into_iter().map(SourceGame::from).collect())
    }

    async fn list_candidates(&self, game: &SourceGame, class: AssetClass) -> Result<Vec<CoverCandidate>, SourceError> {
        let mut path = format!("/{}/game/{}", class.api_segment(), game.id);
        if class == AssetClass::Cover {
            path.push_str(&format!("?dimensions={COVER_DIMENSIONS}"));
        }
        let assets: Option<Vec<ApiAsset>> = self.get_data(&path).await?;
        let candidates: Vec<CoverCandidate> =
            assets.unwrap_or_default().into_iter().map(CoverCandidate::from).collect();
        tracing::debug!(
            source_game_id = game.id,
            %class,
            count = candidates.len(),
            "Fetched candidates"
        );
        Ok(candidates)
    }
}
