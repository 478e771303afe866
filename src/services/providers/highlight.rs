/// Highlight fetcher backed by the MLB video endpoint
///
/// Resolves a reel reference into title, blurb and video URL. Successful
/// lookups are cached in Redis when a cache is configured; failures are never
/// cached so a transient miss does not stick.
///
/// API: `GET /api/mlb/video?play_id=R`
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{ApiVideoResponse, HighlightMetadata, Identity},
    services::providers::{BackendClient, HighlightFetcher},
};

const DEFAULT_TITLE: &str = "MLB Highlight";

#[derive(Clone)]
pub struct HttpHighlightFetcher {
    backend: BackendClient,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl HttpHighlightFetcher {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            cache: None,
            cache_ttl: 0,
        }
    }

    pub fn with_cache(mut self, cache: Cache, ttl_secs: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl_secs;
        self
    }

    async fn fetch_metadata(
        &self,
        reel_id: &str,
        identity: Option<&Identity>,
    ) -> AppResult<HighlightMetadata> {
        let query = [("play_id", reel_id.to_string())];
        let token = identity.map(|i| i.token.as_str());

        let response: ApiVideoResponse = self
            .backend
            .get_json("/api/mlb/video", &query, token)
            .await?;

        let metadata = into_metadata(response)?;

        tracing::debug!(reel_id, has_video = metadata.video_url.is_some(), "Highlight resolved");

        Ok(metadata)
    }
}

#[async_trait::async_trait]
impl HighlightFetcher for HttpHighlightFetcher {
    async fn resolve(
        &self,
        reel_id: &str,
        identity: Option<Identity>,
    ) -> AppResult<HighlightMetadata> {
        if reel_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Reel id cannot be empty".to_string()));
        }

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Highlight(reel_id.to_string()),
                self.cache_ttl,
                self.fetch_metadata(reel_id, identity.as_ref())
            ),
            None => self.fetch_metadata(reel_id, identity.as_ref()).await,
        }
    }
}

fn into_metadata(response: ApiVideoResponse) -> AppResult<HighlightMetadata> {
    if !response.success {
        return Err(AppError::NotFound(
            response
                .message
                .unwrap_or_else(|| "Video not found".to_string()),
        ));
    }

    Ok(HighlightMetadata {
        title: response
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: response.blurb.unwrap_or_default(),
        video_url: response.video_url.filter(|u| !u.trim().is_empty()),
    })
}
