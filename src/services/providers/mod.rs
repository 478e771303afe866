/// Collaborators the feed merger pulls from
///
/// Each recommendation source is a paginated supplier of reel references and
/// the highlight fetcher turns a reel reference into playable metadata. The
/// merger only sees these traits, so the HTTP adapters can be swapped for
/// fakes in tests.
use crate::{
    error::AppResult,
    models::{FeedQuery, HighlightMetadata, Identity, SourcePage},
};

pub mod backend;
pub mod followed;
pub mod highlight;
pub mod model;

pub use backend::BackendClient;
pub use followed::FollowedSource;
pub use highlight::HttpHighlightFetcher;
pub use model::ModelSource;

/// A paginated supplier of highlight reel references
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Fetches the 1-indexed `page`
    ///
    /// Identity and search come from the caller; adapters never read
    /// credentials from ambient state. Any error means the page could not be
    /// obtained.
    async fn fetch_page(&self, page: u32, query: FeedQuery) -> AppResult<SourcePage>;
}

/// Resolves a reel reference into playable metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HighlightFetcher: Send + Sync {
    async fn resolve(&self, reel_id: &str, identity: Option<Identity>)
        -> AppResult<HighlightMetadata>;
}
