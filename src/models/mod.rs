use serde::Deserialize;

mod feed;
mod recommendation;

pub use feed::{FeedCursor, FeedSnapshot, LoadOutcome};
pub use recommendation::{
    FeedQuery, HighlightMetadata, Identity, RawRecommendation, RecommendationItem, SourceKind,
    SourcePage, UnresolvedPolicy, PAGE_SIZE,
};

// ============================================================================
// Backend API Types
// ============================================================================

/// Reel identifiers arrive as strings, but older rows serialize as numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiReelId {
    Text(String),
    Number(i64),
}

impl From<ApiReelId> for String {
    fn from(id: ApiReelId) -> Self {
        match id {
            ApiReelId::Text(s) => s,
            ApiReelId::Number(n) => n.to_string(),
        }
    }
}

/// Response from `/recommend/follow` and `/recommend/predict`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRecommendationsResponse {
    pub success: bool,
    #[serde(default)]
    pub recommendations: Vec<ApiRecommendation>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRecommendation {
    pub reel_id: ApiReelId,
    #[serde(default)]
    pub predicted_score: Option<f64>,
}

impl From<ApiRecommendation> for RawRecommendation {
    fn from(rec: ApiRecommendation) -> Self {
        RawRecommendation {
            reel_id: rec.reel_id.into(),
            raw_score: rec.predicted_score,
        }
    }
}

/// Response from `/api/mlb/video`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideoResponse {
    pub success: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub blurb: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
