use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Items per source page, and therefore per block of the combined sequence
pub const PAGE_SIZE: usize = 5;

/// Upper bound of the predicted rating scale used by the model recommender
const MAX_PREDICTED_RATING: f64 = 5.0;

/// Which recommender produced an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Highlights derived from the user's followed teams and players
    Followed,
    /// Highlights ranked by the per-user predictive model
    Model,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Followed => "followed",
            SourceKind::Model => "model",
        }
    }

    fn placeholder_title(&self) -> &'static str {
        match self {
            SourceKind::Followed => "Followed Team/Player Highlight",
            SourceKind::Model => "Model Recommendation",
        }
    }

    fn placeholder_description(&self) -> &'static str {
        match self {
            SourceKind::Followed => "Highlight from your followed teams/players",
            SourceKind::Model => "",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reel reference as returned by a source page, before metadata resolution
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecommendation {
    pub reel_id: String,
    /// Predicted rating on a 0-5 scale; only the model recommender sets it
    pub raw_score: Option<f64>,
}

impl RawRecommendation {
    pub fn new(reel_id: impl Into<String>) -> Self {
        Self {
            reel_id: reel_id.into(),
            raw_score: None,
        }
    }

    pub fn with_score(mut self, raw_score: f64) -> Self {
        self.raw_score = Some(raw_score);
        self
    }

    /// Display score as a 0-100 match percentage of the predicted rating
    pub fn score(&self) -> Option<u8> {
        self.raw_score
            .filter(|s| s.is_finite())
            .map(|s| ((s / MAX_PREDICTED_RATING) * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

/// One page as reported by a source adapter
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
    pub items: Vec<RawRecommendation>,
    pub has_more: bool,
}

/// Playable metadata resolved for a single reel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightMetadata {
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
}

/// The unit displayed in the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: String,
    pub source_kind: SourceKind,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl RecommendationItem {
    pub fn resolved(raw: RawRecommendation, kind: SourceKind, metadata: HighlightMetadata) -> Self {
        Self {
            score: Self::score_for(&raw, kind),
            id: raw.reel_id,
            source_kind: kind,
            title: metadata.title,
            description: metadata.description,
            video_url: metadata.video_url,
        }
    }

    /// Item shown when metadata resolution failed and placeholders are enabled
    pub fn placeholder(raw: RawRecommendation, kind: SourceKind) -> Self {
        Self {
            score: Self::score_for(&raw, kind),
            id: raw.reel_id,
            source_kind: kind,
            title: kind.placeholder_title().to_string(),
            description: kind.placeholder_description().to_string(),
            video_url: None,
        }
    }

    fn score_for(raw: &RawRecommendation, kind: SourceKind) -> Option<u8> {
        match kind {
            SourceKind::Model => raw.score(),
            SourceKind::Followed => None,
        }
    }
}

/// The caller identity a source may need; tokens are never read from ambient state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub token: String,
}

impl Identity {
    /// Builds an identity only when both parts are present and non-blank
    pub fn from_parts(user_id: Option<String>, token: Option<String>) -> Option<Self> {
        let user_id = user_id.filter(|u| !u.trim().is_empty())?;
        let token = token.filter(|t| !t.trim().is_empty())?;
        Some(Self { user_id, token })
    }
}

/// What a source request carries besides the page number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub identity: Option<Identity>,
    /// Free-text filter forwarded to both recommenders
    pub search: Option<String>,
}

impl FeedQuery {
    /// Blank search terms are treated as no search
    pub fn new(identity: Option<Identity>, search: Option<String>) -> Self {
        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self { identity, search }
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.token.as_str())
    }
}

/// Handling of reels whose metadata lookup failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Leave the reel out of the feed
    #[default]
    Drop,
    /// Keep the reel with source-provided placeholder text and no video
    Placeholder,
}
