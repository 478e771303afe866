use serde::Serialize;

use super::{RecommendationItem, SourceKind};

/// Per-source pagination bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedCursor {
    /// Last page requested; 0 until the first request goes out
    pub page_number: u32,
    /// Once false the source is never queried again
    pub has_more: bool,
    /// Set the first time the source's first page yields a displayable item
    pub is_loaded: bool,
}

impl FeedCursor {
    pub fn new() -> Self {
        Self {
            page_number: 0,
            has_more: true,
            is_loaded: false,
        }
    }

    /// A cursor for a source that must never be queried
    pub fn disabled() -> Self {
        Self {
            has_more: false,
            ..Self::new()
        }
    }

    pub fn exhaust(&mut self) {
        self.has_more = false;
    }
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// What the viewer sees at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub items: Vec<RecommendationItem>,
    /// True while at least one source can still produce pages
    pub has_more: bool,
    /// False while personalized results are still arriving
    pub model_loaded: bool,
    pub current_page: u32,
}

/// Result of one "load more" trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was requested from the scheduled source
    Fetched(SourceKind),
    /// The scheduled page failed and its source is now exhausted
    Failed(SourceKind),
    /// The scheduled source is exhausted; the round was spent without a request
    Skipped(SourceKind),
    /// Another load is in flight
    Busy,
    /// Both sources are exhausted
    Exhausted,
    /// The feed was torn down
    Closed,
}

impl LoadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadOutcome::Fetched(_) => "fetched",
            LoadOutcome::Failed(_) => "failed",
            LoadOutcome::Skipped(_) => "skipped",
            LoadOutcome::Busy => "busy",
            LoadOutcome::Exhausted => "exhausted",
            LoadOutcome::Closed => "closed",
        }
    }

    /// The source the trigger was scheduled onto, if it got that far
    pub fn source(&self) -> Option<SourceKind> {
        match self {
            LoadOutcome::Fetched(kind) | LoadOutcome::Failed(kind) | LoadOutcome::Skipped(kind) => {
                Some(*kind)
            }
            _ => None,
        }
    }
}
