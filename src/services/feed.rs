/// Dual-source infinite-scroll feed
///
/// Combines the followed-entity recommender and the model recommender into one
/// append-only sequence of highlight items.
///
/// Page scheduling is a fixed round-robin over "page operations". Mounting
/// issues operations 1 (MODEL page 1) and 2 (FOLLOWED page 1) concurrently.
/// Every later trigger issues operation `n = current_page + 1`: odd `n` pulls
/// MODEL page `ceil(n / 2)`, even `n` pulls FOLLOWED page `n / 2`. A trigger
/// scheduled onto an exhausted source still consumes its round without a
/// request, which skews the interleave once one source runs dry.
///
/// The rendered sequence is a pure function of the buffered pages,
/// `current_page` and `model_loaded`, so the order in which network responses
/// land never matters:
///
/// * until the model has loaded, it is every FOLLOWED item in fetch order;
/// * afterwards it is `current_page` blocks, block `2j` holding FOLLOWED page
///   `j + 1` and block `2j + 1` holding MODEL page `j + 1`. Once both sources
///   are exhausted the block count is rounded up to even so the last MODEL
///   page is not stranded.
///
/// A trigger that pulls MODEL page `k` only opens block `2k - 2`, which
/// belongs to FOLLOWED, so MODEL page `k` becomes visible one trigger after it
/// lands.
///
/// Errors never escape: a failed page exhausts its source, a failed item
/// resolution drops (or placeholders) only that item.
///
/// Loads run on tasks the merger owns. Dropping the caller's future does not
/// cancel a load half way through a round.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    models::{
        FeedCursor, FeedQuery, FeedSnapshot, LoadOutcome, RawRecommendation, RecommendationItem,
        SourceKind, UnresolvedPolicy,
    },
    services::providers::{HighlightFetcher, RecommendationSource},
};

/// Page operations issued by the initial load
const INITIAL_OPERATIONS: u32 = 2;

/// Everything a merger needs from the outside world
#[derive(Clone)]
pub struct FeedSources {
    pub followed: Arc<dyn RecommendationSource>,
    pub model: Arc<dyn RecommendationSource>,
    pub highlights: Arc<dyn HighlightFetcher>,
    pub unresolved_policy: UnresolvedPolicy,
}

/// One source's cursor plus the surviving items of each page it returned
#[derive(Debug, Default)]
struct SourceBuffer {
    cursor: FeedCursor,
    pages: Vec<Vec<RecommendationItem>>,
}

impl SourceBuffer {
    fn block(&self, index: usize) -> &[RecommendationItem] {
        self.pages.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// A settled source has either delivered its first page or given up
    fn first_page_settled(&self) -> bool {
        !self.pages.is_empty() || !self.cursor.has_more
    }
}

#[derive(Debug)]
struct FeedState {
    current_page: u32,
    followed: SourceBuffer,
    model: SourceBuffer,
    model_loaded: bool,
}

impl FeedState {
    fn new(model_enabled: bool) -> Self {
        let model = SourceBuffer {
            cursor: if model_enabled {
                FeedCursor::new()
            } else {
                FeedCursor::disabled()
            },
            pages: Vec::new(),
        };

        Self {
            current_page: 0,
            followed: SourceBuffer::default(),
            model,
            model_loaded: false,
        }
    }

    fn buffer(&self, kind: SourceKind) -> &SourceBuffer {
        match kind {
            SourceKind::Followed => &self.followed,
            SourceKind::Model => &self.model,
        }
    }

    fn buffer_mut(&mut self, kind: SourceKind) -> &mut SourceBuffer {
        match kind {
            SourceKind::Followed => &mut self.followed,
            SourceKind::Model => &mut self.model,
        }
    }

    fn has_more(&self) -> bool {
        self.followed.cursor.has_more || self.model.cursor.has_more
    }

    /// Flips `model_loaded` once MODEL page 1 has items to show
    ///
    /// Waits for FOLLOWED page 1 to settle too, so that FOLLOWED items can
    /// never be inserted ahead of MODEL items already on screen.
    fn refresh_model_loaded(&mut self) {
        if self.model_loaded {
            return;
        }
        let first_model_page_ready = self.model.pages.first().is_some_and(|p| !p.is_empty());
        if first_model_page_ready && self.followed.first_page_settled() {
            self.model_loaded = true;
            tracing::info!("Model recommendations loaded");
        }
    }

    fn compose(&self) -> Vec<RecommendationItem> {
        if !self.model_loaded {
            return self.followed.pages.iter().flatten().cloned().collect();
        }

        let mut blocks = self.current_page as usize;
        if !self.has_more() {
            blocks += blocks % 2;
        }

        (0..blocks)
            .flat_map(|block| {
                let buffer = if block % 2 == 0 {
                    &self.followed
                } else {
                    &self.model
                };
                buffer.block(block / 2).iter().cloned()
            })
            .collect()
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: self.compose(),
            has_more: self.has_more(),
            model_loaded: self.model_loaded,
            current_page: self.current_page,
        }
    }
}

/// Maps a page operation number to the source and page it pulls
pub fn schedule(operation: u32) -> (SourceKind, u32) {
    if operation % 2 == 0 {
        (SourceKind::Followed, operation / 2)
    } else {
        (SourceKind::Model, operation.div_ceil(2))
    }
}

/// Clears the in-flight flag when a load finishes, however it finishes
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The per-viewer feed state machine
pub struct FeedMerger {
    sources: FeedSources,
    query: FeedQuery,
    state: RwLock<FeedState>,
    loading: AtomicBool,
    closed: AtomicBool,
}

impl FeedMerger {
    /// Creates an unmounted feed; without an identity the MODEL source is
    /// permanently exhausted and never called
    pub fn new(sources: FeedSources, query: FeedQuery) -> Self {
        let state = FeedState::new(query.identity.is_some());

        Self {
            sources,
            query,
            state: RwLock::new(state),
            loading: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn query(&self) -> &FeedQuery {
        &self.query
    }

    /// Mount: pulls page 1 of both sources concurrently
    pub async fn load_initial(self: &Arc<Self>) -> LoadOutcome {
        let feed = Arc::clone(self);
        settle(tokio::spawn(async move {
            if feed.is_closed() {
                return LoadOutcome::Closed;
            }
            let Some(_in_flight) = InFlight::acquire(&feed.loading) else {
                return LoadOutcome::Busy;
            };
            feed.run_initial().await
        }))
        .await
    }

    /// Viewer reached the end of the rendered list
    pub async fn load_more(self: &Arc<Self>) -> LoadOutcome {
        let feed = Arc::clone(self);
        settle(tokio::spawn(async move { feed.run_load_more().await })).await
    }

    /// Unmount: results still in flight are discarded when they land
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub async fn has_more(&self) -> bool {
        self.state.read().await.has_more()
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn cursor(&self, kind: SourceKind) -> FeedCursor {
        self.state.read().await.buffer(kind).cursor
    }

    async fn run_load_more(&self) -> LoadOutcome {
        if self.is_closed() {
            return LoadOutcome::Closed;
        }
        let Some(_in_flight) = InFlight::acquire(&self.loading) else {
            return LoadOutcome::Busy;
        };

        let (kind, page) = {
            let mut state = self.state.write().await;

            if state.current_page == 0 {
                drop(state);
                return self.run_initial().await;
            }
            if !state.has_more() {
                return LoadOutcome::Exhausted;
            }

            state.current_page += 1;
            let (kind, page) = schedule(state.current_page);

            if !state.buffer(kind).cursor.has_more {
                tracing::debug!(
                    source = %kind,
                    operation = state.current_page,
                    "Scheduled source is exhausted, skipping round"
                );
                return LoadOutcome::Skipped(kind);
            }

            state.buffer_mut(kind).cursor.page_number = page;
            (kind, page)
        };

        let fetched = self.pull(kind, page).await;

        if self.is_closed() {
            LoadOutcome::Closed
        } else if fetched {
            LoadOutcome::Fetched(kind)
        } else {
            LoadOutcome::Failed(kind)
        }
    }

    /// Caller must hold the in-flight guard
    async fn run_initial(&self) -> LoadOutcome {
        {
            let mut state = self.state.write().await;
            if state.current_page != 0 {
                return LoadOutcome::Busy;
            }
            state.current_page = INITIAL_OPERATIONS;
            for kind in [SourceKind::Followed, SourceKind::Model] {
                let buffer = state.buffer_mut(kind);
                if buffer.cursor.has_more {
                    buffer.cursor.page_number = 1;
                }
            }
        }

        let model_enabled = self.query.identity.is_some();
        let (followed, model) = tokio::join!(self.pull(SourceKind::Followed, 1), async {
            model_enabled && self.pull(SourceKind::Model, 1).await
        });

        if self.is_closed() {
            LoadOutcome::Closed
        } else if followed {
            LoadOutcome::Fetched(SourceKind::Followed)
        } else if model {
            LoadOutcome::Fetched(SourceKind::Model)
        } else {
            LoadOutcome::Failed(SourceKind::Followed)
        }
    }

    /// Fetches one page, resolves its items and applies the result
    ///
    /// Returns false when the source failed the page.
    async fn pull(&self, kind: SourceKind, page: u32) -> bool {
        let source = match kind {
            SourceKind::Followed => &self.sources.followed,
            SourceKind::Model => &self.sources.model,
        };

        let result = match source.fetch_page(page, self.query.clone()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    source = %kind,
                    page,
                    error = %e,
                    "Source page failed, marking source exhausted"
                );
                self.apply(kind, |buffer| buffer.cursor.exhaust()).await;
                return false;
            }
        };

        let requested = result.items.len();
        let items = self.resolve_items(kind, result.items).await;

        tracing::info!(
            source = %kind,
            page,
            requested,
            resolved = items.len(),
            has_more = result.has_more,
            "Feed page loaded"
        );

        self.apply(kind, move |buffer| {
            buffer.pages.push(items);
            buffer.cursor.has_more = result.has_more;
        })
        .await;

        true
    }

    /// Resolves every reel of a page in parallel, keeping page order
    async fn resolve_items(
        &self,
        kind: SourceKind,
        raw: Vec<RawRecommendation>,
    ) -> Vec<RecommendationItem> {
        let tasks: Vec<_> = raw
            .into_iter()
            .map(|rec| {
                let fetcher = Arc::clone(&self.sources.highlights);
                let identity = self.query.identity.clone();
                tokio::spawn(async move {
                    let resolved = fetcher.resolve(&rec.reel_id, identity).await;
                    (rec, resolved)
                })
            })
            .collect();

        let mut items = Vec::with_capacity(tasks.len());

        for task in tasks {
            match task.await {
                Ok((rec, Ok(metadata))) => {
                    items.push(RecommendationItem::resolved(rec, kind, metadata));
                }
                Ok((rec, Err(e))) => {
                    tracing::debug!(
                        source = %kind,
                        reel_id = %rec.reel_id,
                        error = %e,
                        "Highlight resolution failed"
                    );
                    if self.sources.unresolved_policy == UnresolvedPolicy::Placeholder {
                        items.push(RecommendationItem::placeholder(rec, kind));
                    }
                }
                Err(e) => {
                    tracing::error!(source = %kind, error = %e, "Highlight resolution task failed");
                }
            }
        }

        items
    }

    async fn apply(&self, kind: SourceKind, update: impl FnOnce(&mut SourceBuffer)) {
        let mut state = self.state.write().await;
        if self.is_closed() {
            tracing::debug!(source = %kind, "Feed closed, discarding page");
            return;
        }
        let buffer = state.buffer_mut(kind);
        update(buffer);
        if buffer.pages.first().is_some_and(|p| !p.is_empty()) {
            buffer.cursor.is_loaded = true;
        }
        state.refresh_model_loaded();
    }
}

/// Waits for a load the merger owns
///
/// Loads run on their own task so a caller that goes away mid-load (a dropped
/// HTTP request) cannot leave a page requested but never applied.
async fn settle(task: JoinHandle<LoadOutcome>) -> LoadOutcome {
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Feed load task failed");
            LoadOutcome::Busy
        }
    }
}
