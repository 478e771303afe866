use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::RwLock, task::JoinHandle, time::Instant};
use uuid::Uuid;

use crate::models::FeedQuery;
use crate::services::{FeedMerger, FeedSources};

/// A mounted feed and when a viewer last touched it
struct Session {
    merger: Arc<FeedMerger>,
    last_seen: Instant,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sources: FeedSources,
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl AppState {
    pub fn new(sources: FeedSources) -> Self {
        Self {
            sources,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a fresh, not yet mounted feed
    pub async fn open_session(&self, query: FeedQuery) -> (Uuid, Arc<FeedMerger>) {
        let id = Uuid::new_v4();
        let merger = Arc::new(FeedMerger::new(self.sources.clone(), query));
        let session = Session {
            merger: Arc::clone(&merger),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(id, session);
        (id, merger)
    }

    /// Looks a feed up and marks it as recently used
    pub async fn session(&self, id: &Uuid) -> Option<Arc<FeedMerger>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        session.last_seen = Instant::now();
        Some(Arc::clone(&session.merger))
    }

    /// Closes and forgets a feed; returns false if it was unknown
    pub async fn close_session(&self, id: &Uuid) -> bool {
        match self.sessions.write().await.remove(id) {
            Some(session) => {
                session.merger.close();
                true
            }
            None => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Closes every feed idle for at least `ttl`; returns how many went away
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, session| {
            let idle = now.duration_since(session.last_seen) >= ttl;
            if idle {
                session.merger.close();
                tracing::debug!(session_id = %id, "Evicting idle feed");
            }
            !idle
        });

        before - sessions.len()
    }

    /// Sweeps idle feeds every `period` until the returned task is aborted
    pub fn spawn_reaper(&self, ttl: Duration, period: Duration) -> JoinHandle<()> {
        let state = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = state.evict_idle(ttl).await;
                if evicted > 0 {
                    let open_feeds = state.session_count().await;
                    tracing::info!(
                        evicted,
                        open_feeds,
                        "Idle feeds evicted"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnresolvedPolicy;
    use crate::services::providers::{MockHighlightFetcher, MockRecommendationSource};

    fn state() -> AppState {
        AppState::new(FeedSources {
            followed: Arc::new(MockRecommendationSource::new()),
            model: Arc::new(MockRecommendationSource::new()),
            highlights: Arc::new(MockHighlightFetcher::new()),
            unresolved_policy: UnresolvedPolicy::Drop,
        })
    }

    #[tokio::test]
    async fn test_idle_feeds_are_closed_and_forgotten() {
        let state = state();
        let (id, merger) = state.open_session(FeedQuery::default()).await;

        assert_eq!(state.evict_idle(Duration::ZERO).await, 1);
        assert!(merger.is_closed());
        assert!(state.session(&id).await.is_none());
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_recent_feeds_survive_a_sweep() {
        let state = state();
        let (id, merger) = state.open_session(FeedQuery::default()).await;

        assert_eq!(state.evict_idle(Duration::from_secs(3600)).await, 0);
        assert!(!merger.is_closed());
        assert!(state.session(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_reaper_sweeps_in_the_background() {
        let state = state();
        state.open_session(FeedQuery::default()).await;
        state.open_session(FeedQuery::default()).await;

        let reaper = state.spawn_reaper(Duration::ZERO, Duration::from_millis(10));
        for _ in 0..50 {
            if state.session_count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        reaper.abort();

        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let state = state();
        assert!(!state.close_session(&Uuid::new_v4()).await);
    }
}
