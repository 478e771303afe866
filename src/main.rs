use std::sync::Arc;

use goatsquad_feed::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache},
    services::{
        providers::{BackendClient, FollowedSource, HttpHighlightFetcher, ModelSource},
        FeedSources,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("goatsquad_feed=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;
    let backend = BackendClient::from_config(&config)?;

    let mut highlights = HttpHighlightFetcher::new(backend.clone());
    let mut cache_writer = None;
    if let Some(redis_url) = &config.redis_url {
        let (cache, handle) = Cache::new(create_redis_client(redis_url)?).await;
        highlights = highlights.with_cache(cache, config.highlight_cache_ttl_secs);
        cache_writer = Some(handle);
        tracing::info!("Highlight cache enabled");
    }

    let sources = FeedSources {
        followed: Arc::new(FollowedSource::new(backend.clone())),
        model: Arc::new(ModelSource::new(backend.clone(), config.model_table.clone())),
        highlights: Arc::new(highlights),
        unresolved_policy: config.unresolved_policy,
    };

    let state = AppState::new(sources);
    let reaper = state.spawn_reaper(config.session_ttl(), config.session_sweep_interval());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, backend = %backend.api_url(), "GoatSquad feed service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
