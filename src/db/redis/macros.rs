/// Read-through caching around an async computation.
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues
/// the result for a background write and returns it. A failed cache read is
/// logged and treated as a miss, so an unavailable Redis only costs latency.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::Cache)-like value with `get_from_cache`
///   and `set_in_background`.
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write.
/// * `$ttl`: time-to-live for the stored value, in seconds.
/// * `$block`: a future resolving to `AppResult<T>`.
///
/// # Example
/// ```rust,ignore
/// let metadata = cached!(cache, CacheKey::Highlight(id), ttl, async move {
///     fetch_metadata(&id).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(cached)) => Ok(cached),
            lookup => {
                if let Err(e) = lookup {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                }
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
