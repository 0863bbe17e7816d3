mod noop_store;
mod redis_store;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use noop_store::NoopCacheStore;
use redis_store::RedisCacheStore;

pub const DEFAULT_LLM_MENTION_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_LLM_MENTION_RATE_LIMIT_MAX_HITS: u64 = 5;

/// How long the leaderboard's total user count may be served from cache.
pub const TOTAL_USERS_TTL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
enum CacheBackend {
    Disabled(NoopCacheStore),
    Redis(RedisCacheStore),
}

#[derive(Clone, Debug)]
pub struct CacheService {
    key_prefix: String,
    backend: CacheBackend,
    llm_rate_limit_window: Duration,
    llm_rate_limit_max_hits: u64,
}

impl CacheService {
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Disabled(NoopCacheStore),
            llm_rate_limit_window: DEFAULT_LLM_MENTION_RATE_LIMIT_WINDOW,
            llm_rate_limit_max_hits: DEFAULT_LLM_MENTION_RATE_LIMIT_MAX_HITS,
        }
    }

    pub fn redis(redis_url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Redis(RedisCacheStore::from_url(redis_url)?),
            llm_rate_limit_window: DEFAULT_LLM_MENTION_RATE_LIMIT_WINDOW,
            llm_rate_limit_max_hits: DEFAULT_LLM_MENTION_RATE_LIMIT_MAX_HITS,
        })
    }

    pub fn is_redis_enabled(&self) -> bool {
        matches!(self.backend, CacheBackend::Redis(_))
    }

    pub fn configure_llm_rate_limit(&mut self, window: Duration, max_hits: u64) {
        self.llm_rate_limit_window = window.max(Duration::from_secs(1));
        self.llm_rate_limit_max_hits = max_hits.max(1);
    }

    pub fn llm_rate_limit_window(&self) -> Duration {
        self.llm_rate_limit_window
    }

    pub fn llm_rate_limit_max_hits(&self) -> u64 {
        self.llm_rate_limit_max_hits
    }

    pub fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}:{}", self.key_prefix, suffix.as_ref())
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Disabled(_) => Ok(()),
            CacheBackend::Redis(store) => store.ping().await,
        }
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let value = match &self.backend {
            CacheBackend::Disabled(store) => store.get(key).await,
            CacheBackend::Redis(store) => store.get(key).await,
        }?;

        match value {
            Some(bytes) => {
                let parsed = serde_json::from_slice(&bytes).map_err(|e| {
                    anyhow::anyhow!("failed to deserialize cache value for `{key}`: {e}")
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let ttl_seconds = ttl.as_secs().max(1);
        let payload = serde_json::to_vec(value)
            .map_err(|e| anyhow::anyhow!("failed to serialize cache value for `{key}`: {e}"))?;

        match &self.backend {
            CacheBackend::Disabled(store) => store.set(key, payload, ttl_seconds).await,
            CacheBackend::Redis(store) => store.set(key, payload, ttl_seconds).await,
        }
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Disabled(store) => store.del(key).await,
            CacheBackend::Redis(store) => store.del(key).await,
        }
    }

    /// Delete a key, logging instead of failing. Used after writes where a
    /// stale entry only costs one TTL of staleness.
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.del(key).await {
            warn!(?e, cache_key = key, "cache invalidation failed");
        }
    }

    /// Increment a counter that expires `window` after its first hit and
    /// return the new value. The disabled backend always reports one hit.
    pub async fn increment_with_window(&self, key: &str, window: Duration) -> anyhow::Result<u64> {
        let ttl_seconds = window.as_secs().max(1);
        match &self.backend {
            CacheBackend::Disabled(store) => store.incr(key, ttl_seconds).await,
            CacheBackend::Redis(store) => store.incr(key, ttl_seconds).await,
        }
    }

    pub async fn get_or_load_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(
                ?e,
                cache_key = key,
                "cache get failed; falling back to database"
            ),
        }

        let loaded = loader().await?;

        if let Err(e) = self.set_json(key, &loaded, ttl).await {
            warn!(
                ?e,
                cache_key = key,
                "cache set failed; returning database value"
            );
        }

        Ok(loaded)
    }
}

pub fn total_users_key(cache: &CacheService) -> String {
    cache.key("users:total")
}

pub fn llm_mention_rate_limit_key(
    cache: &CacheService,
    guild_id: u64,
    channel_id: u64,
    user_id: u64,
) -> String {
    cache.key(format!("ratelimit:llm:{guild_id}:{channel_id}:{user_id}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CacheService, llm_mention_rate_limit_key, total_users_key};

    #[test]
    fn keys_carry_the_prefix() {
        let cache = CacheService::disabled("mooncrest:test");
        assert_eq!(total_users_key(&cache), "mooncrest:test:users:total");
        assert_eq!(
            llm_mention_rate_limit_key(&cache, 1, 2, 3),
            "mooncrest:test:ratelimit:llm:1:2:3"
        );
    }

    #[test]
    fn rate_limit_configuration_has_floors() {
        let mut cache = CacheService::disabled("mooncrest:test");
        cache.configure_llm_rate_limit(Duration::ZERO, 0);
        assert_eq!(cache.llm_rate_limit_window(), Duration::from_secs(1));
        assert_eq!(cache.llm_rate_limit_max_hits(), 1);
        assert!(!cache.is_redis_enabled());
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let cache = CacheService::disabled("mooncrest:test");
        let loaded = cache
            .get_or_load_json("k", Duration::from_secs(5), || async { Ok(7_u64) })
            .await
            .unwrap();
        assert_eq!(loaded, 7);
        assert_eq!(cache.get_json::<u64>("k").await.unwrap(), None);
        assert_eq!(
            cache
                .increment_with_window("k", Duration::from_secs(5))
                .await
                .unwrap(),
            1
        );
    }
}
