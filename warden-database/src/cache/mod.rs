mod disabled_store;
mod memory_store;
mod redis_store;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::model::features::Feature;
use disabled_store::DisabledCacheStore;
use memory_store::MemoryCacheStore;
use redis_store::RedisCacheStore;

/// Lifetime of a materialised moderation config document.
pub const MOD_CONFIG_CACHE_TTL: Duration = Duration::from_secs(60);
/// Lifetime of a feature state read from the backend.
pub const FEATURE_STATE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Lifetime of the fallback feature state cached after a failed read.
pub const FEATURE_STATE_FAILURE_TTL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
enum CacheBackend {
    Disabled(DisabledCacheStore),
    Memory(MemoryCacheStore),
    Redis(RedisCacheStore),
}

/// Injected cache shared by the config and feature stores.
///
/// Built once at startup and handed to `Database`; tests build their own so
/// nothing leaks between them.
#[derive(Clone, Debug)]
pub struct CacheService {
    key_prefix: String,
    backend: CacheBackend,
}

impl CacheService {
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Disabled(DisabledCacheStore),
        }
    }

    pub fn memory(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Memory(MemoryCacheStore::default()),
        }
    }

    pub fn redis(redis_url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            key_prefix: prefix.into(),
            backend: CacheBackend::Redis(RedisCacheStore::from_url(redis_url)?),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            CacheBackend::Disabled(_) => "disabled",
            CacheBackend::Memory(_) => "memory",
            CacheBackend::Redis(_) => "redis",
        }
    }

    /// Round-trip check; only meaningful for Redis.
    pub async fn ping(&self) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Redis(store) => store.ping().await,
            CacheBackend::Disabled(_) | CacheBackend::Memory(_) => Ok(()),
        }
    }

    pub fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}:{}", self.key_prefix, suffix.as_ref())
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let value = match &self.backend {
            CacheBackend::Disabled(store) => store.get(key).await,
            CacheBackend::Memory(store) => store.get(key).await,
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
        let payload = serde_json::to_vec(value)
            .map_err(|e| anyhow::anyhow!("failed to serialize cache value for `{key}`: {e}"))?;

        match &self.backend {
            CacheBackend::Disabled(store) => store.set(key, payload, ttl).await,
            CacheBackend::Memory(store) => store.set(key, payload, ttl).await,
            CacheBackend::Redis(store) => store.set(key, payload, ttl).await,
        }
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        match &self.backend {
            CacheBackend::Disabled(store) => store.del(key).await,
            CacheBackend::Memory(store) => store.del(key).await,
            CacheBackend::Redis(store) => store.del(key).await,
        }
    }

    /// Return the cached value, or run `loader` and cache what it returns.
    ///
    /// Cache faults are logged and treated as misses; loader errors propagate
    /// and nothing is cached for them.
    pub async fn get_or_load_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(?e, cache_key = key, "cache get failed; falling back to backend"),
        }

        let loaded = loader().await?;

        if let Err(e) = self.set_json(key, &loaded, ttl).await {
            warn!(?e, cache_key = key, "cache set failed; returning backend value");
        }

        Ok(loaded)
    }
}

pub fn mod_config_key(cache: &CacheService, guild_id: u64) -> String {
    cache.key(format!("modcfg:{guild_id}"))
}

pub fn feature_state_key(cache: &CacheService, guild_id: u64, feature: Feature) -> String {
    cache.key(format!("feature:{guild_id}:{}", feature.column()))
}

pub async fn invalidate_mod_config(cache: &CacheService, guild_id: u64) -> anyhow::Result<()> {
    cache.del(&mod_config_key(cache, guild_id)).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::CacheService;

    #[tokio::test(start_paused = true)]
    async fn memory_entries_expire_after_their_ttl() {
        let cache = CacheService::memory("test");
        cache
            .set_json("k", &41_u32, Duration::from_secs(60))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_json::<u32>("k").await.expect("get"), Some(41));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_json::<u32>("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn del_drops_an_entry() {
        let cache = CacheService::memory("test");
        cache
            .set_json("k", &"v", Duration::from_secs(60))
            .await
            .expect("set");
        cache.del("k").await.expect("del");

        assert_eq!(cache.get_json::<String>("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let cache = CacheService::disabled("test");
        let mut calls = 0;

        for _ in 0..2 {
            let value = cache
                .get_or_load_json("k", Duration::from_secs(60), || {
                    calls += 1;
                    async { Ok(7_u8) }
                })
                .await
                .expect("load");
            assert_eq!(value, 7);
        }

        assert_eq!(calls, 2);
    }

    #[test]
    fn keys_are_prefixed() {
        let cache = CacheService::disabled("warden:test");
        assert_eq!(super::mod_config_key(&cache, 5), "warden:test:modcfg:5");
        assert_eq!(
            super::feature_state_key(&cache, 5, crate::model::features::Feature::Automod),
            "warden:test:feature:5:automod"
        );
    }
}
