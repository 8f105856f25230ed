use std::time::Duration;

/// Cache backend that never stores anything; every read misses.
#[derive(Clone, Debug, Default)]
pub struct DisabledCacheStore;

impl DisabledCacheStore {
    pub async fn get(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    pub async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> anyhow::Result<()> {
        Ok(())
    }

    pub async fn del(&self, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
