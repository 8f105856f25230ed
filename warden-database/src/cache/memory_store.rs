use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Clone, Debug)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local cache keyed by string, with per-entry expiry.
///
/// Expiry uses tokio's clock, so paused-time tests can step across a TTL.
#[derive(Clone, Debug, Default)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl MemoryCacheStore {
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }

        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        self.entries.insert(
            key.to_owned(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
