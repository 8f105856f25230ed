use std::sync::Arc;

use dashmap::DashMap;
use sqlx::{PgPool, migrate::Migrator};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::cache::CacheService;
use crate::store::{Backend, MemoryBackend, PgBackend};

/// Compile-time discovered SQLx migrations for the `warden-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Shared database handle passed across crates.
#[derive(Clone, Debug)]
pub struct Database {
    backend: Arc<dyn Backend>,
    cache: CacheService,
    case_locks: CaseLocks,
}

impl Database {
    /// PostgreSQL-backed handle.
    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self::with_backend(PgBackend::new(pool), cache)
    }

    pub fn with_backend(backend: impl Backend + 'static, cache: CacheService) -> Self {
        Self {
            backend: Arc::new(backend),
            cache,
            case_locks: CaseLocks::default(),
        }
    }

    /// Everything in process; state is gone when the handle is dropped.
    ///
    /// The returned backend shares state with the handle, so callers can seed
    /// documents or flip its failure switches.
    pub fn in_memory(cache: CacheService) -> (Self, MemoryBackend) {
        let backend = MemoryBackend::new();
        (Self::with_backend(backend.clone(), cache), backend)
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub(crate) fn case_locks(&self) -> &CaseLocks {
        &self.case_locks
    }
}

/// One async mutex per (guild, target), serialising case insert + count.
///
/// Only guards a single process; separate bot instances can still interleave.
/// An entry lives only while some task holds or waits for it.
#[derive(Clone, Debug, Default)]
pub(crate) struct CaseLocks {
    locks: Arc<DashMap<(u64, u64), Arc<Mutex<()>>>>,
}

impl CaseLocks {
    pub(crate) async fn acquire(&self, guild_id: u64, target_id: u64) -> CaseLockGuard {
        let key = (guild_id, target_id);
        let lock = self.locks.entry(key).or_default().clone();
        let guard = lock.lock_owned().await;

        CaseLockGuard {
            key,
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Held for the duration of one case creation.
pub(crate) struct CaseLockGuard {
    key: (u64, u64),
    locks: Arc<DashMap<(u64, u64), Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CaseLockGuard {
    fn drop(&mut self) {
        // Release first so the map holds the last reference when idle.
        drop(self.guard.take());
        // `remove_if` runs under the shard lock, the same lock `acquire` clones under.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
