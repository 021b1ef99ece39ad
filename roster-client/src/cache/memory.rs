//! In-memory cache store for testing.

use super::{check_kind, CacheError, CacheScope, CacheStore};
use async_trait::async_trait;
use roster_types::{CacheRecord, RecordKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// In-memory cache store.
///
/// Clones share the same contents. Counts writes and can be told to fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStore {
    inner: Arc<Mutex<MemoryCacheInner>>,
}

#[derive(Debug, Default)]
struct MemoryCacheInner {
    lists: HashMap<(CacheScope, RecordKind), Vec<CacheRecord>>,
    put_count: usize,
    fail_next_get: Option<String>,
    fail_next_put: Option<String>,
    delay_next_put: Option<Duration>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryCacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a list without counting it as a write.
    pub fn insert(&self, scope: &CacheScope, kind: RecordKind, records: Vec<CacheRecord>) {
        self.lock().lists.insert((scope.clone(), kind), records);
    }

    /// Current contents of a list.
    pub fn records(&self, scope: &CacheScope, kind: RecordKind) -> Vec<CacheRecord> {
        self.lock()
            .lists
            .get(&(scope.clone(), kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> usize {
        self.lock().put_count
    }

    /// Cause the next get_all() to fail with the given message.
    pub fn fail_next_get(&self, error: &str) {
        self.lock().fail_next_get = Some(error.to_string());
    }

    /// Cause the next put() to fail with the given message.
    pub fn fail_next_put(&self, error: &str) {
        self.lock().fail_next_put = Some(error.to_string());
    }

    /// Make the next put() take `delay` before it lands.
    pub fn delay_next_put(&self, delay: Duration) {
        self.lock().delay_next_put = Some(delay);
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get_all(
        &self,
        scope: &CacheScope,
        kind: RecordKind,
    ) -> Result<Vec<CacheRecord>, CacheError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_get.take() {
            return Err(CacheError::Unavailable(error));
        }

        Ok(inner
            .lists
            .get(&(scope.clone(), kind))
            .cloned()
            .unwrap_or_default())
    }

    async fn put(
        &self,
        scope: &CacheScope,
        kind: RecordKind,
        records: Vec<CacheRecord>,
    ) -> Result<(), CacheError> {
        let delay = self.lock().delay_next_put.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_put.take() {
            return Err(CacheError::Unavailable(error));
        }
        check_kind(kind, &records)?;

        inner.lists.insert((scope.clone(), kind), records);
        inner.put_count += 1;
        Ok(())
    }
}
