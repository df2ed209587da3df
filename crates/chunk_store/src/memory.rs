//! MemoryChunkStore - in-process store with fault injection

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{ChunkStore, ContractError, FusedSample, SessionChunkKey};
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct Faults {
    fail_all_puts: bool,
    fail_put: HashSet<SessionChunkKey>,
    fail_get: HashSet<SessionChunkKey>,
    /// Fetches that never complete
    hang_get: HashSet<SessionChunkKey>,
    get_delay: HashMap<SessionChunkKey, Duration>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    name: String,
    chunks: Mutex<HashMap<SessionChunkKey, Vec<FusedSample>>>,
    faults: Mutex<Faults>,
    puts: AtomicU64,
    gets: AtomicU64,
}

/// Chunk store backed by a shared map
///
/// Clones share the same contents, so a test can keep a handle while the
/// recorder's writer owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    inner: Arc<MemoryInner>,
}

impl MemoryChunkStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                name: name.into(),
                ..Default::default()
            }),
        }
    }

    fn chunks(&self) -> MutexGuard<'_, HashMap<SessionChunkKey, Vec<FusedSample>>> {
        self.inner.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.inner.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a chunk directly, bypassing fault injection
    pub fn insert(&self, key: SessionChunkKey, samples: Vec<FusedSample>) {
        self.chunks().insert(key, samples);
    }

    pub fn contains(&self, key: &SessionChunkKey) -> bool {
        self.chunks().contains_key(key)
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks().is_empty()
    }

    /// Stored chunk sizes keyed by chunk key
    pub fn chunk_sizes(&self) -> HashMap<SessionChunkKey, usize> {
        self.chunks()
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect()
    }

    /// Successful and failed put attempts
    pub fn put_count(&self) -> u64 {
        self.inner.puts.load(Ordering::Relaxed)
    }

    pub fn get_count(&self) -> u64 {
        self.inner.gets.load(Ordering::Relaxed)
    }

    /// Reject every put
    pub fn fail_all_puts(&self, fail: bool) {
        self.faults().fail_all_puts = fail;
    }

    /// Reject puts for `key`
    pub fn fail_put(&self, key: SessionChunkKey) {
        self.faults().fail_put.insert(key);
    }

    /// Reject gets for `key`
    pub fn fail_get(&self, key: SessionChunkKey) {
        self.faults().fail_get.insert(key);
    }

    /// Make gets for `key` never complete
    pub fn hang_get(&self, key: SessionChunkKey) {
        self.faults().hang_get.insert(key);
    }

    /// Delay gets for `key`
    pub fn delay_get(&self, key: SessionChunkKey, delay: Duration) {
        self.faults().get_delay.insert(key, delay);
    }

    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }
}

impl ChunkStore for MemoryChunkStore {
    fn name(&self) -> &str {
        &self.inner.name
    }

    #[instrument(
        name = "memory_store_put",
        skip(self, samples),
        fields(store = %self.inner.name, key = %key, samples = samples.len())
    )]
    async fn put_chunk(
        &self,
        key: &SessionChunkKey,
        samples: &[FusedSample],
    ) -> Result<(), ContractError> {
        self.inner.puts.fetch_add(1, Ordering::Relaxed);
        let rejected = {
            let faults = self.faults();
            faults.fail_all_puts || faults.fail_put.contains(key)
        };
        if rejected {
            return Err(ContractError::chunk_write(key.as_str(), "injected put failure"));
        }

        self.chunks().insert(key.clone(), samples.to_vec());
        debug!("Chunk stored");
        Ok(())
    }

    #[instrument(
        name = "memory_store_get",
        skip(self),
        fields(store = %self.inner.name, key = %key)
    )]
    async fn get_chunk(&self, key: &SessionChunkKey) -> Result<Vec<FusedSample>, ContractError> {
        self.inner.gets.fetch_add(1, Ordering::Relaxed);
        let (delay, hang, fail) = {
            let faults = self.faults();
            (
                faults.get_delay.get(key).copied(),
                faults.hang_get.contains(key),
                faults.fail_get.contains(key),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if hang {
            std::future::pending::<()>().await;
        }
        if fail {
            return Err(ContractError::chunk_read(key.as_str(), "injected get failure"));
        }

        self.chunks()
            .get(key)
            .cloned()
            .ok_or_else(|| ContractError::ChunkNotFound {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Location, Orientation};

    fn samples(n: usize) -> Vec<FusedSample> {
        (0..n)
            .map(|i| FusedSample {
                orientation: Orientation::new(0.1, 0.2, i as f32),
                location: Location::new(1.0, 2.0, 3.0),
                captured_at: i as f64,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryChunkStore::new("mem");
        let key = SessionChunkKey::generate();
        store.put_chunk(&key, &samples(4)).await.unwrap();

        let loaded = store.get_chunk(&key).await.unwrap();
        assert_eq!(loaded, samples(4));
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.get_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = MemoryChunkStore::new("mem");
        let other = store.clone();
        let key = SessionChunkKey::generate();
        other.put_chunk(&key, &[]).await.unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.get_chunk(&key).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryChunkStore::new("mem");
        let err = store
            .get_chunk(&SessionChunkKey::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ChunkNotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryChunkStore::new("mem");
        let key = SessionChunkKey::generate();
        store.fail_put(key.clone());
        assert!(store.put_chunk(&key, &samples(1)).await.is_err());
        assert!(store.is_empty());

        store.clear_faults();
        store.put_chunk(&key, &samples(1)).await.unwrap();
        store.fail_get(key.clone());
        assert!(matches!(
            store.get_chunk(&key).await,
            Err(ContractError::ChunkRead { .. })
        ));
    }

    #[tokio::test]
    async fn test_hanging_get_never_completes() {
        let store = MemoryChunkStore::new("mem");
        let key = SessionChunkKey::generate();
        store.insert(key.clone(), samples(1));
        store.hang_get(key.clone());

        let result =
            tokio::time::timeout(Duration::from_millis(30), store.get_chunk(&key)).await;
        assert!(result.is_err());
    }
}
