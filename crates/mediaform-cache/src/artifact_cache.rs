use lru::LruCache;
use mediaform_core::{AppError, Artifact, PipelineKey};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

type Outcome = Result<Arc<Artifact>, AppError>;

/// How a `get_or_compute` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a stored artifact
    Hit,
    /// This call started the computation
    Miss,
    /// Joined a computation another call had already started
    Shared,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Shared => "SHARED",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub in_flight: usize,
    pub max_bytes: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub shared: u64,
    pub evictions: u64,
}

struct State {
    entries: LruCache<PipelineKey, Arc<Artifact>>,
    total_bytes: usize,
    in_flight: HashMap<PipelineKey, watch::Receiver<Option<Outcome>>>,
    hits: u64,
    misses: u64,
    shared: u64,
    evictions: u64,
}

struct Inner {
    state: Mutex<State>,
    max_bytes: usize,
    max_entries: usize,
}

impl Inner {
    // Only O(1) index updates happen under this lock; it is never held
    // across an await.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the in-flight slot and store a successful artifact
    fn complete(&self, key: &PipelineKey, outcome: &Outcome) {
        let mut state = self.lock();
        state.in_flight.remove(key);

        let Ok(artifact) = outcome else {
            return;
        };

        let size = artifact.byte_len();
        if size > self.max_bytes {
            tracing::debug!(
                key = %key,
                size_bytes = size,
                max_bytes = self.max_bytes,
                "Artifact larger than cache budget, not stored"
            );
            return;
        }

        if let Some(previous) = state.entries.put(key.clone(), Arc::clone(artifact)) {
            state.total_bytes -= previous.byte_len();
        }
        state.total_bytes += size;

        while state.total_bytes > self.max_bytes || state.entries.len() > self.max_entries {
            let Some((evicted_key, evicted)) = state.entries.pop_lru() else {
                break;
            };
            state.total_bytes -= evicted.byte_len();
            state.evictions += 1;
            tracing::debug!(
                key = %evicted_key,
                size_bytes = evicted.byte_len(),
                "Artifact evicted"
            );
        }
    }
}

/// Bounded LRU artifact cache keyed by [`PipelineKey`].
///
/// Cloning is cheap and every clone shares the same index.
#[derive(Clone)]
pub struct ArtifactCache {
    inner: Arc<Inner>,
}

impl ArtifactCache {
    pub fn new(max_bytes: usize, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    entries: LruCache::unbounded(),
                    total_bytes: 0,
                    in_flight: HashMap::new(),
                    hits: 0,
                    misses: 0,
                    shared: 0,
                    evictions: 0,
                }),
                max_bytes,
                max_entries: max_entries.max(1),
            }),
        }
    }

    /// Return the artifact for `key`, running `compute` at most once across
    /// all concurrent callers.
    ///
    /// The computation runs as its own task, so a caller that stops waiting
    /// does not cancel it; the artifact still lands in the cache. Failures
    /// reach every waiter and are not cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &PipelineKey,
        compute: F,
    ) -> Result<(Arc<Artifact>, CacheStatus), AppError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Artifact, AppError>> + Send + 'static,
    {
        let (mut rx, status) = {
            let mut state = self.inner.lock();
            if let Some(artifact) = state.entries.get(key) {
                let artifact = Arc::clone(artifact);
                state.hits += 1;
                return Ok((artifact, CacheStatus::Hit));
            }

            if let Some(rx) = state.in_flight.get(key) {
                let rx = rx.clone();
                state.shared += 1;
                (rx, CacheStatus::Shared)
            } else {
                let (tx, rx) = watch::channel(None);
                state.in_flight.insert(key.clone(), rx.clone());
                state.misses += 1;
                self.spawn_compute(key.clone(), tx, compute);
                (rx, CacheStatus::Miss)
            }
        };

        let outcome = {
            let settled = rx.wait_for(Option::is_some).await.map_err(|_| {
                AppError::Internal("cache computation ended without a result".to_string())
            })?;
            (*settled).clone()
        };

        match outcome {
            Some(Ok(artifact)) => Ok((artifact, status)),
            Some(Err(err)) => Err(err),
            None => Err(AppError::Internal(
                "cache computation ended without a result".to_string(),
            )),
        }
    }

    fn spawn_compute<F, Fut>(&self, key: PipelineKey, tx: watch::Sender<Option<Outcome>>, compute: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Artifact, AppError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let start = std::time::Instant::now();
            // A panicking compute surfaces as a JoinError instead of leaving
            // the in-flight slot behind.
            let outcome = match tokio::spawn(compute()).await {
                Ok(result) => result.map(Arc::new),
                Err(e) => Err(AppError::Internal(format!("transform task failed: {}", e))),
            };

            match &outcome {
                Ok(artifact) => tracing::debug!(
                    key = %key,
                    size_bytes = artifact.byte_len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Artifact computed"
                ),
                Err(err) => tracing::debug!(
                    key = %key,
                    error = %err,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Artifact computation failed"
                ),
            }

            inner.complete(&key, &outcome);
            // Nobody may be waiting any more; the cache is already updated.
            let _ = tx.send(Some(outcome));
        });
    }

    /// Whether a finished artifact is stored for `key` (does not touch recency)
    pub fn contains(&self, key: &PipelineKey) -> bool {
        self.inner.lock().entries.contains(key)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        CacheStats {
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
            in_flight: state.in_flight.len(),
            max_bytes: self.inner.max_bytes,
            max_entries: self.inner.max_entries,
            hits: state.hits,
            misses: state.misses,
            shared: state.shared,
            evictions: state.evictions,
        }
    }

    /// Drop every stored artifact. In-flight computations are unaffected.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.total_bytes = 0;
        tracing::info!(entries = dropped, "Artifact cache cleared");
    }
}
