use parking_lot::Mutex;
use recommender_core::{
    AdapterError, AdapterResult, Embedding, EmbeddingComputer, EmbeddingStore, EntityId, EntityKind,
    RecommendError, RecommendResult, StoreKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::fanout::with_timeout;

type FlightKey = (EntityKind, EntityId);

// @component: ReadThroughEmbeddings
// @status: WORKING
// @performance: one store read per hit, at most one compute per key in flight
// @dependencies: tokio OnceCell, parking_lot
// @tests: single-flight, cache hit/miss accounting, failure retry
/// Read-through кэш embeddings поверх EmbeddingStore
///
/// A miss invokes the compute hook, stores the result and hands it back.
/// Concurrent misses for the same (kind, id) share one computation.
pub struct ReadThroughEmbeddings {
    store: Arc<dyn EmbeddingStore>,
    computer: Arc<dyn EmbeddingComputer>,
    in_flight: Mutex<HashMap<FlightKey, Arc<OnceCell<Embedding>>>>,
    timeout: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    computes: AtomicU64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub computes: u64,
    pub in_flight: usize,
}

impl ReadThroughEmbeddings {
    pub fn new(store: Arc<dyn EmbeddingStore>, computer: Arc<dyn EmbeddingComputer>) -> Self {
        info!(
            dimension = computer.dimension() as u64,
            "Инициализация read-through embedding cache"
        );

        Self {
            store,
            computer,
            in_flight: Mutex::new(HashMap::new()),
            timeout: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computes: AtomicU64::new(0),
        }
    }

    /// Per adapter call timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dimension(&self) -> usize {
        self.computer.dimension()
    }

    /// Cached embedding, computed and stored on a miss
    ///
    /// Vectors with NaN or infinite components are rejected as a query
    /// failure so they never reach scoring.
    pub async fn resolve(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Embedding> {
        let embedding = self.resolve_unchecked(kind, id).await?;
        if !embedding.is_finite() {
            warn!(kind = %kind, id = %id, "Embedding has non-finite components");
            return Err(AdapterError::query(
                StoreKind::Embedding,
                format!("{} '{}' embedding has non-finite components", kind, id),
            ));
        }
        Ok(embedding)
    }

    async fn resolve_unchecked(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Embedding> {
        if let Some(embedding) = self.lookup(kind, id).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(embedding);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let key = (kind, id.clone());
        let cell = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        // Releases the slot on every exit, cancellation included
        let flight = FlightGuard {
            cache: self,
            key,
            cell,
        };

        let result = flight
            .cell
            .get_or_try_init(|| self.compute_and_store(kind, id))
            .await
            .cloned();
        result
    }

    pub fn stats(&self) -> EmbeddingCacheStats {
        EmbeddingCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            in_flight: self.in_flight.lock().len(),
        }
    }

    async fn lookup(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Option<Embedding>> {
        with_timeout(self.timeout, StoreKind::Embedding, "get", self.store.get(kind, id)).await
    }

    async fn compute_and_store(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Embedding> {
        // Предыдущий flight мог уже записать embedding и освободить слот
        if let Some(embedding) = self.lookup(kind, id).await? {
            return Ok(embedding);
        }

        self.computes.fetch_add(1, Ordering::Relaxed);
        debug!(kind = %kind, id = %id, "Computing missing embedding");

        let embedding = with_timeout(
            self.timeout,
            StoreKind::Embedding,
            "compute",
            self.computer.compute(kind, id),
        )
        .await?;

        with_timeout(
            self.timeout,
            StoreKind::Embedding,
            "put",
            self.store.put(kind, id, embedding.clone()),
        )
        .await?;

        Ok(embedding)
    }

    /// Drop the in-flight slot once it is resolved or nobody else waits on it
    fn release(&self, key: &FlightKey, cell: &Arc<OnceCell<Embedding>>) {
        let mut in_flight = self.in_flight.lock();
        let ours = in_flight
            .get(key)
            .map(|existing| Arc::ptr_eq(existing, cell))
            .unwrap_or(false);

        // map + this caller hold the only references when no one is waiting
        if ours && (cell.initialized() || Arc::strong_count(cell) <= 2) {
            in_flight.remove(key);
        }
    }
}

/// Claim on an in-flight slot, released when dropped
struct FlightGuard<'a> {
    cache: &'a ReadThroughEmbeddings,
    key: FlightKey,
    cell: Arc<OnceCell<Embedding>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.cache.release(&self.key, &self.cell);
    }
}

/// Per-request dimension check: one dimension per entity kind
#[derive(Debug, Default)]
pub struct DimensionGuard {
    seen: Mutex<HashMap<EntityKind, usize>>,
}

impl DimensionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(
        &self,
        kind: EntityKind,
        id: &EntityId,
        embedding: &Embedding,
    ) -> RecommendResult<()> {
        let mut seen = self.seen.lock();
        let expected = *seen.entry(kind).or_insert(embedding.dimension());

        if expected != embedding.dimension() {
            return Err(RecommendError::EmbeddingSchema {
                kind,
                entity_id: id.clone(),
                expected,
                actual: embedding.dimension(),
            });
        }

        Ok(())
    }
}
