//! Общие helpers для integration тестов engine

#![allow(dead_code)]

use async_trait::async_trait;
use engine::adapters::{GraphSnapshot, InMemoryEmbeddingStore, InMemoryGraphStore};
use engine::{Recommender, RecommenderConfig};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use recommender_core::{
    AdapterError, AdapterResult, Embedding, EmbeddingComputer, EntityId, EntityKind, EntityRef,
    GraphStore, RankedResult, RelationshipFeature, RelationshipKind, StoreKind,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

static INIT_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&INIT_TRACING);
}

/// Ids of a ranked result, in order
pub fn ids(result: &RankedResult) -> Vec<String> {
    result
        .items()
        .iter()
        .map(|item| item.id.as_str().to_string())
        .collect()
}

pub fn score_of(result: &RankedResult, id: &str) -> Option<f64> {
    result
        .items()
        .iter()
        .find(|item| item.id.as_str() == id)
        .map(|item| item.score)
}

/// Facade over an in-memory graph and an empty in-memory embedding store
pub fn recommender(config: &RecommenderConfig, snapshot: GraphSnapshot) -> Recommender {
    init_tracing();
    let graph = Arc::new(InMemoryGraphStore::from_snapshot(snapshot));
    Recommender::from_config(config, graph, Arc::new(InMemoryEmbeddingStore::new()))
        .expect("валидная конфигурация")
}

/// Compute hook returning fixed vectors, counting calls per id
pub struct CountingComputer {
    vectors: HashMap<(EntityKind, String), Vec<f32>>,
    fallback: Option<Vec<f32>>,
    delay: Duration,
    dimension: usize,
    calls: Mutex<HashMap<(EntityKind, String), usize>>,
}

impl CountingComputer {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: None,
            delay: Duration::ZERO,
            dimension,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_vector(mut self, kind: EntityKind, id: &str, values: Vec<f32>) -> Self {
        self.vectors.insert((kind, id.to_string()), values);
        self
    }

    /// Vector for ids without an explicit entry; NotFound otherwise
    pub fn with_fallback(mut self, values: Vec<f32>) -> Self {
        self.fallback = Some(values);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, kind: EntityKind, id: &str) -> usize {
        self.calls
            .lock()
            .get(&(kind, id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl EmbeddingComputer for CountingComputer {
    async fn compute(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Embedding> {
        *self
            .calls
            .lock()
            .entry((kind, id.as_str().to_string()))
            .or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.vectors
            .get(&(kind, id.as_str().to_string()))
            .or(self.fallback.as_ref())
            .cloned()
            .map(Embedding::new)
            .ok_or_else(|| AdapterError::not_found(StoreKind::Embedding, kind, id))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Graph store that stalls on chosen entities
pub struct SlowGraph {
    inner: InMemoryGraphStore,
    slow: HashSet<String>,
    delay: Duration,
}

impl SlowGraph {
    pub fn new(snapshot: GraphSnapshot, slow: &[&str], delay: Duration) -> Self {
        Self {
            inner: InMemoryGraphStore::from_snapshot(snapshot),
            slow: slow.iter().map(|id| id.to_string()).collect(),
            delay,
        }
    }
}

#[async_trait]
impl GraphStore for SlowGraph {
    async fn query_relationships(
        &self,
        entity: &EntityRef,
        kinds: &HashSet<RelationshipKind>,
    ) -> AdapterResult<HashSet<RelationshipFeature>> {
        if self.slow.contains(entity.id.as_str()) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.query_relationships(entity, kinds).await
    }

    async fn query_exclusions(
        &self,
        requester: &EntityRef,
        target_kind: EntityKind,
    ) -> AdapterResult<HashSet<EntityId>> {
        self.inner.query_exclusions(requester, target_kind).await
    }

    async fn list_candidates(
        &self,
        target_kind: EntityKind,
        limit: Option<usize>,
    ) -> AdapterResult<Vec<EntityId>> {
        self.inner.list_candidates(target_kind, limit).await
    }
}

/// Small social graph shared by several suites
///
/// r follows f, is interested in rust, liked p3 and is a member of t3.
/// x blocked r. f liked p2 and is a member of t1 together with g.
pub fn social_graph() -> GraphSnapshot {
    use RelationshipKind::*;

    GraphSnapshot::default()
        .users(&["r", "f", "g", "h", "x"])
        .posts(&["p1", "p2", "p3"])
        .threads(&["t1", "t2", "t3"])
        .relate("r", "f", Follows)
        .relate("r", "rust", InterestedBy)
        .relate("r", "p3", Likes)
        .relate("r", "t3", MemberOf)
        .relate("f", "p2", Likes)
        .relate("f", "t1", MemberOf)
        .relate("g", "t1", MemberOf)
        .relate("h", "rust", InterestedBy)
        .relate("x", "rust", InterestedBy)
        .relate("p1", "rust", HasKey)
        .relate("p2", "go", HasKey)
        .relate("p3", "rust", HasKey)
        .relate("t2", "rust", HasKey)
        .block("x", "r")
}
