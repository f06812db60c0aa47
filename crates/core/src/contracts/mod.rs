//! Contracts between the recommendation core and its external stores

use crate::*;
use async_trait::async_trait;
use std::collections::HashSet;

/// Property graph traversal contract
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Every relationship of the given kinds incident to `entity`, either direction
    async fn query_relationships(
        &self,
        entity: &EntityRef,
        kinds: &HashSet<RelationshipKind>,
    ) -> AdapterResult<HashSet<RelationshipFeature>>;

    /// Entities of `target_kind` that must never be recommended to `requester`
    async fn query_exclusions(
        &self,
        requester: &EntityRef,
        target_kind: EntityKind,
    ) -> AdapterResult<HashSet<EntityId>>;

    /// Candidate entities of `target_kind` in a stable order, at most `limit` when given
    async fn list_candidates(
        &self,
        target_kind: EntityKind,
        limit: Option<usize>,
    ) -> AdapterResult<Vec<EntityId>>;
}

/// Key/value store of embeddings keyed by (entity kind, entity id)
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn get(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Option<Embedding>>;

    async fn put(&self, kind: EntityKind, id: &EntityId, embedding: Embedding) -> AdapterResult<()>;

    /// Drop a stored embedding after its source entity changed
    async fn invalidate(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<()>;
}

/// Hook producing an embedding for an entity that has none cached
#[async_trait]
pub trait EmbeddingComputer: Send + Sync {
    async fn compute(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Embedding>;

    /// Dimension of every embedding this hook produces
    fn dimension(&self) -> usize;
}
