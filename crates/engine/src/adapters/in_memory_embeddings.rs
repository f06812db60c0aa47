use async_trait::async_trait;
use parking_lot::RwLock;
use recommender_core::{AdapterResult, Embedding, EmbeddingStore, EntityId, EntityKind};
use std::collections::HashMap;

/// Process-local embedding store
#[derive(Debug, Default)]
pub struct InMemoryEmbeddingStore {
    entries: RwLock<HashMap<(EntityKind, EntityId), Embedding>>,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload one embedding
    pub fn with_embedding(self, kind: EntityKind, id: &str, embedding: Embedding) -> Self {
        self.entries.write().insert((kind, EntityId::from(id)), embedding);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl EmbeddingStore for InMemoryEmbeddingStore {
    async fn get(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Option<Embedding>> {
        Ok(self.entries.read().get(&(kind, id.clone())).cloned())
    }

    async fn put(&self, kind: EntityKind, id: &EntityId, embedding: Embedding) -> AdapterResult<()> {
        self.entries.write().insert((kind, id.clone()), embedding);
        Ok(())
    }

    async fn invalidate(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<()> {
        self.entries.write().remove(&(kind, id.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let store = InMemoryEmbeddingStore::new();
        let id = EntityId::from("u1");

        assert!(store.get(EntityKind::User, &id).await.unwrap().is_none());

        store
            .put(EntityKind::User, &id, Embedding::new(vec![1.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(
            store.get(EntityKind::User, &id).await.unwrap(),
            Some(Embedding::new(vec![1.0, 0.0]))
        );
        // Same id under another kind is a different key
        assert!(store.get(EntityKind::Post, &id).await.unwrap().is_none());

        store.invalidate(EntityKind::User, &id).await.unwrap();
        assert!(store.is_empty());
    }
}
