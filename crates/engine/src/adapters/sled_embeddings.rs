use anyhow::{Context, Result};
use async_trait::async_trait;
use recommender_core::{
    AdapterError, AdapterResult, Embedding, EmbeddingStore, EntityId, EntityKind, StoreKind,
};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEmbedding {
    values: Vec<f32>,
    created_at: i64,
}

#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    pub ttl_seconds: Option<i64>, // Optional TTL for entries
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: Some(86400 * 7), // 7 days
        }
    }
}

// @component: SledEmbeddingStore
// @status: WORKING
// @performance: O(log n) lookup, entries expire lazily on read
// @dependencies: sled(✅), bincode(✅), chrono(✅)
// @tests: ✅ persistence across reopen, TTL expiry
/// Persistent embedding store on a sled tree
pub struct SledEmbeddingStore {
    db: Arc<Db>,
    config: SledStoreConfig,
}

impl SledEmbeddingStore {
    pub fn open(path: impl AsRef<Path>, config: SledStoreConfig) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening embedding store at: {:?}", path);
        let db = sled::open(path).context("Failed to open sled database")?;

        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush embedding store")?;
        Ok(())
    }

    fn make_key(kind: EntityKind, id: &EntityId) -> Vec<u8> {
        format!("{}:{}", kind, id).into_bytes()
    }

    fn is_expired(&self, stored: &StoredEmbedding, now: i64) -> bool {
        self.config
            .ttl_seconds
            .map(|ttl| now - stored.created_at > ttl)
            .unwrap_or(false)
    }
}

fn storage_error(error: sled::Error) -> AdapterError {
    AdapterError::unavailable(StoreKind::Embedding, error.to_string())
}

#[async_trait]
impl EmbeddingStore for SledEmbeddingStore {
    async fn get(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<Option<Embedding>> {
        let key = Self::make_key(kind, id);
        let Some(bytes) = self.db.get(&key).map_err(storage_error)? else {
            return Ok(None);
        };

        match bincode::deserialize::<StoredEmbedding>(&bytes) {
            Ok(stored) if self.is_expired(&stored, chrono::Utc::now().timestamp()) => {
                debug!(kind = %kind, id = %id, "Stored embedding expired");
                self.db.remove(&key).map_err(storage_error)?;
                Ok(None)
            }
            Ok(stored) => Ok(Some(Embedding::new(stored.values))),
            Err(e) => {
                // Битая запись: удаляем и считаем промахом
                debug!("Failed to deserialize stored embedding: {}", e);
                self.db.remove(&key).map_err(storage_error)?;
                Ok(None)
            }
        }
    }

    async fn put(&self, kind: EntityKind, id: &EntityId, embedding: Embedding) -> AdapterResult<()> {
        let stored = StoredEmbedding {
            values: embedding.into_inner(),
            created_at: chrono::Utc::now().timestamp(),
        };
        let bytes = bincode::serialize(&stored)
            .map_err(|e| AdapterError::query(StoreKind::Embedding, e.to_string()))?;

        self.db
            .insert(Self::make_key(kind, id), bytes)
            .map_err(storage_error)?;
        Ok(())
    }

    async fn invalidate(&self, kind: EntityKind, id: &EntityId) -> AdapterResult<()> {
        self.db
            .remove(Self::make_key(kind, id))
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_survives_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("embeddings");
        let id = EntityId::from("p1");

        {
            let store = SledEmbeddingStore::open(&path, SledStoreConfig::default())?;
            store
                .put(EntityKind::Post, &id, Embedding::new(vec![0.5, 0.5]))
                .await?;
            store.flush()?;
        }

        let store = SledEmbeddingStore::open(&path, SledStoreConfig::default())?;
        assert_eq!(
            store.get(EntityKind::Post, &id).await?,
            Some(Embedding::new(vec![0.5, 0.5]))
        );
        assert!(store.get(EntityKind::User, &id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SledEmbeddingStore::open(
            temp_dir.path().join("embeddings"),
            SledStoreConfig {
                ttl_seconds: Some(-1),
            },
        )?;
        let id = EntityId::from("u1");

        store
            .put(EntityKind::User, &id, Embedding::new(vec![1.0]))
            .await?;
        assert!(store.get(EntityKind::User, &id).await?.is_none());
        assert!(store.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalidate() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store =
            SledEmbeddingStore::open(temp_dir.path().join("embeddings"), SledStoreConfig::default())?;
        let id = EntityId::from("t1");

        store
            .put(EntityKind::Thread, &id, Embedding::new(vec![1.0, 2.0]))
            .await?;
        store.invalidate(EntityKind::Thread, &id).await?;
        assert!(store.get(EntityKind::Thread, &id).await?.is_none());
        Ok(())
    }
}
