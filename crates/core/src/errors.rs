//! Error taxonomy of the recommendation core
//!
//! Adapters report [`AdapterError`]; strategies decide whether a failure is
//! fatal for the request or only excludes one candidate. Everything that
//! reaches the API layer is a [`RecommendError`].

use crate::domain::{EntityId, EntityKind};
use std::fmt;
use thiserror::Error;

/// External store behind an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Graph,
    Embedding,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Graph => f.write_str("graph store"),
            StoreKind::Embedding => f.write_str("embedding store"),
        }
    }
}

/// Failures reported by adapter implementations
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("{store} unreachable: {reason}")]
    Unavailable { store: StoreKind, reason: String },

    #[error("{store} timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout {
        store: StoreKind,
        operation: String,
        timeout_ms: u64,
    },

    #[error("{kind} '{id}' not found in {store}")]
    NotFound {
        store: StoreKind,
        kind: EntityKind,
        id: EntityId,
    },

    #[error("{store} query failed: {reason}")]
    Query { store: StoreKind, reason: String },
}

impl AdapterError {
    pub fn unavailable(store: StoreKind, reason: impl Into<String>) -> Self {
        AdapterError::Unavailable {
            store,
            reason: reason.into(),
        }
    }

    pub fn not_found(store: StoreKind, kind: EntityKind, id: &EntityId) -> Self {
        AdapterError::NotFound {
            store,
            kind,
            id: id.clone(),
        }
    }

    pub fn query(store: StoreKind, reason: impl Into<String>) -> Self {
        AdapterError::Query {
            store,
            reason: reason.into(),
        }
    }

    /// Whether the store itself is gone, as opposed to one lookup failing
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AdapterError::Unavailable { .. })
    }

    pub fn store(&self) -> StoreKind {
        match self {
            AdapterError::Unavailable { store, .. }
            | AdapterError::Timeout { store, .. }
            | AdapterError::NotFound { store, .. }
            | AdapterError::Query { store, .. } => *store,
        }
    }
}

/// Fatal outcomes of a recommendation request
#[derive(Debug, Clone, Error)]
pub enum RecommendError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error(
        "embedding schema error: {kind} '{entity_id}' has dimension {actual}, expected {expected}"
    )]
    EmbeddingSchema {
        kind: EntityKind,
        entity_id: EntityId,
        expected: usize,
        actual: usize,
    },

    #[error("adapter unavailable: {store} - {reason}")]
    AdapterUnavailable { store: StoreKind, reason: String },
}

impl RecommendError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        RecommendError::Configuration {
            reason: reason.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, RecommendError::Configuration { .. })
    }

    pub fn is_embedding_schema(&self) -> bool {
        matches!(self, RecommendError::EmbeddingSchema { .. })
    }

    pub fn is_adapter_unavailable(&self) -> bool {
        matches!(self, RecommendError::AdapterUnavailable { .. })
    }
}

/// Any adapter failure on a lookup the request cannot do without
impl From<AdapterError> for RecommendError {
    fn from(error: AdapterError) -> Self {
        RecommendError::AdapterUnavailable {
            store: error.store(),
            reason: error.to_string(),
        }
    }
}

/// Which side of a comparison carried no direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSide {
    Left,
    Right,
    Both,
}

/// Zero-magnitude vector met during scoring; recoverable, scored as 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegenerateVectorWarning {
    pub side: VectorSide,
}

impl fmt::Display for DegenerateVectorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            VectorSide::Left => "left",
            VectorSide::Right => "right",
            VectorSide::Both => "both",
        };
        write!(f, "zero-magnitude vector ({} side), similarity scored as 0", side)
    }
}

pub type RecommendResult<T> = Result<T, RecommendError>;
pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_conversion_keeps_store() {
        let err: RecommendError = AdapterError::Timeout {
            store: StoreKind::Embedding,
            operation: "get".to_string(),
            timeout_ms: 50,
        }
        .into();

        match err {
            RecommendError::AdapterUnavailable { store, reason } => {
                assert_eq!(store, StoreKind::Embedding);
                assert!(reason.contains("50ms"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_conversion_names_its_store() {
        let err: RecommendError =
            AdapterError::not_found(StoreKind::Embedding, EntityKind::User, &EntityId::from("u1"))
                .into();

        match err {
            RecommendError::AdapterUnavailable { store, reason } => {
                assert_eq!(store, StoreKind::Embedding);
                assert!(reason.contains("user 'u1' not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_messages() {
        let err = RecommendError::EmbeddingSchema {
            kind: EntityKind::Post,
            entity_id: EntityId::from("p1"),
            expected: 64,
            actual: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("post 'p1'"));
        assert!(msg.contains("expected 64"));

        assert!(AdapterError::unavailable(StoreKind::Graph, "refused").is_unavailable());
        assert!(!AdapterError::query(StoreKind::Graph, "syntax").is_unavailable());
    }
}
