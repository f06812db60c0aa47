//! Reference adapters for the store contracts

pub mod graph_embedder;
pub mod in_memory_embeddings;
pub mod in_memory_graph;
#[cfg(feature = "persistence")]
pub mod sled_embeddings;

pub use graph_embedder::GraphEmbedder;
pub use in_memory_embeddings::InMemoryEmbeddingStore;
pub use in_memory_graph::{Block, GraphSnapshot, InMemoryGraphStore};
#[cfg(feature = "persistence")]
pub use sled_embeddings::{SledEmbeddingStore, SledStoreConfig};
