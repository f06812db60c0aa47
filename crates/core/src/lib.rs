//! Core domain models and contracts for the social recommender
//!
//! This crate contains the domain layer shared by every strategy:
//! - Entity, RelationshipFeature, WeightVector, Embedding, RankedResult
//! - Contracts: GraphStore, EmbeddingStore, EmbeddingComputer
//! - Error taxonomy surfaced to the API layer

pub mod contracts;
pub mod domain;
pub mod errors;

pub use contracts::*;
pub use domain::*;
pub use errors::*;

/// Re-export common types
pub use serde::{Deserialize, Serialize};
