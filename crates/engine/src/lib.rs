//! Recommendation engine: scoring, strategies, read-through embeddings and
//! the request facade, plus reference adapters for the store contracts.

pub mod adapters;
pub mod config;
pub mod config_loader;
pub mod embedding_cache;
pub mod facade;
pub mod fanout;
pub mod scoring;
pub mod strategies;

pub use config::{
    EmbeddingConfig, EmbeddingSimilarityConfig, FeatureEndpoint, FeatureProfile, OverlapFeature,
    RecommenderConfig, StrategyKind, TargetProfiles, SIMILARITY_SUBSCORE,
};
pub use config_loader::ConfigurationLoader;
pub use embedding_cache::{DimensionGuard, EmbeddingCacheStats, ReadThroughEmbeddings};
pub use facade::Recommender;
pub use fanout::{CandidateOutcome, FanOutLimits};
pub use scoring::{combine, cosine_similarity, overlap, DimensionMismatch, SimilarityOutcome, Subscores};
pub use strategies::{RankRequest, RecommendationStrategy, StrategyContext};
