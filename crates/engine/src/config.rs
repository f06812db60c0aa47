//! Recommender configuration
//!
//! One [`FeatureProfile`] per strategy per target kind, plus the request
//! limits shared by every strategy. Defaults follow the weights the social
//! network has been running with.

use recommender_core::{
    Direction, EntityKind, RecommendError, RecommendResult, RelationshipKind, WeightVector,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Subscore name carrying embedding similarity
pub const SIMILARITY_SUBSCORE: &str = "similarity";

/// Strategy variant selected at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    GraphWeighted,
    EmbeddingSimilarity,
    HybridInterest,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::GraphWeighted => "graph_weighted",
            StrategyKind::EmbeddingSimilarity => "embedding_similarity",
            StrategyKind::HybridInterest => "hybrid_interest",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "graph_weighted" | "graph" => Ok(StrategyKind::GraphWeighted),
            "embedding_similarity" | "embedding" => Ok(StrategyKind::EmbeddingSimilarity),
            "hybrid_interest" | "hybrid" => Ok(StrategyKind::HybridInterest),
            other => Err(RecommendError::configuration(format!(
                "unknown strategy '{}'",
                other
            ))),
        }
    }
}

/// How one side of an overlap feature is collected from the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEndpoint {
    pub kinds: Vec<RelationshipKind>,
    pub direction: Direction,
}

impl FeatureEndpoint {
    pub fn outgoing(kinds: &[RelationshipKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            direction: Direction::Outgoing,
        }
    }

    pub fn incoming(kinds: &[RelationshipKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            direction: Direction::Incoming,
        }
    }
}

/// Named subscore: overlap between a requester set and a candidate set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapFeature {
    pub name: String,
    pub requester: FeatureEndpoint,
    pub candidate: FeatureEndpoint,
}

impl OverlapFeature {
    pub fn new(name: &str, requester: FeatureEndpoint, candidate: FeatureEndpoint) -> Self {
        Self {
            name: name.to_string(),
            requester,
            candidate,
        }
    }
}

/// Features and default weights for one target kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    #[serde(default)]
    pub features: Vec<OverlapFeature>,
    pub weights: WeightVector,
}

impl FeatureProfile {
    /// Relationship kinds needed on the requester side
    pub fn requester_kinds(&self) -> HashSet<RelationshipKind> {
        self.features
            .iter()
            .flat_map(|f| f.requester.kinds.iter().copied())
            .collect()
    }

    /// Relationship kinds needed on the candidate side
    pub fn candidate_kinds(&self) -> HashSet<RelationshipKind> {
        self.features
            .iter()
            .flat_map(|f| f.candidate.kinds.iter().copied())
            .collect()
    }

    fn validate(&self, context: &str) -> RecommendResult<()> {
        self.weights.validate().map_err(|e| {
            RecommendError::configuration(format!("{}: {}", context, e))
        })?;

        let mut names = HashSet::new();
        for feature in &self.features {
            if feature.name.trim().is_empty() {
                return Err(RecommendError::configuration(format!(
                    "{}: feature with empty name",
                    context
                )));
            }
            if feature.name == SIMILARITY_SUBSCORE {
                return Err(RecommendError::configuration(format!(
                    "{}: feature name '{}' is reserved",
                    context, SIMILARITY_SUBSCORE
                )));
            }
            if !names.insert(feature.name.as_str()) {
                return Err(RecommendError::configuration(format!(
                    "{}: duplicate feature '{}'",
                    context, feature.name
                )));
            }
            if feature.requester.kinds.is_empty() || feature.candidate.kinds.is_empty() {
                return Err(RecommendError::configuration(format!(
                    "{}: feature '{}' has no relationship kinds",
                    context, feature.name
                )));
            }
        }

        Ok(())
    }
}

/// Profiles per target kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProfiles {
    pub users: FeatureProfile,
    pub posts: FeatureProfile,
    pub threads: FeatureProfile,
}

impl TargetProfiles {
    pub fn for_kind(&self, kind: EntityKind) -> &FeatureProfile {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Post => &self.posts,
            EntityKind::Thread => &self.threads,
        }
    }

    pub fn graph_weighted() -> Self {
        use RelationshipKind::*;

        Self {
            users: FeatureProfile {
                features: vec![
                    OverlapFeature::new(
                        "follows",
                        FeatureEndpoint::outgoing(&[Follows]),
                        FeatureEndpoint::outgoing(&[Follows]),
                    ),
                    OverlapFeature::new(
                        "interests",
                        FeatureEndpoint::outgoing(&[InterestedBy]),
                        FeatureEndpoint::outgoing(&[InterestedBy]),
                    ),
                ],
                weights: WeightVector::new().with("follows", 0.5).with("interests", 0.5),
            },
            posts: FeatureProfile {
                features: vec![
                    OverlapFeature::new(
                        "interests",
                        FeatureEndpoint::outgoing(&[InterestedBy]),
                        FeatureEndpoint::outgoing(&[HasKey]),
                    ),
                    OverlapFeature::new(
                        "engagement",
                        FeatureEndpoint::outgoing(&[Follows]),
                        FeatureEndpoint::incoming(&[Likes, CommentedOn]),
                    ),
                ],
                weights: WeightVector::new().with("interests", 0.7).with("engagement", 0.3),
            },
            threads: FeatureProfile {
                features: vec![
                    OverlapFeature::new(
                        "members",
                        FeatureEndpoint::outgoing(&[Follows]),
                        FeatureEndpoint::incoming(&[MemberOf]),
                    ),
                    OverlapFeature::new(
                        "interests",
                        FeatureEndpoint::outgoing(&[InterestedBy]),
                        FeatureEndpoint::outgoing(&[HasKey]),
                    ),
                ],
                weights: WeightVector::new().with("members", 0.6).with("interests", 0.4),
            },
        }
    }

    pub fn hybrid_interest() -> Self {
        let mut profiles = Self::graph_weighted();
        profiles.users.weights = WeightVector::new()
            .with("follows", 0.3)
            .with("interests", 0.4)
            .with(SIMILARITY_SUBSCORE, 0.3);
        profiles.posts.weights = WeightVector::new()
            .with("interests", 0.5)
            .with("engagement", 0.2)
            .with(SIMILARITY_SUBSCORE, 0.3);
        profiles.threads.weights = WeightVector::new()
            .with("members", 0.4)
            .with("interests", 0.3)
            .with(SIMILARITY_SUBSCORE, 0.3);
        profiles
    }

    fn validate(&self, strategy: StrategyKind) -> RecommendResult<()> {
        for kind in EntityKind::ALL {
            self.for_kind(kind)
                .validate(&format!("{}.{}", strategy, kind))?;
        }
        Ok(())
    }
}

/// Embedding-similarity weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSimilarityConfig {
    pub weights: WeightVector,
}

impl Default for EmbeddingSimilarityConfig {
    fn default() -> Self {
        Self {
            weights: WeightVector::new().with(SIMILARITY_SUBSCORE, 1.0),
        }
    }
}

/// Reference graph embedder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    /// Relationship label -> contribution of its endpoints
    pub relationship_weights: BTreeMap<String, f32>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let relationship_weights = [
            (RelationshipKind::Follows, 0.4),
            (RelationshipKind::InterestedBy, 0.4),
            (RelationshipKind::HasKey, 0.35),
            (RelationshipKind::MemberOf, 0.3),
            (RelationshipKind::Likes, 0.2),
            (RelationshipKind::CommentedOn, 0.1),
        ]
        .into_iter()
        .map(|(kind, weight)| (kind.as_str().to_string(), weight))
        .collect();

        Self {
            dimension: 64,
            relationship_weights,
        }
    }
}

impl EmbeddingConfig {
    /// Parsed relationship weights
    pub fn weights_by_kind(&self) -> RecommendResult<BTreeMap<RelationshipKind, f32>> {
        self.relationship_weights
            .iter()
            .map(|(label, weight)| {
                let kind = label.parse::<RelationshipKind>()?;
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(RecommendError::configuration(format!(
                        "embedding weight for {} must be a non-negative number",
                        label
                    )));
                }
                Ok((kind, *weight))
            })
            .collect()
    }
}

/// Конфигурация recommender engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub strategy: StrategyKind,
    pub default_top_k: usize,
    /// Requests above this are clamped
    pub max_top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_limit: Option<usize>,
    /// Max concurrent adapter lookups per request
    pub max_in_flight: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_timeout_ms: Option<u64>,
    pub graph_weighted: TargetProfiles,
    pub hybrid_interest: TargetProfiles,
    pub embedding_similarity: EmbeddingSimilarityConfig,
    pub embedding: EmbeddingConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::GraphWeighted,
            default_top_k: 20,
            max_top_k: 100,
            candidate_limit: None,
            max_in_flight: 16,
            adapter_timeout_ms: None,
            graph_weighted: TargetProfiles::graph_weighted(),
            hybrid_interest: TargetProfiles::hybrid_interest(),
            embedding_similarity: EmbeddingSimilarityConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl RecommenderConfig {
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn adapter_timeout(&self) -> Option<Duration> {
        self.adapter_timeout_ms.map(Duration::from_millis)
    }

    /// Requested top-K resolved against the configured default and ceiling
    pub fn resolve_top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_top_k).min(self.max_top_k)
    }

    pub fn validate(&self) -> RecommendResult<()> {
        if self.max_in_flight == 0 {
            return Err(RecommendError::configuration("max_in_flight must be positive"));
        }
        if self.default_top_k > self.max_top_k {
            return Err(RecommendError::configuration(format!(
                "default_top_k ({}) exceeds max_top_k ({})",
                self.default_top_k, self.max_top_k
            )));
        }
        if self.adapter_timeout_ms == Some(0) {
            return Err(RecommendError::configuration(
                "adapter_timeout_ms must be positive when set",
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(RecommendError::configuration("embedding dimension must be positive"));
        }

        self.graph_weighted.validate(StrategyKind::GraphWeighted)?;
        self.hybrid_interest.validate(StrategyKind::HybridInterest)?;
        self.embedding_similarity.weights.validate().map_err(|e| {
            RecommendError::configuration(format!("{}: {}", StrategyKind::EmbeddingSimilarity, e))
        })?;
        self.embedding.weights_by_kind()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RecommenderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.default_top_k, 20);
        assert_eq!(config.strategy, StrategyKind::GraphWeighted);
    }

    #[test]
    fn test_resolve_top_k() {
        let config = RecommenderConfig::default();
        assert_eq!(config.resolve_top_k(None), 20);
        assert_eq!(config.resolve_top_k(Some(5)), 5);
        assert_eq!(config.resolve_top_k(Some(0)), 0);
        assert_eq!(config.resolve_top_k(Some(10_000)), 100);
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!(
            "graph-weighted".parse::<StrategyKind>().unwrap(),
            StrategyKind::GraphWeighted
        );
        assert_eq!("hybrid".parse::<StrategyKind>().unwrap(), StrategyKind::HybridInterest);
        assert!("random".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_profiles() {
        let mut config = RecommenderConfig::default();
        config.graph_weighted.users.weights = WeightVector::new().with("follows", 0.0);
        assert!(config.validate().unwrap_err().is_configuration());

        let mut config = RecommenderConfig::default();
        let duplicate = config.graph_weighted.posts.features[0].clone();
        config.graph_weighted.posts.features.push(duplicate);
        assert!(config.validate().is_err());

        let mut config = RecommenderConfig::default();
        config.max_in_flight = 0;
        assert!(config.validate().is_err());

        let mut config = RecommenderConfig::default();
        config
            .embedding
            .relationship_weights
            .insert("BLOCKS".to_string(), 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profile_kinds() {
        let profiles = TargetProfiles::graph_weighted();
        let posts = profiles.for_kind(EntityKind::Post);

        assert!(posts.requester_kinds().contains(&RelationshipKind::InterestedBy));
        assert!(posts.requester_kinds().contains(&RelationshipKind::Follows));
        assert!(posts.candidate_kinds().contains(&RelationshipKind::Likes));
        assert!(!posts.candidate_kinds().contains(&RelationshipKind::MemberOf));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = RecommenderConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: RecommenderConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
