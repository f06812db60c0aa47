//! Recommendation strategies
//!
//! Every strategy ranks candidates of one target kind for one requester.
//! They share candidate enumeration, exclusion and the fan-out policy:
//! requester-side lookups are fatal, candidate-side lookups only exclude
//! the candidate unless the store is gone.

pub mod embedding_similarity;
pub mod graph_weighted;
pub mod hybrid_interest;

pub use embedding_similarity::EmbeddingSimilarityStrategy;
pub use graph_weighted::GraphWeightedStrategy;
pub use hybrid_interest::HybridInterestStrategy;

use async_trait::async_trait;
use recommender_core::{
    AdapterResult, EntityId, EntityKind, EntityRef, GraphStore, RankedResult, RecommendResult,
    RelationshipFeature, RelationshipKind, StoreKind, WeightVector,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::{FeatureEndpoint, FeatureProfile, RecommenderConfig, StrategyKind};
use crate::fanout::{with_timeout, FanOutLimits};
use crate::scoring::{overlap, Subscores};

/// Request after top-K resolution and weight validation
#[derive(Debug, Clone)]
pub struct RankRequest {
    pub requester: EntityRef,
    pub target_kind: EntityKind,
    pub top_k: usize,
    pub offset: usize,
    /// Replaces the strategy defaults when present
    pub weights: Option<WeightVector>,
}

impl RankRequest {
    pub fn new(requester: impl Into<EntityId>, target_kind: EntityKind, top_k: usize) -> Self {
        Self {
            requester: EntityRef::user(requester),
            target_kind,
            top_k,
            offset: 0,
            weights: None,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_weights(mut self, weights: WeightVector) -> Self {
        self.weights = Some(weights);
        self
    }

    fn weights_or<'a>(&'a self, defaults: &'a WeightVector) -> &'a WeightVector {
        self.weights.as_ref().unwrap_or(defaults)
    }
}

#[async_trait]
pub trait RecommendationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Weights used when the request carries none
    fn default_weights(&self, target_kind: EntityKind) -> &WeightVector;

    async fn rank(&self, request: &RankRequest) -> RecommendResult<RankedResult>;
}

/// Graph access shared by the strategies
#[derive(Clone)]
pub struct StrategyContext {
    graph: Arc<dyn GraphStore>,
    limits: FanOutLimits,
    candidate_limit: Option<usize>,
}

impl StrategyContext {
    pub fn new(graph: Arc<dyn GraphStore>, limits: FanOutLimits) -> Self {
        Self {
            graph,
            limits,
            candidate_limit: None,
        }
    }

    pub fn from_config(graph: Arc<dyn GraphStore>, config: &RecommenderConfig) -> Self {
        let limits = FanOutLimits {
            max_in_flight: config.max_in_flight,
            timeout: config.adapter_timeout(),
        };
        Self::new(graph, limits).with_candidate_limit(config.candidate_limit)
    }

    pub fn with_candidate_limit(mut self, limit: Option<usize>) -> Self {
        self.candidate_limit = limit;
        self
    }

    pub fn limits(&self) -> FanOutLimits {
        self.limits
    }

    /// Requester's own relationships; any failure fails the request
    pub async fn requester_features(
        &self,
        requester: &EntityRef,
        kinds: &HashSet<RelationshipKind>,
    ) -> RecommendResult<HashSet<RelationshipFeature>> {
        if kinds.is_empty() {
            return Ok(HashSet::new());
        }
        Ok(self.relationships(requester, kinds).await?)
    }

    /// Relationships of one entity under the per-call timeout
    pub async fn relationships(
        &self,
        entity: &EntityRef,
        kinds: &HashSet<RelationshipKind>,
    ) -> AdapterResult<HashSet<RelationshipFeature>> {
        if kinds.is_empty() {
            return Ok(HashSet::new());
        }
        with_timeout(
            self.limits.timeout,
            StoreKind::Graph,
            "query_relationships",
            self.graph.query_relationships(entity, kinds),
        )
        .await
    }

    /// Candidates of the target kind minus the requester and its exclusion set
    pub async fn candidates(
        &self,
        requester: &EntityRef,
        target_kind: EntityKind,
    ) -> RecommendResult<Vec<EntityId>> {
        let excluded = with_timeout(
            self.limits.timeout,
            StoreKind::Graph,
            "query_exclusions",
            self.graph.query_exclusions(requester, target_kind),
        )
        .await?;

        // Excluded ids and the requester must not use up the limit
        let fetch = self
            .candidate_limit
            .map(|limit| limit.saturating_add(excluded.len()).saturating_add(1));
        let listed = with_timeout(
            self.limits.timeout,
            StoreKind::Graph,
            "list_candidates",
            self.graph.list_candidates(target_kind, fetch),
        )
        .await?;

        let total = listed.len();
        let candidates: Vec<EntityId> = listed
            .into_iter()
            .filter(|id| !(requester.kind == target_kind && *id == requester.id))
            .filter(|id| !excluded.contains(id))
            .take(self.candidate_limit.unwrap_or(usize::MAX))
            .collect();

        debug!(
            target_kind = %target_kind,
            listed = total as u64,
            kept = candidates.len() as u64,
            "Candidates filtered"
        );
        Ok(candidates)
    }
}

/// Ids reachable from `entity` through the endpoint's relationship kinds
pub fn endpoint_set(
    features: &HashSet<RelationshipFeature>,
    entity: &EntityId,
    endpoint: &FeatureEndpoint,
) -> HashSet<EntityId> {
    features
        .iter()
        .filter(|feature| endpoint.kinds.contains(&feature.kind))
        .filter_map(|feature| feature.other_end(entity, endpoint.direction))
        .cloned()
        .collect()
}

/// Requester-side sets of a profile, computed once per request
#[derive(Debug, Clone, Default)]
pub struct RequesterSets {
    sets: Vec<(String, HashSet<EntityId>)>,
}

impl RequesterSets {
    pub fn build(
        profile: &FeatureProfile,
        requester: &EntityId,
        features: &HashSet<RelationshipFeature>,
    ) -> Self {
        let sets = profile
            .features
            .iter()
            .map(|feature| {
                (
                    feature.name.clone(),
                    endpoint_set(features, requester, &feature.requester),
                )
            })
            .collect();
        Self { sets }
    }

    /// No relationship signal at all on the requester side
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(|(_, set)| set.is_empty())
    }

    /// One overlap subscore per profile feature
    pub fn subscores(
        &self,
        profile: &FeatureProfile,
        candidate: &EntityId,
        features: &HashSet<RelationshipFeature>,
    ) -> Subscores {
        profile
            .features
            .iter()
            .zip(self.sets.iter())
            .map(|(feature, (name, requester_set))| {
                let candidate_set = endpoint_set(features, candidate, &feature.candidate);
                (name.clone(), overlap(requester_set, &candidate_set))
            })
            .collect()
    }
}
