use async_trait::async_trait;
use recommender_core::{EntityKind, EntityRef, RankedResult, RecommendResult, WeightVector};
use std::sync::Arc;
use tracing::debug;

use super::embedding_similarity::{requester_embedding, similarity_to};
use super::{RankRequest, RecommendationStrategy, RequesterSets, StrategyContext};
use crate::config::{StrategyKind, TargetProfiles, SIMILARITY_SUBSCORE};
use crate::embedding_cache::{DimensionGuard, ReadThroughEmbeddings};
use crate::fanout::{fan_out, triage_candidate_failure, CandidateOutcome};
use crate::scoring::combine;

/// Relationship overlaps plus embedding similarity as one more subscore
///
/// Negative cosine is clamped to 0 so every subscore stays in [0, 1].
pub struct HybridInterestStrategy {
    context: StrategyContext,
    embeddings: Arc<ReadThroughEmbeddings>,
    profiles: TargetProfiles,
}

impl HybridInterestStrategy {
    pub fn new(
        context: StrategyContext,
        embeddings: Arc<ReadThroughEmbeddings>,
        profiles: TargetProfiles,
    ) -> Self {
        Self {
            context,
            embeddings,
            profiles,
        }
    }
}

#[async_trait]
impl RecommendationStrategy for HybridInterestStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HybridInterest
    }

    fn default_weights(&self, target_kind: EntityKind) -> &WeightVector {
        &self.profiles.for_kind(target_kind).weights
    }

    async fn rank(&self, request: &RankRequest) -> RecommendResult<RankedResult> {
        let profile = self.profiles.for_kind(request.target_kind);
        let weights = request.weights_or(self.default_weights(request.target_kind));
        weights.validate()?;

        let requester_features = self
            .context
            .requester_features(&request.requester, &profile.requester_kinds())
            .await?;
        let requester_sets =
            RequesterSets::build(profile, &request.requester.id, &requester_features);

        let guard = DimensionGuard::new();
        let requester = requester_embedding(&self.embeddings, &guard, request).await?;

        let candidates = self
            .context
            .candidates(&request.requester, request.target_kind)
            .await?;

        let candidate_kinds = profile.candidate_kinds();
        let candidate_kinds = &candidate_kinds;
        let requester_sets = &requester_sets;
        let requester = &requester;
        let guard = &guard;
        let kind = request.target_kind;

        let scores = fan_out(candidates, self.context.limits(), move |candidate| async move {
            let entity = EntityRef::new(kind, candidate.clone());
            let features = match self.context.relationships(&entity, candidate_kinds).await {
                Ok(features) => features,
                Err(error) => return triage_candidate_failure(&candidate, error),
            };
            let embedding = match self.embeddings.resolve(kind, &candidate).await {
                Ok(embedding) => embedding,
                Err(error) => return triage_candidate_failure(&candidate, error),
            };
            if let Err(error) = guard.check(kind, &candidate, &embedding) {
                return Err(error);
            }

            let similarity = match similarity_to(requester, kind, &candidate, &embedding) {
                Ok(outcome) => outcome.score.max(0.0),
                Err(error) => return Err(error),
            };

            let mut subscores = requester_sets.subscores(profile, &candidate, &features);
            subscores.insert(SIMILARITY_SUBSCORE.to_string(), similarity);
            combine(&subscores, weights).map(CandidateOutcome::Scored)
        })
        .await?;

        let ranked = RankedResult::rank(scores, request.offset, request.top_k);
        let stats = self.embeddings.stats();
        debug!(
            results = ranked.len() as u64,
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Hybrid ranking done"
        );
        Ok(ranked)
    }
}
