use async_trait::async_trait;
use recommender_core::{EntityKind, EntityRef, RankedResult, RecommendResult, WeightVector};
use tracing::debug;

use super::{RankRequest, RecommendationStrategy, RequesterSets, StrategyContext};
use crate::config::{StrategyKind, TargetProfiles};
use crate::fanout::{fan_out, triage_candidate_failure, CandidateOutcome};
use crate::scoring::combine;

/// Weighted overlap of explicit relationships
pub struct GraphWeightedStrategy {
    context: StrategyContext,
    profiles: TargetProfiles,
}

impl GraphWeightedStrategy {
    pub fn new(context: StrategyContext, profiles: TargetProfiles) -> Self {
        Self { context, profiles }
    }
}

#[async_trait]
impl RecommendationStrategy for GraphWeightedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GraphWeighted
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
        if requester_sets.is_empty() {
            debug!("Requester has no relationship signal, scores degrade to 0");
        }

        let candidates = self
            .context
            .candidates(&request.requester, request.target_kind)
            .await?;

        let candidate_kinds = profile.candidate_kinds();
        let requester_sets = &requester_sets;
        let candidate_kinds = &candidate_kinds;

        let scores = fan_out(candidates, self.context.limits(), move |candidate| async move {
            let entity = EntityRef::new(request.target_kind, candidate.clone());
            match self.context.relationships(&entity, candidate_kinds).await {
                Ok(features) => {
                    let subscores = requester_sets.subscores(profile, &candidate, &features);
                    combine(&subscores, weights).map(CandidateOutcome::Scored)
                }
                Err(error) => triage_candidate_failure(&candidate, error),
            }
        })
        .await?;

        let ranked = RankedResult::rank(scores, request.offset, request.top_k);
        debug!(results = ranked.len() as u64, "Graph-weighted ranking done");
        Ok(ranked)
    }
}
