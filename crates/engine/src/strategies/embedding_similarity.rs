use async_trait::async_trait;
use recommender_core::{
    Embedding, EntityId, EntityKind, RankedResult, RecommendError, RecommendResult, WeightVector,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{RankRequest, RecommendationStrategy, StrategyContext};
use crate::config::{StrategyKind, SIMILARITY_SUBSCORE};
use crate::embedding_cache::{DimensionGuard, ReadThroughEmbeddings};
use crate::fanout::{fan_out, triage_candidate_failure, CandidateOutcome};
use crate::scoring::{combine, cosine_similarity, SimilarityOutcome, Subscores};

/// Cosine closeness between requester and candidate embeddings
pub struct EmbeddingSimilarityStrategy {
    context: StrategyContext,
    embeddings: Arc<ReadThroughEmbeddings>,
    weights: WeightVector,
}

impl EmbeddingSimilarityStrategy {
    pub fn new(
        context: StrategyContext,
        embeddings: Arc<ReadThroughEmbeddings>,
        weights: WeightVector,
    ) -> Self {
        Self {
            context,
            embeddings,
            weights,
        }
    }
}

/// Requester embedding; any failure, schema violation included, fails the request
pub(crate) async fn requester_embedding(
    embeddings: &ReadThroughEmbeddings,
    guard: &DimensionGuard,
    request: &RankRequest,
) -> RecommendResult<Embedding> {
    let requester = &request.requester;
    let embedding = embeddings.resolve(requester.kind, &requester.id).await?;
    guard.check(requester.kind, &requester.id, &embedding)?;
    Ok(embedding)
}

/// Cosine against the requester; dimension mismatch is a schema error
pub(crate) fn similarity_to(
    requester: &Embedding,
    kind: EntityKind,
    candidate: &EntityId,
    embedding: &Embedding,
) -> RecommendResult<SimilarityOutcome> {
    let outcome = cosine_similarity(requester.as_slice(), embedding.as_slice()).map_err(
        |mismatch| RecommendError::EmbeddingSchema {
            kind,
            entity_id: candidate.clone(),
            expected: mismatch.left,
            actual: mismatch.right,
        },
    )?;

    if let Some(warning) = outcome.warning {
        warn!(candidate = %candidate, "{}", warning);
    }
    Ok(outcome)
}

#[async_trait]
impl RecommendationStrategy for EmbeddingSimilarityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmbeddingSimilarity
    }

    fn default_weights(&self, _target_kind: EntityKind) -> &WeightVector {
        &self.weights
    }

    async fn rank(&self, request: &RankRequest) -> RecommendResult<RankedResult> {
        let weights = request.weights_or(self.default_weights(request.target_kind));
        weights.validate()?;

        let guard = DimensionGuard::new();
        let requester = requester_embedding(&self.embeddings, &guard, request).await?;

        let candidates = self
            .context
            .candidates(&request.requester, request.target_kind)
            .await?;

        let guard = &guard;
        let requester = &requester;
        let kind = request.target_kind;

        let scores = fan_out(candidates, self.context.limits(), move |candidate| async move {
            match self.embeddings.resolve(kind, &candidate).await {
                Ok(embedding) => {
                    if let Err(error) = guard.check(kind, &candidate, &embedding) {
                        return Err(error);
                    }
                    let outcome = match similarity_to(requester, kind, &candidate, &embedding) {
                        Ok(outcome) => outcome,
                        Err(error) => return Err(error),
                    };
                    let subscores: Subscores =
                        [(SIMILARITY_SUBSCORE.to_string(), outcome.score)].into_iter().collect();
                    combine(&subscores, weights).map(CandidateOutcome::Scored)
                }
                Err(error) => triage_candidate_failure(&candidate, error),
            }
        })
        .await?;

        let ranked = RankedResult::rank(scores, request.offset, request.top_k);
        let stats = self.embeddings.stats();
        debug!(
            results = ranked.len() as u64,
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Embedding-similarity ranking done"
        );
        Ok(ranked)
    }
}
