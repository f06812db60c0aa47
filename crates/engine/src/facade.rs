//! Recommendation API facade
//!
//! Resolves top-K and weight overrides, opens the request span and hands the
//! request to the configured strategy.

use common::{OperationTimer, RequestContext};
use recommender_core::{
    EmbeddingComputer, EmbeddingStore, EntityId, EntityKind, GraphStore, RankedResult,
    RecommendOptions, RecommendResult,
};
use std::sync::Arc;
use tracing::{debug, info, Instrument};

use crate::adapters::GraphEmbedder;
use crate::config::{RecommenderConfig, StrategyKind};
use crate::embedding_cache::ReadThroughEmbeddings;
use crate::strategies::{
    EmbeddingSimilarityStrategy, GraphWeightedStrategy, HybridInterestStrategy, RankRequest,
    RecommendationStrategy, StrategyContext,
};

// @component: Recommender
// @status: WORKING
// @dependencies: strategies(✅), common::structured_logging(✅)
// @tests: ✅ tests/test_facade.rs
pub struct Recommender {
    strategy: Arc<dyn RecommendationStrategy>,
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(strategy: Arc<dyn RecommendationStrategy>, config: RecommenderConfig) -> Self {
        Self { strategy, config }
    }

    /// Strategy from configuration with the graph embedder as compute hook
    pub fn from_config(
        config: &RecommenderConfig,
        graph: Arc<dyn GraphStore>,
        embeddings: Arc<dyn EmbeddingStore>,
    ) -> RecommendResult<Self> {
        let embedder = GraphEmbedder::new(graph.clone(), &config.embedding)?
            .with_timeout(config.adapter_timeout());
        Self::with_computer(config, graph, embeddings, Arc::new(embedder))
    }

    /// Strategy from configuration with a caller supplied compute hook
    pub fn with_computer(
        config: &RecommenderConfig,
        graph: Arc<dyn GraphStore>,
        embeddings: Arc<dyn EmbeddingStore>,
        computer: Arc<dyn EmbeddingComputer>,
    ) -> RecommendResult<Self> {
        config.validate()?;

        let context = StrategyContext::from_config(graph, config);
        let strategy: Arc<dyn RecommendationStrategy> = match config.strategy {
            StrategyKind::GraphWeighted => Arc::new(GraphWeightedStrategy::new(
                context,
                config.graph_weighted.clone(),
            )),
            StrategyKind::EmbeddingSimilarity => Arc::new(EmbeddingSimilarityStrategy::new(
                context,
                Arc::new(Self::read_through(config, embeddings, computer)),
                config.embedding_similarity.weights.clone(),
            )),
            StrategyKind::HybridInterest => Arc::new(HybridInterestStrategy::new(
                context,
                Arc::new(Self::read_through(config, embeddings, computer)),
                config.hybrid_interest.clone(),
            )),
        };

        info!(strategy = %config.strategy, "Recommender initialised");
        Ok(Self::new(strategy, config.clone()))
    }

    fn read_through(
        config: &RecommenderConfig,
        embeddings: Arc<dyn EmbeddingStore>,
        computer: Arc<dyn EmbeddingComputer>,
    ) -> ReadThroughEmbeddings {
        ReadThroughEmbeddings::new(embeddings, computer).with_timeout(config.adapter_timeout())
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub async fn recommend_users(
        &self,
        requester: impl Into<EntityId>,
        options: RecommendOptions,
    ) -> RecommendResult<RankedResult> {
        self.recommend(requester.into(), EntityKind::User, options).await
    }

    pub async fn recommend_posts(
        &self,
        requester: impl Into<EntityId>,
        options: RecommendOptions,
    ) -> RecommendResult<RankedResult> {
        self.recommend(requester.into(), EntityKind::Post, options).await
    }

    pub async fn recommend_threads(
        &self,
        requester: impl Into<EntityId>,
        options: RecommendOptions,
    ) -> RecommendResult<RankedResult> {
        self.recommend(requester.into(), EntityKind::Thread, options).await
    }

    /// Shared body of the three operations
    pub async fn recommend(
        &self,
        requester: EntityId,
        target_kind: EntityKind,
        options: RecommendOptions,
    ) -> RecommendResult<RankedResult> {
        let operation = format!("recommend_{}s", target_kind);
        let context = RequestContext::new(operation.as_str()).with_requester(requester.as_str());

        async move {
            let mut timer = OperationTimer::new(operation);
            timer.add_field("strategy", self.strategy.kind().as_str());

            // Weights are checked before any store is touched
            if let Some(weights) = &options.weights {
                if let Err(error) = weights.validate() {
                    timer.finish_with_result::<(), _>(&Err(&error));
                    return Err(error);
                }
            }

            let top_k = self.config.resolve_top_k(options.top_k);
            if top_k == 0 {
                debug!("top_k is 0, nothing to rank");
                timer.finish();
                return Ok(RankedResult::empty());
            }

            let mut request =
                RankRequest::new(requester, target_kind, top_k).with_offset(options.offset);
            if let Some(weights) = options.weights {
                request = request.with_weights(weights);
            }

            let result = self.strategy.rank(&request).await;
            if let Ok(ranked) = &result {
                timer.add_field("results", ranked.len());
            }
            timer.finish_with_result(&result);
            result
        }
        .instrument(context.span())
        .await
    }
}
