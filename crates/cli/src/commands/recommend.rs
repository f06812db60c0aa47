use anyhow::{Context, Result};
use clap::Args;
use console::style;
use engine::adapters::{GraphSnapshot, InMemoryEmbeddingStore, InMemoryGraphStore};
use engine::{Recommender, RecommenderConfig};
use recommender_core::{
    EmbeddingStore, EntityKind, RankedResult, RecommendOptions, ScoredEntity, WeightVector,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Requesting user id
    pub requester: String,

    /// Graph snapshot (JSON: users, posts, threads, relationships, blocks)
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Maximum number of results (configured default when absent)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Ranked entries to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Weight override, repeatable: --weight interests=0.8
    #[arg(short, long = "weight", value_parser = parse_weight)]
    pub weights: Vec<(String, f64)>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Persist computed embeddings in a sled database (persistence feature)
    #[arg(long)]
    pub embeddings_db: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    requester: &'a str,
    target: EntityKind,
    strategy: &'a str,
    items: &'a [ScoredEntity],
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty weight name in '{}'", raw));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid weight '{}': {}", value, e))?;
    Ok((name.to_string(), value))
}

impl RecommendArgs {
    pub async fn execute(&self, target: EntityKind, config: RecommenderConfig) -> Result<()> {
        let snapshot = GraphSnapshot::from_json_file(&self.snapshot)?;
        let graph = Arc::new(InMemoryGraphStore::from_snapshot(snapshot));
        info!(
            users = graph.entity_count(EntityKind::User) as u64,
            posts = graph.entity_count(EntityKind::Post) as u64,
            threads = graph.entity_count(EntityKind::Thread) as u64,
            "Graph snapshot loaded"
        );

        let recommender = Recommender::from_config(&config, graph, self.embedding_store()?)
            .context("Failed to build recommender")?;

        let mut options = RecommendOptions::default().offset(self.offset);
        options.top_k = self.top_k;
        if !self.weights.is_empty() {
            options = options.weights(self.weights.iter().cloned().collect::<WeightVector>());
        }

        let result = recommender
            .recommend(self.requester.as_str().into(), target, options)
            .await
            .with_context(|| format!("Recommendation for '{}' failed", self.requester))?;

        if self.json {
            let output = JsonOutput {
                requester: &self.requester,
                target,
                strategy: config.strategy.as_str(),
                items: result.items(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_table(&self.requester, target, &config, &result);
        }

        Ok(())
    }

    #[cfg(not(feature = "persistence"))]
    fn embedding_store(&self) -> Result<Arc<dyn EmbeddingStore>> {
        if self.embeddings_db.is_some() {
            anyhow::bail!("--embeddings-db requires a build with the 'persistence' feature");
        }
        Ok(Arc::new(InMemoryEmbeddingStore::new()))
    }

    #[cfg(feature = "persistence")]
    fn embedding_store(&self) -> Result<Arc<dyn EmbeddingStore>> {
        use engine::adapters::{SledEmbeddingStore, SledStoreConfig};

        Ok(match &self.embeddings_db {
            Some(path) => Arc::new(SledEmbeddingStore::open(path, SledStoreConfig::default())?),
            None => Arc::new(InMemoryEmbeddingStore::new()),
        })
    }
}

fn print_table(
    requester: &str,
    target: EntityKind,
    config: &RecommenderConfig,
    result: &RankedResult,
) {
    println!(
        "{} {}s for {} ({})",
        style("[►]").cyan(),
        target,
        style(requester).bold(),
        config.strategy
    );

    if result.is_empty() {
        println!("  {}", style("no recommendations available").dim());
        return;
    }

    for (rank, item) in result.items().iter().enumerate() {
        println!(
            "  {:>3}. {:<24} {}",
            rank + 1,
            item.id.as_str(),
            style(format!("{:.4}", item.score)).green()
        );
    }
}
