pub mod config;
pub mod recommend;

pub use config::ConfigCommand;
pub use recommend::RecommendArgs;

use anyhow::Result;
use engine::{ConfigurationLoader, RecommenderConfig, StrategyKind};
use std::path::Path;

/// File and environment configuration with the command line strategy on top
pub fn load_config(explicit: Option<&Path>, strategy: Option<StrategyKind>) -> Result<RecommenderConfig> {
    let config = ConfigurationLoader::new().load(explicit)?;
    Ok(match strategy {
        Some(strategy) => config.with_strategy(strategy),
        None => config,
    })
}
