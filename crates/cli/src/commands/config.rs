use anyhow::{bail, Context, Result};
use clap::Args;
use engine::RecommenderConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Output format (toml or json)
    #[arg(short, long, default_value = "toml")]
    pub format: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConfigCommand {
    /// Effective configuration after file and environment merging
    pub fn execute(&self, config: &RecommenderConfig) -> Result<()> {
        let content = match self.format.to_ascii_lowercase().as_str() {
            "toml" => toml::to_string_pretty(config).context("Failed to serialize config as TOML")?,
            "json" => {
                serde_json::to_string_pretty(config).context("Failed to serialize config as JSON")?
            }
            other => bail!("Unsupported format '{}', expected toml or json", other),
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, &content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Configuration written to {}", path.display());
            }
            None => println!("{}", content),
        }

        Ok(())
    }
}
