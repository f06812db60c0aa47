//! Configuration Loader
//!
//! Sources, lowest priority first:
//! - Built-in defaults
//! - Configuration file (TOML, JSON, YAML), explicit or found in search paths
//! - Environment variables (`RECOMMENDER_*`)
//!
//! The merged configuration is validated before it is handed out.

use anyhow::{anyhow, bail, Context, Result};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::config::{RecommenderConfig, StrategyKind};

const CONFIG_FILE_STEM: &str = "recommender";
const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];
const ENV_PREFIX: &str = "RECOMMENDER";

/// Configuration loader with support for multiple sources
pub struct ConfigurationLoader {
    /// Configuration search paths
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // Current directory first
        search_paths.push(PathBuf::from("."));

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join(CONFIG_FILE_STEM));
        }

        search_paths.push(PathBuf::from("/etc/recommender"));

        Self { search_paths }
    }

    /// Loader that only looks in the given paths
    pub fn with_search_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            search_paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }

    /// Load from an explicit file or the first one found, then apply the process environment
    pub fn load(&self, explicit: Option<&Path>) -> Result<RecommenderConfig> {
        self.load_with_env(explicit, |key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with a custom environment lookup
    pub fn load_with_env<F>(&self, explicit: Option<&Path>, lookup: F) -> Result<RecommenderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit {
            Some(path) => self.load_from_file(path)?,
            None => match self.find_configuration_file() {
                Some(found) => self.load_from_file(&found)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    RecommenderConfig::default()
                }
            },
        };

        self.apply_environment_variables(&mut config, lookup)?;

        config
            .validate()
            .map_err(|e| anyhow!(e))
            .context("Configuration validation failed")?;

        info!(
            strategy = %config.strategy,
            default_top_k = config.default_top_k,
            max_in_flight = config.max_in_flight,
            "Recommender configuration loaded"
        );

        Ok(config)
    }

    /// Parse one configuration file; format follows the extension
    pub fn load_from_file(&self, path: &Path) -> Result<RecommenderConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let config = match extension.as_str() {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?,
            other => bail!("Unsupported config format '{}' ({})", other, path.display()),
        };

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// First `recommender.<ext>` present in the search paths
    pub fn find_configuration_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find_map(|dir| {
            CONFIG_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}.{}", CONFIG_FILE_STEM, ext)))
                .find(|candidate| candidate.is_file())
        })
    }

    fn apply_environment_variables<F>(&self, config: &mut RecommenderConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}_{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("STRATEGY") {
            config.strategy = value
                .parse::<StrategyKind>()
                .map_err(|e| anyhow!(e))
                .with_context(|| format!("Invalid {}", key))?;
        }
        if let Some((key, value)) = var("DEFAULT_TOP_K") {
            config.default_top_k = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_TOP_K") {
            config.max_top_k = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_IN_FLIGHT") {
            config.max_in_flight = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = var("ADAPTER_TIMEOUT_MS") {
            config.adapter_timeout_ms = Some(parse_number(&key, &value)?);
        }
        if let Some((key, value)) = var("CANDIDATE_LIMIT") {
            config.candidate_limit = Some(parse_number(&key, &value)?);
        }

        Ok(())
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid {}='{}': {}", key, value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigurationLoader::with_search_paths([dir.path()]);

        let config = loader.load_with_env(None, no_env).unwrap();
        assert_eq!(config, RecommenderConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("recommender.toml"),
            "strategy = \"hybrid_interest\"\ndefault_top_k = 5\n",
        )
        .unwrap();

        let loader = ConfigurationLoader::with_search_paths([dir.path()]);
        let config = loader.load_with_env(None, no_env).unwrap();

        assert_eq!(config.strategy, StrategyKind::HybridInterest);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.max_top_k, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        fs::write(&path, "default_top_k: 7\nmax_in_flight: 4\n").unwrap();

        let env: HashMap<&str, &str> = [
            ("RECOMMENDER_DEFAULT_TOP_K", "9"),
            ("RECOMMENDER_ADAPTER_TIMEOUT_MS", "250"),
            ("RECOMMENDER_STRATEGY", "embedding-similarity"),
        ]
        .into_iter()
        .collect();

        let loader = ConfigurationLoader::with_search_paths([dir.path()]);
        let config = loader
            .load_with_env(Some(&path), |key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.default_top_k, 9);
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.adapter_timeout_ms, Some(250));
        assert_eq!(config.strategy, StrategyKind::EmbeddingSimilarity);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigurationLoader::with_search_paths([dir.path()]);

        let err = loader
            .load_with_env(None, |key| {
                (key == "RECOMMENDER_MAX_IN_FLIGHT").then(|| "many".to_string())
            })
            .unwrap_err();
        assert!(err.to_string().contains("RECOMMENDER_MAX_IN_FLIGHT"));

        let path = dir.path().join("recommender.json");
        fs::write(&path, r#"{"default_top_k": 500, "max_top_k": 50}"#).unwrap();
        assert!(loader.load_with_env(Some(&path), no_env).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recommender.ini");
        fs::write(&path, "strategy=graph").unwrap();

        let loader = ConfigurationLoader::with_search_paths([dir.path()]);
        assert!(loader.load_from_file(&path).is_err());
        assert!(loader.find_configuration_file().is_none());
    }
}
