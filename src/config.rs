//! Configuration settings for the innkeep assistant core.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub knowledge: KnowledgeConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub calendar: CalendarConfig,
    pub dates: DatesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            knowledge: KnowledgeConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            calendar: CalendarConfig::default(),
            dates: DatesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        // Try standard config locations
        let config_paths = [
            // Current directory
            PathBuf::from("config.toml"),
            PathBuf::from("innkeep.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("innkeep/config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".innkeep/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.embedding.model.is_empty() {
            return Err(ConfigError::MissingField("embedding.model".to_string()).into());
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be > 0".to_string()).into());
        }

        if self.calendar.fetch_timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("calendar.fetch_timeout_secs must be > 0".to_string()).into(),
            );
        }

        for (property_id, url) in &self.calendar.feeds {
            if url.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "calendar.feeds.{property_id} must not be empty"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Expand the corpus path.
    pub fn corpus_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::tilde(&self.knowledge.corpus_path);
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

/// Knowledge corpus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Path to the JSONL knowledge corpus
    pub corpus_path: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_path: "~/.local/share/innkeep/knowledge.jsonl".to_string(),
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name for local embeddings
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "intfloat/multilingual-e5-small".to_string(),
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of knowledge entries returned per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Calendar feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// ICS feed URL per property id
    pub feeds: HashMap<String, String>,
    /// Feed fetch timeout in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            feeds: HashMap::new(),
            fetch_timeout_secs: 10,
        }
    }
}

/// Date normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    /// Resolve ambiguous day/month mentions to the nearest future occurrence
    pub prefer_future: bool,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            prefer_future: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.embedding.model, "intfloat/multilingual-e5-small");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.calendar.fetch_timeout_secs, 10);
        assert!(config.dates.prefer_future);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [knowledge]
            corpus_path = "/srv/innkeep/corpus.jsonl"

            [embedding]
            model = "BAAI/bge-small-en-v1.5"

            [retrieval]
            top_k = 8

            [calendar]
            fetch_timeout_secs = 5

            [calendar.feeds]
            casa_sol = "https://calendar.example.com/casa_sol.ics"

            [dates]
            prefer_future = false
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.knowledge.corpus_path, "/srv/innkeep/corpus.jsonl");
        assert_eq!(config.embedding.model, "BAAI/bge-small-en-v1.5");
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(
            config.calendar.feeds.get("casa_sol").map(String::as_str),
            Some("https://calendar.example.com/casa_sol.ics")
        );
        assert!(!config.dates.prefer_future);
    }

    #[test]
    fn test_validate_zero_top_k() {
        let toml = r#"
            [retrieval]
            top_k = 0
        "#;

        let result = Config::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_feed_url() {
        let toml = r#"
            [calendar.feeds]
            casa_sol = ""
        "#;

        let result = Config::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let toml = r#"
            [calendar]
            fetch_timeout_secs = 0
        "#;

        let result = Config::from_str(toml);
        assert!(result.is_err());
    }
}
