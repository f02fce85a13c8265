//! Configuration management for Atelier.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `atelier.toml` file
//! 3. User config `~/.config/atelier/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Session configuration.
    pub session: SessionConfig,

    /// Tool adapter configuration.
    pub tools: ToolsConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./atelier.toml` (project local)
    /// 2. `~/.config/atelier/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("atelier.toml").exists() {
            return Self::from_file("atelier.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("atelier").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("ATELIER_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("ATELIER_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Ok(url) = std::env::var("ATELIER_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("ATELIER_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(tokens) = std::env::var("ATELIER_LLM_MAX_TOKENS") {
            if let Ok(n) = tokens.parse() {
                self.llm.max_tokens = n;
            }
        }

        if let Ok(depth) = std::env::var("ATELIER_DEPTH") {
            if let Ok(n) = depth.parse() {
                self.session.depth = n;
            }
        }

        if let Ok(path) = std::env::var("ATELIER_SALES_DB") {
            self.tools.sales_db = path;
        }
        if let Ok(path) = std::env::var("ATELIER_CHUNK_DB") {
            self.tools.chunk_db = path;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.session.depth) {
            return Err(ConfigError::Invalid(format!(
                "session.depth must be 1, 2, or 3 (got {})",
                self.session.depth
            )));
        }
        Ok(())
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "openai", "anthropic", or "openai-compatible".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for API (for openai-compatible providers).
    pub base_url: Option<String>,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum tokens for response.
    pub max_tokens: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,   // Use provider default
            base_url: None, // Use provider default
            api_key: None,  // Load from env
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Research depth (1-3), fixed for the lifetime of a session.
    pub depth: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
        }
    }
}

/// Tool adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the read-only sales database.
    pub sales_db: String,

    /// Path to the pre-ingested document chunk store.
    pub chunk_db: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sales_db: DEFAULT_SALES_DB.to_string(),
            chunk_db: DEFAULT_CHUNK_DB.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
        assert_eq!(config.session.depth, DEFAULT_DEPTH);
        assert_eq!(config.tools.sales_db, DEFAULT_SALES_DB);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[llm]
provider = "anthropic"
model = "claude-sonnet-4-20250514"

[session]
depth = 3

[tools]
sales_db = "fixtures/sales.db"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.session.depth, 3);
        assert_eq!(config.tools.sales_db, "fixtures/sales.db");
        assert_eq!(config.tools.chunk_db, DEFAULT_CHUNK_DB);
    }

    #[test]
    fn test_depth_out_of_range_rejected() {
        let config = Config {
            session: SessionConfig { depth: 4 },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[llm]"));
        assert!(toml_str.contains("[session]"));
        assert!(toml_str.contains("[tools]"));
    }
}
