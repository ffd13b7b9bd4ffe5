//! Configuration management
//!
//! This module handles loading, validation, and management of the Valet
//! configuration. Configuration is stored in TOML format at
//! ~/.valet/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Data directory, log level, identity file
//! - **llm**: Completion provider settings (model, temperature, max tokens)
//! - **memory**: Rolling-window size, semantic search limits, embedding
//!   endpoint
//! - **search**: Web search backend settings (Serper API key, result limit)
//! - **skills**: App-command overrides for the open_app skill

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Completion provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Memory subsystem configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Skill configuration
    #[serde(default)]
    pub skills: SkillsConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Identity file name inside the data directory
    #[serde(default = "default_identity_file")]
    pub identity_file: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            identity_file: default_identity_file(),
        }
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key for the completion provider (may also come from the
    /// VALET_API_KEY environment variable)
    #[serde(default)]
    pub api_key: String,

    /// Model name (e.g. "gemini-2.5-flash")
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Memory subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum messages kept in the in-process rolling window
    #[serde(default = "default_window_limit")]
    pub window_limit: usize,

    /// Maximum results returned by a semantic search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Base URL of the Ollama-compatible embedding endpoint
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_limit: default_window_limit(),
            search_limit: default_search_limit(),
            embedding_url: default_embedding_url(),
            embedding_model: default_embedding_model(),
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Serper.dev API key; when empty the DuckDuckGo fallback is used
    #[serde(default)]
    pub serper_api_key: String,

    /// Maximum search results to fetch
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serper_api_key: String::new(),
            max_results: default_max_results(),
        }
    }
}

/// Skill configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillsConfig {
    /// App-name → launch-command overrides for the open_app skill
    #[serde(default)]
    pub app_commands: HashMap<String, String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.valet")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_identity_file() -> String {
    "identity.md".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_window_limit() -> usize {
    50
}

fn default_search_limit() -> usize {
    10
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_max_results() -> usize {
    5
}

impl Config {
    /// Default configuration file path: ~/.valet/config.toml
    pub fn default_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".into()))?;
        Ok(home.join(".valet").join("config.toml"))
    }

    /// Load configuration from the default location, creating a default
    /// config file if none exists.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            info!("Created default configuration at {}", path.display());
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config: {}", e)))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;
        config.core.data_dir = expand_tilde(&config.core.data_dir)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| EngineError::Config(format!("Failed to create config dir: {}", e)))?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)
            .map_err(|e| EngineError::Config(format!("Failed to write config: {}", e)))?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(format!(
                "temperature must be in [0.0, 2.0], got {}",
                self.llm.temperature
            )));
        }
        if self.memory.window_limit == 0 {
            return Err(EngineError::Config(
                "memory.window_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the completion API key from config or environment
    pub fn api_key(&self) -> Option<String> {
        if !self.llm.api_key.is_empty() {
            return Some(self.llm.api_key.clone());
        }
        std::env::var("VALET_API_KEY").ok().filter(|k| !k.is_empty())
    }

    /// Path of the SQLite database file inside the data directory
    pub fn db_path(&self) -> PathBuf {
        self.core.data_dir.join("valet.db")
    }

    /// Path of the identity file inside the data directory
    pub fn identity_path(&self) -> PathBuf {
        self.core.data_dir.join(&self.core.identity_file)
    }
}

/// Expand a leading ~ to the user's home directory
fn expand_tilde(path: &Path) -> Result<PathBuf, EngineError> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".into()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".into()))
    } else {
        Ok(path.to_path_buf())
    }
}
