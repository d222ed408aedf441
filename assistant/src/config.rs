//! Configuration loading

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflow::BusyPolicy;

/// Config file name looked up by [`AppConfig::load`]
pub const CONFIG_FILE: &str = ".sql-assistant.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/sql-assistant/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("sql-assistant").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Top-level configuration (from .sql-assistant.toml)
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub engine: EngineSectionConfig,
}

/// LLM configuration section
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Business database the agent queries
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Allow statements other than SELECT/WITH/EXPLAIN/PRAGMA
    #[serde(default)]
    pub allow_writes: bool,
    /// Rows shown to the model by the query tool
    #[serde(default = "default_max_tool_rows")]
    pub max_tool_rows: usize,
    #[serde(default = "default_database_timeout")]
    pub timeout_secs: u64,
}

/// Skills configuration section
#[derive(Debug, Deserialize)]
pub struct SkillsConfig {
    #[serde(default = "default_skills_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Checkpoint store configuration section
#[derive(Debug, Default, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,
    /// SQLite file; defaults to ~/.sql-assistant/checkpoints.db
    pub path: Option<PathBuf>,
}

/// Workflow engine configuration section
#[derive(Debug, Deserialize)]
pub struct EngineSectionConfig {
    #[serde(default = "default_max_agent_steps")]
    pub max_agent_steps: usize,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub busy_policy: BusyPolicy,
}

// Default value functions
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3-coder:30b".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/business.db")
}

fn default_max_tool_rows() -> usize {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_skills_dir() -> PathBuf {
    PathBuf::from("skills")
}

fn default_max_agent_steps() -> usize {
    10
}

fn default_tool_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            allow_writes: false,
            max_tool_rows: default_max_tool_rows(),
            timeout_secs: default_database_timeout(),
        }
    }
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dir: default_skills_dir(),
        }
    }
}

impl Default for EngineSectionConfig {
    fn default() -> Self {
        Self {
            max_agent_steps: default_max_agent_steps(),
            tool_timeout_secs: default_tool_timeout(),
            busy_policy: BusyPolicy::default(),
        }
    }
}

impl EngineSectionConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl AppConfig {
    /// Load config from .sql-assistant.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .sql-assistant.toml
    /// 2. Check ~/.config/sql-assistant/.sql-assistant.toml (global fallback)
    /// 3. Fall back to defaults
    ///
    /// `OLLAMA_URL` and `OLLAMA_MODEL` override the [llm] section.
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file(CONFIG_FILE) {
            Some(config_path) => {
                tracing::debug!("Loading config from: {}", config_path.display());
                Self::load_from_path(&config_path)?
            }
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("OLLAMA_URL").filter(|v| !v.is_empty()) {
            self.llm.url = url;
        }
        if let Some(model) = var("OLLAMA_MODEL").filter(|v| !v.is_empty()) {
            self.llm.model = model;
        }
    }
}
