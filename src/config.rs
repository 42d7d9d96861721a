//! Configuration management for db-ask.
//!
//! Handles loading configuration from TOML files and environment variables:
//! LLM provider settings, per-agent generation settings and the database path.

use crate::error::{AskError, Result};
use crate::llm::types::{MAX_TEMPERATURE, MIN_TEMPERATURE};
use crate::llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure for db-ask.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Generation settings for each agent.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Provider: "openrouter", "openai", "deepseek" or "mock".
    #[serde(default)]
    pub provider: LlmProvider,

    /// Model id. Falls back to `<PROVIDER>_MODEL`, then the provider default.
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key. Prefer the provider's environment variable instead.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per LLM call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles on each retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl LlmConfig {
    /// Resolves the model id from config, then environment, then provider default.
    pub fn resolve_model(&self) -> String {
        self.resolve_model_with(|name| std::env::var(name).ok())
    }

    /// Same as `resolve_model` with an explicit environment lookup.
    pub fn resolve_model_with(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| env(self.provider.model_env()).filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Resolves the API key from config, then the provider's environment variable.
    ///
    /// Returns `Ok(None)` for providers that need no key.
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as `resolve_api_key` with an explicit environment lookup.
    pub fn resolve_api_key_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>> {
        let Some(env_name) = self.provider.api_key_env() else {
            return Ok(None);
        };

        let key = self
            .api_key
            .clone()
            .or_else(|| env(env_name))
            .map(|k| k.trim().to_string())
            .ok_or_else(|| {
                AskError::config(format!(
                    "No API key configured for {}. Set {env_name} or [llm].api_key.",
                    self.provider
                ))
            })?;

        if is_placeholder_key(&key) {
            return Err(AskError::config(format!(
                "{env_name} is not set to a real API key. Replace the placeholder value."
            )));
        }

        Ok(Some(key))
    }

    /// Resolves the API base URL.
    pub fn resolve_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    /// Returns the retry base delay.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Returns true for empty keys and template values such as `your_openrouter_api_key_here`.
fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim().to_lowercase();
    key.is_empty() || key.starts_with("your_") || key.ends_with("_here") || key == "changeme"
}

/// Sampling settings for one agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// Sampling temperature in `[0, 2]`.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl AgentSettings {
    /// Creates settings with the given temperature and token limit.
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }

    fn validate(&self, agent: &str) -> Result<()> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(AskError::config(format!(
                "agents.{agent}.temperature must be between {MIN_TEMPERATURE} and {MAX_TEMPERATURE}, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AskError::config(format!(
                "agents.{agent}.max_tokens must be greater than zero"
            )));
        }
        Ok(())
    }
}

/// Generation settings for each agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsConfig {
    /// SQL generation: low temperature for consistent queries.
    #[serde(default = "default_sql_settings")]
    pub sql: AgentSettings,

    /// Summaries: moderate temperature for natural language.
    #[serde(default = "default_summary_settings")]
    pub summary: AgentSettings,
}

fn default_sql_settings() -> AgentSettings {
    AgentSettings::new(0.3, 500)
}

fn default_summary_settings() -> AgentSettings {
    AgentSettings::new(0.7, 500)
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            sql: default_sql_settings(),
            summary: default_summary_settings(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Per-query execution timeout in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("sample.db")
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Returns the query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-ask")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AskError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AskError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.agents.sql.validate("sql")?;
        self.agents.summary.validate("summary")?;

        if self.llm.max_attempts == 0 {
            return Err(AskError::config("llm.max_attempts must be at least 1"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(AskError::config("llm.timeout_secs must be greater than zero"));
        }
        if self.database.query_timeout_secs == 0 {
            return Err(AskError::config(
                "database.query_timeout_secs must be greater than zero",
            ));
        }
        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url).map_err(|e| {
                AskError::config(format!("llm.base_url '{base_url}' is not a valid URL: {e}"))
            })?;
        }

        Ok(())
    }
}
