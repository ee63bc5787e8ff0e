//! TOML-based configuration for briefsmith
//!
//! All settings live in `briefsmith.toml`; every field has a default so an
//! empty file (or no file at all, via [`BriefsmithConfig::load_or_default`])
//! yields a working local setup against Ollama and DuckDuckGo.
//!
//! Secrets are never stored in the file. The config names the environment
//! variable that holds them (`api_key_env`, `cx_env`), and `.env` files are
//! honoured through `dotenvy`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Hard ceiling on the number of sub-tasks a query is decomposed into.
pub const MAX_TASKS_CEILING: usize = 5;

/// Longest overall session deadline accepted from config or a request.
pub const MAX_DEADLINE_SECS: u64 = 3600;

/// Root configuration structure loaded from briefsmith.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BriefsmithConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub research: ResearchConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable containing the API key (OpenAI only)
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after the first failed call
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_llm_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3".to_string()
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_llm_max_retries() -> u32 {
    2
}

fn default_llm_retry_backoff_ms() -> u64 {
    500
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
            retry_backoff_ms: default_llm_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    #[default]
    DuckDuckGo,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProviderKind,

    /// Environment variable containing the Google API key
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Environment variable containing the Google Programmable Search engine id
    #[serde(default = "default_search_cx_env")]
    pub cx_env: String,

    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Results requested from the backend per query
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Ceiling on evidence items kept per task
    #[serde(default = "default_max_evidence_per_task")]
    pub max_evidence_per_task: usize,

    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_search_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_search_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_search_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_search_cx_env() -> String {
    "GOOGLE_CX".to_string()
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_results_per_query() -> usize {
    5
}

fn default_max_evidence_per_task() -> usize {
    8
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_search_max_retries() -> u32 {
    1
}

fn default_search_retry_backoff_ms() -> u64 {
    250
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            api_key_env: default_search_api_key_env(),
            cx_env: default_search_cx_env(),
            base_url: default_search_base_url(),
            results_per_query: default_results_per_query(),
            max_evidence_per_task: default_max_evidence_per_task(),
            timeout_secs: default_search_timeout_secs(),
            max_retries: default_search_max_retries(),
            retry_backoff_ms: default_search_retry_backoff_ms(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Upper bound on planned sub-tasks
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// Per-task pipelines allowed to run at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overall deadline from planning through assembly
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Time given to in-flight work to wind down after the deadline
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}


fn default_max_tasks() -> usize {
    MAX_TASKS_CEILING
}

fn default_concurrency() -> usize {
    3
}

fn default_deadline_secs() -> u64 {
    120
}

fn default_grace_period_secs() -> u64 {
    5
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            concurrency: default_concurrency(),
            deadline_secs: default_deadline_secs(),
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl BriefsmithConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;

        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No configuration at {:?}, using defaults", path);
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BriefsmithConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate bounds and internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let research = &self.research;

        if research.max_tasks == 0 || research.max_tasks > MAX_TASKS_CEILING {
            return Err(ConfigError::ValidationError(format!(
                "research.max_tasks ({}) must be between 1 and {}",
                research.max_tasks, MAX_TASKS_CEILING
            )));
        }
        if research.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "research.concurrency must be at least 1".to_string(),
            ));
        }
        if research.deadline_secs == 0 || research.deadline_secs > MAX_DEADLINE_SECS {
            return Err(ConfigError::ValidationError(format!(
                "research.deadline_secs ({}) must be between 1 and {}",
                research.deadline_secs, MAX_DEADLINE_SECS
            )));
        }
        if self.llm.timeout_secs == 0 || self.llm.timeout_secs >= research.deadline_secs {
            return Err(ConfigError::ValidationError(format!(
                "llm.timeout_secs ({}) must be positive and shorter than research.deadline_secs ({})",
                self.llm.timeout_secs, research.deadline_secs
            )));
        }
        if self.search.timeout_secs == 0 || self.search.timeout_secs >= research.deadline_secs {
            return Err(ConfigError::ValidationError(format!(
                "search.timeout_secs ({}) must be positive and shorter than research.deadline_secs ({})",
                self.search.timeout_secs, research.deadline_secs
            )));
        }
        if self.search.results_per_query == 0 || self.search.max_evidence_per_task == 0 {
            return Err(ConfigError::ValidationError(
                "search.results_per_query and search.max_evidence_per_task must be at least 1"
                    .to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature ({}) must be between 0.0 and 2.0",
                self.llm.temperature
            )));
        }

        Ok(())
    }

    /// Check that every environment variable the selected backends need is set
    pub fn validate_env(&self) -> Result<(), ConfigError> {
        if self.llm.provider == LlmProviderKind::OpenAI {
            self.validate_env_var(&self.llm.api_key_env)?;
        }
        if self.search.provider == SearchProviderKind::Google {
            self.validate_env_var(&self.search.api_key_env)?;
            self.validate_env_var(&self.search.cx_env)?;
        }
        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.research.deadline_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.research.grace_period_secs)
    }
}
