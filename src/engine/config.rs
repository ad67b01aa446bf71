// chatsql Engine — Assistant configuration
// Defaults → TOML file → environment → (shell flags, applied by the caller).

use crate::atoms::constants::*;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::ProviderKind;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// serde default helpers: must live in this module so #[serde(default = "fn")] resolves correctly
pub(crate) fn default_query_model() -> String {
    DEFAULT_QUERY_MODEL.to_string()
}
pub(crate) fn default_answer_model() -> String {
    DEFAULT_ANSWER_MODEL.to_string()
}
pub(crate) fn default_query_temperature() -> f64 {
    DEFAULT_QUERY_TEMPERATURE
}
pub(crate) fn default_answer_temperature() -> f64 {
    DEFAULT_ANSWER_TEMPERATURE
}
pub(crate) fn default_sample_rows() -> usize {
    DEFAULT_SAMPLE_ROWS
}
pub(crate) fn default_max_result_rows() -> usize {
    DEFAULT_MAX_RESULT_ROWS
}
pub(crate) fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
pub(crate) fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Provider credential. Required for every provider except Ollama.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's default endpoint (required for `custom`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model behind the SQL synthesis stage.
    #[serde(default = "default_query_model")]
    pub query_model: String,
    /// Model behind the streamed answer stage.
    #[serde(default = "default_answer_model")]
    pub answer_model: String,
    #[serde(default = "default_query_temperature")]
    pub query_temperature: f64,
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f64,
    /// Example rows per table in the schema description.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Result rows rendered into the answer prompt.
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,
    /// Render only the most recent N turns into prompts. Unset = everything.
    #[serde(default)]
    pub history_window: Option<usize>,
    /// Use the dedicated failure prompt when the query fails at the database.
    #[serde(default)]
    pub explain_failures: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Bounds the wait for a provider response to start. Once an answer is
    /// streaming, the same bound applies to each gap between chunks, so a
    /// long answer that keeps arriving is never cut off.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: String::new(),
            base_url: None,
            query_model: default_query_model(),
            answer_model: default_answer_model(),
            query_temperature: default_query_temperature(),
            answer_temperature: default_answer_temperature(),
            sample_rows: default_sample_rows(),
            max_result_rows: default_max_result_rows(),
            history_window: None,
            explain_failures: false,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// The key must never reach a log line.
impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("query_model", &self.query_model)
            .field("answer_model", &self.answer_model)
            .field("query_temperature", &self.query_temperature)
            .field("answer_temperature", &self.answer_temperature)
            .field("sample_rows", &self.sample_rows)
            .field("max_result_rows", &self.max_result_rows)
            .field("history_window", &self.history_window)
            .field("explain_failures", &self.explain_failures)
            .finish()
    }
}

/// `$CONFIG_DIR/chatsql/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatsql").join("config.toml"))
}

impl AssistantConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and plain defaults otherwise. Environment overrides
    /// are applied afterwards; the result is not validated.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut config = match path {
            Some(p) => {
                info!("[config] Loading {}", p.display());
                Self::from_toml_str(&std::fs::read_to_string(p)?)?
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(p) => {
                    info!("[config] Loading {}", p.display());
                    Self::from_toml_str(&std::fs::read_to_string(&p)?)?
                }
                None => {
                    debug!("[config] No config file, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV).or_else(|| get(API_KEY_ENV_FALLBACK)) {
            self.api_key = key;
        }
        if let Some(model) = get(QUERY_MODEL_ENV) {
            self.query_model = model;
        }
        if let Some(model) = get(ANSWER_MODEL_ENV) {
            self.answer_model = model;
        }
    }

    /// Reject configurations that cannot authenticate or name no model.
    pub fn validate(&self) -> EngineResult<()> {
        if self.api_key.trim().is_empty() && self.provider != ProviderKind::Ollama {
            return Err(EngineError::Config(format!(
                "no provider credential: set {} or api_key in the config file",
                API_KEY_ENV
            )));
        }
        if self.provider == ProviderKind::Custom && self.base_url.is_none() {
            return Err(EngineError::Config("provider 'custom' requires base_url".into()));
        }
        if self.query_model.trim().is_empty() || self.answer_model.trim().is_empty() {
            return Err(EngineError::Config("query_model and answer_model must be set".into()));
        }
        Ok(())
    }
}
