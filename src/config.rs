use serde::{Deserialize, Serialize};

use crate::clients::GenerationParams;
use crate::clients::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Main configuration structure loaded from vsme.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    /// Secrets and process-level settings, environment only
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Hosted text-generation model and its decoding parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            timeout_ms: 60_000,
        }
    }
}

impl ModelConfig {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Whole-request timeout applied by the router
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            request_timeout_ms: 90_000,
        }
    }
}

/// Disclosure response store; persistence is disabled while `url` is unset
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub table: String,
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: "disclosure_responses".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gemini_api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            log_level: "vsme_disclosures=info,tower_http=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Log filter from `VSME_LOG_LEVEL`, else the default. Needs no config file,
    /// so the subscriber can be installed before [`Config::load`] logs anything.
    pub fn log_level_from<F>(lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        non_blank(lookup("VSME_LOG_LEVEL")).unwrap_or_else(|| Self::default().log_level)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Read `VSME_ENV_FILE` if set, else `./.env`. Variables already set win.
    pub fn load_env_file() {
        if let Ok(env_path) = std::env::var("VSME_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }
    }

    /// Load configuration: `.env`, then the TOML file, then environment overrides.
    ///
    /// Logs missing files and corrected values, so install the subscriber first.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env_file();

        let config_path =
            std::env::var("VSME_CONFIG").unwrap_or_else(|_| "vsme.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid config file {}: {}", config_path, e))?
        } else {
            tracing::debug!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        self.runtime.gemini_api_key = get("GEMINI_API_KEY").or(self.runtime.gemini_api_key.take());
        if let Some(level) = get("VSME_LOG_LEVEL") {
            self.runtime.log_level = level;
        }

        if let Some(model) = get("VSME_MODEL") {
            self.model.name = model;
        }
        if let Some(url) = get("VSME_MODEL_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(raw) = get("VSME_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(t) => self.model.temperature = t,
                Err(_) => tracing::warn!("Ignoring VSME_TEMPERATURE={}: not a number", raw),
            }
        }
        if let Some(raw) = get("VSME_MAX_OUTPUT_TOKENS") {
            match raw.parse::<u32>() {
                Ok(n) => self.model.max_output_tokens = n,
                Err(_) => tracing::warn!("Ignoring VSME_MAX_OUTPUT_TOKENS={}: not an integer", raw),
            }
        }
        if let Some(ms) = get("VSME_MODEL_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.model.timeout_ms = ms;
        }

        if let Some(bind) = get("VSME_HTTP_BIND") {
            self.server.bind = bind;
        }
        if let Some(ms) = get("VSME_REQUEST_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.server.request_timeout_ms = ms;
        }

        if let Some(url) = get("VSME_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = get("VSME_STORE_API_KEY") {
            self.store.api_key = Some(key);
        }
        if let Some(table) = get("VSME_STORE_TABLE") {
            self.store.table = table;
        }
    }

    /// Clamp out-of-range values, warning about each correction.
    pub fn validate(&mut self) {
        if !(0.0..=2.0).contains(&self.model.temperature) || self.model.temperature.is_nan() {
            let clamped = if self.model.temperature.is_nan() {
                GenerationParams::default().temperature
            } else {
                self.model.temperature.clamp(0.0, 2.0)
            };
            tracing::warn!(
                "model.temperature {} out of range [0, 2], using {}",
                self.model.temperature,
                clamped
            );
            self.model.temperature = clamped;
        }
        if !(1..=8192).contains(&self.model.max_output_tokens) {
            let clamped = self.model.max_output_tokens.clamp(1, 8192);
            tracing::warn!(
                "model.max_output_tokens {} out of range [1, 8192], using {}",
                self.model.max_output_tokens,
                clamped
            );
            self.model.max_output_tokens = clamped;
        }
        if self.model.timeout_ms == 0 {
            tracing::warn!("model.timeout_ms must be > 0, using 60000");
            self.model.timeout_ms = 60_000;
        }
        if self.server.request_timeout_ms == 0 {
            tracing::warn!("server.request_timeout_ms must be > 0, using 90000");
            self.server.request_timeout_ms = 90_000;
        }
        if let Some(url) = &self.store.url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            tracing::warn!("store.url {} is not an http(s) URL, persistence disabled", url);
            self.store.url = None;
        }
    }
}
