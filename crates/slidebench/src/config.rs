//! Benchmark configuration: TOML settings file and per-run parameters.

use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::gateway::LlmProvider;

/// Accepted board edge lengths.
pub const SIZE_RANGE: RangeInclusive<i64> = 2..=6;
/// Accepted move budgets.
pub const MAX_MOVES_RANGE: RangeInclusive<i64> = 10..=500;
/// Accepted scramble depths.
pub const SCRAMBLE_DEPTH_RANGE: RangeInclusive<i64> = 1..=200;

const DEFAULT_SIZE: i64 = 4;
const DEFAULT_MAX_MOVES: i64 = 200;
const DEFAULT_SCRAMBLE_DEPTH: i64 = 50;

/// Settings for the model gateway.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Provider wire format.
    #[serde(default)]
    provider: LlmProvider,

    /// Base URL; `/chat/completions` or `/messages` is appended.
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    api_key_env: String,

    /// Model used when a run request names none.
    #[serde(default = "default_model")]
    default_model: String,

    /// Completion token limit per move request.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Sampling temperature.
    #[serde(default)]
    temperature: f32,

    /// Request timeout.
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

#[instrument]
fn default_base_url() -> String {
    "https://ai-gateway.vercel.sh/v1".to_string()
}

#[instrument]
fn default_api_key_env() -> String {
    "AI_GATEWAY_API_KEY".to_string()
}

#[instrument]
fn default_model() -> String {
    "openai/gpt-4.1-mini".to_string()
}

#[instrument]
fn default_max_tokens() -> u32 {
    16
}

#[instrument]
fn default_timeout_secs() -> u64 {
    60
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the HTTP API.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Pause between background steps, for observers.
    #[serde(default = "default_step_delay_ms")]
    step_delay_ms: u64,
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_step_delay_ms() -> u64 {
    800
}

impl ServerSettings {
    /// Pause between background steps.
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

/// Which store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process maps, lost on exit.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite,
}

/// Settings for persistence.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Backend selection.
    #[serde(default)]
    backend: StorageBackend,

    /// Database path for the SQLite backend.
    #[serde(default = "default_db_path")]
    db_path: String,
}

#[instrument]
fn default_db_path() -> String {
    "slidebench.db".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_path: default_db_path(),
        }
    }
}

/// Complete benchmark configuration.
#[derive(Debug, Clone, Default, Getters, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Model gateway settings.
    #[serde(default)]
    gateway: GatewaySettings,

    /// HTTP API settings.
    #[serde(default)]
    server: ServerSettings,

    /// Persistence settings.
    #[serde(default)]
    storage: StorageSettings,
}

impl BenchConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not a valid configuration.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(
            provider = ?config.gateway.provider,
            backend = ?config.storage.backend,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Loads the file if it exists, falls back to defaults otherwise, then
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Applies `AI_GATEWAY_BASE_URL` and `DEFAULT_MODEL_ID` from the environment.
    #[instrument(skip(self))]
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("AI_GATEWAY_BASE_URL").ok(),
            std::env::var("DEFAULT_MODEL_ID").ok(),
        );
    }

    /// Replaces the gateway base URL and default model when values are given.
    #[instrument(skip(self))]
    pub fn apply_overrides(&mut self, base_url: Option<String>, default_model: Option<String>) {
        if let Some(url) = base_url.filter(|url| !url.is_empty()) {
            debug!(url = %url, "Overriding gateway base URL");
            self.gateway.base_url = url;
        }
        if let Some(model) = default_model.filter(|model| !model.is_empty()) {
            debug!(model = %model, "Overriding default model");
            self.gateway.default_model = model;
        }
    }

    /// Replaces the bind address when values are given.
    #[instrument(skip(self))]
    pub fn override_server(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
    }
}

/// Parameters of a requested run, as received from a caller.
///
/// Every field is optional; see [`RunConfig::from_request`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Model to benchmark.
    pub model_id: Option<String>,
    /// Board edge length.
    pub size: Option<i64>,
    /// Move budget.
    pub max_moves: Option<i64>,
    /// Random walk length used to scramble the board.
    pub scramble_depth: Option<i64>,
}

/// Validated run parameters, every value inside its accepted range.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct RunConfig {
    model_id: String,
    size: usize,
    max_moves: u32,
    scramble_depth: usize,
}

impl RunConfig {
    /// Creates a run configuration, clamping each value into its range.
    #[instrument(skip(model_id), fields(model_id = %model_id))]
    pub fn new(model_id: String, size: i64, max_moves: i64, scramble_depth: i64) -> Self {
        let config = Self {
            model_id,
            size: clamp(size, &SIZE_RANGE) as usize,
            max_moves: clamp(max_moves, &MAX_MOVES_RANGE) as u32,
            scramble_depth: clamp(scramble_depth, &SCRAMBLE_DEPTH_RANGE) as usize,
        };
        debug!(
            size = config.size,
            max_moves = config.max_moves,
            scramble_depth = config.scramble_depth,
            "Run config resolved"
        );
        config
    }

    /// Fills missing request fields with defaults and clamps the rest.
    #[instrument(skip(request, default_model))]
    pub fn from_request(request: &RunRequest, default_model: &str) -> Self {
        let model_id = request
            .model_id
            .clone()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        Self::new(
            model_id,
            request.size.unwrap_or(DEFAULT_SIZE),
            request.max_moves.unwrap_or(DEFAULT_MAX_MOVES),
            request.scramble_depth.unwrap_or(DEFAULT_SCRAMBLE_DEPTH),
        )
    }
}

fn clamp(value: i64, range: &RangeInclusive<i64>) -> i64 {
    value.clamp(*range.start(), *range.end())
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
