//! HTTP model gateway for OpenAI-compatible and Anthropic endpoints.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use slidebench_puzzle::Board;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{GatewayError, GatewayReply, ModelGateway, SYSTEM_PROMPT, parse_move, user_message};
use crate::config::GatewaySettings;
use crate::records::TokenUsage;

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Any OpenAI-compatible `/chat/completions` endpoint (OpenAI, AI gateways).
    #[default]
    OpenAI,
    /// Anthropic `/messages` endpoint.
    Anthropic,
}

/// Gateway that calls a hosted model over HTTP.
#[derive(Debug, Clone)]
pub struct LlmGateway {
    provider: LlmProvider,
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl LlmGateway {
    /// Creates a gateway from settings and an optional API key.
    ///
    /// A missing key is not an error here: every call then fails with a
    /// [`GatewayError`], which fails the run that made it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the HTTP client cannot be built.
    #[instrument(skip(settings, api_key), fields(provider = ?settings.provider(), base_url = %settings.base_url()))]
    pub fn new(settings: &GatewaySettings, api_key: Option<String>) -> Result<Self, GatewayError> {
        if api_key.is_none() {
            warn!(env = %settings.api_key_env(), "No API key configured, model calls will fail");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(*settings.timeout_secs()))
            .build()?;

        info!("Creating LLM gateway");
        Ok(Self {
            provider: *settings.provider(),
            base_url: settings.base_url().trim_end_matches('/').to_string(),
            api_key,
            max_tokens: *settings.max_tokens(),
            temperature: *settings.temperature(),
            client,
        })
    }

    /// Creates a gateway reading the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the HTTP client cannot be built.
    #[instrument(skip(settings))]
    pub fn from_env(settings: &GatewaySettings) -> Result<Self, GatewayError> {
        let api_key = std::env::var(settings.api_key_env())
            .ok()
            .filter(|key| !key.is_empty());
        Self::new(settings, api_key)
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::OpenAI => format!("{}/chat/completions", self.base_url),
            LlmProvider::Anthropic => format!("{}/messages", self.base_url),
        }
    }

    fn request_body(&self, board: &Board, model_id: &str, moves_remaining: u32) -> Value {
        let user = user_message(board, moves_remaining);
        match self.provider {
            LlmProvider::OpenAI => json!({
                "model": model_id,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": user }
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }),
            LlmProvider::Anthropic => json!({
                "model": model_id,
                "system": SYSTEM_PROMPT,
                "messages": [
                    { "role": "user", "content": user }
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }),
        }
    }

    /// Posts the request and returns the decoded JSON body.
    #[instrument(skip(self, body, api_key))]
    async fn send(&self, api_key: &str, body: &Value) -> Result<Value, GatewayError> {
        let request = self.client.post(self.endpoint()).json(body);
        let request = match self.provider {
            LlmProvider::OpenAI => request.bearer_auth(api_key),
            LlmProvider::Anthropic => request
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01"),
        };

        debug!("Sending move request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(status = %status, response = %text, "Provider returned an error status");
            return Err(GatewayError::new(format!("Gateway error {}: {}", status, text)));
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "Provider response is not JSON");
            GatewayError::new(format!("Failed to parse response: {}", e))
        })
    }

    fn extract_content(&self, response: &Value) -> Result<String, GatewayError> {
        let content = match self.provider {
            LlmProvider::OpenAI => response["choices"][0]["message"]["content"].as_str(),
            LlmProvider::Anthropic => response["content"][0]["text"].as_str(),
        };
        content.map(str::to_string).ok_or_else(|| {
            GatewayError::new(format!("Unexpected response shape: {}", response))
        })
    }

    fn extract_usage(&self, response: &Value) -> Option<TokenUsage> {
        let usage = response.get("usage")?;
        let field = |name: &str| usage.get(name).and_then(Value::as_u64).map(|n| n as u32);
        let token_usage = match self.provider {
            LlmProvider::OpenAI => TokenUsage {
                prompt_tokens: field("prompt_tokens"),
                completion_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            },
            LlmProvider::Anthropic => {
                let prompt_tokens = field("input_tokens");
                let completion_tokens = field("output_tokens");
                TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens.zip(completion_tokens).map(|(p, c)| p + c),
                }
            }
        };
        Some(token_usage)
    }
}

#[async_trait]
impl ModelGateway for LlmGateway {
    #[instrument(skip(self, board), fields(provider = ?self.provider, size = board.size()))]
    async fn suggest_move(
        &self,
        board: &Board,
        model_id: &str,
        moves_remaining: u32,
    ) -> Result<GatewayReply, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::new("API key is not set"))?;

        let body = self.request_body(board, model_id, moves_remaining);
        let started = Instant::now();
        let response = self.send(api_key, &body).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let content = self.extract_content(&response)?;
        let parsed_move = parse_move(&content);
        let token_usage = self.extract_usage(&response);

        info!(latency_ms, parsed = ?parsed_move, "Model replied");
        Ok(GatewayReply {
            request_id: Uuid::new_v4(),
            parsed_move,
            content,
            raw_response: response,
            latency_ms,
            token_usage,
        })
    }
}
