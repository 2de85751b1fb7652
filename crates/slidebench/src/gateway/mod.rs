//! Model gateway: asks a language model for the next move.

mod client;
mod error;
mod prompt;

pub use client::{LlmGateway, LlmProvider};
pub use error::GatewayError;
pub use prompt::{SYSTEM_PROMPT, parse_move, user_message};

use async_trait::async_trait;
use slidebench_puzzle::{Board, Direction};

use crate::records::{RequestId, TokenUsage};

/// A reply that made it back from the provider.
///
/// Unusable content is not an error: it arrives with `parsed_move = None`.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    /// Identifier shared by the call record and the move record.
    pub request_id: RequestId,
    /// Direction decoded from the content, if any.
    pub parsed_move: Option<Direction>,
    /// Text the model produced.
    pub content: String,
    /// Full provider response body.
    pub raw_response: serde_json::Value,
    /// Wall-clock duration of the request.
    pub latency_ms: u64,
    /// Token accounting, when the provider reports it.
    pub token_usage: Option<TokenUsage>,
}

/// Source of move suggestions.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Asks `model_id` for the next move on `board` with `moves_remaining` left.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the provider cannot be reached or
    /// answers with a failure. Content that names no direction is reported
    /// through [`GatewayReply::parsed_move`] instead.
    async fn suggest_move(
        &self,
        board: &Board,
        model_id: &str,
        moves_remaining: u32,
    ) -> Result<GatewayReply, GatewayError>;
}
