//! Append-only trace records: one per move attempt, one per model call.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use slidebench_puzzle::{Board, Direction};
use uuid::Uuid;

use super::{FailureKind, Game, Run, RunId};
use crate::gateway::{GatewayError, GatewayReply};

/// Identifier linking a model call to the move attempt it produced.
pub type RequestId = Uuid;

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: Option<u32>,
    /// Tokens in the completion.
    pub completion_tokens: Option<u32>,
    /// Provider-reported total.
    pub total_tokens: Option<u32>,
}

/// One attempted step of a run.
///
/// `move_index` equals the game's move count when the attempt started, so a
/// failed attempt shares its index with the move that would have followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub(crate) run_id: RunId,
    pub(crate) move_index: u32,
    pub(crate) model_id: String,
    pub(crate) request_id: Option<RequestId>,
    pub(crate) pre_board: Board,
    pub(crate) suggested_move: Option<Direction>,
    pub(crate) raw_suggestion: Option<String>,
    pub(crate) is_parsed: bool,
    pub(crate) is_legal: bool,
    pub(crate) post_board: Option<Board>,
    pub(crate) error_kind: Option<FailureKind>,
    pub(crate) timestamp: DateTime<Utc>,
}

impl MoveRecord {
    /// Opens a record for the model reply received in the game's current state.
    pub(crate) fn begin(run: &Run, game: &Game, reply: &GatewayReply) -> Self {
        Self {
            run_id: run.id,
            move_index: game.move_count,
            model_id: run.model_id.clone(),
            request_id: Some(reply.request_id),
            pre_board: game.current_board.clone(),
            suggested_move: reply.parsed_move,
            raw_suggestion: Some(reply.content.clone()),
            is_parsed: reply.parsed_move.is_some(),
            is_legal: false,
            post_board: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    /// Closes the record as a rejected attempt.
    pub(crate) fn reject(mut self, kind: FailureKind) -> Self {
        self.is_legal = false;
        self.post_board = None;
        self.error_kind = Some(kind);
        self
    }

    /// Closes the record as an applied move.
    pub(crate) fn accept(mut self, post_board: Board) -> Self {
        self.is_legal = true;
        self.post_board = Some(post_board);
        self.error_kind = None;
        self
    }
}

/// One request to the model gateway, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct ModelCallRecord {
    pub(crate) request_id: RequestId,
    pub(crate) run_id: RunId,
    pub(crate) model_id: String,
    pub(crate) latency_ms: u64,
    pub(crate) token_usage: Option<TokenUsage>,
    pub(crate) raw_response: serde_json::Value,
    pub(crate) summary: String,
    pub(crate) error_kind: Option<FailureKind>,
    pub(crate) recorded_at: DateTime<Utc>,
}

impl ModelCallRecord {
    /// Records a reply that came back from the provider.
    pub(crate) fn from_reply(run: &Run, reply: &GatewayReply) -> Self {
        Self {
            request_id: reply.request_id,
            run_id: run.id,
            model_id: run.model_id.clone(),
            latency_ms: reply.latency_ms,
            token_usage: reply.token_usage,
            raw_response: reply.raw_response.clone(),
            summary: "auto move call".to_string(),
            error_kind: None,
            recorded_at: Utc::now(),
        }
    }

    /// Records a call that failed before a reply could be read.
    pub(crate) fn from_failure(run: &Run, error: &GatewayError) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            run_id: run.id,
            model_id: run.model_id.clone(),
            latency_ms: 0,
            token_usage: None,
            raw_response: serde_json::Value::Null,
            summary: format!("gateway error: {}", error.message),
            error_kind: Some(FailureKind::GatewayError),
            recorded_at: Utc::now(),
        }
    }
}
