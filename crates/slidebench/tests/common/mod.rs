//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use slidebench::{
    Board, Direction, GatewayError, GatewayReply, ModelGateway, NotificationSink, RunEvent,
    TokenUsage, parse_move,
};

/// Simulated latency reported by [`ScriptedGateway`] replies.
pub const REPLY_LATENCY_MS: u64 = 25;

/// How the scripted model answers.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Names the move that solves the board, if one exists.
    Solve,
    /// Names a legal move that does not solve the board.
    Avoid,
    /// Names a direction the blank cannot take.
    Illegal,
    /// Answers with fixed text.
    Content(&'static str),
    /// Fails the call.
    Fail,
}

/// Gateway that answers according to a [`Script`].
#[derive(Debug)]
pub struct ScriptedGateway {
    script: Script,
    pause: Duration,
    calls: AtomicUsize,
    remaining_seen: Mutex<Vec<u32>>,
}

impl ScriptedGateway {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            pause: Duration::ZERO,
            calls: AtomicUsize::new(0),
            remaining_seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps before answering each call.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `moves_remaining` of every call, in order.
    pub fn remaining_seen(&self) -> Vec<u32> {
        self.remaining_seen.lock().expect("Lock").clone()
    }

    fn choose(&self, board: &Board) -> Option<Direction> {
        let legal = board.legal_moves().expect("Valid board");
        match self.script {
            Script::Solve => legal.into_iter().find(|d| {
                board
                    .apply_move(*d)
                    .map(|next| next.is_solved())
                    .unwrap_or(false)
            }),
            Script::Avoid => legal.into_iter().find(|d| {
                board
                    .apply_move(*d)
                    .map(|next| !next.is_solved())
                    .unwrap_or(false)
            }),
            Script::Illegal => Direction::ALL.into_iter().find(|d| !legal.contains(d)),
            Script::Content(_) | Script::Fail => None,
        }
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn suggest_move(
        &self,
        board: &Board,
        _model_id: &str,
        moves_remaining: u32,
    ) -> Result<GatewayReply, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.remaining_seen
            .lock()
            .expect("Lock")
            .push(moves_remaining);
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }

        let content = match self.script {
            Script::Fail => return Err(GatewayError::new("provider unavailable")),
            Script::Content(text) => text.to_string(),
            _ => match self.choose(board) {
                Some(direction) => json!({ "move": direction }).to_string(),
                None => "no move".to_string(),
            },
        };

        Ok(GatewayReply {
            request_id: Uuid::new_v4(),
            parsed_move: parse_move(&content),
            raw_response: json!({ "choices": [{ "message": { "content": content } }] }),
            content,
            latency_ms: REPLY_LATENCY_MS,
            token_usage: Some(TokenUsage {
                prompt_tokens: Some(90),
                completion_tokens: Some(5),
                total_tokens: Some(95),
            }),
        })
    }
}

/// Sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().expect("Lock").clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(RunEvent::kind).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, event: RunEvent) {
        self.events.lock().expect("Lock").push(event);
    }
}
