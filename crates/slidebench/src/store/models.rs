//! Database rows and their conversion to records.

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use slidebench_puzzle::{Board, Direction};
use uuid::Uuid;

use super::{StoreError, schema};
use crate::records::{
    FailureKind, Game, GameStatus, ModelCallRecord, MoveRecord, Run, RunStatus, TokenUsage,
};

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::new(format!("Invalid id '{}': {}", value, e)))
}

fn parse_tag<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| StoreError::new(format!("Invalid stored value '{}': {}", value, e)))
}

fn parse_optional_tag<T>(value: Option<&str>) -> Result<Option<T>, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value.map(parse_tag).transpose()
}

fn decode_board(value: &str) -> Result<Board, StoreError> {
    Ok(serde_json::from_str(value)?)
}

fn encode_board(board: &Board) -> Result<String, StoreError> {
    Ok(serde_json::to_string(board)?)
}

/// `games` row; also used for upserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = schema::games)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(super) struct GameRow {
    id: String,
    size: i32,
    initial_board: String,
    current_board: String,
    status: String,
    move_count: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl GameRow {
    pub(super) fn from_game(game: &Game) -> Result<Self, StoreError> {
        Ok(Self {
            id: game.id.to_string(),
            size: game.size as i32,
            initial_board: encode_board(&game.initial_board)?,
            current_board: encode_board(&game.current_board)?,
            status: game.status.to_string(),
            move_count: game.move_count as i32,
            created_at: game.created_at.naive_utc(),
            updated_at: game.updated_at.naive_utc(),
        })
    }

    pub(super) fn into_game(self) -> Result<Game, StoreError> {
        Ok(Game {
            id: parse_uuid(&self.id)?,
            size: self.size as usize,
            initial_board: decode_board(&self.initial_board)?,
            current_board: decode_board(&self.current_board)?,
            status: parse_tag::<GameStatus>(&self.status)?,
            move_count: self.move_count as u32,
            created_at: self.created_at.and_utc(),
            updated_at: self.updated_at.and_utc(),
        })
    }
}

/// `runs` row; also used for upserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = schema::runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub(super) struct RunRow {
    id: String,
    game_id: String,
    model_id: String,
    max_moves: i32,
    status: String,
    failure: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl RunRow {
    pub(super) fn from_run(run: &Run) -> Self {
        Self {
            id: run.id.to_string(),
            game_id: run.game_id.to_string(),
            model_id: run.model_id.clone(),
            max_moves: run.max_moves as i32,
            status: run.status.to_string(),
            failure: run.failure.map(|kind| kind.to_string()),
            created_at: run.created_at.naive_utc(),
            updated_at: run.updated_at.naive_utc(),
        }
    }

    pub(super) fn into_run(self) -> Result<Run, StoreError> {
        Ok(Run {
            id: parse_uuid(&self.id)?,
            game_id: parse_uuid(&self.game_id)?,
            model_id: self.model_id,
            max_moves: self.max_moves as u32,
            status: parse_tag::<RunStatus>(&self.status)?,
            failure: parse_optional_tag::<FailureKind>(self.failure.as_deref())?,
            created_at: self.created_at.and_utc(),
            updated_at: self.updated_at.and_utc(),
        })
    }
}

/// Stored `move_records` row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::move_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(super) struct MoveRow {
    #[allow(dead_code)]
    id: i32,
    run_id: String,
    move_index: i32,
    model_id: String,
    request_id: Option<String>,
    pre_board: String,
    suggested_move: Option<String>,
    raw_suggestion: Option<String>,
    is_parsed: bool,
    is_legal: bool,
    post_board: Option<String>,
    error_kind: Option<String>,
    recorded_at: NaiveDateTime,
}

impl MoveRow {
    pub(super) fn into_record(self) -> Result<MoveRecord, StoreError> {
        Ok(MoveRecord {
            run_id: parse_uuid(&self.run_id)?,
            move_index: self.move_index as u32,
            model_id: self.model_id,
            request_id: self.request_id.as_deref().map(parse_uuid).transpose()?,
            pre_board: decode_board(&self.pre_board)?,
            suggested_move: parse_optional_tag::<Direction>(self.suggested_move.as_deref())?,
            raw_suggestion: self.raw_suggestion,
            is_parsed: self.is_parsed,
            is_legal: self.is_legal,
            post_board: self.post_board.as_deref().map(decode_board).transpose()?,
            error_kind: parse_optional_tag::<FailureKind>(self.error_kind.as_deref())?,
            timestamp: self.recorded_at.and_utc(),
        })
    }
}

/// Insertable `move_records` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::move_records)]
pub(super) struct NewMoveRow {
    run_id: String,
    move_index: i32,
    model_id: String,
    request_id: Option<String>,
    pre_board: String,
    suggested_move: Option<String>,
    raw_suggestion: Option<String>,
    is_parsed: bool,
    is_legal: bool,
    post_board: Option<String>,
    error_kind: Option<String>,
    recorded_at: NaiveDateTime,
}

impl NewMoveRow {
    pub(super) fn from_record(record: &MoveRecord) -> Result<Self, StoreError> {
        Ok(Self {
            run_id: record.run_id.to_string(),
            move_index: record.move_index as i32,
            model_id: record.model_id.clone(),
            request_id: record.request_id.map(|id| id.to_string()),
            pre_board: encode_board(&record.pre_board)?,
            suggested_move: record.suggested_move.map(|d| d.to_string()),
            raw_suggestion: record.raw_suggestion.clone(),
            is_parsed: record.is_parsed,
            is_legal: record.is_legal,
            post_board: record.post_board.as_ref().map(encode_board).transpose()?,
            error_kind: record.error_kind.map(|kind| kind.to_string()),
            recorded_at: record.timestamp.naive_utc(),
        })
    }
}

/// Stored `model_calls` row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::model_calls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(super) struct CallRow {
    #[allow(dead_code)]
    id: i32,
    request_id: String,
    run_id: String,
    model_id: String,
    latency_ms: i64,
    prompt_tokens: Option<i32>,
    completion_tokens: Option<i32>,
    total_tokens: Option<i32>,
    raw_response: String,
    summary: String,
    error_kind: Option<String>,
    recorded_at: NaiveDateTime,
}

impl CallRow {
    pub(super) fn into_record(self) -> Result<ModelCallRecord, StoreError> {
        let counts = [self.prompt_tokens, self.completion_tokens, self.total_tokens];
        let token_usage = counts.iter().any(Option::is_some).then(|| TokenUsage {
            prompt_tokens: self.prompt_tokens.map(|n| n as u32),
            completion_tokens: self.completion_tokens.map(|n| n as u32),
            total_tokens: self.total_tokens.map(|n| n as u32),
        });

        Ok(ModelCallRecord {
            request_id: parse_uuid(&self.request_id)?,
            run_id: parse_uuid(&self.run_id)?,
            model_id: self.model_id,
            latency_ms: self.latency_ms as u64,
            token_usage,
            raw_response: serde_json::from_str(&self.raw_response)?,
            summary: self.summary,
            error_kind: parse_optional_tag::<FailureKind>(self.error_kind.as_deref())?,
            recorded_at: self.recorded_at.and_utc(),
        })
    }
}

/// Insertable `model_calls` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::model_calls)]
pub(super) struct NewCallRow {
    request_id: String,
    run_id: String,
    model_id: String,
    latency_ms: i64,
    prompt_tokens: Option<i32>,
    completion_tokens: Option<i32>,
    total_tokens: Option<i32>,
    raw_response: String,
    summary: String,
    error_kind: Option<String>,
    recorded_at: NaiveDateTime,
}

impl NewCallRow {
    pub(super) fn from_record(record: &ModelCallRecord) -> Result<Self, StoreError> {
        let usage = record.token_usage.unwrap_or_default();
        Ok(Self {
            request_id: record.request_id.to_string(),
            run_id: record.run_id.to_string(),
            model_id: record.model_id.clone(),
            latency_ms: record.latency_ms as i64,
            prompt_tokens: usage.prompt_tokens.map(|n| n as i32),
            completion_tokens: usage.completion_tokens.map(|n| n as i32),
            total_tokens: usage.total_tokens.map(|n| n as i32),
            raw_response: serde_json::to_string(&record.raw_response)?,
            summary: record.summary.clone(),
            error_kind: record.error_kind.map(|kind| kind.to_string()),
            recorded_at: record.recorded_at.naive_utc(),
        })
    }
}
