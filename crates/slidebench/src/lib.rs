//! Slidebench - benchmark language models on sliding-tile puzzles
//!
//! Each run scrambles an n-puzzle and asks a model for one move at a time
//! until the board is solved, the model errs, or the move budget runs out.
//! Every model call and every move attempt is recorded.
//!
//! # Architecture
//!
//! - **Orchestrator**: run initialization and the single step
//! - **Gateway**: model calls over HTTP (OpenAI-compatible or Anthropic)
//! - **Store**: runs, games and the trace (in memory or SQLite)
//! - **Supervisor**: one background task per run
//! - **Server**: HTTP API with a WebSocket event stream
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use slidebench::{BenchConfig, LlmGateway, MemoryStore, NullSink, Orchestrator, RunConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BenchConfig::default();
//! let gateway = LlmGateway::from_env(config.gateway())?;
//! let orchestrator = Orchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(gateway),
//!     Arc::new(NullSink),
//! );
//!
//! let run = RunConfig::new("openai/gpt-4.1-mini".to_string(), 3, 100, 10);
//! let view = orchestrator.initialize_run(&run)?;
//! let _finished = orchestrator
//!     .run_to_completion(*view.run.id(), Duration::ZERO)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod gateway;
mod notify;
mod orchestrator;
mod records;
mod server;
mod store;
mod supervisor;

// Crate-level exports - Configuration
pub use config::{
    BenchConfig, ConfigError, GatewaySettings, MAX_MOVES_RANGE, RunConfig, RunRequest,
    SCRAMBLE_DEPTH_RANGE, SIZE_RANGE, ServerSettings, StorageBackend, StorageSettings,
};

// Crate-level exports - Model gateway
pub use gateway::{
    GatewayError, GatewayReply, LlmGateway, LlmProvider, ModelGateway, SYSTEM_PROMPT, parse_move,
    user_message,
};

// Crate-level exports - Notifications
pub use notify::{BroadcastSink, DEFAULT_CAPACITY, NotificationSink, NullSink, RunEvent};

// Crate-level exports - Orchestration
pub use orchestrator::{Orchestrator, OrchestratorError, RunLocks};
pub use supervisor::RunSupervisor;

// Crate-level exports - Records
pub use records::{
    FailureKind, Game, GameId, GameStatus, ModelCallRecord, MoveRecord, RequestId, Run, RunId,
    RunStats, RunStatus, RunView, TokenUsage,
};

// Crate-level exports - Persistence
pub use store::{MemoryStore, RunStore, SqliteStore, StoreError, TraceRecorder, open_store};

// Crate-level exports - HTTP API
pub use server::{ApiError, AppState, RunList, router, serve};

// Crate-level exports - Puzzle types
pub use slidebench_puzzle::{Board, BoardError, Coord, Direction, Scrambler, Tile};
