//! Benchmark records: games, runs, the move/call trace and aggregate views.

mod game;
mod run;
mod trace;
mod view;

pub use game::{Game, GameId, GameStatus};
pub use run::{FailureKind, Run, RunId, RunStatus};
pub use trace::{ModelCallRecord, MoveRecord, RequestId, TokenUsage};
pub use view::{RunStats, RunView};
