//! Orchestrator error type.

use crate::records::RunId;
use crate::store::StoreError;

/// Failure of an orchestrator operation itself.
///
/// Model misbehavior never shows up here; it ends the run as `failed` and is
/// recorded in the trace instead.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub enum OrchestratorError {
    /// The store could not be read or written.
    #[display("{_0}")]
    Store(StoreError),
    /// A run could not be reloaded right after it was written.
    #[display("Run {_0} disappeared during an update")]
    #[from(ignore)]
    Vanished(RunId),
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Vanished(_) => None,
        }
    }
}
