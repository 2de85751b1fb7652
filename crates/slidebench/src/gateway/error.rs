//! Gateway error type.

use derive_more::{Display, Error};
use tracing::{error, instrument};

/// Transport or provider failure while asking for a move.
#[derive(Debug, Clone, Display, Error)]
#[display("Gateway error: {} at {}:{}", message, file, line)]
pub struct GatewayError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl GatewayError {
    /// Creates a new gateway error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "Gateway error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("HTTP request failed: {}", err))
    }
}
