//! Run lifecycle events and their fan-out to observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

use crate::records::{RunStats, RunView};

/// Default number of events a slow subscriber may fall behind.
pub const DEFAULT_CAPACITY: usize = 256;

/// A change observers may want to render.
///
/// Serialized as `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run was initialized.
    RunCreated(RunView),
    /// A step changed a run that is still in progress, or is about to finish.
    RunUpdated(RunView),
    /// A run reached a final status.
    RunCompleted(RunView),
    /// Aggregates were recomputed.
    StatsUpdated(RunStats),
}

impl RunEvent {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunCreated(_) => "run_created",
            Self::RunUpdated(_) => "run_updated",
            Self::RunCompleted(_) => "run_completed",
            Self::StatsUpdated(_) => "stats_updated",
        }
    }
}

/// Best-effort event delivery.
pub trait NotificationSink: Send + Sync {
    /// Hands an event to every current observer. Never fails.
    fn publish(&self, event: RunEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&self, event: RunEvent) {
        trace!(kind = event.kind(), "Dropping event");
    }
}

/// Fans events out over a broadcast channel.
///
/// Publishing with no subscribers is not an error; subscribers that fall
/// more than the channel capacity behind skip the missed events.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<RunEvent>,
}

impl BroadcastSink {
    /// Creates a sink buffering up to `capacity` events per subscriber.
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Registers a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Number of live observers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationSink for BroadcastSink {
    #[instrument(skip(self, event), fields(kind = event.kind()))]
    fn publish(&self, event: RunEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "Event published"),
            Err(_) => trace!("No subscribers"),
        }
    }
}
