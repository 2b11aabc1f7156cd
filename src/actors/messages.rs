//! Message types for the refresh scheduler

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::retriever::StatusSnapshot;

/// Event published after a polling cycle finished
///
/// Slow subscribers may lag and miss events; every event carries the complete
/// snapshot, so the latest one received is always sufficient.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    CycleCompleted {
        /// Status of every configured project after the cycle
        snapshot: StatusSnapshot,

        /// When the cycle finished
        timestamp: DateTime<Utc>,
    },
}

/// Commands that can be sent to a RefreshActor
#[derive(Debug)]
pub enum RefreshCommand {
    /// Run a cycle immediately (bypassing the interval timer)
    RefreshNow {
        /// Signalled once the cycle has been published
        respond_to: oneshot::Sender<()>,
    },

    /// Update the refresh interval
    UpdateInterval { interval_secs: u64 },

    /// Gracefully shut down the scheduler
    ///
    /// A cycle in progress is finished first.
    Shutdown,
}
