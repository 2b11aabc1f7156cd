//! RefreshActor - triggers polling cycles on an interval
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → refresh() → Publish CycleCompleted → [subscribers]
//!     ↑
//!     └─── Commands (RefreshNow, UpdateInterval, Shutdown)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, instrument, trace, warn};

use crate::retriever::StatusRetriever;

use super::messages::{RefreshCommand, StatusEvent};

/// Actor owning the refresh loop of one retriever
pub struct RefreshActor {
    retriever: Arc<StatusRetriever>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<RefreshCommand>,

    /// Broadcast sender for cycle events
    event_tx: broadcast::Sender<StatusEvent>,

    /// Current refresh interval
    interval_duration: Duration,
}

impl RefreshActor {
    pub fn new(
        retriever: Arc<StatusRetriever>,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<RefreshCommand>,
        event_tx: broadcast::Sender<StatusEvent>,
    ) -> Self {
        Self {
            retriever,
            command_rx,
            event_tx,
            interval_duration: interval_duration.max(Duration::from_secs(1)),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is closed.
    /// The first tick fires immediately, so a cycle runs right after startup.
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting refresh actor");

        let mut ticker = interval(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        RefreshCommand::RefreshNow { respond_to } => {
                            debug!("received RefreshNow command");
                            self.refresh().await;
                            let _ = respond_to.send(());
                        }

                        RefreshCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs.max(1));
                            ticker = interval(self.interval_duration);
                            // skip the immediate tick of the new interval
                            ticker.reset();
                        }

                        RefreshCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("refresh actor stopped");
    }

    async fn refresh(&self) {
        self.retriever.refresh().await;

        let event = StatusEvent::CycleCompleted {
            snapshot: self.retriever.snapshot().await,
            timestamp: Utc::now(),
        };

        // It's OK if there are no subscribers
        match self.event_tx.send(event) {
            Ok(receivers) => trace!("published cycle event to {receivers} receivers"),
            Err(_) => trace!("no receivers for cycle event"),
        }
    }
}

/// Handle for controlling a RefreshActor
///
/// Can be cloned and shared across tasks.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<RefreshCommand>,
}

impl SchedulerHandle {
    /// Spawn a new refresh actor as a tokio task
    pub fn spawn(
        retriever: Arc<StatusRetriever>,
        interval_duration: Duration,
        event_tx: broadcast::Sender<StatusEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = RefreshActor::new(retriever, interval_duration, cmd_rx, event_tx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a cycle now and wait until it is published
    pub async fn refresh_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RefreshCommand::RefreshNow { respond_to: tx })
            .await
            .context("failed to send RefreshNow command")?;

        rx.await.context("failed to receive response")?;
        Ok(())
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(RefreshCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Gracefully shut down the scheduler
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(RefreshCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
