//! Actor that drives the status retriever
//!
//! The retriever itself is passive: something has to call `refresh()`. The
//! [`scheduler::RefreshActor`] does so on an interval, accepts commands over an mpsc
//! channel, and broadcasts an event after every completed cycle.
//!
//! ```text
//!   Timer tick ──┐
//!                ├──► StatusRetriever::refresh() ──► CycleCompleted ──► [dashboard, logger, ...]
//!   RefreshNow ──┘        (broadcast channel)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: `RefreshCommand` over an mpsc channel, wrapped by `SchedulerHandle`
//! 2. **Events**: `StatusEvent` published to a broadcast channel for fan-out
//! 3. **Request/Response**: oneshot channels for `RefreshNow`

pub mod messages;
pub mod scheduler;
