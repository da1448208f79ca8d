//! Domain error types for the reflex core.
//!
//! Each enum represents errors from a specific subsystem. Per the
//! crate's fail-closed propagation policy, none of these errors ever
//! abort the tick loop: callers catch, log, and fall back to inaction.

use thiserror::Error;

/// Errors surfaced by the world-state cache's fetcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The fetcher returned an error; the cache does not retain it.
    #[error("world-state fetch failed: {0}")]
    FetchFailed(String),
}

/// Errors surfaced while enqueuing a reflex task through the external
/// task store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    /// `addTask` threw/returned an error.
    #[error("addTask failed: {0}")]
    AddTaskFailed(String),
}

/// Errors surfaced while querying outstanding tasks for the goal-key
/// guard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskQueryError {
    /// `getTasks` failed.
    #[error("getTasks failed: {0}")]
    QueryFailed(String),
}

/// Top-level error type threaded through the reflex core's public API.
///
/// Contract violations inside a controller (`evaluate` panicking or
/// returning an error) are caught by the registry and logged rather
/// than propagated; this enum exists for the seams that legitimately
/// need a `Result` (cache fetch, enqueue, task query).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflexError {
    /// World-state fetch failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Task enqueue failed.
    #[error(transparent)]
    Enqueue(#[from] EnqueueError),

    /// Outstanding-task query failed.
    #[error(transparent)]
    TaskQuery(#[from] TaskQueryError),
}
