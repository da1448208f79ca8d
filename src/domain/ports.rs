//! Trait seams the reflex core consumes from external collaborators.
//!
//! These mirror spec.md §6's "Consumed from collaborators" contract.
//! Every call returns a `Result` rather than throwing, per the
//! crate-wide fail-closed propagation policy.

use async_trait::async_trait;

use crate::domain::error::{CacheError, EnqueueError, TaskQueryError};
use crate::domain::models::{ProofBundle, Task, TaskData, TaskMetadata, TaskStatus, WorldSample};

/// Asynchronous sampler of the external agent's world state.
#[async_trait]
pub trait WorldStateFetcher: Send + Sync {
    async fn fetch_world_state(&self) -> Result<WorldSample, CacheError>;
}

/// The external task store: enqueue and query tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Enqueue a task carrying the given reflex provenance metadata.
    /// Returns the created task as the store represents it.
    async fn add_task(&self, data: TaskData, metadata: TaskMetadata) -> Result<Task, EnqueueError>;

    /// Snapshot of current tasks, optionally filtered by status.
    async fn get_tasks(&self, status: Option<&[TaskStatus]>) -> Result<Vec<Task>, TaskQueryError>;
}

/// Durable recorder for proof bundles. The core hands bundles off here
/// and never retains them itself.
#[async_trait]
pub trait ProofRecorder: Send + Sync {
    async fn record_reflex_proof(&self, run_id: &str, bundle: ProofBundle);
}
