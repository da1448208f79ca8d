//! reflex-core — the autonomous reflex layer of a long-running embodied
//! agent runtime.
//!
//! Samples a periodic world-state snapshot, evaluates a priority-ordered
//! set of hysteresis controllers against it, deduplicates and enqueues
//! at most one task per tick, and verifies the hunger reflex's outcome
//! against post-execution state via a content-addressed proof bundle.
//! The deliberative planner, inventory valuation, and step execution
//! pipeline are external collaborators reached only through the trait
//! seams in [`domain::ports`].

pub mod domain;
pub mod services;

pub use domain::error::{CacheError, EnqueueError, ReflexError, TaskQueryError};
pub use domain::models::{
    EnqueueOutcome, EnqueueSkipReason, GuardOutcome, ProofAccumulator, ProofBundle,
    ReflexLifecycleEvent, ReflexResult, SignalVector, Task, TaskData, TaskMetadata,
    TaskProvenance, TaskStatus, VerificationReason, WorldSample,
};
pub use domain::ports::{ProofRecorder, TaskStore, WorldStateFetcher};
pub use services::config::ReflexConfig;
pub use services::credit_store::CreditStore;
pub use services::lifecycle_emitter::LifecycleEmitter;
pub use services::reflex_registry::{ReflexRegistry, TickOutcome};
pub use services::reflexes::exploration::ExplorationController;
pub use services::reflexes::hunger::HungerController;
pub use services::reflexes::sleep::SleepController;
pub use services::world_state_cache::WorldStateCache;
