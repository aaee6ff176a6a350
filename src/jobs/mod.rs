//! Asynchronous generation jobs
//!
//! Video-class backends accept a job and finish it later. This module holds
//! the typed job state machine, the submit/poll driver and the registry that
//! serves job snapshots to callers.

mod lifecycle;
mod registry;
mod state;

pub use lifecycle::{JobLifecycleManager, JobObserver, JobPolicy};
pub use registry::{JobRegistry, DEFAULT_RETENTION};
pub use state::{ArtifactHandle, GenerationJob, JobState};
