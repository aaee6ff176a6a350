//! In-memory job registry
//!
//! Finished jobs stay readable for the retention window, then get swept on
//! the next insert or listing.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::GenerationError;

use super::state::GenerationJob;

/// Default time a finished job stays in the registry
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

struct JobEntry {
    job: GenerationJob,
    cancel: CancellationToken,
    /// Set when the stored snapshot first turns terminal
    finished_at: Option<Instant>,
}

/// Latest snapshot of every job plus its cancellation token
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, JobEntry>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl JobRegistry {
    pub fn new(retention: Duration) -> Self {
        JobRegistry {
            jobs: Arc::new(DashMap::new()),
            retention,
        }
    }

    /// Register a job and return the token that cancels it
    pub fn insert(&self, job: GenerationJob) -> CancellationToken {
        self.sweep();
        let cancel = CancellationToken::new();
        let finished_at = job.is_terminal().then(Instant::now);
        self.jobs.insert(
            job.id,
            JobEntry {
                job,
                cancel: cancel.clone(),
                finished_at,
            },
        );
        cancel
    }

    /// Replace the stored snapshot; unknown ids are ignored
    pub fn update(&self, job: &GenerationJob) {
        if let Some(mut entry) = self.jobs.get_mut(&job.id) {
            if job.is_terminal() && entry.finished_at.is_none() {
                entry.finished_at = Some(Instant::now());
            }
            entry.job = job.clone();
        }
    }

    /// Drop finished jobs older than the retention window
    fn sweep(&self) {
        let before = self.jobs.len();
        let retention = self.retention;
        self.jobs.retain(|_, entry| match entry.finished_at {
            Some(finished) => finished.elapsed() < retention,
            None => true,
        });
        let evicted = before.saturating_sub(self.jobs.len());
        if evicted > 0 {
            debug!(evicted, "Swept finished jobs");
        }
    }

    pub fn get(&self, id: Uuid) -> Option<GenerationJob> {
        self.jobs.get(&id).map(|entry| entry.job.clone())
    }

    /// All retained jobs, newest first
    pub fn list(&self) -> Vec<GenerationJob> {
        self.sweep();
        let mut jobs: Vec<GenerationJob> = self.jobs.iter().map(|entry| entry.job.clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Request cancellation; the job ends `cancelled` at its next wait
    ///
    /// Cancelling a job that already finished is a no-op.
    pub fn cancel(&self, id: Uuid) -> Result<GenerationJob, GenerationError> {
        let entry = self.jobs.get(&id).ok_or(GenerationError::JobNotFound(id))?;
        if !entry.job.is_terminal() {
            entry.cancel.cancel();
        }
        Ok(entry.job.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}
