//! Submit + poll driver for asynchronous generation jobs
//!
//! Timing rules:
//! - submission is retried on transient failures only, `submit_attempts`
//!   attempts in total with `submit_retry_delay` between them
//! - a wait of `poll_interval` precedes every poll
//! - a transient poll error consumes a poll attempt and polling continues
//! - after `max_poll_attempts` polls without a terminal status the job
//!   times out
//!
//! Cancellation interrupts waits only. A poll or submission already in
//! flight runs to completion, and the backend job is never cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::GenerationError;
use crate::providers::{JobBackend, RemoteJobStatus};

use super::state::{ArtifactHandle, GenerationJob, JobEvent};

/// Retry and polling limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolicy {
    pub submit_attempts: u32,
    pub submit_retry_delay: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for JobPolicy {
    fn default() -> Self {
        JobPolicy {
            submit_attempts: 3,
            submit_retry_delay: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(5000),
            max_poll_attempts: 120,
        }
    }
}

/// Called with a snapshot after every state or counter change
pub type JobObserver = Box<dyn Fn(&GenerationJob) + Send + Sync>;

#[derive(Clone)]
pub struct JobLifecycleManager {
    backend: Arc<dyn JobBackend>,
    policy: JobPolicy,
}

enum Waited {
    Elapsed,
    Cancelled,
}

async fn wait(duration: Duration, cancel: &CancellationToken) -> Waited {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Waited::Cancelled,
        _ = tokio::time::sleep(duration) => Waited::Elapsed,
    }
}

impl JobLifecycleManager {
    pub fn new(backend: Arc<dyn JobBackend>, policy: JobPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &Arc<dyn JobBackend> {
        &self.backend
    }

    /// Drive a created job to a terminal state
    #[instrument(skip(self, job, cancel, observer), fields(job_id = %job.id))]
    pub async fn run(
        &self,
        mut job: GenerationJob,
        cancel: CancellationToken,
        observer: JobObserver,
    ) -> GenerationJob {
        let Some(backend_job_id) = self.submit(&mut job, &cancel, &observer).await else {
            return job;
        };
        self.poll_until_terminal(&mut job, &backend_job_id, &cancel, &observer).await;
        job
    }

    /// Returns the backend job id, or `None` once the job is terminal
    async fn submit(
        &self,
        job: &mut GenerationJob,
        cancel: &CancellationToken,
        observer: &JobObserver,
    ) -> Option<String> {
        if !self.backend.is_configured() {
            let err = GenerationError::Configuration(format!(
                "job backend '{}' has no API key configured",
                self.backend.code()
            ));
            apply(job, JobEvent::failed(&err), observer);
            return None;
        }

        for attempt in 1..=self.policy.submit_attempts.max(1) {
            if attempt > 1 || cancel.is_cancelled() {
                let delay = if attempt > 1 { self.policy.submit_retry_delay } else { Duration::ZERO };
                if let Waited::Cancelled = wait(delay, cancel).await {
                    info!("Job cancelled before submission");
                    apply(job, JobEvent::Cancelled, observer);
                    return None;
                }
            }

            job.submission_attempts = attempt;
            match self
                .backend
                .submit_job(&job.prompt, job.size, job.duration_secs)
                .await
            {
                Ok(backend_job_id) => {
                    info!(backend_job_id = %backend_job_id, attempt, "Job submitted");
                    job.backend_job_id = Some(backend_job_id.clone());
                    apply(job, JobEvent::Submitted, observer);
                    return Some(backend_job_id);
                }
                Err(e) => {
                    let err = GenerationError::from(e);
                    if err.is_transient() && attempt < self.policy.submit_attempts {
                        warn!(attempt, error = %err, "Job submission failed, retrying");
                        observer(job);
                        continue;
                    }
                    error!(attempt, error = %err, "Job submission failed");
                    apply(job, JobEvent::failed(&err), observer);
                    return None;
                }
            }
        }
        None
    }

    async fn poll_until_terminal(
        &self,
        job: &mut GenerationJob,
        backend_job_id: &str,
        cancel: &CancellationToken,
        observer: &JobObserver,
    ) {
        apply(job, JobEvent::PollingStarted, observer);

        loop {
            if job.poll_attempts >= self.policy.max_poll_attempts {
                let polls = job.poll_attempts;
                warn!(polls, "Job timed out");
                apply(job, JobEvent::TimedOut { polls }, observer);
                return;
            }

            if let Waited::Cancelled = wait(self.policy.poll_interval, cancel).await {
                info!(polls = job.poll_attempts, "Job cancelled while polling");
                apply(job, JobEvent::Cancelled, observer);
                return;
            }

            job.poll_attempts += 1;
            let poll = match self.backend.poll_job(backend_job_id).await {
                Ok(poll) => poll,
                Err(e) => {
                    let err = GenerationError::from(e);
                    if err.is_transient() {
                        warn!(poll = job.poll_attempts, error = %err, "Transient poll error, continuing");
                        observer(job);
                        continue;
                    }
                    error!(poll = job.poll_attempts, error = %err, "Poll failed");
                    apply(job, JobEvent::failed(&err), observer);
                    return;
                }
            };

            match poll.status {
                RemoteJobStatus::Pending => {
                    debug!(poll = job.poll_attempts, progress = ?poll.progress, "Job pending");
                    apply(job, JobEvent::Progress { progress: poll.progress }, observer);
                }
                RemoteJobStatus::Completed => {
                    let handle = poll
                        .artifact_handle
                        .unwrap_or_else(|| backend_job_id.to_string());
                    info!(poll = job.poll_attempts, "Job completed");
                    let artifact = ArtifactHandle::for_job(job.id, handle);
                    apply(
                        job,
                        JobEvent::Completed {
                            artifact,
                            duration_secs: poll.duration_secs,
                            size: poll.size,
                        },
                        observer,
                    );
                    return;
                }
                RemoteJobStatus::Failed => {
                    let reason = poll
                        .error
                        .unwrap_or_else(|| "backend reported failure without a reason".to_string());
                    error!(poll = job.poll_attempts, reason = %reason, "Job failed");
                    apply(job, JobEvent::failed(&GenerationError::terminal(reason)), observer);
                    return;
                }
            }
        }
    }
}

fn apply(job: &mut GenerationJob, event: JobEvent, observer: &JobObserver) {
    if let Err(e) = job.transition(event) {
        error!(job_id = %job.id, error = %e, "Rejected job transition");
        return;
    }
    observer(job);
}
