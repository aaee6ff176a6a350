//! Job state machine
//!
//! ```text
//! created ──► submitted ──► polling ──► completed
//!    │            │           │ ▲
//!    │            │           └─┘ progress / transient blip
//!    ▼            ▼           ├──► failed
//!  failed     cancelled       ├──► timed_out
//!  cancelled                  └──► cancelled
//! ```
//!
//! States only change through [`JobState::apply`], which rejects any
//! transition not drawn above.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{ContextPreset, Size};
use crate::error::{ErrorKind, GenerationError};

/// Stable retrieval handle for a finished artifact
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ArtifactHandle {
    /// Backend-side id used by the delivery proxy
    pub backend_job_id: String,
    /// Path that serves the artifact through this service
    pub content_url: String,
}

impl ArtifactHandle {
    pub fn for_job(job_id: Uuid, backend_job_id: impl Into<String>) -> Self {
        ArtifactHandle {
            backend_job_id: backend_job_id.into(),
            content_url: format!("/api/v1/jobs/{}/content", job_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Created,
    Submitted,
    Polling {
        progress: Option<u8>,
    },
    Completed {
        artifact: ArtifactHandle,
        duration_secs: Option<f64>,
        size: Option<String>,
    },
    Failed {
        kind: ErrorKind,
        reason: String,
    },
    TimedOut {
        polls: u32,
    },
    Cancelled,
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Submitted => "submitted",
            JobState::Polling { .. } => "polling",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::TimedOut { .. } => "timed_out",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. }
                | JobState::Failed { .. }
                | JobState::TimedOut { .. }
                | JobState::Cancelled
        )
    }

    /// Compute the next state, leaving `self` untouched
    pub fn apply(&self, event: JobEvent) -> Result<JobState, InvalidTransition> {
        use JobEvent as E;
        use JobState as S;

        let next = match (self, event) {
            (S::Created, E::Submitted) => S::Submitted,
            (S::Submitted, E::PollingStarted) => S::Polling { progress: None },
            (S::Polling { .. }, E::Progress { progress }) => S::Polling { progress },
            (S::Polling { .. }, E::Completed { artifact, duration_secs, size }) => {
                S::Completed { artifact, duration_secs, size }
            }
            (S::Polling { .. }, E::TimedOut { polls }) => S::TimedOut { polls },
            (S::Created | S::Submitted | S::Polling { .. }, E::Failed { kind, reason }) => {
                S::Failed { kind, reason }
            }
            (S::Created | S::Submitted | S::Polling { .. }, E::Cancelled) => S::Cancelled,
            (from, event) => {
                return Err(InvalidTransition {
                    from: from.name(),
                    event: event.name(),
                })
            }
        };
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Submitted,
    PollingStarted,
    Progress {
        progress: Option<u8>,
    },
    Completed {
        artifact: ArtifactHandle,
        duration_secs: Option<f64>,
        size: Option<String>,
    },
    Failed {
        kind: ErrorKind,
        reason: String,
    },
    TimedOut {
        polls: u32,
    },
    Cancelled,
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Submitted => "submitted",
            JobEvent::PollingStarted => "polling_started",
            JobEvent::Progress { .. } => "progress",
            JobEvent::Completed { .. } => "completed",
            JobEvent::Failed { .. } => "failed",
            JobEvent::TimedOut { .. } => "timed_out",
            JobEvent::Cancelled => "cancelled",
        }
    }

    pub fn failed(err: &GenerationError) -> Self {
        JobEvent::Failed {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid job transition: {event} while {from}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub event: &'static str,
}

/// One asynchronous generation job
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationJob {
    pub id: Uuid,
    /// Backend-assigned id, known once submitted
    pub backend_job_id: Option<String>,
    pub provider: String,
    pub model: String,
    pub context_preset: ContextPreset,
    pub prompt: String,
    #[schema(value_type = String, example = "1280x720")]
    pub size: Size,
    pub duration_secs: u32,
    #[serde(flatten)]
    pub state: JobState,
    pub submission_attempts: u32,
    pub poll_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        context_preset: ContextPreset,
        prompt: impl Into<String>,
        size: Size,
        duration_secs: u32,
    ) -> Self {
        let now = Utc::now();
        GenerationJob {
            id: Uuid::new_v4(),
            backend_job_id: None,
            provider: provider.into(),
            model: model.into(),
            context_preset,
            prompt: prompt.into(),
            size,
            duration_secs,
            state: JobState::Created,
            submission_attempts: 0,
            poll_attempts: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Apply an event to this job's state
    pub fn transition(&mut self, event: JobEvent) -> Result<(), InvalidTransition> {
        self.state = self.state.apply(event)?;
        self.updated_at = Utc::now();
        if self.state.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Error equivalent of a non-successful terminal state
    pub fn error(&self) -> Option<GenerationError> {
        match &self.state {
            JobState::Failed { kind, reason } => Some(match kind {
                ErrorKind::Configuration => GenerationError::Configuration(reason.clone()),
                ErrorKind::Validation => GenerationError::Validation(reason.clone()),
                ErrorKind::TransientBackend => GenerationError::transient(reason.clone()),
                _ => GenerationError::terminal(reason.clone()),
            }),
            JobState::TimedOut { polls } => Some(GenerationError::Timeout {
                job_id: self
                    .backend_job_id
                    .clone()
                    .unwrap_or_else(|| self.id.to_string()),
                polls: *polls,
            }),
            JobState::Cancelled => Some(GenerationError::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn job() -> GenerationJob {
        GenerationJob::new("openai", "sora-2", ContextPreset::Hero, "prompt", Size::new(1280, 720), 8)
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = job();
        assert_ok!(job.transition(JobEvent::Submitted));
        assert_ok!(job.transition(JobEvent::PollingStarted));
        assert_ok!(job.transition(JobEvent::Progress { progress: Some(50) }));
        assert_eq!(job.state, JobState::Polling { progress: Some(50) });

        let artifact = ArtifactHandle::for_job(job.id, "video_1");
        job.transition(JobEvent::Completed {
            artifact: artifact.clone(),
            duration_secs: Some(8.0),
            size: Some("1280x720".into()),
        })
        .unwrap();
        assert!(job.is_terminal());
        assert!(job.completed_at.is_some());
        assert!(job.error().is_none());
        assert_eq!(artifact.content_url, format!("/api/v1/jobs/{}/content", job.id));
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let created = JobState::Created;
        let err = created.apply(JobEvent::PollingStarted).unwrap_err();
        assert_eq!(err.from, "created");
        assert_eq!(err.event, "polling_started");

        assert_err!(JobState::Submitted.apply(JobEvent::TimedOut { polls: 1 }));
        assert_err!(JobState::Cancelled.apply(JobEvent::Submitted));
        assert_err!(JobState::TimedOut { polls: 120 }.apply(JobEvent::Cancelled));
    }

    #[test]
    fn test_failed_transition_keeps_state_on_error() {
        let mut job = job();
        assert_ok!(job.transition(JobEvent::Cancelled));
        assert_err!(job.transition(JobEvent::Submitted));
        assert_eq!(job.state, JobState::Cancelled);
    }

    #[test]
    fn test_timed_out_maps_to_timeout_error() {
        let mut job = job();
        job.backend_job_id = Some("video_9".into());
        job.transition(JobEvent::Submitted).unwrap();
        job.transition(JobEvent::PollingStarted).unwrap();
        job.transition(JobEvent::TimedOut { polls: 120 }).unwrap();
        let err = job.error().unwrap();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "Job video_9 timed out after 120 poll attempts");
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let value = serde_json::to_value(JobState::TimedOut { polls: 120 }).unwrap();
        assert_eq!(value["status"], "timed_out");
        assert_eq!(value["polls"], 120);
    }
}
