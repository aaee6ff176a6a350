//! Artifact delivery proxy
//!
//! Finished job artifacts live behind the backend's authenticated content
//! endpoint. Delivery fetches them with its own retry budget, separate from
//! the job lifecycle's submit and poll budgets.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::error::GenerationError;
use crate::jobs::ArtifactHandle;
use crate::providers::{ArtifactPayload, JobBackend};

/// Retry budget for artifact fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub attempts: u32,
    /// Wait before retry `n` is `backoff_base * n`
    pub backoff_base: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        DeliveryPolicy {
            attempts: 3,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("artifact is not ready: job is {0}")]
    NotReady(&'static str),

    #[error("artifact fetch failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: GenerationError,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl From<DeliveryError> for GenerationError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::NotReady(state) => {
                GenerationError::Validation(format!("artifact is not ready: job is {}", state))
            }
            DeliveryError::Exhausted { source, .. } => source,
            DeliveryError::Generation(e) => e,
        }
    }
}

#[derive(Clone)]
pub struct ArtifactDelivery {
    backend: Arc<dyn JobBackend>,
    policy: DeliveryPolicy,
}

impl ArtifactDelivery {
    pub fn new(backend: Arc<dyn JobBackend>, policy: DeliveryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Fetch an artifact, retrying transient failures with linear backoff
    #[instrument(skip(self, handle), fields(backend_job_id = %handle.backend_job_id))]
    pub async fn fetch(&self, handle: &ArtifactHandle) -> Result<ArtifactPayload, DeliveryError> {
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            match self.backend.fetch_artifact(&handle.backend_job_id).await {
                Ok(payload) => {
                    info!(attempt, bytes = payload.bytes.len(), "Artifact delivered");
                    return Ok(payload);
                }
                Err(e) => {
                    let err = GenerationError::from(e);
                    if !err.is_transient() {
                        return Err(DeliveryError::Generation(err));
                    }
                    if attempt == attempts {
                        return Err(DeliveryError::Exhausted { attempts, source: err });
                    }
                    let backoff = self.policy.backoff_base * attempt;
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "Artifact fetch failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        Err(DeliveryError::Exhausted {
            attempts,
            source: GenerationError::transient("no fetch attempt was made"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    use crate::error::ErrorKind;
    use crate::testing::{ScriptedJobBackend, Step};

    fn handle() -> ArtifactHandle {
        ArtifactHandle {
            backend_job_id: "video_1".into(),
            content_url: "/api/v1/jobs/x/content".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_linear_backoff() {
        let backend = Arc::new(ScriptedJobBackend::new().with_fetches(vec![
            Step::Status(502),
            Step::Status(503),
            Step::Ok(()),
        ]));
        let delivery = ArtifactDelivery::new(backend.clone(), DeliveryPolicy::default());
        let started = Instant::now();

        let payload = delivery.fetch(&handle()).await.unwrap();

        assert_eq!(payload.content_type, "video/mp4");
        assert_eq!(backend.fetch_calls(), 3);
        // 1000 ms after the first failure, 2000 ms after the second
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let backend = Arc::new(ScriptedJobBackend::new().with_fetches(vec![
            Step::Status(500),
            Step::Status(500),
            Step::Status(500),
            Step::Ok(()),
        ]));
        let delivery = ArtifactDelivery::new(backend.clone(), DeliveryPolicy::default());

        let err = delivery.fetch(&handle()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Exhausted { attempts: 3, .. }));
        assert_eq!(backend.fetch_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_is_not_retried() {
        let backend = Arc::new(ScriptedJobBackend::new().with_fetches(vec![Step::Status(404)]));
        let delivery = ArtifactDelivery::new(backend.clone(), DeliveryPolicy::default());

        let err = delivery.fetch(&handle()).await.unwrap_err();
        assert_eq!(backend.fetch_calls(), 1);
        assert_eq!(GenerationError::from(err).kind(), ErrorKind::TerminalBackend);
    }
}
