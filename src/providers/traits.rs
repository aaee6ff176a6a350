//! Provider trait definitions for synthesis backends
//!
//! The orchestration core treats image and video generation as opaque
//! capabilities. Each backend implements one of the traits below so the
//! dispatcher and the job lifecycle manager never see HTTP details.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ImagePayload, Quality, Size};

// ============================================================================
// Error Types
// ============================================================================

/// Provider error types
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

// ============================================================================
// Async job types
// ============================================================================

/// Backend-reported status of an asynchronous job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobStatus {
    Pending,
    Completed,
    Failed,
}

/// One poll response from a job backend
#[derive(Debug, Clone)]
pub struct JobPoll {
    pub status: RemoteJobStatus,
    /// Backend handle for the finished artifact
    pub artifact_handle: Option<String>,
    pub error: Option<String>,
    /// Progress percentage (0-100) when the backend reports one
    pub progress: Option<u8>,
    pub duration_secs: Option<f64>,
    pub size: Option<String>,
}

impl JobPoll {
    pub fn pending(progress: Option<u8>) -> Self {
        JobPoll {
            status: RemoteJobStatus::Pending,
            artifact_handle: None,
            error: None,
            progress,
            duration_secs: None,
            size: None,
        }
    }

    pub fn completed(artifact_handle: impl Into<String>) -> Self {
        JobPoll {
            status: RemoteJobStatus::Completed,
            artifact_handle: Some(artifact_handle.into()),
            error: None,
            progress: Some(100),
            duration_secs: None,
            size: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        JobPoll {
            status: RemoteJobStatus::Failed,
            artifact_handle: None,
            error: Some(reason.into()),
            progress: None,
            duration_secs: None,
            size: None,
        }
    }
}

/// Raw artifact bytes served by a backend's delivery endpoint
#[derive(Debug, Clone)]
pub struct ArtifactPayload {
    pub bytes: Bytes,
    pub content_type: String,
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Synchronous image synthesis backend
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Provider code (e.g., "openai")
    fn code(&self) -> &'static str;

    /// Model identifier recorded in provenance
    fn model(&self) -> &str;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    /// Text-to-image generation
    async fn synthesize_from_text(
        &self,
        instruction: &str,
        size: Size,
        quality: Quality,
    ) -> ProviderResult<ImagePayload>;

    /// Reference-conditioned (edit-style) generation
    async fn edit_from_reference(
        &self,
        reference: &ImagePayload,
        instruction: &str,
        size: Size,
        quality: Quality,
    ) -> ProviderResult<ImagePayload>;
}

/// Asynchronous (submit + poll) generation backend
#[async_trait]
pub trait JobBackend: Send + Sync {
    fn code(&self) -> &'static str;

    fn model(&self) -> &str;

    fn is_configured(&self) -> bool;

    /// Submit a job and return the backend-assigned job id
    ///
    /// # Arguments
    /// * `duration_hint` - Requested clip length in seconds
    async fn submit_job(
        &self,
        instruction: &str,
        size: Size,
        duration_hint: u32,
    ) -> ProviderResult<String>;

    async fn poll_job(&self, job_id: &str) -> ProviderResult<JobPoll>;

    /// Fetch the finished artifact from the authenticated delivery endpoint
    async fn fetch_artifact(&self, job_id: &str) -> ProviderResult<ArtifactPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_poll_constructors() {
        let done = JobPoll::completed("video_123");
        assert_eq!(done.status, RemoteJobStatus::Completed);
        assert_eq!(done.artifact_handle.as_deref(), Some("video_123"));

        let failed = JobPoll::failed("moderation_blocked");
        assert_eq!(failed.status, RemoteJobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("moderation_blocked"));

        assert_eq!(JobPoll::pending(Some(40)).progress, Some(40));
    }
}
