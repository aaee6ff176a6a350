//! OpenAI videos API request/response models

use serde::{Deserialize, Serialize};

use crate::providers::traits::{JobPoll, RemoteJobStatus};

/// Body of `POST /videos`
#[derive(Debug, Serialize)]
pub struct CreateVideoRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// Clip length in seconds, sent as a string
    pub seconds: String,
    pub size: String,
}

/// Video job object returned by create and retrieve
#[derive(Debug, Deserialize)]
pub struct VideoJob {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub seconds: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub error: Option<VideoJobError>,
}

#[derive(Debug, Deserialize)]
pub struct VideoJobError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VideoJob {
    pub fn into_poll(self) -> JobPoll {
        let progress = self.progress.map(|p| p.clamp(0.0, 100.0) as u8);
        match self.status.as_str() {
            "completed" | "succeeded" => JobPoll {
                status: RemoteJobStatus::Completed,
                artifact_handle: Some(self.id),
                error: None,
                progress: Some(100),
                duration_secs: self.seconds.as_deref().and_then(|s| s.parse().ok()),
                size: self.size,
            },
            "failed" | "cancelled" | "expired" => {
                let reason = self
                    .error
                    .and_then(|e| e.message.or(e.code))
                    .unwrap_or_else(|| format!("video job {}", self.status));
                JobPoll::failed(reason)
            }
            // queued, in_progress and anything unknown keep polling
            _ => JobPoll::pending(progress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> JobPoll {
        serde_json::from_str::<VideoJob>(body).unwrap().into_poll()
    }

    #[test]
    fn test_queued_and_in_progress_are_pending() {
        assert_eq!(parse(r#"{"id":"video_1","status":"queued"}"#).status, RemoteJobStatus::Pending);
        let poll = parse(r#"{"id":"video_1","status":"in_progress","progress":42.5}"#);
        assert_eq!(poll.status, RemoteJobStatus::Pending);
        assert_eq!(poll.progress, Some(42));
    }

    #[test]
    fn test_completed_carries_duration_and_size() {
        let poll = parse(r#"{"id":"video_1","status":"completed","seconds":"8","size":"1280x720"}"#);
        assert_eq!(poll.status, RemoteJobStatus::Completed);
        assert_eq!(poll.artifact_handle.as_deref(), Some("video_1"));
        assert_eq!(poll.duration_secs, Some(8.0));
        assert_eq!(poll.size.as_deref(), Some("1280x720"));
    }

    #[test]
    fn test_failed_propagates_reason() {
        let poll = parse(
            r#"{"id":"video_1","status":"failed","error":{"code":"moderation_blocked","message":"Blocked by moderation"}}"#,
        );
        assert_eq!(poll.status, RemoteJobStatus::Failed);
        assert_eq!(poll.error.as_deref(), Some("Blocked by moderation"));

        let poll = parse(r#"{"id":"video_1","status":"failed"}"#);
        assert_eq!(poll.error.as_deref(), Some("video job failed"));
    }
}
