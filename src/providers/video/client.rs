//! OpenAI-compatible video job backend
//!
//! API Docs: https://platform.openai.com/docs/api-reference/videos

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::VideoSettings;
use crate::domain::Size;
use crate::providers::http_client::{ensure_success, normalize_base_url, RateLimitedClient};
use crate::providers::traits::{ArtifactPayload, JobBackend, JobPoll, ProviderError, ProviderResult};

use super::models::{CreateVideoRequest, VideoJob};

pub struct VideoJobProvider {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl VideoJobProvider {
    pub fn new(settings: &VideoSettings) -> ProviderResult<Self> {
        let client = RateLimitedClient::new(settings.rate_limit, Duration::from_secs(settings.timeout_secs))?;
        debug!(
            model = %settings.model,
            rate_limit_per_minute = client.rate_limit_per_minute(),
            "VideoJobProvider initialized"
        );
        Ok(VideoJobProvider {
            client,
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: normalize_base_url(&settings.base_url)?,
            model: settings.model.clone(),
        })
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("STUDIO_VIDEO__API_KEY is not set".to_string()))
    }

    async fn parse_job(response: reqwest::Response) -> ProviderResult<VideoJob> {
        let text = ensure_success(response).await?.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::ParseError(format!(
                "JSON parse error: {} - Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl JobBackend for VideoJobProvider {
    fn code(&self) -> &'static str {
        "openai-video"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn submit_job(&self, instruction: &str, size: Size, duration_hint: u32) -> ProviderResult<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/videos", self.base_url);
        debug!(url = %url, size = %size, seconds = duration_hint, "Video job submission");

        let body = CreateVideoRequest {
            model: &self.model,
            prompt: instruction,
            seconds: duration_hint.to_string(),
            size: size.to_string(),
        };
        let response = self.client.post(&url).bearer_auth(api_key).json(&body).send().await?;
        Ok(Self::parse_job(response).await?.id)
    }

    async fn poll_job(&self, job_id: &str) -> ProviderResult<JobPoll> {
        let api_key = self.api_key()?;
        let url = format!("{}/videos/{}", self.base_url, job_id);

        let response = self.client.get(&url).bearer_auth(api_key).send().await?;
        Ok(Self::parse_job(response).await?.into_poll())
    }

    async fn fetch_artifact(&self, job_id: &str) -> ProviderResult<ArtifactPayload> {
        let api_key = self.api_key()?;
        let url = format!("{}/videos/{}/content", self.base_url, job_id);
        debug!(url = %url, "Fetching video artifact");

        let response = self.client.get(&url).bearer_auth(api_key).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("video {}", job_id)));
        }
        let response = ensure_success(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = response.bytes().await?;

        Ok(ArtifactPayload { bytes, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_key() {
        let provider = VideoJobProvider::new(&VideoSettings::default()).unwrap();
        assert!(!provider.is_configured());
        assert_eq!(provider.model(), "sora-2");
    }

    #[tokio::test]
    async fn test_submit_without_key_is_not_configured() {
        let provider = VideoJobProvider::new(&VideoSettings::default()).unwrap();
        let err = provider.submit_job("a sofa", Size::new(1280, 720), 8).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
