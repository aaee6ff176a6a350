//! OpenAI-compatible image backend
//!
//! Text-to-image goes to `/images/generations`; reference-based generation
//! uploads the source photo to `/images/edits` as multipart form data.
//!
//! API Docs: https://platform.openai.com/docs/api-reference/images

use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiSettings;
use crate::domain::{ImagePayload, Quality, Size};
use crate::providers::http_client::{ensure_success, normalize_base_url, RateLimitedClient};
use crate::providers::traits::{ImageBackend, ProviderError, ProviderResult};

use super::models::{ImageGenerationRequest, ImagesResponse};

pub struct OpenAiImageProvider {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiImageProvider {
    pub fn new(settings: &OpenAiSettings) -> ProviderResult<Self> {
        let client = RateLimitedClient::new(settings.rate_limit, Duration::from_secs(settings.timeout_secs))?;
        debug!(
            model = %settings.image_model,
            rate_limit_per_minute = client.rate_limit_per_minute(),
            "OpenAiImageProvider initialized"
        );
        Ok(OpenAiImageProvider {
            client,
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: normalize_base_url(&settings.base_url)?,
            model: settings.image_model.clone(),
        })
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("STUDIO_OPENAI__API_KEY is not set".to_string()))
    }

    async fn decode(response: reqwest::Response) -> ProviderResult<ImagePayload> {
        let text = ensure_success(response).await?.text().await?;
        let parsed: ImagesResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::ParseError(format!(
                "JSON parse error: {} - Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })?;

        let encoded = parsed
            .first_image()
            .ok_or_else(|| ProviderError::ParseError("response contained no b64_json image".to_string()))?;
        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ProviderError::ParseError(format!("invalid base64 image: {}", e)))?;

        ImagePayload::from_bytes(raw.into())
            .map_err(|e| ProviderError::ParseError(format!("backend returned an unreadable image: {}", e)))
    }
}

#[async_trait]
impl ImageBackend for OpenAiImageProvider {
    fn code(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize_from_text(
        &self,
        instruction: &str,
        size: Size,
        quality: Quality,
    ) -> ProviderResult<ImagePayload> {
        let api_key = self.api_key()?;
        let url = format!("{}/images/generations", self.base_url);
        debug!(url = %url, size = %size, quality = quality.as_str(), "OpenAI image generation request");

        let body = ImageGenerationRequest {
            model: &self.model,
            prompt: instruction,
            n: 1,
            size: size.to_string(),
            quality: quality.as_str(),
        };

        let response = self.client.post(&url).bearer_auth(api_key).json(&body).send().await?;
        Self::decode(response).await
    }

    async fn edit_from_reference(
        &self,
        reference: &ImagePayload,
        instruction: &str,
        size: Size,
        quality: Quality,
    ) -> ProviderResult<ImagePayload> {
        let api_key = self.api_key()?;
        let url = format!("{}/images/edits", self.base_url);
        debug!(url = %url, size = %size, reference_bytes = reference.bytes.len(), "OpenAI image edit request");

        let image = Part::bytes(reference.bytes.to_vec())
            .file_name(format!("reference.{}", reference.extension()))
            .mime_str(&reference.mime_type)
            .map_err(|e| ProviderError::Internal(format!("invalid reference mime type: {}", e)))?;

        let form = Form::new()
            .text("model", self.model.clone())
            .text("prompt", instruction.to_string())
            .text("n", "1")
            .text("size", size.to_string())
            .text("quality", quality.as_str())
            .part("image[]", image);

        let response = self.client.post(&url).bearer_auth(api_key).multipart(form).send().await?;
        Self::decode(response).await
    }
}
