//! OpenAI images API request/response models

use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /images/generations`
#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub size: String,
    pub quality: &'a str,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
pub struct ImageDatum {
    #[serde(default)]
    pub b64_json: Option<String>,
}

impl ImagesResponse {
    /// First base64 image in the response
    pub fn first_image(&self) -> Option<&str> {
        self.data.iter().find_map(|d| d.b64_json.as_deref())
    }
}
