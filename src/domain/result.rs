//! Generation results and provenance

use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use utoipa::ToSchema;

use crate::error::{ErrorKind, GenerationError};
use super::settings::{ContextPreset, Quality, Size};

/// Strategy declared for a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMethod {
    TextToImage,
    ReferenceBased,
    /// Reference-based first, text-to-image on failure
    Hybrid,
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMethod::TextToImage => write!(f, "text-to-image"),
            GenerationMethod::ReferenceBased => write!(f, "reference-based"),
            GenerationMethod::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// A method that can actually be dispatched. There is no hybrid variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedMethod {
    TextToImage,
    ReferenceBased,
}

impl ResolvedMethod {
    pub fn uses_reference(&self) -> bool {
        matches!(self, ResolvedMethod::ReferenceBased)
    }
}

impl From<ResolvedMethod> for GenerationMethod {
    fn from(method: ResolvedMethod) -> Self {
        match method {
            ResolvedMethod::TextToImage => GenerationMethod::TextToImage,
            ResolvedMethod::ReferenceBased => GenerationMethod::ReferenceBased,
        }
    }
}

impl fmt::Display for ResolvedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        GenerationMethod::from(*self).fmt(f)
    }
}

/// Encoded image bytes plus their MIME type
///
/// Serialized as a `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        ImagePayload {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Decode and validate an uploaded image given as base64 or a data URL
    pub fn from_base64(input: &str) -> Result<Self, GenerationError> {
        let encoded = match input.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => input,
        };
        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| GenerationError::Validation(format!("reference image is not valid base64: {}", e)))?;
        Self::from_bytes(Bytes::from(raw))
    }

    /// Sniff the format from magic bytes; rejects anything that is not an image
    pub fn from_bytes(bytes: Bytes) -> Result<Self, GenerationError> {
        if bytes.is_empty() {
            return Err(GenerationError::Validation("reference image is empty".to_string()));
        }
        let format = image::guess_format(&bytes).map_err(|_| {
            GenerationError::Validation("reference image format not recognised".to_string())
        })?;
        let mime_type = match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            image::ImageFormat::WebP => "image/webp",
            image::ImageFormat::Gif => "image/gif",
            other => {
                return Err(GenerationError::Validation(format!(
                    "unsupported reference image format: {:?}",
                    other
                )))
            }
        };
        Ok(ImagePayload::new(bytes, mime_type))
    }

    /// File extension matching the MIME type, used for multipart uploads
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl Serialize for ImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

/// How a result was produced
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Provenance {
    pub method: ResolvedMethod,
    pub provider: String,
    pub model: String,
    /// Fidelity estimate in [0, 1]
    pub confidence: f32,
    pub reference_image_used: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResultMetadata {
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = String, example = "1024x1024")]
    pub size: Size,
    /// 1-based, unique within a batch
    pub variation_index: u32,
    pub context_preset: ContextPreset,
    pub quality: Quality,
}

/// One generated image
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationResult {
    /// `data:` URL of the generated image
    #[schema(value_type = String)]
    pub image: ImagePayload,
    pub prompt: String,
    pub source: Provenance,
    pub metadata: ResultMetadata,
}

/// A failed variation, reported next to the successes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VariationError {
    pub variation_index: u32,
    pub kind: ErrorKind,
    pub message: String,
    /// Methods tried, in order
    #[serde(default)]
    pub attempted_methods: Vec<ResolvedMethod>,
}

impl VariationError {
    pub fn new(variation_index: u32, err: &GenerationError, attempted_methods: Vec<ResolvedMethod>) -> Self {
        VariationError {
            variation_index,
            kind: err.kind(),
            message: err.to_string(),
            attempted_methods,
        }
    }
}
