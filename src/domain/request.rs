//! Requests accepted by the orchestration core

use crate::error::GenerationError;
use super::profile::ProductProfile;
use super::result::ImagePayload;
use super::settings::{clamp_variations, ContextPreset, GenerationSettings};

/// Single-context generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub profile: ProductProfile,
    pub settings: GenerationSettings,
    pub reference_image: Option<ImagePayload>,
    /// Appended to the composed instruction, never substituted
    pub custom_prompt: Option<String>,
    /// Caller-supplied bound on concurrent variation attempts
    pub concurrency: Option<usize>,
}

impl GenerationRequest {
    pub fn new(profile: ProductProfile, settings: GenerationSettings) -> Self {
        GenerationRequest {
            profile,
            settings,
            reference_image: None,
            custom_prompt: None,
            concurrency: None,
        }
    }

    pub fn with_reference(mut self, reference: ImagePayload) -> Self {
        self.reference_image = Some(reference);
        self
    }
}

/// One `(assetType, variationCount, customPrompt?)` entry of a batch
#[derive(Debug, Clone)]
pub struct AssetBatchItem {
    pub asset_type: String,
    pub variations: i64,
    pub custom_prompt: Option<String>,
}

/// Several asset types generated from one shared source image
#[derive(Debug, Clone)]
pub struct AssetBatchRequest {
    pub profile: ProductProfile,
    /// Shared settings; each item overrides preset and variation count
    pub base_settings: GenerationSettings,
    pub reference_image: Option<ImagePayload>,
    pub items: Vec<AssetBatchItem>,
    pub concurrency: Option<usize>,
}

/// An asset item after validation
#[derive(Debug, Clone)]
pub struct ResolvedAssetItem {
    pub preset: ContextPreset,
    pub settings: GenerationSettings,
    pub custom_prompt: Option<String>,
}

impl AssetBatchRequest {
    /// Reject the whole request before any backend call when an item is invalid
    pub fn resolve_items(&self) -> Result<Vec<ResolvedAssetItem>, GenerationError> {
        if self.items.is_empty() {
            return Err(GenerationError::Validation(
                "batch request must contain at least one asset type".to_string(),
            ));
        }
        self.items
            .iter()
            .map(|item| {
                let preset: ContextPreset = item.asset_type.parse().map_err(|_| {
                    GenerationError::Validation(format!("unsupported asset type '{}'", item.asset_type))
                })?;
                let mut settings = self.base_settings.clone();
                settings.context_preset = preset;
                settings.variations = clamp_variations(item.variations) as i64;
                // A size override only makes sense for the preset it was chosen for
                if self.base_settings.context_preset != preset {
                    settings.size = None;
                }
                Ok(ResolvedAssetItem {
                    preset,
                    settings,
                    custom_prompt: item.custom_prompt.clone(),
                })
            })
            .collect()
    }
}

/// Allowed clip lengths for video jobs, in seconds
pub const VIDEO_DURATIONS: [u32; 3] = [4, 8, 12];
pub const DEFAULT_VIDEO_DURATION: u32 = 8;

/// Asynchronous (video-class) generation request
#[derive(Debug, Clone)]
pub struct AsyncGenerationRequest {
    pub profile: ProductProfile,
    pub settings: GenerationSettings,
    pub custom_prompt: Option<String>,
    pub duration_hint: Option<u32>,
}

impl AsyncGenerationRequest {
    /// Round the requested duration up to the nearest supported clip length
    pub fn effective_duration(&self) -> u32 {
        match self.duration_hint {
            None => DEFAULT_VIDEO_DURATION,
            Some(requested) => VIDEO_DURATIONS
                .into_iter()
                .find(|d| *d >= requested)
                .unwrap_or(VIDEO_DURATIONS[VIDEO_DURATIONS.len() - 1]),
        }
    }
}
