//! Provenance attached to every generation result

use std::time::Duration;

use chrono::Utc;

use crate::domain::{
    ConfidenceLevel, GenerationResult, GenerationSettings, ImagePayload, Provenance,
    ResolvedMethod, ResultMetadata,
};

const REFERENCE_BASE_CONFIDENCE: f32 = 0.92;
const TEXT_BASE_CONFIDENCE: f32 = 0.75;

/// What the dispatcher knows about one finished backend call
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub method: ResolvedMethod,
    pub provider: String,
    pub model: String,
    pub elapsed: Duration,
    pub fallback_reason: Option<String>,
}

pub struct ProvenanceRecorder;

impl ProvenanceRecorder {
    /// Fidelity estimate for a method, scaled by the analysis confidence
    pub fn confidence(method: ResolvedMethod, profile_confidence: ConfidenceLevel) -> f32 {
        let base = match method {
            ResolvedMethod::ReferenceBased => REFERENCE_BASE_CONFIDENCE,
            ResolvedMethod::TextToImage => TEXT_BASE_CONFIDENCE,
        };
        (base * profile_confidence.weight()).clamp(0.0, 1.0)
    }

    pub fn provenance(record: DispatchRecord, profile_confidence: ConfidenceLevel) -> Provenance {
        Provenance {
            method: record.method,
            provider: record.provider,
            model: record.model,
            confidence: Self::confidence(record.method, profile_confidence),
            reference_image_used: record.method.uses_reference(),
            duration_ms: record.elapsed.as_millis().min(u64::MAX as u128) as u64,
            fallback_reason: record.fallback_reason,
        }
    }

    /// Wrap an image into a complete result
    pub fn record(
        image: ImagePayload,
        prompt: &str,
        record: DispatchRecord,
        profile_confidence: ConfidenceLevel,
        settings: &GenerationSettings,
        variation_index: u32,
    ) -> GenerationResult {
        GenerationResult {
            image,
            prompt: prompt.to_string(),
            source: Self::provenance(record, profile_confidence),
            metadata: ResultMetadata {
                timestamp: Utc::now(),
                size: settings.target_size(),
                variation_index,
                context_preset: settings.context_preset,
                quality: settings.quality,
            },
        }
    }
}
