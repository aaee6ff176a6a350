//! Product profile produced by vision analysis
//!
//! A profile is an immutable snapshot. Re-analysing a product yields a new
//! profile with the same `id` and a bumped `version`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::settings::ContextPreset;

/// Confidence the vision model reported for its own analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Multiplier applied to provenance confidence scores
    pub fn weight(&self) -> f32 {
        match self {
            ConfidenceLevel::High => 1.0,
            ConfidenceLevel::Medium => 0.9,
            ConfidenceLevel::Low => 0.75,
        }
    }
}

/// Estimated physical dimensions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub unit: Option<String>,
    /// Free-text estimate when the analysis gave no numbers
    pub description: Option<String>,
}

impl Dimensions {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.depth.is_none()
            && self.description.is_none()
    }
}

/// Photography parameters suggested by the analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct PhotographySpecs {
    pub camera_angle: Option<String>,
    pub lighting_setup: Option<String>,
    pub depth_of_field: Option<String>,
    pub composition: Option<String>,
}

/// Fine-grained visual description used for fidelity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct VisualDetails {
    pub material_details: Option<String>,
    pub color_details: Option<String>,
    pub construction_details: Option<String>,
}

/// Instruction fragments keyed by context
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ContextPrompts {
    pub base_description: String,
    pub packshot: Option<String>,
    pub lifestyle: Option<String>,
    pub hero: Option<String>,
    pub story: Option<String>,
    pub instagram: Option<String>,
    pub detail: Option<String>,
}

impl ContextPrompts {
    /// Preset-specific fragment, or `None` when absent or blank
    pub fn for_preset(&self, preset: ContextPreset) -> Option<&str> {
        let fragment = match preset {
            ContextPreset::Packshot => &self.packshot,
            ContextPreset::Lifestyle => &self.lifestyle,
            ContextPreset::Hero => &self.hero,
            ContextPreset::Story => &self.story,
            ContextPreset::Instagram => &self.instagram,
            ContextPreset::Detail => &self.detail,
        };
        fragment.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, preset: ContextPreset, fragment: String) {
        let slot = match preset {
            ContextPreset::Packshot => &mut self.packshot,
            ContextPreset::Lifestyle => &mut self.lifestyle,
            ContextPreset::Hero => &mut self.hero,
            ContextPreset::Story => &mut self.story,
            ContextPreset::Instagram => &mut self.instagram,
            ContextPreset::Detail => &mut self.detail,
        };
        *slot = Some(fragment);
    }
}

/// Canonical product profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductProfile {
    pub id: Uuid,
    pub version: u32,
    pub product_type: String,
    #[serde(default)]
    pub materials: Vec<String>,
    pub primary_color: Option<String>,
    pub style: Option<String>,
    #[serde(default)]
    pub wall_mounted: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub prompts: ContextPrompts,
    #[serde(default)]
    pub photography_specs: PhotographySpecs,
    #[serde(default)]
    pub visual_details: VisualDetails,
    pub analyzed_at: DateTime<Utc>,
}

impl ProductProfile {
    /// Minimal profile for a product type; everything else defaulted
    pub fn new(product_type: impl Into<String>) -> Self {
        ProductProfile {
            id: Uuid::new_v4(),
            version: 1,
            product_type: product_type.into(),
            materials: Vec::new(),
            primary_color: None,
            style: None,
            wall_mounted: false,
            features: Vec::new(),
            confidence: ConfidenceLevel::default(),
            dimensions: Dimensions::default(),
            prompts: ContextPrompts::default(),
            photography_specs: PhotographySpecs::default(),
            visual_details: VisualDetails::default(),
            analyzed_at: Utc::now(),
        }
    }

    /// One-line description synthesized from the structured fields
    pub fn summary(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(style) = self.style.as_deref() {
            parts.push(style);
        }
        if let Some(color) = self.primary_color.as_deref() {
            parts.push(color);
        }
        parts.push(&self.product_type);
        let mut summary = format!("A {}", parts.join(" "));
        if !self.materials.is_empty() {
            summary.push_str(&format!(" made of {}", self.materials.join(", ")));
        }
        if !self.features.is_empty() {
            summary.push_str(&format!(", featuring {}", self.features.join(", ")));
        }
        summary.push('.');
        summary
    }
}
