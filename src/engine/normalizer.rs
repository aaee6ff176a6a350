//! Vision-analysis output → canonical [`ProductProfile`]
//!
//! Analysis payloads come from an LLM and are loosely shaped: keys may be
//! camelCase or snake_case, lists may arrive as comma-separated strings and
//! confidence may be a label or a number. Everything is tolerated except a
//! payload that is not a JSON object.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    ConfidenceLevel, ContextPreset, ContextPrompts, Dimensions, PhotographySpecs, ProductProfile,
    VisualDetails,
};
use crate::error::GenerationError;

const DEFAULT_PRODUCT_TYPE: &str = "furniture";

pub struct ProfileNormalizer;

impl ProfileNormalizer {
    /// Build a profile snapshot from raw analysis output
    ///
    /// When `previous` is given the new snapshot keeps its id and bumps the
    /// version; the previous profile itself is left untouched.
    pub fn normalize(
        raw: &Value,
        previous: Option<&ProductProfile>,
    ) -> Result<ProductProfile, GenerationError> {
        let obj = raw.as_object().ok_or_else(|| {
            GenerationError::Validation("analysis payload must be a JSON object".to_string())
        })?;

        let (id, version) = match previous {
            Some(prev) => (prev.id, prev.version.saturating_add(1)),
            None => (Uuid::new_v4(), 1),
        };

        let product_type = text(obj, &["productType", "product_type", "type", "category"])
            .unwrap_or_else(|| DEFAULT_PRODUCT_TYPE.to_string());

        let profile = ProductProfile {
            id,
            version,
            product_type,
            materials: list(obj, &["materials", "material"]),
            primary_color: text(obj, &["primaryColor", "primary_color", "color", "colour"]),
            style: text(obj, &["style", "designStyle", "design_style"]),
            wall_mounted: flag(obj, &["wallMounted", "wall_mounted", "isWallMounted"]),
            features: list(obj, &["features", "keyFeatures", "key_features"]),
            confidence: confidence(obj),
            dimensions: dimensions(obj),
            prompts: prompts(obj),
            photography_specs: photography_specs(obj),
            visual_details: visual_details(obj),
            analyzed_at: Utc::now(),
        };

        debug!(
            profile_id = %profile.id,
            version = profile.version,
            product_type = %profile.product_type,
            "Normalized product profile"
        );
        Ok(profile)
    }
}

// ============================================================================
// Field extraction
// ============================================================================

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn value_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    lookup(obj, keys).and_then(value_text)
}

fn list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match lookup(obj, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn flag(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    match lookup(obj, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn confidence(obj: &Map<String, Value>) -> ConfidenceLevel {
    match lookup(obj, &["confidence", "confidenceLevel", "confidence_level"]) {
        Some(Value::Number(n)) => confidence_from_score(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(s)) => {
            let label = s.trim();
            if let Ok(score) = label.parse::<f64>() {
                return confidence_from_score(score);
            }
            match label.to_ascii_lowercase().as_str() {
                "high" => ConfidenceLevel::High,
                "low" => ConfidenceLevel::Low,
                _ => ConfidenceLevel::Medium,
            }
        }
        _ => ConfidenceLevel::default(),
    }
}

fn confidence_from_score(score: f64) -> ConfidenceLevel {
    if score >= 0.8 {
        ConfidenceLevel::High
    } else if score >= 0.5 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    match lookup(obj, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn dimensions(obj: &Map<String, Value>) -> Dimensions {
    match lookup(obj, &["dimensions", "estimatedDimensions", "estimated_dimensions"]) {
        Some(Value::Object(dims)) => Dimensions {
            width: number(dims, &["width", "w"]),
            height: number(dims, &["height", "h"]),
            depth: number(dims, &["depth", "d"]),
            unit: text(dims, &["unit", "units"]),
            description: text(dims, &["description", "estimate"]),
        },
        Some(other) => Dimensions {
            description: value_text(other),
            ..Dimensions::default()
        },
        None => Dimensions::default(),
    }
}

/// Prompts may be nested or spread across the top level
fn prompts(obj: &Map<String, Value>) -> ContextPrompts {
    let source = match lookup(obj, &["prompts", "contextPrompts", "context_prompts"]) {
        Some(Value::Object(nested)) => nested,
        _ => obj,
    };

    let mut prompts = ContextPrompts {
        base_description: text(source, &["baseDescription", "base_description", "description"])
            .unwrap_or_default(),
        ..ContextPrompts::default()
    };

    for preset in ContextPreset::ALL {
        let camel = format!("{}Prompt", preset.as_str());
        let snake = format!("{}_prompt", preset.as_str());
        if let Some(fragment) = text(source, &[preset.as_str(), camel.as_str(), snake.as_str()]) {
            prompts.set(preset, fragment);
        }
    }
    prompts
}

fn photography_specs(obj: &Map<String, Value>) -> PhotographySpecs {
    let Some(Value::Object(specs)) = lookup(obj, &["photographySpecs", "photography_specs"]) else {
        return PhotographySpecs::default();
    };
    PhotographySpecs {
        camera_angle: text(specs, &["cameraAngle", "camera_angle"]),
        lighting_setup: text(specs, &["lightingSetup", "lighting_setup", "lighting"]),
        depth_of_field: text(specs, &["depthOfField", "depth_of_field"]),
        composition: text(specs, &["composition"]),
    }
}

fn visual_details(obj: &Map<String, Value>) -> VisualDetails {
    let Some(Value::Object(details)) = lookup(obj, &["visualDetails", "visual_details"]) else {
        return VisualDetails::default();
    };
    VisualDetails {
        material_details: text(details, &["materialDetails", "material_details", "materials"]),
        color_details: text(details, &["colorDetails", "color_details", "colors"]),
        construction_details: text(
            details,
            &["constructionDetails", "construction_details", "construction"],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_normalize_camel_case_payload() {
        let raw = json!({
            "productType": "sofa",
            "materials": ["velvet", "oak"],
            "primaryColor": "emerald green",
            "style": "art deco",
            "wallMounted": false,
            "features": "channel tufting, brass feet",
            "confidence": 0.86,
            "dimensions": {"width": 210, "height": "85", "depth": 90, "unit": "cm"},
            "contextPrompts": {
                "baseDescription": "An emerald velvet sofa",
                "hero": "Dramatic gallery setting"
            },
            "photographySpecs": {"cameraAngle": "low three-quarter"},
            "visualDetails": {"materialDetails": "crushed velvet with visible pile"}
        });

        let profile = ProfileNormalizer::normalize(&raw, None).unwrap();
        assert_eq!(profile.product_type, "sofa");
        assert_eq!(profile.version, 1);
        assert_eq!(profile.materials, vec!["velvet", "oak"]);
        assert_eq!(profile.features, vec!["channel tufting", "brass feet"]);
        assert_eq!(profile.confidence, ConfidenceLevel::High);
        assert_eq!(profile.dimensions.width, Some(210.0));
        assert_eq!(profile.dimensions.height, Some(85.0));
        assert_eq!(profile.prompts.base_description, "An emerald velvet sofa");
        assert_eq!(profile.prompts.for_preset(ContextPreset::Hero), Some("Dramatic gallery setting"));
        assert_eq!(profile.photography_specs.camera_angle.as_deref(), Some("low three-quarter"));
        assert_eq!(
            profile.visual_details.material_details.as_deref(),
            Some("crushed velvet with visible pile")
        );
    }

    #[test]
    fn test_normalize_snake_case_and_top_level_prompts() {
        let raw = json!({
            "product_type": "shelf",
            "material": "pine",
            "wall_mounted": "yes",
            "confidence": "LOW",
            "dimensions": "roughly 80cm wide",
            "base_description": "A floating pine shelf",
            "packshot_prompt": "On seamless white"
        });

        let profile = ProfileNormalizer::normalize(&raw, None).unwrap();
        assert_eq!(profile.materials, vec!["pine"]);
        assert!(profile.wall_mounted);
        assert_eq!(profile.confidence, ConfidenceLevel::Low);
        assert_eq!(profile.dimensions.description.as_deref(), Some("roughly 80cm wide"));
        assert_eq!(profile.prompts.base_description, "A floating pine shelf");
        assert_eq!(profile.prompts.for_preset(ContextPreset::Packshot), Some("On seamless white"));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let profile = ProfileNormalizer::normalize(&json!({}), None).unwrap();
        assert_eq!(profile.product_type, "furniture");
        assert!(profile.materials.is_empty());
        assert_eq!(profile.confidence, ConfidenceLevel::Medium);
        assert!(profile.dimensions.is_empty());
    }

    #[test]
    fn test_reanalysis_bumps_version_and_keeps_id() {
        let first = ProfileNormalizer::normalize(&json!({"productType": "stool"}), None).unwrap();
        let second =
            ProfileNormalizer::normalize(&json!({"productType": "bar stool"}), Some(&first)).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.version, 2);
        assert_eq!(first.product_type, "stool");
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = ProfileNormalizer::normalize(&json!(["sofa"]), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_numeric_string_confidence_is_scored() {
        let confidence = |raw: Value| ProfileNormalizer::normalize(&json!({"confidence": raw}), None).unwrap().confidence;
        assert_eq!(confidence(json!("0.9")), ConfidenceLevel::High);
        assert_eq!(confidence(json!(" 0.3 ")), ConfidenceLevel::Low);
        assert_eq!(confidence(json!("0.6")), ConfidenceLevel::Medium);
        assert_eq!(confidence(json!("High")), ConfidenceLevel::High);
    }
}
