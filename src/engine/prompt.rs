//! Instruction text composition
//!
//! Composition is a pure function of its inputs: the same profile, settings
//! and custom prompt always produce the same instruction. Sections are
//! emitted in a fixed order and every optional input has a default, so a
//! sparse profile or settings object never fails.

use crate::domain::{ContextPreset, GenerationSettings, ProductProfile, Quality};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_CAMERA_ANGLE: &str = "eye-level three-quarter view";
pub const DEFAULT_LIGHTING_SETUP: &str = "soft, diffused studio lighting";
pub const DEFAULT_DEPTH_OF_FIELD: &str = "deep focus with the entire product sharp";
pub const DEFAULT_COMPOSITION: &str = "product centered with balanced negative space";

pub const STRICT_MODE_CLAUSE: &str =
    "Strict mode: no text, labels, watermarks, or unauthorized objects in the image.";

const WALL_MOUNT_CLAUSE: &str =
    "The product is wall-mounted: show it fixed to a wall at a realistic height, never standing on the floor.";

const FIDELITY_CLAUSE: &str =
    "Reproduce the product's exact shape, proportions, materials and color faithfully.";

/// Static context constraint per preset
fn context_clause(preset: ContextPreset) -> &'static str {
    match preset {
        ContextPreset::Packshot => {
            "Context: e-commerce packshot on a clean, seamless background with no distractions or additional objects."
        }
        ContextPreset::Lifestyle => {
            "Context: lifestyle scene in an authentic, lived-in home environment that suits the product's style."
        }
        ContextPreset::Hero => {
            "Context: wide hero banner with a striking, editorial composition and generous space around the product."
        }
        ContextPreset::Story => {
            "Context: vertical 9:16 story frame with the product in the middle band, leaving the top and bottom clear."
        }
        ContextPreset::Instagram => {
            "Context: square social media post, bold and scroll-stopping, with an on-trend interior styling."
        }
        ContextPreset::Detail => {
            "Context: macro close-up highlighting texture, joinery and finish quality."
        }
    }
}

fn quality_descriptor(quality: Quality) -> &'static str {
    match quality {
        Quality::Low => "Quality: quick draft rendering.",
        Quality::Medium => "Quality: professional catalogue photography.",
        Quality::High => "Quality: ultra-detailed, photorealistic, magazine-grade photography.",
    }
}

// ============================================================================
// Composer
// ============================================================================

pub struct PromptComposer;

impl PromptComposer {
    /// Compose the instruction for one request
    ///
    /// `custom_prompt` is appended after every generated section and never
    /// replaces them.
    pub fn compose(
        profile: &ProductProfile,
        settings: &GenerationSettings,
        custom_prompt: Option<&str>,
    ) -> String {
        let preset = settings.context_preset;
        let mut sections: Vec<String> = Vec::new();

        // 1. Base description
        sections.push(base_fragment(profile, preset));
        sections.push(FIDELITY_CLAUSE.to_string());

        // 2. Detail blocks
        sections.extend(detail_blocks(profile));

        // 3. Photography constraints
        let specs = &profile.photography_specs;
        sections.push(format!(
            "Photography: camera angle {}; lighting {}; depth of field {}; composition {}.",
            specs.camera_angle.as_deref().unwrap_or(DEFAULT_CAMERA_ANGLE),
            specs.lighting_setup.as_deref().unwrap_or(DEFAULT_LIGHTING_SETUP),
            specs.depth_of_field.as_deref().unwrap_or(DEFAULT_DEPTH_OF_FIELD),
            specs.composition.as_deref().unwrap_or(DEFAULT_COMPOSITION),
        ));

        // 4. Context constraints
        sections.push(context_clause(preset).to_string());
        if profile.wall_mounted {
            sections.push(WALL_MOUNT_CLAUSE.to_string());
        }

        // 5. Settings overrides
        sections.extend(setting_overrides(settings));

        // 6. Strict mode
        if settings.strict_mode {
            sections.push(STRICT_MODE_CLAUSE.to_string());
        }

        // 7. Custom prompt
        if let Some(custom) = custom_prompt.map(str::trim).filter(|s| !s.is_empty()) {
            sections.push(format!("Additional instructions: {}", custom));
        }

        sections.join("\n\n")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn base_fragment(profile: &ProductProfile, preset: ContextPreset) -> String {
    if let Some(fragment) = profile.prompts.for_preset(preset) {
        return fragment.to_string();
    }
    match non_blank(Some(&profile.prompts.base_description)) {
        Some(base) => base.to_string(),
        None => profile.summary(),
    }
}

fn detail_blocks(profile: &ProductProfile) -> Vec<String> {
    let details = &profile.visual_details;
    let mut blocks = Vec::new();

    match non_blank(details.material_details.as_deref()) {
        Some(materials) => blocks.push(format!("Materials: {}", materials)),
        None if !profile.materials.is_empty() => {
            blocks.push(format!("Materials: {}", profile.materials.join(", ")))
        }
        None => {}
    }

    match non_blank(details.color_details.as_deref()) {
        Some(colors) => blocks.push(format!("Colors: {}", colors)),
        None => {
            if let Some(color) = non_blank(profile.primary_color.as_deref()) {
                blocks.push(format!("Colors: {}", color));
            }
        }
    }

    if let Some(construction) = non_blank(details.construction_details.as_deref()) {
        blocks.push(format!("Construction: {}", construction));
    }
    blocks
}

fn setting_overrides(settings: &GenerationSettings) -> Vec<String> {
    let mut overrides = Vec::new();

    if let Some(background) = non_blank(settings.background_style.as_deref()) {
        overrides.push(format!("Background: {}.", background));
    }
    if let Some(lighting) = non_blank(settings.lighting.as_deref()) {
        overrides.push(format!("Lighting override: {}.", lighting));
    }
    if let Some(position) = non_blank(settings.product_position.as_deref()) {
        overrides.push(format!("Product position: {}.", position));
    }
    if let Some(zone) = settings.reserved_text_zone {
        overrides.push(format!(
            "Keep the {} of the frame empty and uncluttered for text overlay.",
            zone.describe()
        ));
    }
    let props: Vec<&str> = settings
        .props
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if !props.is_empty() {
        overrides.push(format!("Props: {}.", props.join(", ")));
    }
    overrides.push(quality_descriptor(settings.quality).to_string());
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TextZone;

    fn profile() -> ProductProfile {
        let mut profile = ProductProfile::new("dining chair");
        profile.style = Some("scandinavian".into());
        profile.materials = vec!["ash".into(), "paper cord".into()];
        profile.primary_color = Some("natural".into());
        profile
    }

    #[test]
    fn test_compose_is_deterministic() {
        let profile = profile();
        let settings = GenerationSettings::new(ContextPreset::Lifestyle);
        let first = PromptComposer::compose(&profile, &settings, Some("warm evening light"));
        let second = PromptComposer::compose(&profile, &settings, Some("warm evening light"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_strict_mode_toggles_clause() {
        let profile = profile();
        let mut settings = GenerationSettings::new(ContextPreset::Packshot);
        let relaxed = PromptComposer::compose(&profile, &settings, None);
        assert!(!relaxed.contains(STRICT_MODE_CLAUSE));

        settings.strict_mode = true;
        let strict = PromptComposer::compose(&profile, &settings, None);
        assert!(strict.contains("no text, labels, watermarks, or unauthorized objects"));
        assert!(strict.starts_with(&relaxed[..relaxed.find("Quality:").unwrap()]));
    }

    #[test]
    fn test_sparse_profile_uses_defaults() {
        let profile = ProductProfile::new("side table");
        let settings = GenerationSettings::new(ContextPreset::Detail);
        let prompt = PromptComposer::compose(&profile, &settings, None);
        assert!(prompt.starts_with("A side table."));
        assert!(prompt.contains(DEFAULT_CAMERA_ANGLE));
        assert!(prompt.contains(DEFAULT_LIGHTING_SETUP));
        assert!(prompt.contains(DEFAULT_DEPTH_OF_FIELD));
        assert!(prompt.contains(DEFAULT_COMPOSITION));
        assert!(prompt.contains("macro close-up"));
    }

    #[test]
    fn test_context_fragment_preferred_over_base_description() {
        let mut profile = profile();
        profile.prompts.base_description = "A woven chair".into();
        profile.prompts.set(ContextPreset::Hero, "A woven chair under a skylight".into());

        let hero = PromptComposer::compose(&profile, &GenerationSettings::new(ContextPreset::Hero), None);
        assert!(hero.starts_with("A woven chair under a skylight"));

        let story = PromptComposer::compose(&profile, &GenerationSettings::new(ContextPreset::Story), None);
        assert!(story.starts_with("A woven chair\n\n"));
    }

    #[test]
    fn test_sections_are_ordered() {
        let mut profile = profile();
        profile.wall_mounted = true;
        let mut settings = GenerationSettings::new(ContextPreset::Story);
        settings.background_style = Some("terracotta plaster".into());
        settings.reserved_text_zone = Some(TextZone::Top);
        settings.props = vec!["linen runner".into(), " ".into(), "ceramic vase".into()];
        settings.strict_mode = true;

        let prompt = PromptComposer::compose(&profile, &settings, Some("autumn palette"));
        let position = |needle: &str| prompt.find(needle).unwrap_or_else(|| panic!("missing {}", needle));

        assert!(position("Materials: ash, paper cord") < position("Photography:"));
        assert!(position("Photography:") < position("Context: vertical"));
        assert!(position("Context: vertical") < position("wall-mounted"));
        assert!(position("wall-mounted") < position("Background: terracotta plaster"));
        assert!(position("Background:") < position("top third"));
        assert!(position("Props: linen runner, ceramic vase.") < position("Strict mode"));
        assert!(prompt.ends_with("Additional instructions: autumn palette"));
    }

    #[test]
    fn test_blank_custom_prompt_is_ignored() {
        let profile = profile();
        let settings = GenerationSettings::new(ContextPreset::Instagram);
        let prompt = PromptComposer::compose(&profile, &settings, Some("   "));
        assert!(!prompt.contains("Additional instructions"));
    }
}
