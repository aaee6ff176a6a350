//! Generation method selection
//!
//! The preference table says which strategy a context *wants*; the
//! selection says which strategies will actually be attempted, in order,
//! given whether a reference image is available.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{ContextPreset, GenerationMethod, ResolvedMethod};

/// Immutable preset → preferred method table
#[derive(Debug, Clone)]
pub struct MethodPreferences {
    table: Arc<BTreeMap<ContextPreset, GenerationMethod>>,
}

impl Default for MethodPreferences {
    fn default() -> Self {
        MethodPreferences::new([
            (ContextPreset::Packshot, GenerationMethod::ReferenceBased),
            (ContextPreset::Lifestyle, GenerationMethod::Hybrid),
            (ContextPreset::Hero, GenerationMethod::Hybrid),
            (ContextPreset::Story, GenerationMethod::TextToImage),
            (ContextPreset::Instagram, GenerationMethod::Hybrid),
            (ContextPreset::Detail, GenerationMethod::ReferenceBased),
        ])
    }
}

impl MethodPreferences {
    pub fn new(entries: impl IntoIterator<Item = (ContextPreset, GenerationMethod)>) -> Self {
        MethodPreferences {
            table: Arc::new(entries.into_iter().collect()),
        }
    }

    /// Copy of this table with one preset overridden
    pub fn with(&self, preset: ContextPreset, method: GenerationMethod) -> Self {
        let mut table = (*self.table).clone();
        table.insert(preset, method);
        MethodPreferences { table: Arc::new(table) }
    }

    /// Presets missing from the table prefer text-to-image
    pub fn preferred(&self, preset: ContextPreset) -> GenerationMethod {
        self.table
            .get(&preset)
            .copied()
            .unwrap_or(GenerationMethod::TextToImage)
    }
}

/// Outcome of method selection for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSelection {
    pub preset: ContextPreset,
    pub preferred: GenerationMethod,
    /// Methods to try in order; never empty
    pub attempts: Vec<ResolvedMethod>,
    /// Set when the preferred strategy could not be honoured up front
    pub fallback_reason: Option<String>,
}

impl MethodSelection {
    /// First method that will be attempted
    pub fn method(&self) -> ResolvedMethod {
        self.attempts[0]
    }
}

#[derive(Debug, Clone, Default)]
pub struct MethodSelector {
    preferences: MethodPreferences,
}

impl MethodSelector {
    pub fn new(preferences: MethodPreferences) -> Self {
        Self { preferences }
    }

    pub fn select(&self, preset: ContextPreset, has_reference_image: bool) -> MethodSelection {
        let preferred = self.preferences.preferred(preset);

        let (attempts, fallback_reason) = match (preferred, has_reference_image) {
            (GenerationMethod::TextToImage, _) => (vec![ResolvedMethod::TextToImage], None),
            (GenerationMethod::ReferenceBased, true) => (vec![ResolvedMethod::ReferenceBased], None),
            (GenerationMethod::Hybrid, true) => (
                vec![ResolvedMethod::ReferenceBased, ResolvedMethod::TextToImage],
                None,
            ),
            (GenerationMethod::ReferenceBased | GenerationMethod::Hybrid, false) => (
                vec![ResolvedMethod::TextToImage],
                Some(format!(
                    "'{}' prefers {} but no reference image was provided; using text-to-image.",
                    preset, preferred
                )),
            ),
        };

        MethodSelection {
            preset,
            preferred,
            attempts,
            fallback_reason,
        }
    }
}
