//! Per-request generation settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

pub const MIN_VARIATIONS: u32 = 1;
pub const MAX_VARIATIONS: u32 = 4;

/// Intended use/format of a generated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContextPreset {
    Packshot,
    Lifestyle,
    Hero,
    Story,
    Instagram,
    Detail,
}

impl ContextPreset {
    pub const ALL: [ContextPreset; 6] = [
        ContextPreset::Packshot,
        ContextPreset::Lifestyle,
        ContextPreset::Hero,
        ContextPreset::Story,
        ContextPreset::Instagram,
        ContextPreset::Detail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextPreset::Packshot => "packshot",
            ContextPreset::Lifestyle => "lifestyle",
            ContextPreset::Hero => "hero",
            ContextPreset::Story => "story",
            ContextPreset::Instagram => "instagram",
            ContextPreset::Detail => "detail",
        }
    }

    /// Default output size for images in this context
    pub fn default_size(&self) -> Size {
        match self {
            ContextPreset::Packshot | ContextPreset::Instagram | ContextPreset::Detail => {
                Size::new(1024, 1024)
            }
            ContextPreset::Lifestyle | ContextPreset::Hero => Size::new(1536, 1024),
            ContextPreset::Story => Size::new(1024, 1536),
        }
    }

    /// Default frame for video jobs in this context
    pub fn default_video_size(&self) -> Size {
        match self {
            ContextPreset::Story | ContextPreset::Instagram => Size::new(720, 1280),
            _ => Size::new(1280, 720),
        }
    }
}

impl fmt::Display for ContextPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ContextPreset::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unsupported context preset '{}'", s))
    }
}

/// Rendering quality requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

/// Area of the frame kept free for overlay copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextZone {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

impl TextZone {
    pub fn describe(&self) -> &'static str {
        match self {
            TextZone::Top => "top third",
            TextZone::Bottom => "bottom third",
            TextZone::Left => "left third",
            TextZone::Right => "right third",
            TextZone::Center => "center",
        }
    }
}

/// Output dimensions in pixels, serialized as `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| format!("invalid size '{}', expected WIDTHxHEIGHT", s))?;
        let width: u32 = w.trim().parse().map_err(|_| format!("invalid width in '{}'", s))?;
        let height: u32 = h.trim().parse().map_err(|_| format!("invalid height in '{}'", s))?;
        if width == 0 || height == 0 {
            return Err(format!("size '{}' must be non-zero", s));
        }
        Ok(Size { width, height })
    }
}

impl TryFrom<String> for Size {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.to_string()
    }
}

/// Per-request configuration
///
/// Every field except the preset is optional on the wire and has a default,
/// so a partially filled settings object never fails prompt composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerationSettings {
    pub context_preset: ContextPreset,

    /// Requested count; clamped to [1, 4] by [`GenerationSettings::effective_variations`]
    #[serde(default = "default_variations")]
    pub variations: i64,

    #[serde(default)]
    pub quality: Quality,

    #[serde(default)]
    pub background_style: Option<String>,

    #[serde(default)]
    pub lighting: Option<String>,

    #[serde(default)]
    pub product_position: Option<String>,

    #[serde(default)]
    pub reserved_text_zone: Option<TextZone>,

    #[serde(default)]
    pub props: Vec<String>,

    /// Forbid extraneous objects and text in the output
    #[serde(default)]
    pub strict_mode: bool,

    /// Overrides the preset's default size
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "1024x1024")]
    pub size: Option<Size>,
}

fn default_variations() -> i64 {
    1
}

impl GenerationSettings {
    pub fn new(context_preset: ContextPreset) -> Self {
        GenerationSettings {
            context_preset,
            variations: default_variations(),
            quality: Quality::default(),
            background_style: None,
            lighting: None,
            product_position: None,
            reserved_text_zone: None,
            props: Vec::new(),
            strict_mode: false,
            size: None,
        }
    }

    /// Variation count actually generated
    pub fn effective_variations(&self) -> u32 {
        clamp_variations(self.variations)
    }

    pub fn target_size(&self) -> Size {
        self.size.unwrap_or_else(|| self.context_preset.default_size())
    }
}

pub fn clamp_variations(requested: i64) -> u32 {
    requested.clamp(MIN_VARIATIONS as i64, MAX_VARIATIONS as i64) as u32
}
