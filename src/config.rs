//! Card layout configuration.
//!
//! [`CardConfig`] holds every tunable of the card: font-size fractions,
//! spacing, colors, output quality, and the [`CardScript`] describing which
//! text goes on which line. It serializes to JSON so deployments can tweak
//! wording or proportions without touching layout code.
//!
//! # JSON Format
//!
//! Every field is optional; missing fields keep their defaults.
//!
//! ```json
//! {
//!   "fontPath": "/usr/share/fonts/NanumGothicBold.ttf",
//!   "extraLargeFontFraction": 0.08,
//!   "accentColor": [255, 120, 0, 255]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::CardResult;
use crate::text::StrokeStyle;

// ============================================================================
// Script
// ============================================================================

/// Which of the three card font sizes a segment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum FontRole {
    Small,
    Medium,
    ExtraLarge,
}

/// Which resolved card color a segment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum ColorRole {
    /// Parsed from the record's product color.
    Product,
    /// Parsed from the record's company color.
    Company,
    /// The configured accent color.
    Accent,
    /// The configured connective text color.
    Text,
}

/// One segment of a line template.
///
/// `text` may contain `{product}`, `{identifier}`, `{ticker}`, `{shares}`
/// and `{company}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct SegmentSpec {
    pub text: String,
    pub font: FontRole,
    pub color: ColorRole,
}

impl SegmentSpec {
    pub fn new(text: impl Into<String>, font: FontRole, color: ColorRole) -> Self {
        Self {
            text: text.into(),
            font,
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct LineSpec {
    pub segments: Vec<SegmentSpec>,
}

impl LineSpec {
    pub fn new(segments: Vec<SegmentSpec>) -> Self {
        Self { segments }
    }
}

/// Ordered line templates, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct CardScript {
    pub lines: Vec<LineSpec>,
}

impl Default for CardScript {
    /// Caption, headline, and call to action.
    fn default() -> Self {
        use ColorRole::*;
        use FontRole::*;

        Self {
            lines: vec![
                LineSpec::new(vec![
                    SegmentSpec::new("{product}", Medium, Product),
                    SegmentSpec::new(" 살 돈이면", Small, Text),
                ]),
                LineSpec::new(vec![SegmentSpec::new(
                    "{identifier} {shares}주",
                    ExtraLarge,
                    Company,
                )]),
                LineSpec::new(vec![
                    SegmentSpec::new("주주", Medium, Accent),
                    SegmentSpec::new("가 될 수 있어요!", Small, Text),
                ]),
            ],
        }
    }
}

// ============================================================================
// CardConfig
// ============================================================================

/// All layout and output parameters of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CardConfig {
    /// Outline font to use. `None` selects the built-in fallback font.
    ///
    /// The built-in font only covers ASCII, so the default Korean wording
    /// needs a Hangul-capable font here to render legibly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// Font sizes as fractions of the image width.
    pub small_font_fraction: f64,
    pub medium_font_fraction: f64,
    pub extra_large_font_fraction: f64,

    /// Gap between lines, as a fraction of the image width.
    pub line_gap_fraction: f64,

    /// Vertical center of the text block, as a fraction of the image height.
    pub anchor_fraction: f64,

    /// Distance between line ends and the right edge, as a fraction of the
    /// image width.
    pub right_margin_fraction: f64,

    pub min_stroke_width: u32,
    pub stroke_divisor: u32,

    /// Used when a record color is absent or malformed.
    pub default_color: Color,
    pub accent_color: Color,
    pub text_color: Color,

    pub jpeg_quality: u8,

    /// Side length of the canvas substituted for undecodable photos.
    pub blank_canvas_size: u32,
    pub blank_canvas_color: Color,

    pub script: CardScript,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            small_font_fraction: 0.04,
            medium_font_fraction: 0.05,
            extra_large_font_fraction: 0.075,
            line_gap_fraction: 0.01,
            anchor_fraction: 0.6,
            right_margin_fraction: 0.10,
            min_stroke_width: 2,
            stroke_divisor: 12,
            default_color: Color::MINT,
            accent_color: Color::ACCENT,
            text_color: Color::WHITE,
            jpeg_quality: 95,
            blank_canvas_size: 1024,
            blank_canvas_color: Color::WHITE,
            script: CardScript::default(),
        }
    }
}

impl CardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outline font path.
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Replaces the line script.
    pub fn with_script(mut self, script: CardScript) -> Self {
        self.script = script;
        self
    }

    pub fn font_fraction(&self, role: FontRole) -> f64 {
        match role {
            FontRole::Small => self.small_font_fraction,
            FontRole::Medium => self.medium_font_fraction,
            FontRole::ExtraLarge => self.extra_large_font_fraction,
        }
    }

    pub fn stroke(&self) -> StrokeStyle {
        StrokeStyle {
            min_width: self.min_stroke_width,
            divisor: self.stroke_divisor,
        }
    }

    /// Serializes the config to a JSON string.
    pub fn to_json(&self) -> CardResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the config to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> CardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a config from a JSON string.
    pub fn from_json(json: &str) -> CardResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file.
    pub fn from_path(path: &Path) -> CardResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
