//! Color values, loose color-string parsing, and shadow selection.

use image::Rgba;
use serde::{Deserialize, Serialize};

// ============================================================================
// Color
// ============================================================================

/// An RGBA color as parsed from attribute strings or configuration.
///
/// Channels keep whatever magnitude they were parsed with. Values above 255
/// are only clipped when the color is painted (see [`Color::to_rgba`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Color {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

impl Color {
    /// Opaque white, the connective text color.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    /// Mint green used when an attribute color is absent or malformed.
    pub const MINT: Self = Self::rgba(0, 255, 180, 255);

    /// Orange highlight for the call to action.
    pub const ACCENT: Self = Self::rgba(255, 140, 0, 255);

    /// Dark outline drawn behind light text.
    pub const SHADOW_DARK: Self = Self::rgba(0, 0, 0, 220);

    /// Light outline drawn behind dark text.
    pub const SHADOW_LIGHT: Self = Self::rgba(255, 255, 255, 220);

    pub const fn rgba(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a fully opaque color.
    pub const fn rgb(r: u32, g: u32, b: u32) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Converts to an 8-bit pixel, clipping each channel to 0..=255.
    pub fn to_rgba(self) -> Rgba<u8> {
        let clip = |v: u32| v.min(255) as u8;
        Rgba([clip(self.r), clip(self.g), clip(self.b), clip(self.a)])
    }
}

impl From<[u32; 4]> for Color {
    fn from([r, g, b, a]: [u32; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl From<Color> for [u32; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a loosely formatted color description.
///
/// Every maximal run of ASCII digits is read as one channel. Three runs give
/// an opaque RGB color, four give RGBA. Absent or empty input, any other run
/// count, or a run too large to convert yields `default`. Channels are not
/// range-checked.
///
/// ```
/// use stockcard::{parse_color, Color};
///
/// let d = Color::MINT;
/// assert_eq!(parse_color(Some("rgba(10, 20, 30)"), d), Color::rgb(10, 20, 30));
/// assert_eq!(parse_color(Some("not a color"), d), d);
/// ```
pub fn parse_color(raw: Option<&str>, default: Color) -> Color {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return default;
    };

    let channels: Result<Vec<u32>, _> = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(str::parse::<u32>)
        .collect();

    match channels.as_deref() {
        Ok(&[r, g, b]) => Color::rgb(r, g, b),
        Ok(&[r, g, b, a]) => Color::rgba(r, g, b, a),
        _ => default,
    }
}

// ============================================================================
// Shadow Selection
// ============================================================================

/// Weighted brightness of the first three channels.
pub fn luminance(color: Color) -> f64 {
    0.299 * color.r as f64 + 0.587 * color.g as f64 + 0.114 * color.b as f64
}

/// Picks the outline color with the most contrast against `color`.
///
/// Dark colors (luminance below 128) get a light outline, everything else a
/// dark one. The outline alpha is always 220.
pub fn select_shadow(color: Color) -> Color {
    if luminance(color) < 128.0 {
        Color::SHADOW_LIGHT
    } else {
        Color::SHADOW_DARK
    }
}
