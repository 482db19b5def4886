//! Multi-segment text lines: measuring and outlined drawing.
//!
//! A [`Line`] is an ordered list of [`TextSegment`]s drawn left to right,
//! each with its own font and color. [`measure`] and [`draw`] share
//! [`line_geometry`], so the sizes used for layout are exactly the sizes
//! that get painted.

use image::RgbaImage;

use crate::color::{select_shadow, Color};
use crate::font::{CoverageMask, FontHandle, GlyphRun};
use crate::geometry::SizePx;

// ============================================================================
// Segments and Lines
// ============================================================================

/// One run of text in a single font and color.
#[derive(Debug, Clone)]
pub struct TextSegment {
    pub text: String,
    pub font: FontHandle,
    pub color: Color,
}

impl TextSegment {
    pub fn new(text: impl Into<String>, font: FontHandle, color: Color) -> Self {
        Self {
            text: text.into(),
            font,
            color,
        }
    }

    /// Outline color for this segment.
    ///
    /// White text always gets a dark outline; other colors go through
    /// luminance-based selection.
    pub fn shadow_color(&self) -> Color {
        if self.color == Color::WHITE {
            Color::SHADOW_DARK
        } else {
            select_shadow(self.color)
        }
    }
}

/// Segments in reading order.
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub segments: Vec<TextSegment>,
}

impl Line {
    pub fn new(segments: Vec<TextSegment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<TextSegment> for Line {
    fn from_iter<I: IntoIterator<Item = TextSegment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Laid-out segments of a line plus the line's overall size.
#[derive(Debug, Clone)]
pub struct LineGeometry {
    pub size: SizePx,
    runs: Vec<GlyphRun>,
}

/// Lays out every segment of `line`.
///
/// Width is the sum of the segment widths, height the tallest segment.
pub fn line_geometry(line: &Line) -> LineGeometry {
    let runs: Vec<GlyphRun> = line
        .segments
        .iter()
        .map(|segment| segment.font.layout(&segment.text))
        .collect();
    let width = runs.iter().map(|run| run.width).sum();
    let height = runs.iter().map(|run| run.height).max().unwrap_or(0);
    LineGeometry {
        size: SizePx::new(width, height),
        runs,
    }
}

/// Rendered size of `line`. Has no side effects.
pub fn measure(line: &Line) -> SizePx {
    line_geometry(line).size
}

/// Outline thickness for a font of `px` pixels.
pub fn stroke_width(px: u32, min_width: u32, divisor: u32) -> u32 {
    (px / divisor.max(1)).max(min_width)
}

/// Stroke settings passed down from the card configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeStyle {
    pub min_width: u32,
    pub divisor: u32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            min_width: 2,
            divisor: 12,
        }
    }
}

// ============================================================================
// Drawing
// ============================================================================

/// Draws `line` right-aligned onto `target` with its top at `y`.
///
/// The line ends `right_margin` pixels from the right edge. Each segment's
/// glyph mask is spread over every offset within the stroke width and
/// painted once in the outline color, then the glyphs are painted in the
/// segment's own color. Returns the line height.
pub fn draw(
    line: &Line,
    y: i32,
    target: &mut RgbaImage,
    right_margin: u32,
    stroke: StrokeStyle,
) -> u32 {
    let geometry = line_geometry(line);
    let mut x = target.width() as i32 - geometry.size.width as i32 - right_margin as i32;

    for (segment, run) in line.segments.iter().zip(&geometry.runs) {
        let mask = segment.font.rasterize(run);
        let width = stroke_width(segment.font.px(), stroke.min_width, stroke.divisor);

        paint(target, &mask.spread(width), x, y, segment.shadow_color());
        paint(target, &mask, x, y, segment.color);

        x += run.width as i32;
    }

    geometry.size.height
}

/// Paints `mask` in `color` with the run's top-left at (x, y).
///
/// Every channel, alpha included, moves toward the ink by the coverage, so
/// full coverage replaces the pixel outright.
fn paint(target: &mut RgbaImage, mask: &CoverageMask, x: i32, y: i32, color: Color) {
    let ink = color.to_rgba();
    let (width, height) = (target.width() as i32, target.height() as i32);

    for (mx, my, coverage) in mask.covered() {
        let (tx, ty) = (x + mx, y + my);
        if tx < 0 || ty < 0 || tx >= width || ty >= height {
            continue;
        }
        let t = coverage as f32 / 255.0;
        let dst = target.get_pixel_mut(tx as u32, ty as u32);
        for (d, s) in dst.0.iter_mut().zip(ink.0) {
            *d = (*d as f32 + (s as f32 - *d as f32) * t).round() as u8;
        }
    }
}
