//! Pixel geometry used by the layout engine.

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scales the width by `fraction`, truncating toward zero.
    pub fn width_fraction(&self, fraction: f64) -> u32 {
        (self.width as f64 * fraction) as u32
    }

    /// Scales the height by `fraction`, truncating toward zero.
    pub fn height_fraction(&self, fraction: f64) -> u32 {
        (self.height as f64 * fraction) as u32
    }
}

/// A rectangle in pixel coordinates.
///
/// The origin may lie outside the image: text blocks on very small images
/// can start above the top or left of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    /// X offset from the left edge of the image
    pub x: i32,
    /// Y offset from the top edge of the image
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}
