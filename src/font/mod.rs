//! Font faces, sized font handles, and glyph rasterization.
//!
//! A [`FontFace`] is either an outline font loaded from disk or the
//! built-in bitmap fallback. A [`FontHandle`] pairs a face with a pixel
//! size. Text goes through two steps that share one geometry:
//!
//! 1. [`FontHandle::layout`] positions glyphs and yields the run's box.
//! 2. [`FontHandle::rasterize`] turns a laid-out run into a coverage mask.
//!
//! Measuring only needs step 1, so it never allocates a raster.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use ab_glyph::{point, Font, FontArc, FontVec, Glyph, GlyphId, OutlinedGlyph, PxScale, ScaleFont};
use image::{GrayImage, Luma};

use crate::error::{CardError, CardResult};

// ============================================================================
// FontFace
// ============================================================================

/// A loaded typeface, cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct FontFace {
    kind: FaceKind,
}

#[derive(Clone)]
enum FaceKind {
    Outline(FontArc),
    Builtin,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaceKind::Outline(_) => f.write_str("FontFace::Outline"),
            FaceKind::Builtin => f.write_str("FontFace::Builtin"),
        }
    }
}

impl FontFace {
    /// Loads a TrueType/OpenType font file.
    pub fn load(path: &Path) -> CardResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| CardError::font_load(path, e))?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| CardError::font_load(path, e))?;
        Ok(Self {
            kind: FaceKind::Outline(FontArc::new(font)),
        })
    }

    /// The built-in bitmap font. Only ASCII renders faithfully.
    pub fn builtin() -> Self {
        Self {
            kind: FaceKind::Builtin,
        }
    }

    /// Loads `path`, or falls back to the built-in font with a warning.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::load(path) {
            Ok(face) => face,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "using built-in fallback font");
                Self::builtin()
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.kind, FaceKind::Builtin)
    }

    /// Returns a handle for this face at `px` pixels (at least 1).
    pub fn at_size(&self, px: u32) -> FontHandle {
        FontHandle {
            face: self.clone(),
            px: px.max(1),
        }
    }
}

// ============================================================================
// FontCache
// ============================================================================

/// Lazily populated map from font path to loaded face.
///
/// Faces never change once inserted, so concurrent renders only contend on
/// the first load of each path. A path that fails to load caches the
/// built-in face, which keeps the warning to one per path.
#[derive(Debug, Default)]
pub struct FontCache {
    faces: RwLock<HashMap<PathBuf, FontFace>>,
    warned_unset: AtomicBool,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the face for `path`, loading it on first use.
    ///
    /// `None` resolves to the built-in face without touching the cache and
    /// warns once per cache.
    pub fn face(&self, path: Option<&Path>) -> FontFace {
        let Some(path) = path else {
            if !self.warned_unset.swap(true, Ordering::Relaxed) {
                tracing::warn!("no font path configured, using built-in fallback font");
            }
            return FontFace::builtin();
        };

        if let Some(face) = self
            .faces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return face.clone();
        }

        let loaded = FontFace::load_or_builtin(Some(path));
        self.faces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_insert(loaded)
            .clone()
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.faces.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// FontHandle
// ============================================================================

/// A face at a fixed pixel size.
#[derive(Debug, Clone)]
pub struct FontHandle {
    face: FontFace,
    px: u32,
}

/// Glyphs of one text run, positioned relative to the run's top-left.
///
/// The box is the advance width by the ascent-to-descent height; the ascent
/// line sits at y = 0.
#[derive(Debug, Clone, Default)]
pub struct GlyphRun {
    pub width: u32,
    pub height: u32,
    glyphs: Vec<PlacedGlyph>,
}

#[derive(Debug, Clone)]
enum PlacedGlyph {
    Outline(Glyph),
    Cell { ch: char, x: f32 },
}

impl GlyphRun {
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl FontHandle {
    /// Pixel size of the handle.
    pub fn px(&self) -> u32 {
        self.px
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    /// Positions the glyphs of `text`. Control characters are skipped and
    /// text without glyphs measures 0 x 0.
    pub fn layout(&self, text: &str) -> GlyphRun {
        let run = match &self.face.kind {
            FaceKind::Outline(font) => layout_outline(font, self.px, text),
            FaceKind::Builtin => layout_builtin(self.px, text),
        };
        if run.glyphs.is_empty() {
            GlyphRun::default()
        } else {
            run
        }
    }

    /// Rasterizes a run produced by [`layout`](Self::layout) on this handle.
    pub fn rasterize(&self, run: &GlyphRun) -> CoverageMask {
        match &self.face.kind {
            FaceKind::Outline(font) => rasterize_outline(font, run),
            FaceKind::Builtin => rasterize_builtin(self.px, run),
        }
    }
}

fn layout_outline(font: &FontArc, px: u32, text: &str) -> GlyphRun {
    let scale = PxScale::from(px as f32);
    let scaled = font.as_scaled(scale);
    let ascent = scaled.ascent();

    let mut glyphs = Vec::new();
    let mut caret = 0.0f32;
    let mut previous: Option<GlyphId> = None;
    for ch in text.chars().filter(|c| !c.is_control()) {
        let id = scaled.glyph_id(ch);
        if let Some(previous) = previous {
            caret += scaled.kern(previous, id);
        }
        glyphs.push(PlacedGlyph::Outline(
            id.with_scale_and_position(scale, point(caret, ascent)),
        ));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    GlyphRun {
        width: caret.max(0.0).ceil() as u32,
        height: (ascent - scaled.descent()).max(0.0).ceil() as u32,
        glyphs,
    }
}

fn layout_builtin(px: u32, text: &str) -> GlyphRun {
    let advance = cell_unit(px) * builtin::CELL_COLUMNS as f32;
    let glyphs: Vec<_> = text
        .chars()
        .filter(|c| !c.is_control())
        .enumerate()
        .map(|(i, ch)| PlacedGlyph::Cell {
            ch,
            x: i as f32 * advance,
        })
        .collect();

    GlyphRun {
        width: (glyphs.len() as f32 * advance).ceil() as u32,
        height: px,
        glyphs,
    }
}

fn cell_unit(px: u32) -> f32 {
    px as f32 / builtin::CELL_ROWS as f32
}

// ============================================================================
// CoverageMask
// ============================================================================

/// 8-bit glyph coverage for one run.
///
/// `left`/`top` place the mask relative to the run's top-left; outline
/// glyphs may overhang the advance box on either side.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    left: i32,
    top: i32,
    coverage: GrayImage,
}

impl CoverageMask {
    fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            coverage: GrayImage::new(width, height),
        }
    }

    fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Records coverage at run coordinates, keeping the maximum where
    /// glyphs overlap.
    fn accumulate(&mut self, x: i32, y: i32, value: u8) {
        let mx = x - self.left;
        let my = y - self.top;
        if mx < 0 || my < 0 {
            return;
        }
        let (mx, my) = (mx as u32, my as u32);
        if mx >= self.coverage.width() || my >= self.coverage.height() {
            return;
        }
        let pixel = self.coverage.get_pixel_mut(mx, my);
        pixel.0[0] = pixel.0[0].max(value);
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> u32 {
        self.coverage.width()
    }

    pub fn height(&self) -> u32 {
        self.coverage.height()
    }

    /// Iterates covered pixels as `(x, y, coverage)` in run coordinates.
    pub fn covered(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        self.coverage
            .enumerate_pixels()
            .filter(|(_, _, Luma([c]))| *c > 0)
            .map(|(x, y, Luma([c]))| (self.left + x as i32, self.top + y as i32, *c))
    }

    pub fn is_blank(&self) -> bool {
        self.covered().next().is_none()
    }

    /// Union of this mask shifted by every offset in `[-radius, radius]²`
    /// except `(0, 0)`, keeping the maximum coverage.
    pub fn spread(&self, radius: u32) -> CoverageMask {
        let r = radius as i32;
        let mut out = CoverageMask::new(
            self.left - r,
            self.top - r,
            self.width() + 2 * radius,
            self.height() + 2 * radius,
        );
        for (x, y, c) in self.covered() {
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    out.accumulate(x + dx, y + dy, c);
                }
            }
        }
        out
    }
}

fn rasterize_outline(font: &FontArc, run: &GlyphRun) -> CoverageMask {
    let outlined: Vec<OutlinedGlyph> = run
        .glyphs
        .iter()
        .filter_map(|glyph| match glyph {
            PlacedGlyph::Outline(g) => font.outline_glyph(g.clone()),
            PlacedGlyph::Cell { .. } => None,
        })
        .collect();

    let Some(first) = outlined.first() else {
        return CoverageMask::empty();
    };
    let mut bounds = first.px_bounds();
    for glyph in &outlined[1..] {
        let b = glyph.px_bounds();
        bounds.min.x = bounds.min.x.min(b.min.x);
        bounds.min.y = bounds.min.y.min(b.min.y);
        bounds.max.x = bounds.max.x.max(b.max.x);
        bounds.max.y = bounds.max.y.max(b.max.y);
    }

    let left = bounds.min.x.floor() as i32;
    let top = bounds.min.y.floor() as i32;
    let width = (bounds.max.x.ceil() as i32 - left).max(0) as u32;
    let height = (bounds.max.y.ceil() as i32 - top).max(0) as u32;
    let mut mask = CoverageMask::new(left, top, width, height);

    for glyph in &outlined {
        let b = glyph.px_bounds();
        let (gx, gy) = (b.min.x as i32, b.min.y as i32);
        glyph.draw(|x, y, c| {
            let value = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            mask.accumulate(gx + x as i32, gy + y as i32, value);
        });
    }
    mask
}

fn rasterize_builtin(px: u32, run: &GlyphRun) -> CoverageMask {
    let unit = cell_unit(px);
    let mut mask = CoverageMask::new(0, 0, run.width, run.height);

    for glyph in &run.glyphs {
        let PlacedGlyph::Cell { ch, x } = *glyph else {
            continue;
        };
        for (col, row) in builtin::lit_cells(ch) {
            let x0 = (x + col as f32 * unit).round() as i32;
            let x1 = ((x + (col + 1) as f32 * unit).round() as i32).max(x0 + 1);
            let y0 = (row as f32 * unit).round() as i32;
            let y1 = (((row + 1) as f32 * unit).round() as i32).max(y0 + 1);
            for py in y0..y1 {
                for px in x0..x1 {
                    mask.accumulate(px, py, u8::MAX);
                }
            }
        }
    }
    mask
}

/// DejaVu Sans, shipped for tests that need a real outline face.
#[cfg(test)]
pub(crate) const TEST_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/DejaVuSans.ttf");

#[cfg(test)]
mod tests {
    use super::*;

    fn dejavu() -> FontFace {
        FontFace::load(Path::new(TEST_FONT)).unwrap()
    }

    #[test]
    fn builtin_run_box() {
        let handle = FontFace::builtin().at_size(16);
        let run = handle.layout("AB C");
        // 4 cells of 6 units, 2 px per unit.
        assert_eq!(run.width, 48);
        assert_eq!(run.height, 16);
    }

    #[test]
    fn empty_text_measures_zero() {
        let handle = FontFace::builtin().at_size(16);
        let run = handle.layout("");
        assert_eq!((run.width, run.height), (0, 0));
        assert!(run.is_empty());
        assert!(handle.rasterize(&run).is_blank());

        let run = handle.layout("\n\t");
        assert_eq!((run.width, run.height), (0, 0));
    }

    #[test]
    fn layout_is_repeatable() {
        let handle = FontFace::builtin().at_size(37);
        let a = handle.layout("TSLA 1.0");
        let b = handle.layout("TSLA 1.0");
        assert_eq!((a.width, a.height), (b.width, b.height));
    }

    #[test]
    fn builtin_rasterizes_within_run_box() {
        let handle = FontFace::builtin().at_size(16);
        let run = handle.layout("L");
        let mask = handle.rasterize(&run);
        assert!(!mask.is_blank());
        for (x, y, c) in mask.covered() {
            assert!(x >= 0 && (x as u32) < run.width);
            assert!(y >= 0 && (y as u32) < run.height);
            assert_eq!(c, u8::MAX);
        }
        // Top-left cell of 'L' is lit, top-right is not.
        assert!(mask.covered().any(|(x, y, _)| x == 0 && y == 0));
        assert!(!mask.covered().any(|(x, y, _)| x == 9 && y == 0));
    }

    #[test]
    fn tiny_sizes_still_cover_pixels() {
        let handle = FontFace::builtin().at_size(0);
        assert_eq!(handle.px(), 1);
        let mask = handle.rasterize(&handle.layout("I"));
        assert!(!mask.is_blank());
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let err = FontFace::load(Path::new("/nonexistent/stockcard/font.ttf")).unwrap_err();
        assert!(matches!(err, CardError::FontLoad { .. }));
    }

    #[test]
    fn invalid_font_bytes_are_an_error() {
        let path = std::env::temp_dir().join(format!("stockcard-bad-font-{}.ttf", std::process::id()));
        std::fs::write(&path, b"definitely not a font").unwrap();
        let result = FontFace::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(CardError::FontLoad { .. })));
    }

    #[test]
    fn missing_font_falls_back_to_builtin() {
        let face = FontFace::load_or_builtin(Some(Path::new("/nonexistent/stockcard/font.ttf")));
        assert!(face.is_builtin());
        assert!(FontFace::load_or_builtin(None).is_builtin());
    }

    #[test]
    fn cache_remembers_fallbacks() {
        let cache = FontCache::new();
        assert!(cache.face(None).is_builtin());
        assert!(cache.is_empty());

        let path = Path::new("/nonexistent/stockcard/font.ttf");
        assert!(cache.face(Some(path)).is_builtin());
        assert!(cache.face(Some(path)).is_builtin());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unset_font_path_warns_once() {
        let cache = FontCache::new();
        assert!(!cache.warned_unset.load(Ordering::Relaxed));
        assert!(cache.face(None).is_builtin());
        assert!(cache.warned_unset.load(Ordering::Relaxed));
        assert!(cache.face(None).is_builtin());
    }

    #[test]
    fn cache_loads_outline_fonts() {
        let cache = FontCache::new();
        let path = Path::new(TEST_FONT);
        assert!(!cache.face(Some(path)).is_builtin());
        assert!(!cache.face(Some(path)).is_builtin());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn outline_run_box_spans_ascent_to_descent() {
        let handle = dejavu().at_size(32);
        let run = handle.layout("Tesla 1.0");
        assert!(!run.is_empty());
        assert!((32..=33).contains(&run.height), "height {}", run.height);
        assert!(run.width > 9 * 8 && run.width < 9 * 32, "width {}", run.width);

        let again = handle.layout("Tesla 1.0");
        assert_eq!((again.width, again.height), (run.width, run.height));
    }

    #[test]
    fn outline_widths_add_up_with_kerning() {
        let handle = dejavu().at_size(40);
        let pair = handle.layout("AV").width;
        let apart = handle.layout("A").width + handle.layout("V").width;
        assert!(pair <= apart);
        assert!(handle.layout("AVA").width > pair);
    }

    #[test]
    fn outline_mask_sits_inside_the_run_box() {
        let handle = dejavu().at_size(32);
        let run = handle.layout("Tesla 1.0");
        let mask = handle.rasterize(&run);
        assert!(!mask.is_blank());

        // Cap height is below the ascent line.
        assert!(mask.top() > 0);
        for (x, y, _) in mask.covered() {
            assert!(x >= -2 && x < run.width as i32 + 2, "x {x}");
            assert!(y >= 0 && y <= run.height as i32, "y {y}");
        }
        // Antialiased edges give partial coverage.
        assert!(mask.covered().any(|(_, _, c)| c < u8::MAX));
    }

    #[test]
    fn spread_covers_neighbours_but_not_the_origin() {
        let mut mask = CoverageMask::new(0, 0, 1, 1);
        mask.accumulate(0, 0, 200);
        let spread = mask.spread(2);
        assert_eq!(
            (spread.left(), spread.top(), spread.width(), spread.height()),
            (-2, -2, 5, 5)
        );

        let cells: Vec<_> = spread.covered().collect();
        assert_eq!(cells.len(), 24);
        assert!(!cells.iter().any(|&(x, y, _)| x == 0 && y == 0));
        assert!(cells.iter().all(|&(_, _, c)| c == 200));
    }

    #[test]
    fn spread_keeps_maximum_coverage() {
        let mut mask = CoverageMask::new(0, 0, 2, 1);
        mask.accumulate(0, 0, 255);
        mask.accumulate(1, 0, 100);
        let spread = mask.spread(1);

        let at = |x: i32, y: i32| {
            spread
                .covered()
                .find(|&(cx, cy, _)| cx == x && cy == y)
                .map(|(_, _, c)| c)
        };
        assert_eq!(at(-1, 0), Some(255));
        assert_eq!(at(0, 0), Some(100));
        assert_eq!(at(1, 0), Some(255));
        assert_eq!(at(2, 0), Some(100));
        assert_eq!(at(3, 0), None);
    }
}
