//! Card compositing: photo in, JPEG out.
//!
//! [`Compositor::composite`] decodes the photo (or substitutes a blank
//! canvas), renders the text overlay, blends it over the photo, drops the
//! alpha channel, and encodes a JPEG. Only the final encode can fail.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbImage, RgbaImage};

use crate::config::CardConfig;
use crate::error::{CardError, CardResult};
use crate::font::FontCache;
use crate::geometry::SizePx;
use crate::layout::CardLayout;
use crate::record::AttributeRecord;

// ============================================================================
// Compositor
// ============================================================================

/// Renders stock cards with a fixed configuration.
///
/// Holds a font cache, so one instance can be shared across threads and
/// requests; every call is otherwise independent.
#[derive(Debug, Default)]
pub struct Compositor {
    config: CardConfig,
    fonts: FontCache,
}

impl Compositor {
    pub fn new(config: CardConfig) -> Self {
        Self {
            config,
            fonts: FontCache::new(),
        }
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Renders the card and encodes it as JPEG.
    #[tracing::instrument(skip_all, fields(photo_len = photo.len(), ticker = %record.ticker))]
    pub fn composite(&self, photo: &[u8], record: &AttributeRecord) -> CardResult<Vec<u8>> {
        let card = self.render(photo, record);
        encode_jpeg(&card, self.config.jpeg_quality)
    }

    /// Renders the flattened card without encoding it.
    pub fn render(&self, photo: &[u8], record: &AttributeRecord) -> RgbImage {
        let mut base = self.decode_or_blank(photo);
        let size = SizePx::new(base.width(), base.height());

        let face = self.fonts.face(self.config.font_path.as_deref());
        let overlay = CardLayout::new(&self.config, face).render(size, record);
        composite_over(&mut base, &overlay, 0, 0);

        flatten(base)
    }

    /// Decodes `photo` to RGBA, or returns the configured blank canvas.
    pub fn decode_or_blank(&self, photo: &[u8]) -> RgbaImage {
        match image::load_from_memory(photo) {
            Ok(img) if img.width() > 0 && img.height() > 0 => img.to_rgba8(),
            Ok(_) => {
                tracing::warn!("photo has no pixels, using blank canvas");
                self.blank_canvas()
            }
            Err(err) => {
                tracing::warn!(len = photo.len(), error = %err, "photo could not be decoded, using blank canvas");
                self.blank_canvas()
            }
        }
    }

    fn blank_canvas(&self) -> RgbaImage {
        let side = self.config.blank_canvas_size.max(1);
        RgbaImage::from_pixel(side, side, self.config.blank_canvas_color.to_rgba())
    }
}

/// Composites a card with the default configuration.
pub fn composite(photo: &[u8], record: &AttributeRecord) -> CardResult<Vec<u8>> {
    Compositor::default().composite(photo, record)
}

// ============================================================================
// Output
// ============================================================================

/// Drops the alpha channel.
pub fn flatten(image: RgbaImage) -> RgbImage {
    DynamicImage::ImageRgba8(image).to_rgb8()
}

/// Encodes an RGB image as JPEG. Quality is clamped to 1..=100.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> CardResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(CardError::Encode)?;
    Ok(bytes.into_inner())
}

// ============================================================================
// Compositing
// ============================================================================

/// Composites a source image onto a destination image at the specified position.
///
/// Uses standard alpha blending (source over destination).
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        if src_pixel[3] == 0 {
            continue;
        }
        let dx = x + sx as i32;
        let dy = y + sy as i32;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }

        let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst_pixel = blend_pixel(*src_pixel, *dst_pixel);
    }
}

/// Alpha blends two straight-alpha RGBA pixels (source over destination).
fn blend_pixel(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn sample_record() -> AttributeRecord {
        AttributeRecord::new("테스트", "ABC", "1.0", "회사").with_company_color("(10,10,10,255)")
    }

    #[test]
    fn undecodable_photo_yields_blank_card() {
        let jpeg = composite(b"definitely not an image", &sample_record()).unwrap();
        assert!(!jpeg.is_empty());
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1024, 1024));
    }

    #[test]
    fn valid_photo_keeps_its_dimensions() {
        let photo = png_bytes(512, 512, [90, 120, 150]);
        let jpeg = composite(&photo, &sample_record()).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (512, 512));
    }

    #[test]
    fn non_square_photo_keeps_its_dimensions() {
        let photo = png_bytes(320, 180, [0, 0, 0]);
        let card = Compositor::default().render(&photo, &sample_record());
        assert_eq!(card.dimensions(), (320, 180));
    }

    #[test]
    fn blank_canvas_is_configurable() {
        let mut config = CardConfig::default();
        config.blank_canvas_size = 64;
        config.blank_canvas_color = crate::Color::rgb(0, 0, 255);
        let card = Compositor::new(config).render(&[], &sample_record());
        assert_eq!(card.dimensions(), (64, 64));
        assert_eq!(*card.get_pixel(0, 0), Rgb([0, 0, 255]));
    }

    #[test]
    fn text_is_drawn_over_the_photo() {
        let photo = png_bytes(400, 400, [90, 120, 150]);
        let card = Compositor::default().render(&photo, &sample_record());

        // Corners are untouched, the text block is not.
        assert_eq!(*card.get_pixel(0, 0), Rgb([90, 120, 150]));
        assert!(card.pixels().any(|p| *p != Rgb([90, 120, 150])));
    }

    #[test]
    fn missing_font_still_renders() {
        let config = CardConfig::default().with_font_path("/nonexistent/stockcard/font.ttf");
        let photo = png_bytes(128, 128, [255, 255, 255]);
        let jpeg = Compositor::new(config).composite(&photo, &sample_record()).unwrap();
        assert!(!jpeg.is_empty());
    }

    #[test]
    fn outline_font_renders_the_card() {
        let config = CardConfig::default().with_font_path(crate::font::TEST_FONT);
        let compositor = Compositor::new(config);
        let photo = png_bytes(512, 512, [90, 120, 150]);
        let card = compositor.render(&photo, &sample_record());

        assert_eq!(card.dimensions(), (512, 512));
        assert!(!compositor.fonts.face(compositor.config.font_path.as_deref()).is_builtin());
        let changed = card.pixels().filter(|p| **p != Rgb([90, 120, 150])).count();
        assert!(changed > 1000, "only {changed} pixels changed");
        // The right margin stays clear.
        assert!((470..512).all(|x| (0..512).all(|y| *card.get_pixel(x, y) == Rgb([90, 120, 150]))));

        let jpeg = compositor.composite(&photo, &sample_record()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (512, 512));
    }

    #[test]
    fn compositor_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compositor>();

        let compositor = Compositor::new(CardConfig::default().with_font_path("/nonexistent/font.ttf"));
        let photo = png_bytes(96, 96, [10, 200, 30]);
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| compositor.composite(&photo, &sample_record())))
                .collect();
            for handle in handles {
                assert!(!handle.join().unwrap().unwrap().is_empty());
            }
        });
    }

    #[test]
    fn flatten_drops_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]));
        let flat = flatten(img);
        assert_eq!(*flat.get_pixel(1, 1), Rgb([10, 20, 30]));
    }

    #[test]
    fn composite_simple() {
        // Create a 10x10 red background
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));

        // Create a 4x4 blue overlay
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));

        composite_over(&mut dest, &src, 3, 3);

        assert_eq!(dest.get_pixel(5, 5).0, [0, 0, 255, 255]);
        assert_eq!(dest.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn transparent_overlay_leaves_base_untouched() {
        let mut dest = RgbaImage::from_pixel(4, 4, Rgba([12, 34, 56, 255]));
        let src = RgbaImage::new(4, 4);
        composite_over(&mut dest, &src, 0, 0);
        assert!(dest.pixels().all(|p| p.0 == [12, 34, 56, 255]));
    }

    #[test]
    fn composite_with_transparency() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128]));

        composite_over(&mut dest, &src, 0, 0);

        let pixel = dest.get_pixel(0, 0);
        assert!(pixel[0] > 0, "Should have some red");
        assert!(pixel[2] > 0, "Should have some blue");
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn composite_clips_at_edges() {
        let mut dest = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        composite_over(&mut dest, &src, -2, 2);
        assert_eq!(dest.get_pixel(1, 3).0, [255, 255, 255, 255]);
        assert_eq!(dest.get_pixel(2, 3).0, [0, 0, 0, 255]);
        assert_eq!(dest.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn blending_onto_transparent_keeps_source_color() {
        let out = blend_pixel(Rgba([0, 0, 0, 220]), Rgba([0, 0, 0, 0]));
        assert_eq!(out, Rgba([0, 0, 0, 220]));
        let out = blend_pixel(Rgba([0, 0, 0, 0]), Rgba([0, 0, 0, 0]));
        assert_eq!(out, Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn encode_quality_is_clamped() {
        let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        assert!(!encode_jpeg(&img, 0).unwrap().is_empty());
        assert!(!encode_jpeg(&img, 255).unwrap().is_empty());
    }
}
