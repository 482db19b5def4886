//! Card layout: fonts, colors, line construction, and vertical stacking.
//!
//! Layout runs in two passes. The first builds every line and measures it
//! without painting; only once all line heights are known can the block be
//! centered on the anchor. The second pass draws each line at its placement.

use image::RgbaImage;

use crate::color::{parse_color, Color};
use crate::config::{CardConfig, ColorRole, FontRole};
use crate::font::{FontFace, FontHandle};
use crate::geometry::{RectPx, SizePx};
use crate::record::AttributeRecord;
use crate::text::{self, Line, TextSegment};

// ============================================================================
// Fonts and Colors
// ============================================================================

/// The three card font sizes for one image width.
#[derive(Debug, Clone)]
pub struct CardFonts {
    pub small: FontHandle,
    pub medium: FontHandle,
    pub extra_large: FontHandle,
}

impl CardFonts {
    pub fn for_image(face: &FontFace, size: SizePx, config: &CardConfig) -> Self {
        let at = |role| face.at_size(size.width_fraction(config.font_fraction(role)));
        Self {
            small: at(FontRole::Small),
            medium: at(FontRole::Medium),
            extra_large: at(FontRole::ExtraLarge),
        }
    }

    pub fn get(&self, role: FontRole) -> &FontHandle {
        match role {
            FontRole::Small => &self.small,
            FontRole::Medium => &self.medium,
            FontRole::ExtraLarge => &self.extra_large,
        }
    }
}

/// Colors resolved for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardColors {
    pub product: Color,
    pub company: Color,
    pub accent: Color,
    pub text: Color,
}

impl CardColors {
    pub fn resolve(record: &AttributeRecord, config: &CardConfig) -> Self {
        Self {
            product: parse_color(
                record.product_representation_color.as_deref(),
                config.default_color,
            ),
            company: parse_color(
                record.company_representation_color.as_deref(),
                config.default_color,
            ),
            accent: config.accent_color,
            text: config.text_color,
        }
    }

    pub fn get(&self, role: ColorRole) -> Color {
        match role {
            ColorRole::Product => self.product,
            ColorRole::Company => self.company,
            ColorRole::Accent => self.accent,
            ColorRole::Text => self.text,
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Expands `{product}`, `{identifier}`, `{ticker}`, `{shares}` and
/// `{company}` in one pass. Unknown placeholders stay as written.
pub fn expand_template(template: &str, record: &AttributeRecord) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after[..close];
        match placeholder(key, record) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn placeholder<'r>(key: &str, record: &'r AttributeRecord) -> Option<&'r str> {
    match key {
        "product" => Some(&record.product_name),
        "identifier" => Some(record.display_identifier()),
        "ticker" => Some(&record.ticker),
        "shares" => Some(&record.share_count),
        "company" => Some(&record.company_name),
        _ => None,
    }
}

// ============================================================================
// CardLayout
// ============================================================================

/// Where a measured line will be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePlacement {
    pub rect: RectPx,
}

/// Builds and places the card's text block for a given configuration.
pub struct CardLayout<'a> {
    config: &'a CardConfig,
    face: FontFace,
}

impl<'a> CardLayout<'a> {
    pub fn new(config: &'a CardConfig, face: FontFace) -> Self {
        Self { config, face }
    }

    /// Builds the card's lines from the script, one per [`LineSpec`].
    ///
    /// [`LineSpec`]: crate::config::LineSpec
    pub fn build_lines(&self, size: SizePx, record: &AttributeRecord) -> Vec<Line> {
        let fonts = CardFonts::for_image(&self.face, size, self.config);
        let colors = CardColors::resolve(record, self.config);

        tracing::debug!(
            small = fonts.small.px(),
            medium = fonts.medium.px(),
            extra_large = fonts.extra_large.px(),
            builtin = self.face.is_builtin(),
            "card fonts"
        );

        self.config
            .script
            .lines
            .iter()
            .map(|spec| {
                spec.segments
                    .iter()
                    .map(|seg| {
                        TextSegment::new(
                            expand_template(&seg.text, record),
                            fonts.get(seg.font).clone(),
                            colors.get(seg.color),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    /// Measures `lines` and stacks them, centered on the anchor height and
    /// right-aligned against the margin. Paints nothing.
    pub fn place(&self, size: SizePx, lines: &[Line]) -> Vec<LinePlacement> {
        let measured: Vec<SizePx> = lines.iter().map(text::measure).collect();
        let gap = size.width_fraction(self.config.line_gap_fraction) as i32;
        let margin = size.width_fraction(self.config.right_margin_fraction) as i32;

        let gaps = gap * measured.len().saturating_sub(1) as i32;
        let block_height = measured.iter().map(|m| m.height as i32).sum::<i32>() + gaps;
        let anchor = size.height_fraction(self.config.anchor_fraction) as i32;
        let mut y = anchor - block_height / 2;

        tracing::debug!(block_height, start_y = y, gap, "card block");

        measured
            .iter()
            .map(|m| {
                let x = size.width as i32 - m.width as i32 - margin;
                let placement = LinePlacement {
                    rect: RectPx::new(x, y, m.width, m.height),
                };
                y += m.height as i32 + gap;
                placement
            })
            .collect()
    }

    /// Renders the text block onto a transparent overlay of `size`.
    pub fn render(&self, size: SizePx, record: &AttributeRecord) -> RgbaImage {
        let lines = self.build_lines(size, record);
        let placements = self.place(size, &lines);
        let margin = size.width_fraction(self.config.right_margin_fraction);

        let mut overlay = RgbaImage::new(size.width, size.height);
        for (line, placement) in lines.iter().zip(&placements) {
            text::draw(line, placement.rect.y, &mut overlay, margin, self.config.stroke());
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CardScript, LineSpec, SegmentSpec};

    fn record() -> AttributeRecord {
        AttributeRecord::new("TEST", "ABC", "1.0", "COMPANY")
    }

    #[test]
    fn expands_known_placeholders() {
        let record = AttributeRecord::new("커피", "005930", "2.5", "삼성전자");
        assert_eq!(expand_template("{identifier} {shares}주", &record), "삼성전자 2.5주");
        assert_eq!(expand_template("{ticker}/{company}", &record), "005930/삼성전자");
        assert_eq!(expand_template("{product} 살 돈이면", &record), "커피 살 돈이면");
    }

    #[test]
    fn keeps_unknown_and_unclosed_braces() {
        let record = record();
        assert_eq!(expand_template("{nope} {product", &record), "{nope} {product");
        assert_eq!(expand_template("", &record), "");
        assert_eq!(expand_template("}{", &record), "}{");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let record = AttributeRecord::new("{shares}", "ABC", "9", "C");
        assert_eq!(expand_template("{product}", &record), "{shares}");
    }

    #[test]
    fn headline_uses_company_name_for_numeric_tickers() {
        let config = CardConfig::default();
        let layout = CardLayout::new(&config, FontFace::builtin());
        let size = SizePx::new(512, 512);

        let korean = AttributeRecord::new("갤럭시", "005930", "1.0", "삼성전자");
        let lines = layout.build_lines(size, &korean);
        assert!(lines[1].segments[0].text.starts_with("삼성전자 "));

        let us = AttributeRecord::new("모델 Y", "TSLA", "1.0", "Tesla");
        let lines = layout.build_lines(size, &us);
        assert!(lines[1].segments[0].text.starts_with("TSLA "));
    }

    #[test]
    fn lines_follow_the_script() {
        let config = CardConfig::default();
        let layout = CardLayout::new(&config, FontFace::builtin());
        let record = record().with_company_color("(10,10,10,255)");
        let lines = layout.build_lines(SizePx::new(1000, 800), &record);

        assert_eq!(lines.len(), 3);
        let caption = &lines[0].segments;
        assert_eq!(caption[0].text, "TEST");
        assert_eq!(caption[0].font.px(), 50);
        assert_eq!(caption[0].color, Color::MINT);
        assert_eq!(caption[1].font.px(), 40);
        assert_eq!(caption[1].color, Color::WHITE);

        let headline = &lines[1].segments;
        assert_eq!(headline[0].font.px(), 75);
        assert_eq!(headline[0].color, Color::rgba(10, 10, 10, 255));

        let call_to_action = &lines[2].segments;
        assert_eq!(call_to_action[0].color, Color::ACCENT);
        assert_eq!(call_to_action[1].color, Color::WHITE);
    }

    #[test]
    fn block_is_centered_on_anchor() {
        let config = CardConfig::default();
        let layout = CardLayout::new(&config, FontFace::builtin());
        let size = SizePx::new(1000, 1000);
        let lines = layout.build_lines(size, &record());
        let placements = layout.place(size, &lines);

        // Builtin line heights equal the tallest font: 50, 75, 50. Gap 10.
        // Block 195 px centered on y = 600.
        let ys: Vec<_> = placements.iter().map(|p| p.rect.y).collect();
        assert_eq!(ys, vec![503, 563, 648]);
        let heights: Vec<_> = placements.iter().map(|p| p.rect.height).collect();
        assert_eq!(heights, vec![50, 75, 50]);
        assert!(placements.iter().all(|p| p.rect.right() == 900));
    }

    #[test]
    fn placement_generalizes_to_any_line_count() {
        let script = CardScript {
            lines: vec![LineSpec::new(vec![SegmentSpec::new(
                "{ticker}",
                FontRole::Medium,
                ColorRole::Company,
            )])],
        };
        let config = CardConfig::default().with_script(script);
        let layout = CardLayout::new(&config, FontFace::builtin());
        let size = SizePx::new(400, 400);
        let lines = layout.build_lines(size, &record());
        let placements = layout.place(size, &lines);

        // One 20 px line centered on y = 240, no gaps.
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].rect.y, 230);
    }

    #[test]
    fn placing_does_not_depend_on_previous_calls() {
        let config = CardConfig::default();
        let layout = CardLayout::new(&config, FontFace::builtin());
        let size = SizePx::new(640, 480);
        let lines = layout.build_lines(size, &record());
        assert_eq!(layout.place(size, &lines), layout.place(size, &lines));
    }

    #[test]
    fn overlay_is_transparent_outside_the_block() {
        let config = CardConfig::default();
        let layout = CardLayout::new(&config, FontFace::builtin());
        let size = SizePx::new(300, 300);
        let overlay = layout.render(size, &record());

        assert_eq!(overlay.dimensions(), (300, 300));
        assert_eq!(overlay.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(overlay.get_pixel(299, 299).0[3], 0);
        assert!(overlay.pixels().any(|p| p.0[3] > 0));
    }
}
