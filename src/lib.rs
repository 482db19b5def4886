//! stockcard: "what your purchase could have bought" image cards
//!
//! This crate overlays a product photo with a right-aligned, outlined,
//! three-line text block comparing the product's price to a number of
//! shares of the company behind it, and returns the result as a JPEG.
//!
//! # Example
//!
//! ```
//! use stockcard::{composite, AttributeRecord};
//!
//! let record = AttributeRecord::new("모델 Y", "TSLA", "0.15", "Tesla")
//!     .with_company_color("(204, 0, 0)");
//!
//! // Undecodable photos fall back to a blank 1024x1024 canvas.
//! let jpeg = composite(b"not a photo", &record).unwrap();
//! assert!(!jpeg.is_empty());
//! ```
//!
//! # Configuration
//!
//! Font, proportions, colors and wording live in [`CardConfig`], which
//! round-trips through JSON:
//!
//! ```
//! use stockcard::{AttributeRecord, CardConfig, Compositor};
//!
//! let config = CardConfig::from_json(r#"{ "anchorFraction": 0.5, "jpegQuality": 80 }"#).unwrap();
//! let compositor = Compositor::new(config);
//!
//! let record = AttributeRecord::from_json(r#"{ "ticker": "005930", "company_name": "삼성전자" }"#).unwrap();
//! assert_eq!(record.display_identifier(), "삼성전자");
//!
//! let card = compositor.render(&[], &record);
//! assert_eq!(card.dimensions(), (1024, 1024));
//! ```

mod color;
mod compositor;
mod config;
mod error;
mod font;
mod geometry;
mod layout;
mod record;
mod text;

pub use color::{luminance, parse_color, select_shadow, Color};
pub use compositor::{composite, composite_over, encode_jpeg, flatten, Compositor};
pub use config::{CardConfig, CardScript, ColorRole, FontRole, LineSpec, SegmentSpec};
pub use error::{CardError, CardResult};
pub use font::{CoverageMask, FontCache, FontFace, FontHandle, GlyphRun};
pub use geometry::{RectPx, SizePx};
pub use layout::{expand_template, CardColors, CardFonts, CardLayout, LinePlacement};
pub use record::AttributeRecord;
pub use text::{draw, line_geometry, measure, stroke_width, Line, LineGeometry, StrokeStyle, TextSegment};
