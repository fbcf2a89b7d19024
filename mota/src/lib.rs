//! OpenType text shaping.
//!
//! Shaping turns a sequence of Unicode code points into positioned glyphs:
//! code points are mapped to nominal glyphs through `cmap`, the `GSUB`
//! table substitutes ligatures and contextual forms, and the `GPOS` table
//! kerns and attaches marks, consulting `GDEF` for glyph classes along the
//! way.
//!
//! ```
//! use mota::{Shaper, ShapeBuffer};
//! use read_otl::FontRef;
//!
//! let font_data = otl_test_data::font::test_font();
//! let font = FontRef::new(font_data.as_slice()).unwrap();
//! let shaper = Shaper::new(&font);
//! let run = shaper.shape_str("fi");
//! // the f + i pair ligates into a single glyph
//! assert_eq!(run.glyphs.len(), 1);
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

mod buffer;
mod feature;
mod shape;
mod unicode;

pub use buffer::{AttachKind, Direction, GlyphPosition, ShapeBuffer, ShapeItem};
pub use feature::{Feature, ParseFeatureError};
pub use shape::{GlyphRun, Shaper};

/// Public re-export of the table parsing crate.
pub use read_otl as raw;
