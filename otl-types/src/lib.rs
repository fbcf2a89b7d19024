//! Scalar data types shared by the OpenType layout crates.
//!
//! Everything in a font file is stored big-endian and unaligned; the types
//! here are the bridge between those raw bytes and the native values the
//! rest of the workspace works with.

#![deny(rustdoc::broken_intra_doc_links)]

mod glyph_id;
mod offset;
mod raw;
mod tag;
mod version;

pub use glyph_id::GlyphId;
pub use offset::{Offset16, Offset32};
pub use raw::{BigEndian, FixedSize, Scalar};
pub use tag::{InvalidTag, Tag};
pub use version::MajorMinor;

/// The sfnt version for fonts containing TrueType outlines.
pub const TT_SFNT_VERSION: u32 = 0x00010000;
/// The sfnt version for legacy Apple fonts containing TrueType outlines.
pub const TRUE_SFNT_VERSION: u32 = 0x74727565;
/// The sfnt version for fonts containing CFF outlines.
pub const CFF_SFNT_VERSION: u32 = 0x4F54544F;
