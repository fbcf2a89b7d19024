//! Parsing the OpenType tables that drive text shaping.
//!
//! This crate reads the binary layout tables (`GDEF`, `GSUB`, `GPOS`) plus
//! the handful of collaborator tables a shaper needs (`cmap`, `maxp`,
//! `hhea`, `hmtx`) directly from borrowed font bytes. Parsed tables retain
//! only offsets into the original data; nothing is copied.

#![deny(rustdoc::broken_intra_doc_links)]

mod font;
mod font_data;
mod read;
mod table_provider;
pub mod tables;

pub use font::{FontRef, TableRecord};
pub use font_data::{Cursor, FontData};
pub use read::{FontRead, FontReadWithArgs, ReadArgs, ReadError};
pub use table_provider::TableProvider;

/// Public re-export of the scalar types crate.
pub use otl_types as types;

pub use otl_types::GlyphId;
