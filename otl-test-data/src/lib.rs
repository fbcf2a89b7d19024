//! test data shared between the layout crates.

pub mod bebuffer;
pub mod font;
