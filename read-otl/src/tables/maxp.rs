//! the maximum profile table

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::Tag;

pub const TAG: Tag = Tag::new(b"maxp");

/// The `maxp` table.
///
/// Only the glyph count is of interest to the shaper; the remaining fields
/// (and the version 1.0 extensions) are left unread.
#[derive(Clone)]
pub struct Maxp<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for Maxp<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let version: u32 = data.read_at(0)?;
        // 0.5 for CFF-flavored fonts, 1.0 for TrueType-flavored ones
        if version != 0x00005000 && version != 0x00010000 {
            return Err(ReadError::InvalidFormat(version as i64));
        }
        // ensure num_glyphs is readable
        data.read_at::<u16>(4)?;
        Ok(Maxp { data })
    }
}

impl Maxp<'_> {
    /// The number of glyphs in the font.
    pub fn num_glyphs(&self) -> u16 {
        self.data.read_at(4).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_and_glyph_count() {
        let data = [0x00u8, 0x00, 0x50, 0x00, 0x01, 0x02];
        let maxp = Maxp::read(FontData::new(&data)).unwrap();
        assert_eq!(maxp.num_glyphs(), 0x102);

        let bad = [0x00u8, 0x02, 0x00, 0x00, 0x01, 0x02];
        assert!(Maxp::read(FontData::new(&bad)).is_err());
    }
}
