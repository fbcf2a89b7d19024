//! the horizontal header table

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::{MajorMinor, Tag};

pub const TAG: Tag = Tag::new(b"hhea");

/// The `hhea` table.
#[derive(Clone)]
pub struct Hhea<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for Hhea<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let version: MajorMinor = data.read_at(0)?;
        if !version.compatible(MajorMinor::VERSION_1_0) {
            return Err(ReadError::InvalidVersion(version));
        }
        // the number of long metrics lives in the last field
        data.read_at::<u16>(34)?;
        Ok(Hhea { data })
    }
}

impl Hhea<'_> {
    /// The typographic ascender, in font units.
    pub fn ascender(&self) -> i16 {
        self.data.read_at(4).unwrap_or_default()
    }

    /// The typographic descender, in font units.
    pub fn descender(&self) -> i16 {
        self.data.read_at(6).unwrap_or_default()
    }

    /// The number of long metric entries in the `hmtx` table.
    pub fn number_of_h_metrics(&self) -> u16 {
        self.data.read_at(34).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_metric_count() {
        let mut data = vec![0u8; 36];
        data[..4].copy_from_slice(&[0, 1, 0, 0]);
        data[34..].copy_from_slice(&3u16.to_be_bytes());
        let hhea = Hhea::read(FontData::new(&data)).unwrap();
        assert_eq!(hhea.number_of_h_metrics(), 3);
    }

    #[test]
    fn rejects_bad_version() {
        let mut data = vec![0u8; 36];
        data[..4].copy_from_slice(&[0, 2, 0, 0]);
        assert!(matches!(
            Hhea::read(FontData::new(&data)),
            Err(ReadError::InvalidVersion(_))
        ));
    }
}
