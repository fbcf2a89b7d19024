//! The sfnt table directory.

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::table_provider::TableProvider;
use crate::types::{BigEndian, FixedSize, Tag, CFF_SFNT_VERSION, TRUE_SFNT_VERSION, TT_SFNT_VERSION};

/// One record in the table directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct TableRecord {
    /// Table identifier.
    pub tag: BigEndian<Tag>,
    /// Checksum for the table.
    pub checksum: BigEndian<u32>,
    /// Offset from the beginning of the font data.
    pub offset: BigEndian<u32>,
    /// Length of the table.
    pub length: BigEndian<u32>,
}

// SAFETY: `TableRecord` is repr(C) with no padding, containing only
// byte-array fields for which any bit pattern is valid.
unsafe impl bytemuck::Zeroable for TableRecord {}
unsafe impl bytemuck::AnyBitPattern for TableRecord {}

impl FixedSize for TableRecord {
    const RAW_BYTE_LEN: usize = 16;
}

/// Reference to an in-memory font.
///
/// This holds the raw bytes of the file and the parsed table directory, and
/// hands out the byte ranges of individual tables.
#[derive(Clone)]
pub struct FontRef<'a> {
    data: FontData<'a>,
    table_records: &'a [TableRecord],
}

impl<'a> FontRef<'a> {
    /// Creates a new reference to an in-memory font backed by the given data.
    ///
    /// TrueType- and CFF-flavored fonts are accepted; font collections
    /// (`ttcf`) are not.
    pub fn new(data: impl Into<FontData<'a>>) -> Result<Self, ReadError> {
        let data = data.into();
        let sfnt_version: u32 = data.read_at(0)?;
        match sfnt_version {
            TT_SFNT_VERSION | TRUE_SFNT_VERSION | CFF_SFNT_VERSION => {}
            other => return Err(ReadError::InvalidSfnt(other)),
        }
        let num_tables: u16 = data.read_at(4)?;
        let records_start = 12usize;
        let records_end = records_start + num_tables as usize * TableRecord::RAW_BYTE_LEN;
        let table_records = data.read_array(records_start..records_end)?;
        Ok(FontRef {
            data,
            table_records,
        })
    }

    /// The records of the table directory.
    pub fn table_records(&self) -> &'a [TableRecord] {
        self.table_records
    }

    /// Returns the data for the table with the specified tag, if present.
    pub fn table_data(&self, tag: Tag) -> Option<FontData<'a>> {
        self.table_records
            .binary_search_by(|rec| rec.tag.get().cmp(&tag))
            .ok()
            .or_else(|| {
                // directories are required to be sorted by tag, but fonts
                // with unsorted directories exist in the wild
                self.table_records.iter().position(|rec| rec.tag == tag)
            })
            .and_then(|idx| {
                let record = &self.table_records[idx];
                let start = record.offset.get() as usize;
                let end = start.checked_add(record.length.get() as usize)?;
                self.data.slice(start..end)
            })
    }
}

impl<'a> TableProvider<'a> for FontRef<'a> {
    fn data_for_tag(&self, tag: Tag) -> Option<FontData<'a>> {
        self.table_data(tag)
    }
}

impl<'a> FontRead<'a> for FontRef<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_font() -> Vec<u8> {
        // directory with two tiny tables, 'aaaa' then 'bbbb'
        let mut buf = vec![];
        buf.extend_from_slice(&TT_SFNT_VERSION.to_be_bytes());
        buf.extend_from_slice(&2u16.to_be_bytes());
        buf.extend_from_slice(&[0u8; 6]); // searchRange etc
        for (tag, offset, len) in [(b"aaaa", 44u32, 2u32), (b"bbbb", 46u32, 4u32)] {
            buf.extend_from_slice(tag);
            buf.extend_from_slice(&0u32.to_be_bytes());
            buf.extend_from_slice(&offset.to_be_bytes());
            buf.extend_from_slice(&len.to_be_bytes());
        }
        buf.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        buf
    }

    #[test]
    fn table_directory() {
        let bytes = sample_font();
        let font = FontRef::new(bytes.as_slice()).unwrap();
        assert_eq!(font.table_records().len(), 2);
        let aaaa = font.table_data(Tag::new(b"aaaa")).unwrap();
        assert_eq!(aaaa.as_bytes(), &[1, 2]);
        let bbbb = font.table_data(Tag::new(b"bbbb")).unwrap();
        assert_eq!(bbbb.as_bytes(), &[3, 4, 5, 6]);
        assert!(font.table_data(Tag::new(b"cccc")).is_none());
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut bytes = sample_font();
        bytes[0] = 0xBA;
        assert!(matches!(
            FontRef::new(bytes.as_slice()),
            Err(ReadError::InvalidSfnt(_))
        ));
    }
}
