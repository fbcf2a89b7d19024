//! the character to glyph index mapping table

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::{BigEndian, FixedSize, GlyphId, Offset32, Tag};

pub const TAG: Tag = Tag::new(b"cmap");

/// One encoding record in the `cmap` header.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct EncodingRecord {
    pub platform_id: BigEndian<u16>,
    pub encoding_id: BigEndian<u16>,
    pub subtable_offset: BigEndian<Offset32>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for EncodingRecord {}
unsafe impl bytemuck::AnyBitPattern for EncodingRecord {}

impl FixedSize for EncodingRecord {
    const RAW_BYTE_LEN: usize = 8;
}

/// The `cmap` table.
#[derive(Clone)]
pub struct Cmap<'a> {
    data: FontData<'a>,
    records: &'a [EncodingRecord],
}

impl<'a> FontRead<'a> for Cmap<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let version: u16 = cursor.read()?;
        if version != 0 {
            return Err(ReadError::InvalidVersion(crate::types::MajorMinor::new(
                version, 0,
            )));
        }
        let num_tables: u16 = cursor.read()?;
        let records = cursor.read_array(num_tables as usize)?;
        Ok(Cmap { data, records })
    }
}

/// Unicode platform/encoding pairs, in preference order: full repertoire
/// first, then the basic multilingual plane.
const UNICODE_ENCODINGS: &[(u16, u16)] = &[
    (3, 10),
    (0, 6),
    (0, 4),
    (3, 1),
    (0, 3),
    (0, 2),
    (0, 1),
    (0, 0),
];

impl<'a> Cmap<'a> {
    /// The encoding records in the header.
    pub fn encoding_records(&self) -> &'a [EncodingRecord] {
        self.records
    }

    /// Selects the best available Unicode mapping subtable.
    ///
    /// Subtables in unsupported formats are passed over so that a font with,
    /// say, both a format 2 and a format 4 mapping still maps.
    pub fn preferred_subtable(&self) -> Option<CmapSubtable<'a>> {
        for probe in UNICODE_ENCODINGS {
            for record in self.records {
                if (record.platform_id.get(), record.encoding_id.get()) != *probe {
                    continue;
                }
                let Some(offset) = record.subtable_offset.get().non_null() else {
                    continue;
                };
                let Some(data) = self.data.split_off(offset) else {
                    continue;
                };
                if let Ok(subtable) = CmapSubtable::read(data) {
                    return Some(subtable);
                }
            }
        }
        None
    }

    /// Maps a codepoint to a nominal glyph identifier.
    ///
    /// This selects a subtable per call; cache [`Cmap::preferred_subtable`]
    /// when mapping a run.
    pub fn map_codepoint(&self, codepoint: impl Into<u32>) -> Option<GlyphId> {
        self.preferred_subtable()?.map_codepoint(codepoint.into())
    }
}

/// A supported `cmap` mapping subtable.
#[derive(Clone)]
pub enum CmapSubtable<'a> {
    Format4(Cmap4<'a>),
    Format12(Cmap12<'a>),
}

impl<'a> FontRead<'a> for CmapSubtable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            4 => Cmap4::read(data).map(Self::Format4),
            12 => Cmap12::read(data).map(Self::Format12),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

impl CmapSubtable<'_> {
    /// Maps a codepoint to a nominal glyph identifier.
    ///
    /// Returns `None` if the codepoint is unmapped, or maps to glyph 0.
    pub fn map_codepoint(&self, codepoint: u32) -> Option<GlyphId> {
        let glyph_id = match self {
            Self::Format4(subtable) => subtable.map_codepoint(codepoint),
            Self::Format12(subtable) => subtable.map_codepoint(codepoint),
        }?;
        (glyph_id != GlyphId::NOTDEF).then_some(glyph_id)
    }
}

/// A format 4 subtable: segment mapping to delta values.
#[derive(Clone)]
pub struct Cmap4<'a> {
    data: FontData<'a>,
    end_codes: &'a [BigEndian<u16>],
    start_codes: &'a [BigEndian<u16>],
    id_deltas: &'a [BigEndian<i16>],
    id_range_offsets: &'a [BigEndian<u16>],
    /// byte position of the idRangeOffset array within the subtable
    id_range_offsets_pos: usize,
}

impl<'a> FontRead<'a> for Cmap4<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        if format != 4 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let seg_count_x2 = data.read_at::<u16>(6)? as usize;
        if seg_count_x2 % 2 != 0 {
            return Err(ReadError::MalformedData("odd segCountX2 in cmap format 4"));
        }
        let end_codes = data.read_array(14..14 + seg_count_x2)?;
        // 2 bytes of reserved padding after the end codes
        let start_pos = 16 + seg_count_x2;
        let start_codes = data.read_array(start_pos..start_pos + seg_count_x2)?;
        let delta_pos = start_pos + seg_count_x2;
        let id_deltas = data.read_array(delta_pos..delta_pos + seg_count_x2)?;
        let range_pos = delta_pos + seg_count_x2;
        let id_range_offsets = data.read_array(range_pos..range_pos + seg_count_x2)?;
        Ok(Cmap4 {
            data,
            end_codes,
            start_codes,
            id_deltas,
            id_range_offsets,
            id_range_offsets_pos: range_pos,
        })
    }
}

impl Cmap4<'_> {
    /// Maps a codepoint to a glyph identifier.
    pub fn map_codepoint(&self, codepoint: u32) -> Option<GlyphId> {
        if codepoint > 0xFFFF {
            return None;
        }
        let codepoint = codepoint as u16;
        let segment = self
            .end_codes
            .partition_point(|end| end.get() < codepoint);
        let start = self.start_codes.get(segment)?.get();
        if codepoint < start {
            return None;
        }
        let delta = self.id_deltas.get(segment)?.get();
        let range_offset = self.id_range_offsets.get(segment)?.get();
        let glyph_id = if range_offset == 0 {
            (codepoint as i32 + delta as i32) as u16
        } else {
            // the classic obfuscated-address scheme: the range offset is
            // relative to its own position in the idRangeOffset array
            let addr = self.id_range_offsets_pos
                + segment * 2
                + range_offset as usize
                + (codepoint - start) as usize * 2;
            let glyph = self.data.read_at::<u16>(addr).ok()?;
            if glyph == 0 {
                return None;
            }
            (glyph as i32 + delta as i32) as u16
        };
        Some(GlyphId::new(glyph_id))
    }
}

/// One group in a format 12 subtable.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct SequentialMapGroup {
    pub start_char_code: BigEndian<u32>,
    pub end_char_code: BigEndian<u32>,
    pub start_glyph_id: BigEndian<u32>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for SequentialMapGroup {}
unsafe impl bytemuck::AnyBitPattern for SequentialMapGroup {}

impl FixedSize for SequentialMapGroup {
    const RAW_BYTE_LEN: usize = 12;
}

/// A format 12 subtable: segmented coverage of the full codepoint range.
#[derive(Clone)]
pub struct Cmap12<'a> {
    groups: &'a [SequentialMapGroup],
}

impl<'a> FontRead<'a> for Cmap12<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        if format != 12 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let num_groups = data.read_at::<u32>(12)? as usize;
        let groups = data.read_array(16..16 + num_groups * SequentialMapGroup::RAW_BYTE_LEN)?;
        Ok(Cmap12 { groups })
    }
}

impl Cmap12<'_> {
    /// Maps a codepoint to a glyph identifier.
    pub fn map_codepoint(&self, codepoint: u32) -> Option<GlyphId> {
        let group_idx = self
            .groups
            .partition_point(|group| group.end_char_code.get() < codepoint);
        let group = self.groups.get(group_idx)?;
        if codepoint < group.start_char_code.get() {
            return None;
        }
        let glyph_id = group
            .start_glyph_id
            .get()
            .checked_add(codepoint - group.start_char_code.get())?;
        // glyph ids are 16 bits; anything wider is malformed data
        u16::try_from(glyph_id).ok().map(GlyphId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmap4_subtable() -> Vec<u8> {
        // two segments: 'A'..='C' -> 1..=3, 'f'..='i' -> 10..=13, plus the
        // required terminating 0xFFFF segment
        let seg_count = 3u16;
        let mut buf = vec![];
        buf.extend_from_slice(&4u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes()); // length, unread
        buf.extend_from_slice(&0u16.to_be_bytes()); // language
        buf.extend_from_slice(&(seg_count * 2).to_be_bytes());
        buf.extend_from_slice(&[0; 6]); // search params
        for end in [0x43u16, 0x69, 0xFFFF] {
            buf.extend_from_slice(&end.to_be_bytes());
        }
        buf.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
        for start in [0x41u16, 0x66, 0xFFFF] {
            buf.extend_from_slice(&start.to_be_bytes());
        }
        for delta in [(1i16 - 0x41), (10 - 0x66), 1] {
            buf.extend_from_slice(&delta.to_be_bytes());
        }
        for range_offset in [0u16, 0, 0] {
            buf.extend_from_slice(&range_offset.to_be_bytes());
        }
        buf
    }

    fn cmap_with(subtable: &[u8], platform_id: u16, encoding_id: u16) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&platform_id.to_be_bytes());
        buf.extend_from_slice(&encoding_id.to_be_bytes());
        buf.extend_from_slice(&12u32.to_be_bytes());
        buf.extend_from_slice(subtable);
        buf
    }

    #[test]
    fn format4_delta_mapping() {
        let bytes = cmap_with(&cmap4_subtable(), 3, 1);
        let cmap = Cmap::read(FontData::new(&bytes)).unwrap();
        assert_eq!(cmap.map_codepoint('A'), Some(GlyphId::new(1)));
        assert_eq!(cmap.map_codepoint('C'), Some(GlyphId::new(3)));
        assert_eq!(cmap.map_codepoint('f'), Some(GlyphId::new(10)));
        assert_eq!(cmap.map_codepoint('i'), Some(GlyphId::new(13)));
        assert_eq!(cmap.map_codepoint('D'), None);
        assert_eq!(cmap.map_codepoint('z'), None);
        assert_eq!(cmap.map_codepoint(0x1F600u32), None);
    }

    #[test]
    fn format12_groups() {
        let mut subtable = vec![];
        subtable.extend_from_slice(&12u16.to_be_bytes());
        subtable.extend_from_slice(&0u16.to_be_bytes()); // reserved
        subtable.extend_from_slice(&0u32.to_be_bytes()); // length, unread
        subtable.extend_from_slice(&0u32.to_be_bytes()); // language
        subtable.extend_from_slice(&1u32.to_be_bytes());
        subtable.extend_from_slice(&0x1F600u32.to_be_bytes());
        subtable.extend_from_slice(&0x1F602u32.to_be_bytes());
        subtable.extend_from_slice(&7u32.to_be_bytes());
        let bytes = cmap_with(&subtable, 3, 10);
        let cmap = Cmap::read(FontData::new(&bytes)).unwrap();
        assert_eq!(cmap.map_codepoint(0x1F601u32), Some(GlyphId::new(8)));
        assert_eq!(cmap.map_codepoint('A'), None);
    }

    #[test]
    fn unsupported_subtable_format_is_skipped() {
        let bytes = cmap_with(&6u16.to_be_bytes(), 3, 1);
        let cmap = Cmap::read(FontData::new(&bytes)).unwrap();
        assert!(cmap.preferred_subtable().is_none());
        assert_eq!(cmap.map_codepoint('A'), None);
    }
}
