//! the glyph definition table

use super::layout::{ClassDef, CoverageTable};
use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::{BigEndian, GlyphId, MajorMinor, Offset16, Offset32, Tag};

pub const TAG: Tag = Tag::new(b"GDEF");

/// The glyph classes of the glyph class definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u16)]
pub enum GlyphClass {
    #[default]
    Unclassified = 0,
    Base = 1,
    Ligature = 2,
    Mark = 3,
    Component = 4,
}

impl GlyphClass {
    /// Interpret a raw class value; out-of-range values are unclassified.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            1 => Self::Base,
            2 => Self::Ligature,
            3 => Self::Mark,
            4 => Self::Component,
            _ => Self::Unclassified,
        }
    }
}

/// A ligature caret position.
///
/// Formats 1 and 3 carry a coordinate (the format 3 device table is
/// ignored); format 2 names a contour point to be resolved against the
/// outline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaretValue {
    Coordinate(i16),
    ContourPoint(u16),
}

impl<'a> FontRead<'a> for CaretValue {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 | 3 => data.read_at(2).map(CaretValue::Coordinate),
            2 => data.read_at(2).map(CaretValue::ContourPoint),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

/// The `GDEF` table.
///
/// All sub-records are optional; a missing record answers its queries with
/// defaults (class 0, no attachment points, no carets).
#[derive(Clone, Default)]
pub struct Gdef<'a> {
    glyph_class_def: Option<ClassDef<'a>>,
    attach_list: Option<AttachList<'a>>,
    lig_caret_list: Option<LigCaretList<'a>>,
    mark_attach_class_def: Option<ClassDef<'a>>,
    mark_glyph_sets: Option<MarkGlyphSets<'a>>,
}

impl<'a> FontRead<'a> for Gdef<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let version: MajorMinor = cursor.read()?;
        if !version.compatible(MajorMinor::VERSION_1_0) {
            return Err(ReadError::InvalidVersion(version));
        }
        let glyph_class_def_offset: Offset16 = cursor.read()?;
        let attach_list_offset: Offset16 = cursor.read()?;
        let lig_caret_list_offset: Offset16 = cursor.read()?;
        let mark_attach_class_def_offset: Offset16 = cursor.read()?;
        // mark glyph sets arrived in 1.2 (1.3 appends a variation store
        // offset, which the shaper does not consult)
        let mark_glyph_sets_offset: Option<Offset16> = version
            .compatible(MajorMinor::VERSION_1_2)
            .then(|| cursor.read())
            .transpose()?;

        let read_class_def = |offset: Offset16| -> Result<Option<ClassDef<'a>>, ReadError> {
            offset
                .non_null()
                .map(|off| {
                    ClassDef::read(data.split_off(off).ok_or(ReadError::OutOfBounds)?)
                })
                .transpose()
        };

        Ok(Gdef {
            glyph_class_def: read_class_def(glyph_class_def_offset)?,
            attach_list: attach_list_offset
                .non_null()
                .map(|off| AttachList::read(data.split_off(off).ok_or(ReadError::OutOfBounds)?))
                .transpose()?,
            lig_caret_list: lig_caret_list_offset
                .non_null()
                .map(|off| LigCaretList::read(data.split_off(off).ok_or(ReadError::OutOfBounds)?))
                .transpose()?,
            mark_attach_class_def: read_class_def(mark_attach_class_def_offset)?,
            mark_glyph_sets: mark_glyph_sets_offset
                .and_then(Offset16::non_null)
                .map(|off| MarkGlyphSets::read(data.split_off(off).ok_or(ReadError::OutOfBounds)?))
                .transpose()?,
        })
    }
}

impl<'a> Gdef<'a> {
    /// `true` if a glyph class definition is present.
    pub fn has_glyph_classes(&self) -> bool {
        self.glyph_class_def.is_some()
    }

    /// The class of the given glyph.
    pub fn glyph_class(&self, glyph_id: GlyphId) -> GlyphClass {
        self.glyph_class_def
            .as_ref()
            .map(|classes| GlyphClass::from_raw(classes.get(glyph_id)))
            .unwrap_or_default()
    }

    /// The mark attachment class of the given glyph, or 0.
    pub fn mark_attach_class(&self, glyph_id: GlyphId) -> u16 {
        self.mark_attach_class_def
            .as_ref()
            .map(|classes| classes.get(glyph_id))
            .unwrap_or_default()
    }

    /// `true` if the glyph is in the mark glyph set at `set_index`.
    ///
    /// A missing or out-of-range set contains nothing.
    pub fn is_in_mark_set(&self, set_index: u16, glyph_id: GlyphId) -> bool {
        self.mark_glyph_sets
            .as_ref()
            .map(|sets| sets.contains(set_index, glyph_id))
            .unwrap_or_default()
    }

    /// The attachment (contour) point indices for the given glyph.
    pub fn attach_points(&self, glyph_id: GlyphId) -> Option<&'a [BigEndian<u16>]> {
        self.attach_list.as_ref()?.points(glyph_id)
    }

    /// The ligature caret values for the given ligature glyph.
    pub fn lig_carets(&self, glyph_id: GlyphId) -> Option<Vec<CaretValue>> {
        self.lig_caret_list.as_ref()?.carets(glyph_id)
    }
}

/// Per-glyph attachment point lists.
#[derive(Clone)]
pub struct AttachList<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    attach_point_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for AttachList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let coverage_offset: Offset16 = cursor.read()?;
        let glyph_count: u16 = cursor.read()?;
        let attach_point_offsets = cursor.read_array(glyph_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(AttachList {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            attach_point_offsets,
        })
    }
}

impl<'a> AttachList<'a> {
    fn points(&self, glyph_id: GlyphId) -> Option<&'a [BigEndian<u16>]> {
        let coverage_index = self.coverage.get(glyph_id)?;
        let offset = self
            .attach_point_offsets
            .get(coverage_index as usize)?
            .get()
            .non_null()?;
        let data = self.data.split_off(offset)?;
        let point_count: u16 = data.read_at(0).ok()?;
        data.read_array(2..2 + point_count as usize * 2).ok()
    }
}

/// Per-ligature caret lists.
#[derive(Clone)]
pub struct LigCaretList<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    lig_glyph_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for LigCaretList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let coverage_offset: Offset16 = cursor.read()?;
        let lig_glyph_count: u16 = cursor.read()?;
        let lig_glyph_offsets = cursor.read_array(lig_glyph_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(LigCaretList {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            lig_glyph_offsets,
        })
    }
}

impl LigCaretList<'_> {
    fn carets(&self, glyph_id: GlyphId) -> Option<Vec<CaretValue>> {
        let coverage_index = self.coverage.get(glyph_id)?;
        let offset = self
            .lig_glyph_offsets
            .get(coverage_index as usize)?
            .get()
            .non_null()?;
        let lig_glyph = self.data.split_off(offset)?;
        let caret_count: u16 = lig_glyph.read_at(0).ok()?;
        let caret_offsets = lig_glyph
            .read_array::<BigEndian<Offset16>>(2..2 + caret_count as usize * 2)
            .ok()?;
        let mut carets = Vec::with_capacity(caret_offsets.len());
        for offset in caret_offsets {
            let data = lig_glyph.split_off(offset.get().non_null()?)?;
            carets.push(CaretValue::read(data).ok()?);
        }
        Some(carets)
    }
}

/// Indexed coverage tables naming sets of marks.
#[derive(Clone)]
pub struct MarkGlyphSets<'a> {
    data: FontData<'a>,
    coverage_offsets: &'a [BigEndian<Offset32>],
}

impl<'a> FontRead<'a> for MarkGlyphSets<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let mark_glyph_set_count: u16 = cursor.read()?;
        let coverage_offsets = cursor.read_array(mark_glyph_set_count as usize)?;
        Ok(MarkGlyphSets {
            data,
            coverage_offsets,
        })
    }
}

impl MarkGlyphSets<'_> {
    fn contains(&self, set_index: u16, glyph_id: GlyphId) -> bool {
        self.coverage_offsets
            .get(set_index as usize)
            .and_then(|offset| offset.get().non_null())
            .and_then(|offset| self.data.split_off(offset))
            .and_then(|data| CoverageTable::read(data).ok())
            .and_then(|coverage| coverage.get(glyph_id))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn sample_gdef() -> Vec<u8> {
        // header (12 bytes): version 1.0, glyphClassDef at 12,
        // attachList at 24, ligCaretList null, markAttachClassDef at 42
        let mut bytes = be16(&[1, 0, 12, 24, 0, 42]);
        // glyph class def at 12 (fmt 1): glyphs 1..=3 -> base, mark, ligature
        bytes.extend_from_slice(&be16(&[1, 1, 3, 1, 3, 2]));
        // attach list at 24: coverage at 6 (rel), 1 glyph, points at 12 (rel)
        bytes.extend_from_slice(&be16(&[6, 1, 12]));
        bytes.extend_from_slice(&be16(&[1, 1, 2])); // coverage fmt1: glyph 2
        bytes.extend_from_slice(&be16(&[2, 4, 7])); // 2 points: 4, 7
        // mark attach class def at 42 (fmt 1): glyph 2 -> class 1
        bytes.extend_from_slice(&be16(&[1, 2, 1, 1]));
        bytes
    }

    #[test]
    fn glyph_classes() {
        let bytes = sample_gdef();
        let gdef = Gdef::read(FontData::new(&bytes)).unwrap();
        assert!(gdef.has_glyph_classes());
        assert_eq!(gdef.glyph_class(GlyphId::new(1)), GlyphClass::Base);
        assert_eq!(gdef.glyph_class(GlyphId::new(2)), GlyphClass::Mark);
        assert_eq!(gdef.glyph_class(GlyphId::new(3)), GlyphClass::Ligature);
        assert_eq!(gdef.glyph_class(GlyphId::new(9)), GlyphClass::Unclassified);
    }

    #[test]
    fn attach_points_and_mark_classes() {
        let bytes = sample_gdef();
        let gdef = Gdef::read(FontData::new(&bytes)).unwrap();
        let points = gdef.attach_points(GlyphId::new(2)).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].get(), 7);
        assert!(gdef.attach_points(GlyphId::new(1)).is_none());
        assert_eq!(gdef.mark_attach_class(GlyphId::new(2)), 1);
        assert_eq!(gdef.mark_attach_class(GlyphId::new(1)), 0);
        assert!(gdef.lig_carets(GlyphId::new(3)).is_none());
    }

    #[test]
    fn mark_glyph_sets_need_version_1_2() {
        // version 1.2 header with a mark glyph sets table
        let mut bytes = be16(&[1, 2, 0, 0, 0, 0, 14]);
        // mark glyph sets at 14: format 1, 1 set, coverage at offset 8 (u32)
        bytes.extend_from_slice(&be16(&[1, 1]));
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(&be16(&[1, 1, 5])); // coverage fmt 1: glyph 5
        let gdef = Gdef::read(FontData::new(&bytes)).unwrap();
        assert!(gdef.is_in_mark_set(0, GlyphId::new(5)));
        assert!(!gdef.is_in_mark_set(0, GlyphId::new(6)));
        assert!(!gdef.is_in_mark_set(1, GlyphId::new(5)));
    }

    #[test]
    fn caret_value_formats() {
        let coord = be16(&[1, 0x100]);
        assert_eq!(
            CaretValue::read(FontData::new(&coord)).unwrap(),
            CaretValue::Coordinate(0x100)
        );
        let point = be16(&[2, 3]);
        assert_eq!(
            CaretValue::read(FontData::new(&point)).unwrap(),
            CaretValue::ContourPoint(3)
        );
        let with_device = be16(&[3, 0x80, 6]);
        assert_eq!(
            CaretValue::read(FontData::new(&with_device)).unwrap(),
            CaretValue::Coordinate(0x80)
        );
        assert!(CaretValue::read(FontData::new(&be16(&[4, 0]))).is_err());
    }
}
