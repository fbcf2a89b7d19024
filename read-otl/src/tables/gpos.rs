//! the glyph positioning table

#[path = "./value_record.rs"]
mod value_record;

pub use super::layout::{
    ChainedSequenceContext, ClassDef, CoverageTable, FeatureList, Lookup, LookupFlag, LookupList,
    ScriptList, SequenceContext,
};
pub use value_record::{ValueFormat, ValueRecord};

use super::layout;
use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::{BigEndian, FixedSize, GlyphId, MajorMinor, Offset16, Tag};

pub const TAG: Tag = Tag::new(b"GPOS");

/// The lookup types defined for glyph positioning.
pub mod lookup_type {
    pub const SINGLE: u16 = 1;
    pub const PAIR: u16 = 2;
    pub const CURSIVE: u16 = 3;
    pub const MARK_TO_BASE: u16 = 4;
    pub const MARK_TO_LIGATURE: u16 = 5;
    pub const MARK_TO_MARK: u16 = 6;
    pub const CONTEXTUAL: u16 = 7;
    pub const CHAIN_CONTEXTUAL: u16 = 8;
    pub const EXTENSION: u16 = 9;
}

/// The `GPOS` table: scripts, features and positioning lookups.
#[derive(Clone)]
pub struct Gpos<'a> {
    script_list: ScriptList<'a>,
    feature_list: FeatureList<'a>,
    lookup_list: LookupList<'a>,
}

impl<'a> FontRead<'a> for Gpos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let version: MajorMinor = cursor.read()?;
        if !version.compatible(MajorMinor::VERSION_1_0) {
            return Err(ReadError::InvalidVersion(version));
        }
        let script_list_offset: Offset16 = cursor.read()?;
        let feature_list_offset: Offset16 = cursor.read()?;
        let lookup_list_offset: Offset16 = cursor.read()?;
        let resolve = |offset: Offset16| -> Result<FontData<'a>, ReadError> {
            data.split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
                .ok_or(ReadError::OutOfBounds)
        };
        Ok(Gpos {
            script_list: ScriptList::read(resolve(script_list_offset)?)?,
            feature_list: FeatureList::read(resolve(feature_list_offset)?)?,
            lookup_list: LookupList::read(resolve(lookup_list_offset)?)?,
        })
    }
}

impl<'a> Gpos<'a> {
    /// The script list.
    pub fn script_list(&self) -> &ScriptList<'a> {
        &self.script_list
    }

    /// The feature list.
    pub fn feature_list(&self) -> &FeatureList<'a> {
        &self.feature_list
    }

    /// The lookup list.
    pub fn lookup_list(&self) -> &LookupList<'a> {
        &self.lookup_list
    }

    /// Read the subtable at `index` of the given lookup, resolving any
    /// extension wrapper.
    pub fn subtable(
        &self,
        lookup: &Lookup<'a>,
        index: u16,
    ) -> Result<PositionSubtable<'a>, ReadError> {
        PositionSubtable::read(lookup.subtable_data(index)?, lookup.lookup_type())
    }
}

/// A positioning lookup subtable of any type.
///
/// Extension subtables (type 9) are resolved during reading and never
/// surfaced.
#[derive(Clone)]
pub enum PositionSubtable<'a> {
    Single(SinglePos<'a>),
    Pair(PairPos<'a>),
    Cursive(CursivePosFormat1<'a>),
    MarkToBase(MarkBasePosFormat1<'a>),
    MarkToLigature(MarkLigPosFormat1<'a>),
    MarkToMark(MarkMarkPosFormat1<'a>),
    Contextual(SequenceContext<'a>),
    ChainContextual(ChainedSequenceContext<'a>),
}

impl<'a> PositionSubtable<'a> {
    /// Read a subtable interpreted per the parent lookup's type.
    pub fn read(data: FontData<'a>, lookup_type: u16) -> Result<Self, ReadError> {
        match lookup_type {
            lookup_type::SINGLE => SinglePos::read(data).map(Self::Single),
            lookup_type::PAIR => PairPos::read(data).map(Self::Pair),
            lookup_type::CURSIVE => CursivePosFormat1::read(data).map(Self::Cursive),
            lookup_type::MARK_TO_BASE => MarkBasePosFormat1::read(data).map(Self::MarkToBase),
            lookup_type::MARK_TO_LIGATURE => {
                MarkLigPosFormat1::read(data).map(Self::MarkToLigature)
            }
            lookup_type::MARK_TO_MARK => MarkMarkPosFormat1::read(data).map(Self::MarkToMark),
            lookup_type::CONTEXTUAL => SequenceContext::read(data).map(Self::Contextual),
            lookup_type::CHAIN_CONTEXTUAL => {
                ChainedSequenceContext::read(data).map(Self::ChainContextual)
            }
            lookup_type::EXTENSION => {
                let (wrapped_type, data) = layout::resolve_extension(data)?;
                if wrapped_type == lookup_type::EXTENSION {
                    return Err(ReadError::MalformedData("extension wraps extension"));
                }
                Self::read(data, wrapped_type)
            }
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

/// An attachment point, in design units.
///
/// Anchor formats 2 (contour point) and 3 (device) degrade to their plain
/// coordinates in this engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl<'a> FontRead<'a> for Anchor {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        if !(1..=3).contains(&format) {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        Ok(Anchor {
            x: data.read_at(2)?,
            y: data.read_at(4)?,
        })
    }
}

fn read_anchor_at(data: FontData, offset: Offset16) -> Option<Anchor> {
    let data = data.split_off(offset.non_null()?)?;
    Anchor::read(data).ok()
}

/// A single adjustment subtable.
#[derive(Clone)]
pub enum SinglePos<'a> {
    Format1(SinglePosFormat1<'a>),
    Format2(SinglePosFormat2<'a>),
}

impl<'a> FontRead<'a> for SinglePos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => SinglePosFormat1::read(data).map(Self::Format1),
            2 => SinglePosFormat2::read(data).map(Self::Format2),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

impl SinglePos<'_> {
    /// The adjustment for the given glyph, if covered.
    pub fn value(&self, glyph_id: GlyphId) -> Option<ValueRecord> {
        match self {
            Self::Format1(table) => table.value(glyph_id),
            Self::Format2(table) => table.value(glyph_id),
        }
    }
}

/// One adjustment applied to every covered glyph.
#[derive(Clone)]
pub struct SinglePosFormat1<'a> {
    coverage: CoverageTable<'a>,
    value: ValueRecord,
}

impl<'a> FontRead<'a> for SinglePosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = data.read_at(2)?;
        let value_format = ValueFormat::from_bits(data.read_at(4)?);
        let value = ValueRecord::read(
            data.split_off(6).ok_or(ReadError::OutOfBounds)?,
            value_format,
        )?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(SinglePosFormat1 {
            coverage: CoverageTable::read(coverage_data)?,
            value,
        })
    }
}

impl SinglePosFormat1<'_> {
    fn value(&self, glyph_id: GlyphId) -> Option<ValueRecord> {
        self.coverage.get(glyph_id).map(|_| self.value)
    }
}

/// Per-glyph adjustments, indexed by coverage.
#[derive(Clone)]
pub struct SinglePosFormat2<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    value_format: ValueFormat,
    value_count: u16,
}

impl<'a> FontRead<'a> for SinglePosFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = data.read_at(2)?;
        let value_format = ValueFormat::from_bits(data.read_at(4)?);
        let value_count: u16 = data.read_at(6)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(SinglePosFormat2 {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            value_format,
            value_count,
        })
    }
}

impl SinglePosFormat2<'_> {
    fn value(&self, glyph_id: GlyphId) -> Option<ValueRecord> {
        let coverage_index = self.coverage.get(glyph_id)?;
        if coverage_index >= self.value_count {
            return None;
        }
        let offset = 8 + coverage_index as usize * self.value_format.record_byte_len();
        ValueRecord::read(self.data.split_off(offset)?, self.value_format).ok()
    }
}

/// A pair adjustment subtable.
#[derive(Clone)]
pub enum PairPos<'a> {
    Format1(PairPosFormat1<'a>),
    Format2(PairPosFormat2<'a>),
}

impl<'a> FontRead<'a> for PairPos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => PairPosFormat1::read(data).map(Self::Format1),
            2 => PairPosFormat2::read(data).map(Self::Format2),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

impl PairPos<'_> {
    /// The adjustments for the two glyphs of a covered pair.
    pub fn pair(&self, first: GlyphId, second: GlyphId) -> Option<(ValueRecord, ValueRecord)> {
        match self {
            Self::Format1(table) => table.pair(first, second),
            Self::Format2(table) => table.pair(first, second),
        }
    }
}

/// Pair adjustment by second glyph id.
#[derive(Clone)]
pub struct PairPosFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    value_format1: ValueFormat,
    value_format2: ValueFormat,
    pair_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for PairPosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let value_format1 = ValueFormat::from_bits(cursor.read()?);
        let value_format2 = ValueFormat::from_bits(cursor.read()?);
        let pair_set_count: u16 = cursor.read()?;
        let pair_set_offsets = cursor.read_array(pair_set_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(PairPosFormat1 {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            value_format1,
            value_format2,
            pair_set_offsets,
        })
    }
}

impl PairPosFormat1<'_> {
    fn pair(&self, first: GlyphId, second: GlyphId) -> Option<(ValueRecord, ValueRecord)> {
        let coverage_index = self.coverage.get(first)?;
        let set_offset = self
            .pair_set_offsets
            .get(coverage_index as usize)?
            .get()
            .non_null()?;
        let set_data = self.data.split_off(set_offset)?;
        let count = set_data.read_at::<u16>(0).ok()? as usize;
        let record_len = 2 + self.value_format1.record_byte_len()
            + self.value_format2.record_byte_len();
        // records are sorted by second glyph id
        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let record_pos = 2 + mid * record_len;
            let candidate: GlyphId = set_data.read_at(record_pos).ok()?;
            match second.cmp(&candidate) {
                std::cmp::Ordering::Greater => lo = mid + 1,
                std::cmp::Ordering::Less => hi = mid,
                std::cmp::Ordering::Equal => {
                    let value1 =
                        ValueRecord::read(set_data.split_off(record_pos + 2)?, self.value_format1)
                            .ok()?;
                    let value2 = ValueRecord::read(
                        set_data
                            .split_off(record_pos + 2 + self.value_format1.record_byte_len())?,
                        self.value_format2,
                    )
                    .ok()?;
                    return Some((value1, value2));
                }
            }
        }
        None
    }
}

/// Pair adjustment by glyph class pair.
#[derive(Clone)]
pub struct PairPosFormat2<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    value_format1: ValueFormat,
    value_format2: ValueFormat,
    class_def1: ClassDef<'a>,
    class_def2: ClassDef<'a>,
    class1_count: u16,
    class2_count: u16,
}

impl<'a> FontRead<'a> for PairPosFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let value_format1 = ValueFormat::from_bits(cursor.read()?);
        let value_format2 = ValueFormat::from_bits(cursor.read()?);
        let class_def1_offset: Offset16 = cursor.read()?;
        let class_def2_offset: Offset16 = cursor.read()?;
        let class1_count: u16 = cursor.read()?;
        let class2_count: u16 = cursor.read()?;
        let resolve = |offset: Offset16| -> Result<FontData<'a>, ReadError> {
            data.split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
                .ok_or(ReadError::OutOfBounds)
        };
        Ok(PairPosFormat2 {
            data,
            coverage: CoverageTable::read(resolve(coverage_offset)?)?,
            value_format1,
            value_format2,
            class_def1: ClassDef::read(resolve(class_def1_offset)?)?,
            class_def2: ClassDef::read(resolve(class_def2_offset)?)?,
            class1_count,
            class2_count,
        })
    }
}

impl PairPosFormat2<'_> {
    fn pair(&self, first: GlyphId, second: GlyphId) -> Option<(ValueRecord, ValueRecord)> {
        self.coverage.get(first)?;
        let class1 = self.class_def1.get(first);
        let class2 = self.class_def2.get(second);
        if class1 >= self.class1_count || class2 >= self.class2_count {
            return None;
        }
        let record_len =
            self.value_format1.record_byte_len() + self.value_format2.record_byte_len();
        let offset = 16
            + (class1 as usize * self.class2_count as usize + class2 as usize) * record_len;
        let value1 = ValueRecord::read(self.data.split_off(offset)?, self.value_format1).ok()?;
        let value2 = ValueRecord::read(
            self.data
                .split_off(offset + self.value_format1.record_byte_len())?,
            self.value_format2,
        )
        .ok()?;
        Some((value1, value2))
    }
}

/// An entry/exit anchor pair for cursive attachment.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct EntryExitRecord {
    pub entry_anchor_offset: BigEndian<Offset16>,
    pub exit_anchor_offset: BigEndian<Offset16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for EntryExitRecord {}
unsafe impl bytemuck::AnyBitPattern for EntryExitRecord {}

impl FixedSize for EntryExitRecord {
    const RAW_BYTE_LEN: usize = 4;
}

/// Cursive attachment positioning.
#[derive(Clone)]
pub struct CursivePosFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    entry_exit_records: &'a [EntryExitRecord],
}

impl<'a> FontRead<'a> for CursivePosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let entry_exit_count: u16 = cursor.read()?;
        let entry_exit_records = cursor.read_array(entry_exit_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(CursivePosFormat1 {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            entry_exit_records,
        })
    }
}

impl CursivePosFormat1<'_> {
    /// The coverage of glyphs participating in the cursive chain.
    pub fn coverage(&self) -> &CoverageTable<'_> {
        &self.coverage
    }

    fn anchors(&self, glyph_id: GlyphId) -> Option<&EntryExitRecord> {
        let coverage_index = self.coverage.get(glyph_id)?;
        self.entry_exit_records.get(coverage_index as usize)
    }

    /// The entry anchor of the glyph, if covered and present.
    pub fn entry_anchor(&self, glyph_id: GlyphId) -> Option<Anchor> {
        read_anchor_at(self.data, self.anchors(glyph_id)?.entry_anchor_offset.get())
    }

    /// The exit anchor of the glyph, if covered and present.
    pub fn exit_anchor(&self, glyph_id: GlyphId) -> Option<Anchor> {
        read_anchor_at(self.data, self.anchors(glyph_id)?.exit_anchor_offset.get())
    }
}

/// A mark class paired with an anchor offset.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct MarkRecord {
    pub mark_class: BigEndian<u16>,
    pub mark_anchor_offset: BigEndian<Offset16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for MarkRecord {}
unsafe impl bytemuck::AnyBitPattern for MarkRecord {}

impl FixedSize for MarkRecord {
    const RAW_BYTE_LEN: usize = 4;
}

/// The mark array shared by the mark attachment subtables.
#[derive(Clone)]
pub struct MarkArray<'a> {
    data: FontData<'a>,
    mark_records: &'a [MarkRecord],
}

impl<'a> FontRead<'a> for MarkArray<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let mark_count: u16 = cursor.read()?;
        let mark_records = cursor.read_array(mark_count as usize)?;
        Ok(MarkArray { data, mark_records })
    }
}

impl MarkArray<'_> {
    /// The class and anchor of the mark at the given coverage index.
    fn get(&self, index: u16) -> Option<(u16, Anchor)> {
        let record = self.mark_records.get(index as usize)?;
        let anchor = read_anchor_at(self.data, record.mark_anchor_offset.get())?;
        Some((record.mark_class.get(), anchor))
    }
}

/// Mark-to-base attachment positioning.
#[derive(Clone)]
pub struct MarkBasePosFormat1<'a> {
    mark_coverage: CoverageTable<'a>,
    base_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark_array: MarkArray<'a>,
    base_array_data: FontData<'a>,
}

impl<'a> FontRead<'a> for MarkBasePosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let mark_coverage_offset: Offset16 = cursor.read()?;
        let base_coverage_offset: Offset16 = cursor.read()?;
        let mark_class_count: u16 = cursor.read()?;
        let mark_array_offset: Offset16 = cursor.read()?;
        let base_array_offset: Offset16 = cursor.read()?;
        let resolve = |offset: Offset16| -> Result<FontData<'a>, ReadError> {
            data.split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
                .ok_or(ReadError::OutOfBounds)
        };
        Ok(MarkBasePosFormat1 {
            mark_coverage: CoverageTable::read(resolve(mark_coverage_offset)?)?,
            base_coverage: CoverageTable::read(resolve(base_coverage_offset)?)?,
            mark_class_count,
            mark_array: MarkArray::read(resolve(mark_array_offset)?)?,
            base_array_data: resolve(base_array_offset)?,
        })
    }
}

impl MarkBasePosFormat1<'_> {
    /// The class and anchor for the given mark glyph, if covered.
    pub fn mark_anchor(&self, glyph_id: GlyphId) -> Option<(u16, Anchor)> {
        let index = self.mark_coverage.get(glyph_id)?;
        self.mark_array.get(index)
    }

    /// The anchor on the given base glyph for a mark of the given class.
    pub fn base_anchor(&self, glyph_id: GlyphId, mark_class: u16) -> Option<Anchor> {
        if mark_class >= self.mark_class_count {
            return None;
        }
        let index = self.base_coverage.get(glyph_id)?;
        let offset_pos =
            2 + (index as usize * self.mark_class_count as usize + mark_class as usize) * 2;
        let anchor_offset: Offset16 = self.base_array_data.read_at(offset_pos).ok()?;
        read_anchor_at(self.base_array_data, anchor_offset)
    }
}

/// Mark-to-ligature attachment positioning.
#[derive(Clone)]
pub struct MarkLigPosFormat1<'a> {
    mark_coverage: CoverageTable<'a>,
    ligature_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark_array: MarkArray<'a>,
    ligature_array_data: FontData<'a>,
}

impl<'a> FontRead<'a> for MarkLigPosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let mark_coverage_offset: Offset16 = cursor.read()?;
        let ligature_coverage_offset: Offset16 = cursor.read()?;
        let mark_class_count: u16 = cursor.read()?;
        let mark_array_offset: Offset16 = cursor.read()?;
        let ligature_array_offset: Offset16 = cursor.read()?;
        let resolve = |offset: Offset16| -> Result<FontData<'a>, ReadError> {
            data.split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
                .ok_or(ReadError::OutOfBounds)
        };
        Ok(MarkLigPosFormat1 {
            mark_coverage: CoverageTable::read(resolve(mark_coverage_offset)?)?,
            ligature_coverage: CoverageTable::read(resolve(ligature_coverage_offset)?)?,
            mark_class_count,
            mark_array: MarkArray::read(resolve(mark_array_offset)?)?,
            ligature_array_data: resolve(ligature_array_offset)?,
        })
    }
}

impl MarkLigPosFormat1<'_> {
    /// The class and anchor for the given mark glyph, if covered.
    pub fn mark_anchor(&self, glyph_id: GlyphId) -> Option<(u16, Anchor)> {
        let index = self.mark_coverage.get(glyph_id)?;
        self.mark_array.get(index)
    }

    /// The anchor on the given ligature glyph, for the given component and
    /// mark class.
    pub fn ligature_anchor(
        &self,
        glyph_id: GlyphId,
        component_index: u16,
        mark_class: u16,
    ) -> Option<Anchor> {
        if mark_class >= self.mark_class_count {
            return None;
        }
        let index = self.ligature_coverage.get(glyph_id)?;
        let attach_offset: Offset16 = self
            .ligature_array_data
            .read_at(2 + index as usize * 2)
            .ok()?;
        let attach_data = self.ligature_array_data.split_off(attach_offset.non_null()?)?;
        let component_count: u16 = attach_data.read_at(0).ok()?;
        // a mark past the last component attaches to the last one
        let component = component_index.min(component_count.checked_sub(1)?);
        let offset_pos =
            2 + (component as usize * self.mark_class_count as usize + mark_class as usize) * 2;
        let anchor_offset: Offset16 = attach_data.read_at(offset_pos).ok()?;
        read_anchor_at(attach_data, anchor_offset)
    }
}

/// Mark-to-mark attachment positioning.
#[derive(Clone)]
pub struct MarkMarkPosFormat1<'a> {
    mark1_coverage: CoverageTable<'a>,
    mark2_coverage: CoverageTable<'a>,
    mark_class_count: u16,
    mark1_array: MarkArray<'a>,
    mark2_array_data: FontData<'a>,
}

impl<'a> FontRead<'a> for MarkMarkPosFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let mark1_coverage_offset: Offset16 = cursor.read()?;
        let mark2_coverage_offset: Offset16 = cursor.read()?;
        let mark_class_count: u16 = cursor.read()?;
        let mark1_array_offset: Offset16 = cursor.read()?;
        let mark2_array_offset: Offset16 = cursor.read()?;
        let resolve = |offset: Offset16| -> Result<FontData<'a>, ReadError> {
            data.split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
                .ok_or(ReadError::OutOfBounds)
        };
        Ok(MarkMarkPosFormat1 {
            mark1_coverage: CoverageTable::read(resolve(mark1_coverage_offset)?)?,
            mark2_coverage: CoverageTable::read(resolve(mark2_coverage_offset)?)?,
            mark_class_count,
            mark1_array: MarkArray::read(resolve(mark1_array_offset)?)?,
            mark2_array_data: resolve(mark2_array_offset)?,
        })
    }
}

impl MarkMarkPosFormat1<'_> {
    /// The class and anchor for the given attaching mark, if covered.
    pub fn mark1_anchor(&self, glyph_id: GlyphId) -> Option<(u16, Anchor)> {
        let index = self.mark1_coverage.get(glyph_id)?;
        self.mark1_array.get(index)
    }

    /// The anchor on the given attached-to mark for a mark of the given
    /// class.
    pub fn mark2_anchor(&self, glyph_id: GlyphId, mark_class: u16) -> Option<Anchor> {
        if mark_class >= self.mark_class_count {
            return None;
        }
        let index = self.mark2_coverage.get(glyph_id)?;
        let offset_pos =
            2 + (index as usize * self.mark_class_count as usize + mark_class as usize) * 2;
        let anchor_offset: Offset16 = self.mark2_array_data.read_at(offset_pos).ok()?;
        read_anchor_at(self.mark2_array_data, anchor_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn single_pos_format1() {
        // format 1, coverage at 8, Y_PLACEMENT, -80
        let mut bytes = be16(&[1, 8, 0x0002]);
        bytes.extend_from_slice(&(-80i16).to_be_bytes());
        bytes.extend_from_slice(&be16(&[1, 1, 7]));
        let subtable = SinglePos::read(FontData::new(&bytes)).unwrap();
        let value = subtable.value(GlyphId::new(7)).unwrap();
        assert_eq!(value.y_placement, -80);
        assert_eq!(value.x_advance, 0);
        assert!(subtable.value(GlyphId::new(8)).is_none());
    }

    #[test]
    fn single_pos_format2() {
        // format 2, coverage at 12, X_ADVANCE, 2 values [15, 25];
        // coverage covers glyphs 4 and 5
        let mut bytes = be16(&[2, 12, 0x0004, 2]);
        bytes.extend_from_slice(&15i16.to_be_bytes());
        bytes.extend_from_slice(&25i16.to_be_bytes());
        bytes.extend_from_slice(&be16(&[1, 2, 4, 5]));
        let subtable = SinglePos::read(FontData::new(&bytes)).unwrap();
        assert_eq!(subtable.value(GlyphId::new(4)).unwrap().x_advance, 15);
        assert_eq!(subtable.value(GlyphId::new(5)).unwrap().x_advance, 25);
    }

    #[test]
    fn pair_pos_format1_kerns_by_glyph() {
        // format 1, coverage at 12, vf1 = X_ADVANCE, vf2 = 0, one pair set
        // at 18; coverage covers glyph 1 ('A'); pair set: 1 record,
        // second glyph 2 ('V'), value -40
        let mut bytes = be16(&[1, 12, 0x0004, 0, 1, 18]);
        bytes.extend_from_slice(&be16(&[1, 1, 1])); // coverage
        bytes.extend_from_slice(&be16(&[1, 2])); // pair count, second glyph
        bytes.extend_from_slice(&(-40i16).to_be_bytes());
        let subtable = PairPos::read(FontData::new(&bytes)).unwrap();
        let (first, second) = subtable.pair(GlyphId::new(1), GlyphId::new(2)).unwrap();
        assert_eq!(first.x_advance, -40);
        assert!(second.is_zero());
        assert!(subtable.pair(GlyphId::new(1), GlyphId::new(3)).is_none());
        assert!(subtable.pair(GlyphId::new(2), GlyphId::new(2)).is_none());
    }

    #[test]
    fn pair_pos_format2_kerns_by_class() {
        // format 2: coverage at 24, vf1 = X_ADVANCE, class defs at 32/40,
        // 2x2 classes; record for (1, 1) = -55
        let mut bytes = be16(&[2, 24, 0x0004, 0, 32, 40, 2, 2]);
        for value in [0i16, 0, 0, -55] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes.extend_from_slice(&be16(&[1, 2, 10, 11])); // coverage: glyphs 10, 11
        bytes.extend_from_slice(&be16(&[1, 10, 1, 1])); // classdef1: glyph 10 -> 1
        bytes.extend_from_slice(&be16(&[1, 20, 1, 1])); // classdef2: glyph 20 -> 1
        let subtable = PairPos::read(FontData::new(&bytes)).unwrap();
        let (first, _) = subtable.pair(GlyphId::new(10), GlyphId::new(20)).unwrap();
        assert_eq!(first.x_advance, -55);
        let (first, _) = subtable.pair(GlyphId::new(10), GlyphId::new(21)).unwrap();
        assert_eq!(first.x_advance, 0);
    }

    #[test]
    fn cursive_anchors() {
        // format 1, coverage at 10, 1 record: entry at 16, exit null
        let mut bytes = be16(&[1, 10, 1, 16, 0]);
        bytes.extend_from_slice(&be16(&[1, 1, 6])); // coverage: glyph 6
        bytes.extend_from_slice(&be16(&[1])); // anchor format 1
        bytes.extend_from_slice(&150i16.to_be_bytes());
        bytes.extend_from_slice(&(-20i16).to_be_bytes());
        let subtable = CursivePosFormat1::read(FontData::new(&bytes)).unwrap();
        assert_eq!(
            subtable.entry_anchor(GlyphId::new(6)),
            Some(Anchor { x: 150, y: -20 })
        );
        assert_eq!(subtable.exit_anchor(GlyphId::new(6)), None);
    }

    #[test]
    fn mark_to_base_anchors() {
        // format 1, mark coverage at 12, base coverage at 18, 1 class,
        // mark array at 24, base array at 36
        let mut bytes = be16(&[1, 12, 18, 1, 24, 36]);
        bytes.extend_from_slice(&be16(&[1, 1, 5])); // mark coverage: glyph 5
        bytes.extend_from_slice(&be16(&[1, 1, 2])); // base coverage: glyph 2
        // mark array: 1 record, class 0, anchor at 6 (rel)
        bytes.extend_from_slice(&be16(&[1, 0, 6]));
        bytes.extend_from_slice(&be16(&[1])); // anchor fmt 1
        bytes.extend_from_slice(&10i16.to_be_bytes());
        bytes.extend_from_slice(&20i16.to_be_bytes());
        // base array: 1 base x 1 class, anchor at 4 (rel)
        bytes.extend_from_slice(&be16(&[1, 4]));
        bytes.extend_from_slice(&be16(&[1])); // anchor fmt 1
        bytes.extend_from_slice(&100i16.to_be_bytes());
        bytes.extend_from_slice(&200i16.to_be_bytes());
        let subtable = MarkBasePosFormat1::read(FontData::new(&bytes)).unwrap();
        let (class, mark_anchor) = subtable.mark_anchor(GlyphId::new(5)).unwrap();
        assert_eq!(class, 0);
        assert_eq!(mark_anchor, Anchor { x: 10, y: 20 });
        assert_eq!(
            subtable.base_anchor(GlyphId::new(2), 0),
            Some(Anchor { x: 100, y: 200 })
        );
        assert!(subtable.base_anchor(GlyphId::new(2), 1).is_none());
    }
}
