//! OpenType Layout common table formats

mod lookup_flag;

pub use lookup_flag::LookupFlag;

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::{BigEndian, FixedSize, GlyphId, Offset16, Offset32, Tag};

/// A tag paired with a 16-bit offset, as used by the script, feature and
/// language-system lists.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct TagOffsetRecord {
    pub tag: BigEndian<Tag>,
    pub offset: BigEndian<Offset16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for TagOffsetRecord {}
unsafe impl bytemuck::AnyBitPattern for TagOffsetRecord {}

impl FixedSize for TagOffsetRecord {
    const RAW_BYTE_LEN: usize = 6;
}

fn find_record(records: &[TagOffsetRecord], tag: Tag) -> Option<Offset16> {
    records
        .binary_search_by(|rec| rec.tag.get().cmp(&tag))
        .ok()
        .map(|idx| records[idx].offset.get())
}

/// A glyph range in a format 2 coverage table.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RangeRecord {
    pub start_glyph_id: BigEndian<GlyphId>,
    pub end_glyph_id: BigEndian<GlyphId>,
    pub start_coverage_index: BigEndian<u16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for RangeRecord {}
unsafe impl bytemuck::AnyBitPattern for RangeRecord {}

impl FixedSize for RangeRecord {
    const RAW_BYTE_LEN: usize = 6;
}

/// A coverage table, mapping glyphs to dense indices.
#[derive(Clone)]
pub enum CoverageTable<'a> {
    Format1(CoverageFormat1<'a>),
    Format2(CoverageFormat2<'a>),
}

impl<'a> FontRead<'a> for CoverageTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => CoverageFormat1::read(data).map(Self::Format1),
            2 => CoverageFormat2::read(data).map(Self::Format2),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

impl<'a> CoverageTable<'a> {
    /// The coverage index for the glyph, or `None` if it is not covered.
    ///
    /// An unsorted or overlapping table is not rejected at parse time; a
    /// search that lands on the wrong entry simply reports the glyph as
    /// uncovered.
    pub fn get(&self, glyph_id: GlyphId) -> Option<u16> {
        match self {
            Self::Format1(table) => table.get(glyph_id),
            Self::Format2(table) => table.get(glyph_id),
        }
    }

    /// Iterate over all covered glyphs, in coverage index order.
    pub fn iter(&self) -> impl Iterator<Item = GlyphId> + 'a {
        let (iter1, iter2) = match self {
            Self::Format1(table) => (Some(table.glyph_array.iter().map(|g| g.get())), None),
            Self::Format2(table) => {
                let iter = table.range_records.iter().flat_map(|range| {
                    (range.start_glyph_id.get().to_u16()..=range.end_glyph_id.get().to_u16())
                        .map(GlyphId::new)
                });
                (None, Some(iter))
            }
        };
        iter1
            .into_iter()
            .flatten()
            .chain(iter2.into_iter().flatten())
    }
}

/// A coverage table listing individual glyphs.
#[derive(Clone)]
pub struct CoverageFormat1<'a> {
    glyph_array: &'a [BigEndian<GlyphId>],
}

impl<'a> FontRead<'a> for CoverageFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let glyph_count: u16 = cursor.read()?;
        let glyph_array = cursor.read_array(glyph_count as usize)?;
        Ok(CoverageFormat1 { glyph_array })
    }
}

impl CoverageFormat1<'_> {
    fn get(&self, glyph_id: GlyphId) -> Option<u16> {
        self.glyph_array
            .binary_search_by(|probe| probe.get().cmp(&glyph_id))
            .ok()
            .map(|idx| idx as u16)
    }
}

/// A coverage table listing glyph ranges.
#[derive(Clone)]
pub struct CoverageFormat2<'a> {
    range_records: &'a [RangeRecord],
}

impl<'a> FontRead<'a> for CoverageFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let range_count: u16 = cursor.read()?;
        let range_records = cursor.read_array(range_count as usize)?;
        Ok(CoverageFormat2 { range_records })
    }
}

impl CoverageFormat2<'_> {
    fn get(&self, glyph_id: GlyphId) -> Option<u16> {
        let idx = self
            .range_records
            .partition_point(|range| range.end_glyph_id.get() < glyph_id);
        let range = self.range_records.get(idx)?;
        if glyph_id < range.start_glyph_id.get() {
            return None;
        }
        Some(
            range
                .start_coverage_index
                .get()
                .wrapping_add(glyph_id.to_u16() - range.start_glyph_id.get().to_u16()),
        )
    }
}

/// A glyph range mapped to a class in a format 2 class definition.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct ClassRangeRecord {
    pub start_glyph_id: BigEndian<GlyphId>,
    pub end_glyph_id: BigEndian<GlyphId>,
    pub class: BigEndian<u16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for ClassRangeRecord {}
unsafe impl bytemuck::AnyBitPattern for ClassRangeRecord {}

impl FixedSize for ClassRangeRecord {
    const RAW_BYTE_LEN: usize = 6;
}

/// A class definition table, mapping glyphs to small integer classes.
///
/// Class 0 means "not in any listed class" and is the value for any glyph
/// the table does not mention.
#[derive(Clone)]
pub enum ClassDef<'a> {
    Format1(ClassDefFormat1<'a>),
    Format2(ClassDefFormat2<'a>),
}

impl<'a> FontRead<'a> for ClassDef<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => ClassDefFormat1::read(data).map(Self::Format1),
            2 => ClassDefFormat2::read(data).map(Self::Format2),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

impl ClassDef<'_> {
    /// The class for the glyph.
    pub fn get(&self, glyph_id: GlyphId) -> u16 {
        match self {
            Self::Format1(table) => table.get(glyph_id),
            Self::Format2(table) => table.get(glyph_id),
        }
    }
}

/// A class definition covering a contiguous glyph range.
#[derive(Clone)]
pub struct ClassDefFormat1<'a> {
    start_glyph_id: GlyphId,
    class_values: &'a [BigEndian<u16>],
}

impl<'a> FontRead<'a> for ClassDefFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let start_glyph_id: GlyphId = cursor.read()?;
        let glyph_count: u16 = cursor.read()?;
        let class_values = cursor.read_array(glyph_count as usize)?;
        Ok(ClassDefFormat1 {
            start_glyph_id,
            class_values,
        })
    }
}

impl ClassDefFormat1<'_> {
    fn get(&self, glyph_id: GlyphId) -> u16 {
        glyph_id
            .to_u16()
            .checked_sub(self.start_glyph_id.to_u16())
            .and_then(|idx| self.class_values.get(idx as usize))
            .map(|class| class.get())
            .unwrap_or_default()
    }
}

/// A class definition listing glyph ranges.
#[derive(Clone)]
pub struct ClassDefFormat2<'a> {
    class_range_records: &'a [ClassRangeRecord],
}

impl<'a> FontRead<'a> for ClassDefFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let range_count: u16 = cursor.read()?;
        let class_range_records = cursor.read_array(range_count as usize)?;
        Ok(ClassDefFormat2 {
            class_range_records,
        })
    }
}

impl ClassDefFormat2<'_> {
    fn get(&self, glyph_id: GlyphId) -> u16 {
        let idx = self
            .class_range_records
            .partition_point(|range| range.end_glyph_id.get() < glyph_id);
        match self.class_range_records.get(idx) {
            Some(range) if range.start_glyph_id.get() <= glyph_id => range.class.get(),
            _ => 0,
        }
    }
}

/// The script list of a layout table.
#[derive(Clone)]
pub struct ScriptList<'a> {
    data: FontData<'a>,
    records: &'a [TagOffsetRecord],
}

impl<'a> FontRead<'a> for ScriptList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let script_count: u16 = cursor.read()?;
        let records = cursor.read_array(script_count as usize)?;
        Ok(ScriptList { data, records })
    }
}

impl<'a> ScriptList<'a> {
    /// The script records, ordered by tag.
    pub fn script_records(&self) -> &'a [TagOffsetRecord] {
        self.records
    }

    /// Returns the script with the given tag.
    pub fn get(&self, tag: Tag) -> Option<Script<'a>> {
        let offset = find_record(self.records, tag)?.non_null()?;
        Script::read(self.data.split_off(offset)?).ok()
    }

    /// Finds the first available script matching one of the given tags.
    ///
    /// When none of the requested scripts are available, `DFLT`, `dflt` and
    /// `latn` are tried in that order; many fonts put their features under
    /// one of those even for other scripts.
    pub fn select(&self, tags: &[Tag]) -> Option<(Tag, Script<'a>)> {
        for &tag in tags {
            if let Some(script) = self.get(tag) {
                return Some((tag, script));
            }
        }
        for tag in [Tag::new(b"DFLT"), Tag::new(b"dflt"), Tag::new(b"latn")] {
            if let Some(script) = self.get(tag) {
                return Some((tag, script));
            }
        }
        None
    }
}

/// A script and its language systems.
#[derive(Clone)]
pub struct Script<'a> {
    data: FontData<'a>,
    default_lang_sys_offset: Offset16,
    records: &'a [TagOffsetRecord],
}

impl<'a> FontRead<'a> for Script<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let default_lang_sys_offset: Offset16 = cursor.read()?;
        let lang_sys_count: u16 = cursor.read()?;
        let records = cursor.read_array(lang_sys_count as usize)?;
        Ok(Script {
            data,
            default_lang_sys_offset,
            records,
        })
    }
}

impl<'a> Script<'a> {
    /// The default language system, if the script declares one.
    pub fn default_lang_sys(&self) -> Option<LangSys<'a>> {
        let offset = self.default_lang_sys_offset.non_null()?;
        LangSys::read(self.data.split_off(offset)?).ok()
    }

    /// The named language system with the given tag.
    pub fn lang_sys(&self, tag: Tag) -> Option<LangSys<'a>> {
        let offset = find_record(self.records, tag)?.non_null()?;
        LangSys::read(self.data.split_off(offset)?).ok()
    }

    /// Resolve a language system, falling back from the requested tag to
    /// `dflt` and then to the script's default.
    pub fn select_lang_sys(&self, tag: Option<Tag>) -> Option<LangSys<'a>> {
        if let Some(tag) = tag {
            if let Some(lang_sys) = self.lang_sys(tag) {
                return Some(lang_sys);
            }
            if let Some(lang_sys) = self.lang_sys(Tag::new(b"dflt")) {
                return Some(lang_sys);
            }
        }
        self.default_lang_sys()
    }
}

/// The feature indices of one language system.
#[derive(Clone)]
pub struct LangSys<'a> {
    required_feature_index: u16,
    feature_indices: &'a [BigEndian<u16>],
}

impl<'a> FontRead<'a> for LangSys<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        // lookupOrderOffset, reserved and always null
        let _: u16 = cursor.read()?;
        let required_feature_index: u16 = cursor.read()?;
        let feature_index_count: u16 = cursor.read()?;
        let feature_indices = cursor.read_array(feature_index_count as usize)?;
        Ok(LangSys {
            required_feature_index,
            feature_indices,
        })
    }
}

impl<'a> LangSys<'a> {
    /// The feature required by this language system, if any.
    pub fn required_feature_index(&self) -> Option<u16> {
        (self.required_feature_index != 0xFFFF).then_some(self.required_feature_index)
    }

    /// Indices into the feature list for this language system.
    pub fn feature_indices(&self) -> &'a [BigEndian<u16>] {
        self.feature_indices
    }
}

/// The feature list of a layout table.
#[derive(Clone)]
pub struct FeatureList<'a> {
    data: FontData<'a>,
    records: &'a [TagOffsetRecord],
}

impl<'a> FontRead<'a> for FeatureList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let feature_count: u16 = cursor.read()?;
        let records = cursor.read_array(feature_count as usize)?;
        Ok(FeatureList { data, records })
    }
}

impl<'a> FeatureList<'a> {
    /// The number of features in the list.
    pub fn feature_count(&self) -> u16 {
        self.records.len() as u16
    }

    /// The tag and table of the feature at the given index.
    pub fn get(&self, index: u16) -> Option<(Tag, Feature<'a>)> {
        let record = self.records.get(index as usize)?;
        let offset = record.offset.get().non_null()?;
        let feature = Feature::read(self.data.split_off(offset)?).ok()?;
        Some((record.tag.get(), feature))
    }
}

/// One feature: the lookups it activates.
#[derive(Clone)]
pub struct Feature<'a> {
    lookup_list_indices: &'a [BigEndian<u16>],
}

impl<'a> FontRead<'a> for Feature<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        // featureParamsOffset; only meaningful for a few features ('size',
        // 'ssXX', 'cvXX') and not consulted by the shaper
        let _: u16 = cursor.read()?;
        let lookup_index_count: u16 = cursor.read()?;
        let lookup_list_indices = cursor.read_array(lookup_index_count as usize)?;
        Ok(Feature {
            lookup_list_indices,
        })
    }
}

impl<'a> Feature<'a> {
    /// Indices into the lookup list, in application order.
    pub fn lookup_list_indices(&self) -> &'a [BigEndian<u16>] {
        self.lookup_list_indices
    }
}

/// The lookup list of a layout table.
#[derive(Clone)]
pub struct LookupList<'a> {
    data: FontData<'a>,
    offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for LookupList<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let lookup_count: u16 = cursor.read()?;
        let offsets = cursor.read_array(lookup_count as usize)?;
        Ok(LookupList { data, offsets })
    }
}

impl<'a> LookupList<'a> {
    /// The number of lookups in the list.
    pub fn lookup_count(&self) -> u16 {
        self.offsets.len() as u16
    }

    /// The lookup at the given index.
    pub fn get(&self, index: u16) -> Result<Lookup<'a>, ReadError> {
        let offset = self
            .offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Lookup::read(data)
    }
}

/// A lookup header: type, flags and subtables.
///
/// The numeric lookup type is interpreted in the context of the parent
/// table; the same value means different things in `GSUB` and `GPOS`.
#[derive(Clone)]
pub struct Lookup<'a> {
    data: FontData<'a>,
    lookup_type: u16,
    lookup_flag: LookupFlag,
    subtable_offsets: &'a [BigEndian<Offset16>],
    mark_filtering_set: Option<u16>,
}

impl<'a> FontRead<'a> for Lookup<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let lookup_type: u16 = cursor.read()?;
        let lookup_flag = LookupFlag::from_bits_truncate(cursor.read()?);
        let subtable_count: u16 = cursor.read()?;
        let subtable_offsets = cursor.read_array(subtable_count as usize)?;
        let mark_filtering_set = lookup_flag
            .contains(LookupFlag::USE_MARK_FILTERING_SET)
            .then(|| cursor.read())
            .transpose()?;
        Ok(Lookup {
            data,
            lookup_type,
            lookup_flag,
            subtable_offsets,
            mark_filtering_set,
        })
    }
}

impl<'a> Lookup<'a> {
    /// The raw lookup type.
    pub fn lookup_type(&self) -> u16 {
        self.lookup_type
    }

    /// The flags controlling which glyphs the lookup skips.
    pub fn lookup_flag(&self) -> LookupFlag {
        self.lookup_flag
    }

    /// The mark filtering set index, when `USE_MARK_FILTERING_SET` is set.
    pub fn mark_filtering_set(&self) -> Option<u16> {
        self.mark_filtering_set
    }

    /// The number of subtables in this lookup.
    pub fn subtable_count(&self) -> u16 {
        self.subtable_offsets.len() as u16
    }

    /// The raw data of the subtable at the given index.
    pub fn subtable_data(&self, index: u16) -> Result<FontData<'a>, ReadError> {
        let offset = self
            .subtable_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        self.data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)
    }
}

/// Resolve an extension wrapper: returns the wrapped lookup type and the
/// data of the real subtable it points at.
pub(crate) fn resolve_extension(data: FontData) -> Result<(u16, FontData), ReadError> {
    let mut cursor = data.cursor();
    let format: u16 = cursor.read()?;
    if format != 1 {
        return Err(ReadError::InvalidFormat(format as i64));
    }
    let lookup_type: u16 = cursor.read()?;
    let offset: Offset32 = cursor.read()?;
    let data = data
        .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
        .ok_or(ReadError::OutOfBounds)?;
    Ok((lookup_type, data))
}

/// A nested lookup invocation in a contextual rule.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct SequenceLookupRecord {
    pub sequence_index: BigEndian<u16>,
    pub lookup_list_index: BigEndian<u16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for SequenceLookupRecord {}
unsafe impl bytemuck::AnyBitPattern for SequenceLookupRecord {}

impl FixedSize for SequenceLookupRecord {
    const RAW_BYTE_LEN: usize = 4;
}

/// A contextual rule: the input tail to match, and the lookups to run.
///
/// The same layout serves format 1 (matching by glyph id) and format 2
/// (matching by class); only the interpretation of the input values
/// differs.
#[derive(Clone)]
pub struct SequenceRule<'a> {
    input_sequence: &'a [BigEndian<u16>],
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for SequenceRule<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let glyph_count: u16 = cursor.read()?;
        if glyph_count == 0 {
            return Err(ReadError::MalformedData("empty input in sequence rule"));
        }
        let seq_lookup_count: u16 = cursor.read()?;
        let input_sequence = cursor.read_array(glyph_count as usize - 1)?;
        let seq_lookup_records = cursor.read_array(seq_lookup_count as usize)?;
        Ok(SequenceRule {
            input_sequence,
            seq_lookup_records,
        })
    }
}

impl<'a> SequenceRule<'a> {
    /// The values (glyph ids or classes) to match after the first position.
    pub fn input_sequence(&self) -> &'a [BigEndian<u16>] {
        self.input_sequence
    }

    /// The nested lookups to run on a match.
    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

/// A set of contextual rules sharing a first glyph or class.
#[derive(Clone)]
pub struct SequenceRuleSet<'a> {
    data: FontData<'a>,
    rule_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for SequenceRuleSet<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let rule_count: u16 = cursor.read()?;
        let rule_offsets = cursor.read_array(rule_count as usize)?;
        Ok(SequenceRuleSet { data, rule_offsets })
    }
}

impl<'a> SequenceRuleSet<'a> {
    /// The number of rules in the set.
    pub fn rule_count(&self) -> u16 {
        self.rule_offsets.len() as u16
    }

    /// The rule at the given index.
    pub fn rule(&self, index: u16) -> Result<SequenceRule<'a>, ReadError> {
        let offset = self
            .rule_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        SequenceRule::read(data)
    }
}

/// A contextual matching table (GSUB type 5, GPOS type 7).
#[derive(Clone)]
pub enum SequenceContext<'a> {
    Format1(SequenceContextFormat1<'a>),
    Format2(SequenceContextFormat2<'a>),
    Format3(SequenceContextFormat3<'a>),
}

impl<'a> FontRead<'a> for SequenceContext<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => SequenceContextFormat1::read(data).map(Self::Format1),
            2 => SequenceContextFormat2::read(data).map(Self::Format2),
            3 => SequenceContextFormat3::read(data).map(Self::Format3),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

/// Contextual matching by glyph id.
#[derive(Clone)]
pub struct SequenceContextFormat1<'a> {
    data: FontData<'a>,
    coverage_offset: Offset16,
    rule_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for SequenceContextFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let rule_set_count: u16 = cursor.read()?;
        let rule_set_offsets = cursor.read_array(rule_set_count as usize)?;
        Ok(SequenceContextFormat1 {
            data,
            coverage_offset,
            rule_set_offsets,
        })
    }
}

impl<'a> SequenceContextFormat1<'a> {
    /// The coverage table for the first matched glyph.
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.coverage_offset.non_null().ok_or(ReadError::NullOffset)?;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    /// The rule set for the given coverage index, if non-null.
    pub fn rule_set(&self, index: u16) -> Option<Result<SequenceRuleSet<'a>, ReadError>> {
        let offset = self.rule_set_offsets.get(index as usize)?.get().non_null()?;
        Some(
            self.data
                .split_off(offset)
                .ok_or(ReadError::OutOfBounds)
                .and_then(SequenceRuleSet::read),
        )
    }
}

/// Contextual matching by class.
#[derive(Clone)]
pub struct SequenceContextFormat2<'a> {
    data: FontData<'a>,
    coverage_offset: Offset16,
    class_def_offset: Offset16,
    rule_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for SequenceContextFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let class_def_offset: Offset16 = cursor.read()?;
        let rule_set_count: u16 = cursor.read()?;
        let rule_set_offsets = cursor.read_array(rule_set_count as usize)?;
        Ok(SequenceContextFormat2 {
            data,
            coverage_offset,
            class_def_offset,
            rule_set_offsets,
        })
    }
}

impl<'a> SequenceContextFormat2<'a> {
    /// The coverage table for the first matched glyph.
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.coverage_offset.non_null().ok_or(ReadError::NullOffset)?;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    /// The class definition the rule inputs are matched against.
    pub fn class_def(&self) -> Result<ClassDef<'a>, ReadError> {
        let offset = self.class_def_offset.non_null().ok_or(ReadError::NullOffset)?;
        ClassDef::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    /// The rule set for the given class, if non-null.
    pub fn rule_set(&self, class: u16) -> Option<Result<SequenceRuleSet<'a>, ReadError>> {
        let offset = self.rule_set_offsets.get(class as usize)?.get().non_null()?;
        Some(
            self.data
                .split_off(offset)
                .ok_or(ReadError::OutOfBounds)
                .and_then(SequenceRuleSet::read),
        )
    }
}

/// Contextual matching by per-position coverage.
#[derive(Clone)]
pub struct SequenceContextFormat3<'a> {
    data: FontData<'a>,
    coverage_offsets: &'a [BigEndian<Offset16>],
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for SequenceContextFormat3<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 3 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let glyph_count: u16 = cursor.read()?;
        if glyph_count == 0 {
            return Err(ReadError::MalformedData("empty input in sequence context"));
        }
        let seq_lookup_count: u16 = cursor.read()?;
        let coverage_offsets = cursor.read_array(glyph_count as usize)?;
        let seq_lookup_records = cursor.read_array(seq_lookup_count as usize)?;
        Ok(SequenceContextFormat3 {
            data,
            coverage_offsets,
            seq_lookup_records,
        })
    }
}

impl<'a> SequenceContextFormat3<'a> {
    /// The number of input positions.
    pub fn glyph_count(&self) -> u16 {
        self.coverage_offsets.len() as u16
    }

    /// The coverage table for the input position at the given index.
    pub fn coverage(&self, index: u16) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self
            .coverage_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        CoverageTable::read(data)
    }

    /// The nested lookups to run on a match.
    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

/// A chained contextual rule: backtrack, input tail and lookahead.
#[derive(Clone)]
pub struct ChainedSequenceRule<'a> {
    backtrack_sequence: &'a [BigEndian<u16>],
    input_sequence: &'a [BigEndian<u16>],
    lookahead_sequence: &'a [BigEndian<u16>],
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for ChainedSequenceRule<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let backtrack_count: u16 = cursor.read()?;
        let backtrack_sequence = cursor.read_array(backtrack_count as usize)?;
        let input_count: u16 = cursor.read()?;
        if input_count == 0 {
            return Err(ReadError::MalformedData("empty input in chained rule"));
        }
        let input_sequence = cursor.read_array(input_count as usize - 1)?;
        let lookahead_count: u16 = cursor.read()?;
        let lookahead_sequence = cursor.read_array(lookahead_count as usize)?;
        let seq_lookup_count: u16 = cursor.read()?;
        let seq_lookup_records = cursor.read_array(seq_lookup_count as usize)?;
        Ok(ChainedSequenceRule {
            backtrack_sequence,
            input_sequence,
            lookahead_sequence,
            seq_lookup_records,
        })
    }
}

impl<'a> ChainedSequenceRule<'a> {
    /// The values to match before the first input position, closest first.
    pub fn backtrack_sequence(&self) -> &'a [BigEndian<u16>] {
        self.backtrack_sequence
    }

    /// The values to match after the first input position.
    pub fn input_sequence(&self) -> &'a [BigEndian<u16>] {
        self.input_sequence
    }

    /// The values to match after the input.
    pub fn lookahead_sequence(&self) -> &'a [BigEndian<u16>] {
        self.lookahead_sequence
    }

    /// The nested lookups to run on a match.
    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

/// A set of chained rules sharing a first glyph or class.
#[derive(Clone)]
pub struct ChainedSequenceRuleSet<'a> {
    data: FontData<'a>,
    rule_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for ChainedSequenceRuleSet<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let rule_count: u16 = cursor.read()?;
        let rule_offsets = cursor.read_array(rule_count as usize)?;
        Ok(ChainedSequenceRuleSet { data, rule_offsets })
    }
}

impl<'a> ChainedSequenceRuleSet<'a> {
    /// The number of rules in the set.
    pub fn rule_count(&self) -> u16 {
        self.rule_offsets.len() as u16
    }

    /// The rule at the given index.
    pub fn rule(&self, index: u16) -> Result<ChainedSequenceRule<'a>, ReadError> {
        let offset = self
            .rule_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        ChainedSequenceRule::read(data)
    }
}

/// A chained contextual matching table (GSUB type 6, GPOS type 8).
#[derive(Clone)]
pub enum ChainedSequenceContext<'a> {
    Format1(ChainedSequenceContextFormat1<'a>),
    Format2(ChainedSequenceContextFormat2<'a>),
    Format3(ChainedSequenceContextFormat3<'a>),
}

impl<'a> FontRead<'a> for ChainedSequenceContext<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => ChainedSequenceContextFormat1::read(data).map(Self::Format1),
            2 => ChainedSequenceContextFormat2::read(data).map(Self::Format2),
            3 => ChainedSequenceContextFormat3::read(data).map(Self::Format3),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

/// Chained contextual matching by glyph id.
#[derive(Clone)]
pub struct ChainedSequenceContextFormat1<'a> {
    data: FontData<'a>,
    coverage_offset: Offset16,
    rule_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for ChainedSequenceContextFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let rule_set_count: u16 = cursor.read()?;
        let rule_set_offsets = cursor.read_array(rule_set_count as usize)?;
        Ok(ChainedSequenceContextFormat1 {
            data,
            coverage_offset,
            rule_set_offsets,
        })
    }
}

impl<'a> ChainedSequenceContextFormat1<'a> {
    /// The coverage table for the first input glyph.
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.coverage_offset.non_null().ok_or(ReadError::NullOffset)?;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    /// The rule set for the given coverage index, if non-null.
    pub fn rule_set(&self, index: u16) -> Option<Result<ChainedSequenceRuleSet<'a>, ReadError>> {
        let offset = self.rule_set_offsets.get(index as usize)?.get().non_null()?;
        Some(
            self.data
                .split_off(offset)
                .ok_or(ReadError::OutOfBounds)
                .and_then(ChainedSequenceRuleSet::read),
        )
    }
}

/// Chained contextual matching by class.
#[derive(Clone)]
pub struct ChainedSequenceContextFormat2<'a> {
    data: FontData<'a>,
    coverage_offset: Offset16,
    backtrack_class_def_offset: Offset16,
    input_class_def_offset: Offset16,
    lookahead_class_def_offset: Offset16,
    rule_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for ChainedSequenceContextFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let backtrack_class_def_offset: Offset16 = cursor.read()?;
        let input_class_def_offset: Offset16 = cursor.read()?;
        let lookahead_class_def_offset: Offset16 = cursor.read()?;
        let rule_set_count: u16 = cursor.read()?;
        let rule_set_offsets = cursor.read_array(rule_set_count as usize)?;
        Ok(ChainedSequenceContextFormat2 {
            data,
            coverage_offset,
            backtrack_class_def_offset,
            input_class_def_offset,
            lookahead_class_def_offset,
            rule_set_offsets,
        })
    }
}

impl<'a> ChainedSequenceContextFormat2<'a> {
    /// The coverage table for the first input glyph.
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.coverage_offset.non_null().ok_or(ReadError::NullOffset)?;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    fn class_def_at(&self, offset: Offset16) -> Result<ClassDef<'a>, ReadError> {
        let offset = offset.non_null().ok_or(ReadError::NullOffset)?;
        ClassDef::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    /// The class definition for backtrack positions.
    pub fn backtrack_class_def(&self) -> Result<ClassDef<'a>, ReadError> {
        self.class_def_at(self.backtrack_class_def_offset)
    }

    /// The class definition for input positions.
    pub fn input_class_def(&self) -> Result<ClassDef<'a>, ReadError> {
        self.class_def_at(self.input_class_def_offset)
    }

    /// The class definition for lookahead positions.
    pub fn lookahead_class_def(&self) -> Result<ClassDef<'a>, ReadError> {
        self.class_def_at(self.lookahead_class_def_offset)
    }

    /// The rule set for the given input class, if non-null.
    pub fn rule_set(&self, class: u16) -> Option<Result<ChainedSequenceRuleSet<'a>, ReadError>> {
        let offset = self.rule_set_offsets.get(class as usize)?.get().non_null()?;
        Some(
            self.data
                .split_off(offset)
                .ok_or(ReadError::OutOfBounds)
                .and_then(ChainedSequenceRuleSet::read),
        )
    }
}

/// Chained contextual matching by per-position coverage.
#[derive(Clone)]
pub struct ChainedSequenceContextFormat3<'a> {
    data: FontData<'a>,
    backtrack_coverage_offsets: &'a [BigEndian<Offset16>],
    input_coverage_offsets: &'a [BigEndian<Offset16>],
    lookahead_coverage_offsets: &'a [BigEndian<Offset16>],
    seq_lookup_records: &'a [SequenceLookupRecord],
}

impl<'a> FontRead<'a> for ChainedSequenceContextFormat3<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 3 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let backtrack_count: u16 = cursor.read()?;
        let backtrack_coverage_offsets = cursor.read_array(backtrack_count as usize)?;
        let input_count: u16 = cursor.read()?;
        if input_count == 0 {
            return Err(ReadError::MalformedData("empty input in chained context"));
        }
        let input_coverage_offsets = cursor.read_array(input_count as usize)?;
        let lookahead_count: u16 = cursor.read()?;
        let lookahead_coverage_offsets = cursor.read_array(lookahead_count as usize)?;
        let seq_lookup_count: u16 = cursor.read()?;
        let seq_lookup_records = cursor.read_array(seq_lookup_count as usize)?;
        Ok(ChainedSequenceContextFormat3 {
            data,
            backtrack_coverage_offsets,
            input_coverage_offsets,
            lookahead_coverage_offsets,
            seq_lookup_records,
        })
    }
}

impl<'a> ChainedSequenceContextFormat3<'a> {
    fn coverage_at(
        &self,
        offsets: &'a [BigEndian<Offset16>],
        index: u16,
    ) -> Result<CoverageTable<'a>, ReadError> {
        let offset = offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        CoverageTable::read(data)
    }

    /// The number of backtrack positions.
    pub fn backtrack_count(&self) -> u16 {
        self.backtrack_coverage_offsets.len() as u16
    }

    /// The number of input positions.
    pub fn input_count(&self) -> u16 {
        self.input_coverage_offsets.len() as u16
    }

    /// The number of lookahead positions.
    pub fn lookahead_count(&self) -> u16 {
        self.lookahead_coverage_offsets.len() as u16
    }

    /// The coverage for the backtrack position at the given index, closest
    /// to the input first.
    pub fn backtrack_coverage(&self, index: u16) -> Result<CoverageTable<'a>, ReadError> {
        self.coverage_at(self.backtrack_coverage_offsets, index)
    }

    /// The coverage for the input position at the given index.
    pub fn input_coverage(&self, index: u16) -> Result<CoverageTable<'a>, ReadError> {
        self.coverage_at(self.input_coverage_offsets, index)
    }

    /// The coverage for the lookahead position at the given index.
    pub fn lookahead_coverage(&self, index: u16) -> Result<CoverageTable<'a>, ReadError> {
        self.coverage_at(self.lookahead_coverage_offsets, index)
    }

    /// The nested lookups to run on a match.
    pub fn seq_lookup_records(&self) -> &'a [SequenceLookupRecord] {
        self.seq_lookup_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn coverage_format1() {
        let bytes = be16(&[1, 3, 5, 10, 15]);
        let coverage = CoverageTable::read(FontData::new(&bytes)).unwrap();
        assert_eq!(coverage.get(GlyphId::new(5)), Some(0));
        assert_eq!(coverage.get(GlyphId::new(10)), Some(1));
        assert_eq!(coverage.get(GlyphId::new(15)), Some(2));
        assert_eq!(coverage.get(GlyphId::new(11)), None);
        assert_eq!(coverage.iter().count(), 3);
    }

    #[test]
    fn coverage_format2() {
        let bytes = be16(&[2, 2, 10, 12, 0, 20, 21, 3]);
        let coverage = CoverageTable::read(FontData::new(&bytes)).unwrap();
        assert_eq!(coverage.get(GlyphId::new(10)), Some(0));
        assert_eq!(coverage.get(GlyphId::new(12)), Some(2));
        assert_eq!(coverage.get(GlyphId::new(20)), Some(3));
        assert_eq!(coverage.get(GlyphId::new(21)), Some(4));
        assert_eq!(coverage.get(GlyphId::new(13)), None);
        assert_eq!(coverage.get(GlyphId::new(9)), None);
    }

    #[test]
    fn class_def_formats() {
        let fmt1 = be16(&[1, 10, 3, 1, 0, 2]);
        let class_def = ClassDef::read(FontData::new(&fmt1)).unwrap();
        assert_eq!(class_def.get(GlyphId::new(10)), 1);
        assert_eq!(class_def.get(GlyphId::new(11)), 0);
        assert_eq!(class_def.get(GlyphId::new(12)), 2);
        assert_eq!(class_def.get(GlyphId::new(9)), 0);
        assert_eq!(class_def.get(GlyphId::new(13)), 0);

        let fmt2 = be16(&[2, 1, 30, 32, 7]);
        let class_def = ClassDef::read(FontData::new(&fmt2)).unwrap();
        assert_eq!(class_def.get(GlyphId::new(31)), 7);
        assert_eq!(class_def.get(GlyphId::new(33)), 0);
    }

    #[test]
    fn lookup_header_with_mark_filtering_set() {
        let bytes = be16(&[
            4,      // lookup type
            0x0110, // use mark filtering set | ignore marks... (0x10 | 0x100)
            1,      // subtable count
            10,     // subtable offset
            3,      // mark filtering set
        ]);
        let lookup = Lookup::read(FontData::new(&bytes)).unwrap();
        assert_eq!(lookup.lookup_type(), 4);
        assert_eq!(lookup.mark_filtering_set(), Some(3));
        assert_eq!(lookup.lookup_flag().mark_attachment_class(), Some(1));
        assert_eq!(lookup.subtable_count(), 1);
    }

    #[test]
    fn chained_rule_sections() {
        let bytes = be16(&[
            1, 9, // backtrack: [9]
            2, 7, // input: first + [7]
            1, 8, // lookahead: [8]
            1, 1, 2, // one lookup record at sequence index 1 -> lookup 2
        ]);
        let rule = ChainedSequenceRule::read(FontData::new(&bytes)).unwrap();
        assert_eq!(rule.backtrack_sequence().len(), 1);
        assert_eq!(rule.input_sequence().len(), 1);
        assert_eq!(rule.lookahead_sequence().len(), 1);
        let record = &rule.seq_lookup_records()[0];
        assert_eq!(record.sequence_index.get(), 1);
        assert_eq!(record.lookup_list_index.get(), 2);
    }

    #[test]
    fn script_selection_falls_back() {
        // script list with a single 'latn' script, one 'TRK ' lang sys
        let mut bytes = be16(&[1]); // count
        bytes.extend_from_slice(b"latn");
        bytes.extend_from_slice(&be16(&[8])); // script offset
        // script table at 8: defaultLangSys=10, count 1, 'TRK ' at 18
        // (lang sys offsets are relative to the script table)
        bytes.extend_from_slice(&be16(&[10, 1]));
        bytes.extend_from_slice(b"TRK ");
        bytes.extend_from_slice(&be16(&[18]));
        // default lang sys at 8+10=18: order, required=0xFFFF, count 1, feature 0
        bytes.extend_from_slice(&be16(&[0, 0xFFFF, 1, 0]));
        // named lang sys at 8+18=26: order, required 2, count 1, feature 1
        bytes.extend_from_slice(&be16(&[0, 2, 1, 1]));

        let list = ScriptList::read(FontData::new(&bytes)).unwrap();
        let (tag, script) = list.select(&[Tag::new(b"grek")]).unwrap();
        assert_eq!(tag, Tag::new(b"latn"));

        let default = script.select_lang_sys(None).unwrap();
        assert_eq!(default.required_feature_index(), None);
        assert_eq!(default.feature_indices()[0].get(), 0);

        let named = script.select_lang_sys(Some(Tag::new(b"TRK "))).unwrap();
        assert_eq!(named.required_feature_index(), Some(2));

        // unknown language falls back to the default lang sys
        let fallback = script.select_lang_sys(Some(Tag::new(b"ROM "))).unwrap();
        assert_eq!(fallback.feature_indices()[0].get(), 0);
    }
}
