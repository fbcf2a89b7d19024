//! the glyph substitution table

pub use super::layout::{
    ChainedSequenceContext, ClassDef, CoverageTable, FeatureList, Lookup, LookupFlag, LookupList,
    ScriptList, SequenceContext,
};

use super::layout;
use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::types::{BigEndian, GlyphId, MajorMinor, Offset16, Tag};

pub const TAG: Tag = Tag::new(b"GSUB");

/// The lookup types defined for glyph substitution.
pub mod lookup_type {
    pub const SINGLE: u16 = 1;
    pub const MULTIPLE: u16 = 2;
    pub const ALTERNATE: u16 = 3;
    pub const LIGATURE: u16 = 4;
    pub const CONTEXTUAL: u16 = 5;
    pub const CHAIN_CONTEXTUAL: u16 = 6;
    pub const EXTENSION: u16 = 7;
    pub const REVERSE_CHAIN_SINGLE: u16 = 8;
}

/// The `GSUB` table: scripts, features and substitution lookups.
#[derive(Clone)]
pub struct Gsub<'a> {
    script_list: ScriptList<'a>,
    feature_list: FeatureList<'a>,
    lookup_list: LookupList<'a>,
}

impl<'a> FontRead<'a> for Gsub<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let version: MajorMinor = cursor.read()?;
        if !version.compatible(MajorMinor::VERSION_1_0) {
            return Err(ReadError::InvalidVersion(version));
        }
        let script_list_offset: Offset16 = cursor.read()?;
        let feature_list_offset: Offset16 = cursor.read()?;
        let lookup_list_offset: Offset16 = cursor.read()?;
        // 1.1 appends a feature variations offset; variable fonts are out
        // of scope, so it is not read
        let resolve = |offset: Offset16| -> Result<FontData<'a>, ReadError> {
            data.split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
                .ok_or(ReadError::OutOfBounds)
        };
        Ok(Gsub {
            script_list: ScriptList::read(resolve(script_list_offset)?)?,
            feature_list: FeatureList::read(resolve(feature_list_offset)?)?,
            lookup_list: LookupList::read(resolve(lookup_list_offset)?)?,
        })
    }
}

impl<'a> Gsub<'a> {
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
    ) -> Result<SubstitutionSubtable<'a>, ReadError> {
        SubstitutionSubtable::read(lookup.subtable_data(index)?, lookup.lookup_type())
    }
}

/// A substitution lookup subtable of any type.
///
/// Extension subtables (type 7) are resolved during reading and never
/// surfaced.
#[derive(Clone)]
pub enum SubstitutionSubtable<'a> {
    Single(SingleSubst<'a>),
    Multiple(MultipleSubstFormat1<'a>),
    Alternate(AlternateSubstFormat1<'a>),
    Ligature(LigatureSubstFormat1<'a>),
    Contextual(SequenceContext<'a>),
    ChainContextual(ChainedSequenceContext<'a>),
    Reverse(ReverseChainSingleSubstFormat1<'a>),
}

impl<'a> SubstitutionSubtable<'a> {
    /// Read a subtable interpreted per the parent lookup's type.
    pub fn read(data: FontData<'a>, lookup_type: u16) -> Result<Self, ReadError> {
        match lookup_type {
            lookup_type::SINGLE => SingleSubst::read(data).map(Self::Single),
            lookup_type::MULTIPLE => MultipleSubstFormat1::read(data).map(Self::Multiple),
            lookup_type::ALTERNATE => AlternateSubstFormat1::read(data).map(Self::Alternate),
            lookup_type::LIGATURE => LigatureSubstFormat1::read(data).map(Self::Ligature),
            lookup_type::CONTEXTUAL => SequenceContext::read(data).map(Self::Contextual),
            lookup_type::CHAIN_CONTEXTUAL => {
                ChainedSequenceContext::read(data).map(Self::ChainContextual)
            }
            lookup_type::EXTENSION => {
                let (wrapped_type, data) = layout::resolve_extension(data)?;
                if wrapped_type == lookup_type::EXTENSION {
                    // a nested extension could loop forever
                    return Err(ReadError::MalformedData("extension wraps extension"));
                }
                Self::read(data, wrapped_type)
            }
            lookup_type::REVERSE_CHAIN_SINGLE => {
                ReverseChainSingleSubstFormat1::read(data).map(Self::Reverse)
            }
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

/// A single substitution subtable.
#[derive(Clone)]
pub enum SingleSubst<'a> {
    Format1(SingleSubstFormat1<'a>),
    Format2(SingleSubstFormat2<'a>),
}

impl<'a> FontRead<'a> for SingleSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let format: u16 = data.read_at(0)?;
        match format {
            1 => SingleSubstFormat1::read(data).map(Self::Format1),
            2 => SingleSubstFormat2::read(data).map(Self::Format2),
            other => Err(ReadError::InvalidFormat(other as i64)),
        }
    }
}

impl SingleSubst<'_> {
    /// The replacement for the given glyph, if covered.
    pub fn substitute(&self, glyph_id: GlyphId) -> Option<GlyphId> {
        match self {
            Self::Format1(table) => table.substitute(glyph_id),
            Self::Format2(table) => table.substitute(glyph_id),
        }
    }
}

/// Single substitution by glyph id delta.
#[derive(Clone)]
pub struct SingleSubstFormat1<'a> {
    coverage: CoverageTable<'a>,
    delta_glyph_id: i16,
}

impl<'a> FontRead<'a> for SingleSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let delta_glyph_id: i16 = cursor.read()?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(SingleSubstFormat1 {
            coverage: CoverageTable::read(coverage_data)?,
            delta_glyph_id,
        })
    }
}

impl SingleSubstFormat1<'_> {
    fn substitute(&self, glyph_id: GlyphId) -> Option<GlyphId> {
        self.coverage
            .get(glyph_id)
            .map(|_| glyph_id.wrapping_add_delta(self.delta_glyph_id))
    }
}

/// Single substitution by explicit replacement list.
#[derive(Clone)]
pub struct SingleSubstFormat2<'a> {
    coverage: CoverageTable<'a>,
    substitute_glyph_ids: &'a [BigEndian<GlyphId>],
}

impl<'a> FontRead<'a> for SingleSubstFormat2<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 2 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let glyph_count: u16 = cursor.read()?;
        let substitute_glyph_ids = cursor.read_array(glyph_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(SingleSubstFormat2 {
            coverage: CoverageTable::read(coverage_data)?,
            substitute_glyph_ids,
        })
    }
}

impl SingleSubstFormat2<'_> {
    fn substitute(&self, glyph_id: GlyphId) -> Option<GlyphId> {
        let coverage_index = self.coverage.get(glyph_id)?;
        self.substitute_glyph_ids
            .get(coverage_index as usize)
            .map(|id| id.get())
    }
}

/// Multiple substitution: one glyph becomes a sequence.
#[derive(Clone)]
pub struct MultipleSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    sequence_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for MultipleSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let sequence_count: u16 = cursor.read()?;
        let sequence_offsets = cursor.read_array(sequence_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(MultipleSubstFormat1 {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            sequence_offsets,
        })
    }
}

impl<'a> MultipleSubstFormat1<'a> {
    /// The replacement sequence for the given glyph, if covered.
    ///
    /// An empty sequence deletes the glyph.
    pub fn sequence(&self, glyph_id: GlyphId) -> Option<&'a [BigEndian<GlyphId>]> {
        let coverage_index = self.coverage.get(glyph_id)?;
        let offset = self
            .sequence_offsets
            .get(coverage_index as usize)?
            .get()
            .non_null()?;
        let data = self.data.split_off(offset)?;
        let glyph_count: u16 = data.read_at(0).ok()?;
        data.read_array(2..2 + glyph_count as usize * 2).ok()
    }
}

/// Alternate substitution: one glyph has several selectable variants.
#[derive(Clone)]
pub struct AlternateSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    alternate_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for AlternateSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let alternate_set_count: u16 = cursor.read()?;
        let alternate_set_offsets = cursor.read_array(alternate_set_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(AlternateSubstFormat1 {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            alternate_set_offsets,
        })
    }
}

impl<'a> AlternateSubstFormat1<'a> {
    /// The alternates for the given glyph, if covered.
    pub fn alternates(&self, glyph_id: GlyphId) -> Option<&'a [BigEndian<GlyphId>]> {
        let coverage_index = self.coverage.get(glyph_id)?;
        let offset = self
            .alternate_set_offsets
            .get(coverage_index as usize)?
            .get()
            .non_null()?;
        let data = self.data.split_off(offset)?;
        let glyph_count: u16 = data.read_at(0).ok()?;
        data.read_array(2..2 + glyph_count as usize * 2).ok()
    }
}

/// Ligature substitution: a sequence becomes one glyph.
#[derive(Clone)]
pub struct LigatureSubstFormat1<'a> {
    data: FontData<'a>,
    coverage: CoverageTable<'a>,
    ligature_set_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for LigatureSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let ligature_set_count: u16 = cursor.read()?;
        let ligature_set_offsets = cursor.read_array(ligature_set_count as usize)?;
        let coverage_data = data
            .split_off(coverage_offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ok(LigatureSubstFormat1 {
            data,
            coverage: CoverageTable::read(coverage_data)?,
            ligature_set_offsets,
        })
    }
}

impl<'a> LigatureSubstFormat1<'a> {
    /// The set of candidate ligatures starting with the given glyph.
    pub fn ligature_set(&self, glyph_id: GlyphId) -> Option<LigatureSet<'a>> {
        let coverage_index = self.coverage.get(glyph_id)?;
        let offset = self
            .ligature_set_offsets
            .get(coverage_index as usize)?
            .get()
            .non_null()?;
        LigatureSet::read(self.data.split_off(offset)?).ok()
    }
}

/// The candidate ligatures sharing a first glyph, in priority order.
#[derive(Clone)]
pub struct LigatureSet<'a> {
    data: FontData<'a>,
    ligature_offsets: &'a [BigEndian<Offset16>],
}

impl<'a> FontRead<'a> for LigatureSet<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let ligature_count: u16 = cursor.read()?;
        let ligature_offsets = cursor.read_array(ligature_count as usize)?;
        Ok(LigatureSet {
            data,
            ligature_offsets,
        })
    }
}

impl<'a> LigatureSet<'a> {
    /// The number of candidate ligatures.
    pub fn ligature_count(&self) -> u16 {
        self.ligature_offsets.len() as u16
    }

    /// The candidate at the given index.
    pub fn ligature(&self, index: u16) -> Result<Ligature<'a>, ReadError> {
        let offset = self
            .ligature_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        Ligature::read(data)
    }
}

/// One ligature: the glyph it produces and the component tail it consumes.
#[derive(Clone)]
pub struct Ligature<'a> {
    ligature_glyph: GlyphId,
    component_glyph_ids: &'a [BigEndian<GlyphId>],
}

impl<'a> FontRead<'a> for Ligature<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let ligature_glyph: GlyphId = cursor.read()?;
        let component_count: u16 = cursor.read()?;
        if component_count == 0 {
            return Err(ReadError::MalformedData("ligature with no components"));
        }
        let component_glyph_ids = cursor.read_array(component_count as usize - 1)?;
        Ok(Ligature {
            ligature_glyph,
            component_glyph_ids,
        })
    }
}

impl<'a> Ligature<'a> {
    /// The glyph the ligature substitutes.
    pub fn ligature_glyph(&self) -> GlyphId {
        self.ligature_glyph
    }

    /// The glyphs to match after the first, in order.
    pub fn component_glyph_ids(&self) -> &'a [BigEndian<GlyphId>] {
        self.component_glyph_ids
    }

    /// Total number of glyphs the ligature consumes.
    pub fn component_count(&self) -> u16 {
        self.component_glyph_ids.len() as u16 + 1
    }
}

/// Reverse chained contextual single substitution.
///
/// Applied right-to-left over the buffer, replacing one glyph at a time.
#[derive(Clone)]
pub struct ReverseChainSingleSubstFormat1<'a> {
    data: FontData<'a>,
    coverage_offset: Offset16,
    backtrack_coverage_offsets: &'a [BigEndian<Offset16>],
    lookahead_coverage_offsets: &'a [BigEndian<Offset16>],
    substitute_glyph_ids: &'a [BigEndian<GlyphId>],
}

impl<'a> FontRead<'a> for ReverseChainSingleSubstFormat1<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        let mut cursor = data.cursor();
        let format: u16 = cursor.read()?;
        if format != 1 {
            return Err(ReadError::InvalidFormat(format as i64));
        }
        let coverage_offset: Offset16 = cursor.read()?;
        let backtrack_count: u16 = cursor.read()?;
        let backtrack_coverage_offsets = cursor.read_array(backtrack_count as usize)?;
        let lookahead_count: u16 = cursor.read()?;
        let lookahead_coverage_offsets = cursor.read_array(lookahead_count as usize)?;
        let glyph_count: u16 = cursor.read()?;
        let substitute_glyph_ids = cursor.read_array(glyph_count as usize)?;
        Ok(ReverseChainSingleSubstFormat1 {
            data,
            coverage_offset,
            backtrack_coverage_offsets,
            lookahead_coverage_offsets,
            substitute_glyph_ids,
        })
    }
}

impl<'a> ReverseChainSingleSubstFormat1<'a> {
    fn coverage_at(&self, offset: Offset16) -> Result<CoverageTable<'a>, ReadError> {
        let data = self
            .data
            .split_off(offset.non_null().ok_or(ReadError::NullOffset)?)
            .ok_or(ReadError::OutOfBounds)?;
        CoverageTable::read(data)
    }

    /// The coverage of the replaceable glyph.
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        self.coverage_at(self.coverage_offset)
    }

    /// The number of backtrack positions.
    pub fn backtrack_count(&self) -> u16 {
        self.backtrack_coverage_offsets.len() as u16
    }

    /// The number of lookahead positions.
    pub fn lookahead_count(&self) -> u16 {
        self.lookahead_coverage_offsets.len() as u16
    }

    /// The coverage for the backtrack position at the given index, closest
    /// to the input first.
    pub fn backtrack_coverage(&self, index: u16) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self
            .backtrack_coverage_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        self.coverage_at(offset)
    }

    /// The coverage for the lookahead position at the given index.
    pub fn lookahead_coverage(&self, index: u16) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self
            .lookahead_coverage_offsets
            .get(index as usize)
            .ok_or(ReadError::OutOfBounds)?
            .get();
        self.coverage_at(offset)
    }

    /// The replacement for the covered glyph at the given coverage index.
    pub fn substitute(&self, coverage_index: u16) -> Option<GlyphId> {
        self.substitute_glyph_ids
            .get(coverage_index as usize)
            .map(|id| id.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn single_subst_format1_applies_delta() {
        // format 1, coverage at 6, delta +2; coverage fmt 1 covering 4, 6
        let bytes = be16(&[1, 6, 2, 1, 2, 4, 6]);
        let subst = SingleSubst::read(FontData::new(&bytes)).unwrap();
        assert_eq!(subst.substitute(GlyphId::new(4)), Some(GlyphId::new(6)));
        assert_eq!(subst.substitute(GlyphId::new(6)), Some(GlyphId::new(8)));
        assert_eq!(subst.substitute(GlyphId::new(5)), None);
    }

    #[test]
    fn single_subst_format2_uses_array() {
        // format 2, coverage at 10, 2 substitutes [9, 11]; coverage covers 4, 6
        let bytes = be16(&[2, 10, 2, 9, 11, 1, 2, 4, 6]);
        let subst = SingleSubst::read(FontData::new(&bytes)).unwrap();
        assert_eq!(subst.substitute(GlyphId::new(4)), Some(GlyphId::new(9)));
        assert_eq!(subst.substitute(GlyphId::new(6)), Some(GlyphId::new(11)));
        assert_eq!(subst.substitute(GlyphId::new(9)), None);
    }

    #[test]
    fn multiple_subst_sequences() {
        // format 1, coverage at 10, 1 sequence at 16; coverage covers 5
        let bytes = be16(&[1, 10, 1, 16, 0, 1, 1, 5, 2, 20, 21]);
        let subst = MultipleSubstFormat1::read(FontData::new(&bytes)).unwrap();
        let seq = subst.sequence(GlyphId::new(5)).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].get(), GlyphId::new(20));
        assert_eq!(seq[1].get(), GlyphId::new(21));
        assert!(subst.sequence(GlyphId::new(6)).is_none());
    }

    #[test]
    fn ligature_components() {
        // LigatureSubst: format 1, coverage at 10, 1 set at 16
        // coverage fmt 1: covers glyph 1 ('f')
        // ligature set at 16: 1 ligature at 4 (rel)
        // ligature at 20: glyph 30, component count 2, components [2]
        let bytes = be16(&[1, 10, 1, 16, 0, 1, 1, 1, 1, 4, 30, 2, 2]);
        let subst = LigatureSubstFormat1::read(FontData::new(&bytes)).unwrap();
        let set = subst.ligature_set(GlyphId::new(1)).unwrap();
        assert_eq!(set.ligature_count(), 1);
        let lig = set.ligature(0).unwrap();
        assert_eq!(lig.ligature_glyph(), GlyphId::new(30));
        assert_eq!(lig.component_count(), 2);
        assert_eq!(lig.component_glyph_ids()[0].get(), GlyphId::new(2));
        assert!(subst.ligature_set(GlyphId::new(2)).is_none());
    }

    #[test]
    fn extension_resolution() {
        // extension header: format 1, wrapped type 1, offset 8 (u32);
        // wrapped single subst fmt 1 at 8: coverage at 6 (rel), delta +1,
        // coverage covering glyph 2
        let mut bytes = be16(&[1, 1]);
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(&be16(&[1, 6, 1, 1, 1, 2]));
        let subst =
            SubstitutionSubtable::read(FontData::new(&bytes), lookup_type::EXTENSION).unwrap();
        match subst {
            SubstitutionSubtable::Single(single) => {
                assert_eq!(single.substitute(GlyphId::new(2)), Some(GlyphId::new(3)));
            }
            _ => panic!("expected a single substitution"),
        }
    }

    #[test]
    fn nested_extension_is_rejected() {
        let mut bytes = be16(&[1, 7]);
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(&be16(&[1, 1]));
        bytes.extend_from_slice(&8u32.to_be_bytes());
        assert!(SubstitutionSubtable::read(FontData::new(&bytes), lookup_type::EXTENSION).is_err());
    }
}
