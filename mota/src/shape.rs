//! The shaping driver: feature selection, lookup application and
//! attachment resolution.

use std::collections::BTreeMap;

use read_otl::tables::cmap::CmapSubtable;
use read_otl::tables::gdef::{Gdef, GlyphClass};
use read_otl::tables::gpos::{Anchor, Gpos, PositionSubtable, ValueRecord};
use read_otl::tables::gsub::{Gsub, LigatureSubstFormat1, ReverseChainSingleSubstFormat1, SubstitutionSubtable};
use read_otl::tables::hmtx::Hmtx;
use read_otl::tables::layout::{
    ChainedSequenceContext, FeatureList, Lookup, LookupFlag, ScriptList, SequenceContext,
    SequenceLookupRecord,
};
use read_otl::types::{BigEndian, GlyphId, Tag};
use read_otl::{FontRef, ReadError, TableProvider};

use crate::buffer::{AttachKind, Direction, GlyphPosition, ShapeBuffer, ShapeItem};
use crate::feature::Feature;
use crate::unicode;

/// Contextual lookups nested deeper than this are abandoned.
const MAX_NESTING_DEPTH: u32 = 64;

/// Features applied without being asked for, per common shaping practice.
const DEFAULT_FEATURES: [&[u8; 4]; 10] = [
    b"ccmp", b"liga", b"clig", b"calt", b"locl", b"rlig", b"kern", b"mark", b"mkmk", b"rclt",
];

/// The output of [`Shaper::shape_str`]: parallel arrays of glyphs, source
/// clusters and positions.
#[derive(Clone, Debug, Default)]
pub struct GlyphRun {
    pub glyphs: Vec<GlyphId>,
    pub clusters: Vec<u32>,
    pub positions: Vec<GlyphPosition>,
}

/// A shaper for a single font.
///
/// Construction parses the layout tables once; the shaper is then immutable
/// and may be shared freely between threads, each shaping its own buffer.
/// Missing or malformed tables degrade to the identity transformation with
/// `hmtx` advances.
pub struct Shaper<'a> {
    charmap: Option<CmapSubtable<'a>>,
    hmtx: Option<Hmtx<'a>>,
    gdef: Option<Gdef<'a>>,
    gsub: Option<Gsub<'a>>,
    gpos: Option<Gpos<'a>>,
}

fn absorb<T>(what: &str, result: Result<T, ReadError>) -> Option<T> {
    match result {
        Ok(table) => Some(table),
        Err(ReadError::TableIsMissing(_)) => None,
        Err(err) => {
            log::warn!("failed to parse {what}: {err}");
            None
        }
    }
}

impl<'a> Shaper<'a> {
    /// Create a shaper for the given font.
    pub fn new(font: &FontRef<'a>) -> Self {
        Shaper {
            charmap: absorb("cmap", font.cmap()).and_then(|cmap| cmap.preferred_subtable()),
            hmtx: absorb("hmtx", font.hmtx()),
            gdef: absorb("GDEF", font.gdef()),
            gsub: absorb("GSUB", font.gsub()),
            gpos: absorb("GPOS", font.gpos()),
        }
    }

    /// Shape the buffer in place.
    ///
    /// Substitutions and positionings are applied in lookup-list order for
    /// each of the active features; `features` overrides the default set.
    /// This never fails: malformed lookups are logged and skipped.
    pub fn shape(&self, buffer: &mut ShapeBuffer, features: &[Feature]) {
        buffer.guess_segment_properties();
        self.map_glyphs(buffer);
        if let Some(gsub) = &self.gsub {
            let plan = plan_lookups(
                gsub.script_list(),
                gsub.feature_list(),
                buffer.script(),
                buffer.language(),
                features,
            );
            let mut ctx = SubstContext {
                gsub,
                gdef: self.gdef.as_ref(),
                next_lig_id: 1,
            };
            for (lookup_index, value) in plan {
                ctx.apply_lookup(buffer, lookup_index, value);
            }
        }
        self.apply_advances(buffer);
        if let Some(gpos) = &self.gpos {
            let plan = plan_lookups(
                gpos.script_list(),
                gpos.feature_list(),
                buffer.script(),
                buffer.language(),
                features,
            );
            let ctx = PosContext {
                gpos,
                gdef: self.gdef.as_ref(),
                direction: buffer.direction().unwrap_or(Direction::LeftToRight),
            };
            for (lookup_index, _) in plan {
                ctx.apply_lookup(buffer, lookup_index);
            }
            resolve_attachments(buffer);
        }
    }

    /// Shape a string with the default features.
    pub fn shape_str(&self, text: &str) -> GlyphRun {
        let mut buffer = ShapeBuffer::new();
        buffer.add_str(text);
        self.shape(&mut buffer, &[]);
        GlyphRun {
            glyphs: buffer.glyphs().collect(),
            clusters: buffer.items().iter().map(|item| item.cluster).collect(),
            positions: buffer.positions().collect(),
        }
    }

    fn map_glyphs(&self, buffer: &mut ShapeBuffer) {
        for item in buffer.items_mut() {
            item.glyph_id = self
                .charmap
                .as_ref()
                .and_then(|charmap| charmap.map_codepoint(item.codepoint))
                .unwrap_or(GlyphId::NOTDEF);
            item.glyph_class = classify(self.gdef.as_ref(), item.glyph_id, item.codepoint);
        }
    }

    fn apply_advances(&self, buffer: &mut ShapeBuffer) {
        let Some(hmtx) = &self.hmtx else { return };
        for item in buffer.items_mut() {
            item.x_advance = hmtx.advance(item.glyph_id) as i32;
        }
    }
}

fn classify(gdef: Option<&Gdef>, glyph_id: GlyphId, codepoint: u32) -> GlyphClass {
    match gdef {
        Some(gdef) if gdef.has_glyph_classes() => gdef.glyph_class(glyph_id),
        _ if unicode::is_fallback_mark(codepoint) => GlyphClass::Mark,
        _ => GlyphClass::Unclassified,
    }
}

/// Select the lookups active for this run, in lookup-list order, paired
/// with the value of the feature that enabled them.
fn plan_lookups(
    scripts: &ScriptList,
    features: &FeatureList,
    script: Option<Tag>,
    language: Option<Tag>,
    user_features: &[Feature],
) -> Vec<(u16, u32)> {
    let mut requested = Vec::new();
    if let Some(script) = script {
        requested.push(script);
    }
    let Some((_, script_table)) = scripts.select(&requested) else {
        return Vec::new();
    };
    let Some(lang_sys) = script_table.select_lang_sys(language) else {
        return Vec::new();
    };

    let mut lookups: BTreeMap<u16, u32> = BTreeMap::new();
    let mut add_feature = |feature_index: u16, required: bool| {
        let Some((tag, feature)) = features.get(feature_index) else {
            return;
        };
        // the last caller-supplied setting wins; otherwise the default set
        // and the language system's required feature are on
        let value = user_features
            .iter()
            .rev()
            .find(|f| f.tag == tag)
            .map(|f| f.value)
            .unwrap_or_else(|| {
                let on = required || DEFAULT_FEATURES.iter().any(|d| Tag::new(*d) == tag);
                on as u32
            });
        if value == 0 {
            return;
        }
        for lookup_index in feature.lookup_list_indices() {
            lookups.entry(lookup_index.get()).or_insert(value);
        }
    };
    if let Some(required) = lang_sys.required_feature_index() {
        add_feature(required, true);
    }
    for feature_index in lang_sys.feature_indices() {
        add_feature(feature_index.get(), false);
    }
    lookups.into_iter().collect()
}

/// The per-lookup skip predicate.
#[derive(Clone, Copy)]
struct Skip<'b, 'a> {
    gdef: Option<&'b Gdef<'a>>,
    flag: LookupFlag,
    mark_set: Option<u16>,
}

impl<'b, 'a> Skip<'b, 'a> {
    fn new(gdef: Option<&'b Gdef<'a>>, lookup: &Lookup) -> Self {
        Skip {
            gdef,
            flag: lookup.lookup_flag(),
            mark_set: lookup.mark_filtering_set(),
        }
    }

    fn should_skip(&self, item: &ShapeItem) -> bool {
        let class = item.glyph_class;
        if self.flag.contains(LookupFlag::IGNORE_BASE_GLYPHS) && class == GlyphClass::Base {
            return true;
        }
        if self.flag.contains(LookupFlag::IGNORE_LIGATURES) && class == GlyphClass::Ligature {
            return true;
        }
        if class != GlyphClass::Mark {
            return false;
        }
        // the mark filtering set overrides the other mark tests, but both it
        // and the attachment class filter need GDEF to mean anything
        if self.flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            if let (Some(gdef), Some(set_index)) = (self.gdef, self.mark_set) {
                return !gdef.is_in_mark_set(set_index, item.glyph_id);
            }
        }
        if self.flag.contains(LookupFlag::IGNORE_MARKS) {
            return true;
        }
        if let (Some(gdef), Some(attach_class)) = (self.gdef, self.flag.mark_attachment_class()) {
            return gdef.mark_attach_class(item.glyph_id) != attach_class;
        }
        false
    }
}

fn next_unskipped(buffer: &ShapeBuffer, from: usize, skip: &Skip) -> Option<usize> {
    buffer
        .items()
        .iter()
        .enumerate()
        .skip(from + 1)
        .find(|(_, item)| !skip.should_skip(item))
        .map(|(i, _)| i)
}

fn prev_unskipped(buffer: &ShapeBuffer, from: usize, skip: &Skip) -> Option<usize> {
    buffer.items()[..from]
        .iter()
        .rposition(|item| !skip.should_skip(item))
}

/// Match the input tail of a contextual rule, collecting the matched
/// buffer positions (including the starting one).
fn match_input(
    buffer: &ShapeBuffer,
    pos: usize,
    expected: &[BigEndian<u16>],
    skip: &Skip,
    matches: impl Fn(GlyphId, u16) -> bool,
) -> Option<Vec<usize>> {
    let mut matched = vec![pos];
    let mut cursor = pos;
    for value in expected {
        let next = next_unskipped(buffer, cursor, skip)?;
        if !matches(buffer.items()[next].glyph_id, value.get()) {
            return None;
        }
        matched.push(next);
        cursor = next;
    }
    Some(matched)
}

/// Match positions before `pos`, closest first.
fn match_backtrack(
    buffer: &ShapeBuffer,
    pos: usize,
    count: u16,
    skip: &Skip,
    matches: impl Fn(u16, GlyphId) -> bool,
) -> bool {
    let mut cursor = pos;
    for i in 0..count {
        let Some(prev) = prev_unskipped(buffer, cursor, skip) else {
            return false;
        };
        if !matches(i, buffer.items()[prev].glyph_id) {
            return false;
        }
        cursor = prev;
    }
    true
}

/// Match positions after `last`.
fn match_lookahead(
    buffer: &ShapeBuffer,
    last: usize,
    count: u16,
    skip: &Skip,
    matches: impl Fn(u16, GlyphId) -> bool,
) -> bool {
    let mut cursor = last;
    for i in 0..count {
        let Some(next) = next_unskipped(buffer, cursor, skip) else {
            return false;
        };
        if !matches(i, buffer.items()[next].glyph_id) {
            return false;
        }
        cursor = next;
    }
    true
}

/// A matched context: the input positions and the nested lookups to run.
struct ContextMatch {
    matched: Vec<usize>,
    records: Vec<SequenceLookupRecord>,
}

fn match_sequence_context(
    buffer: &ShapeBuffer,
    ctx: &SequenceContext,
    pos: usize,
    skip: &Skip,
) -> Option<ContextMatch> {
    let glyph = buffer.items()[pos].glyph_id;
    match ctx {
        SequenceContext::Format1(table) => {
            let coverage_index = table.coverage().ok()?.get(glyph)?;
            let rule_set = table.rule_set(coverage_index)?.ok()?;
            for i in 0..rule_set.rule_count() {
                let Ok(rule) = rule_set.rule(i) else { continue };
                if let Some(matched) =
                    match_input(buffer, pos, rule.input_sequence(), skip, |g, v| {
                        g.to_u16() == v
                    })
                {
                    return Some(ContextMatch {
                        matched,
                        records: rule.seq_lookup_records().to_vec(),
                    });
                }
            }
            None
        }
        SequenceContext::Format2(table) => {
            table.coverage().ok()?.get(glyph)?;
            let class_def = table.class_def().ok()?;
            let rule_set = table.rule_set(class_def.get(glyph))?.ok()?;
            for i in 0..rule_set.rule_count() {
                let Ok(rule) = rule_set.rule(i) else { continue };
                if let Some(matched) =
                    match_input(buffer, pos, rule.input_sequence(), skip, |g, v| {
                        class_def.get(g) == v
                    })
                {
                    return Some(ContextMatch {
                        matched,
                        records: rule.seq_lookup_records().to_vec(),
                    });
                }
            }
            None
        }
        SequenceContext::Format3(table) => {
            table.coverage(0).ok()?.get(glyph)?;
            let mut matched = vec![pos];
            let mut cursor = pos;
            for i in 1..table.glyph_count() {
                let next = next_unskipped(buffer, cursor, skip)?;
                table
                    .coverage(i)
                    .ok()?
                    .get(buffer.items()[next].glyph_id)?;
                matched.push(next);
                cursor = next;
            }
            Some(ContextMatch {
                matched,
                records: table.seq_lookup_records().to_vec(),
            })
        }
    }
}

fn match_chained_context(
    buffer: &ShapeBuffer,
    ctx: &ChainedSequenceContext,
    pos: usize,
    skip: &Skip,
) -> Option<ContextMatch> {
    let glyph = buffer.items()[pos].glyph_id;
    match ctx {
        ChainedSequenceContext::Format1(table) => {
            let coverage_index = table.coverage().ok()?.get(glyph)?;
            let rule_set = table.rule_set(coverage_index)?.ok()?;
            for i in 0..rule_set.rule_count() {
                let Ok(rule) = rule_set.rule(i) else { continue };
                let Some(matched) =
                    match_input(buffer, pos, rule.input_sequence(), skip, |g, v| {
                        g.to_u16() == v
                    })
                else {
                    continue;
                };
                let backtrack = rule.backtrack_sequence();
                let lookahead = rule.lookahead_sequence();
                if !match_backtrack(buffer, pos, backtrack.len() as u16, skip, |i, g| {
                    backtrack[i as usize].get() == g.to_u16()
                }) {
                    continue;
                }
                if !match_lookahead(
                    buffer,
                    *matched.last().unwrap(),
                    lookahead.len() as u16,
                    skip,
                    |i, g| lookahead[i as usize].get() == g.to_u16(),
                ) {
                    continue;
                }
                return Some(ContextMatch {
                    matched,
                    records: rule.seq_lookup_records().to_vec(),
                });
            }
            None
        }
        ChainedSequenceContext::Format2(table) => {
            table.coverage().ok()?.get(glyph)?;
            let input_classes = table.input_class_def().ok()?;
            let backtrack_classes = table.backtrack_class_def().ok()?;
            let lookahead_classes = table.lookahead_class_def().ok()?;
            let rule_set = table.rule_set(input_classes.get(glyph))?.ok()?;
            for i in 0..rule_set.rule_count() {
                let Ok(rule) = rule_set.rule(i) else { continue };
                let Some(matched) =
                    match_input(buffer, pos, rule.input_sequence(), skip, |g, v| {
                        input_classes.get(g) == v
                    })
                else {
                    continue;
                };
                let backtrack = rule.backtrack_sequence();
                let lookahead = rule.lookahead_sequence();
                if !match_backtrack(buffer, pos, backtrack.len() as u16, skip, |i, g| {
                    backtrack_classes.get(g) == backtrack[i as usize].get()
                }) {
                    continue;
                }
                if !match_lookahead(
                    buffer,
                    *matched.last().unwrap(),
                    lookahead.len() as u16,
                    skip,
                    |i, g| lookahead_classes.get(g) == lookahead[i as usize].get(),
                ) {
                    continue;
                }
                return Some(ContextMatch {
                    matched,
                    records: rule.seq_lookup_records().to_vec(),
                });
            }
            None
        }
        ChainedSequenceContext::Format3(table) => {
            table.input_coverage(0).ok()?.get(glyph)?;
            let mut matched = vec![pos];
            let mut cursor = pos;
            for i in 1..table.input_count() {
                let next = next_unskipped(buffer, cursor, skip)?;
                table
                    .input_coverage(i)
                    .ok()?
                    .get(buffer.items()[next].glyph_id)?;
                matched.push(next);
                cursor = next;
            }
            if !match_backtrack(buffer, pos, table.backtrack_count(), skip, |i, g| {
                table
                    .backtrack_coverage(i)
                    .ok()
                    .and_then(|cov| cov.get(g))
                    .is_some()
            }) {
                return None;
            }
            if !match_lookahead(
                buffer,
                *matched.last().unwrap(),
                table.lookahead_count(),
                skip,
                |i, g| {
                    table
                        .lookahead_coverage(i)
                        .ok()
                        .and_then(|cov| cov.get(g))
                        .is_some()
                },
            ) {
                return None;
            }
            Some(ContextMatch {
                matched,
                records: table.seq_lookup_records().to_vec(),
            })
        }
    }
}

// ---------- substitution ----------

struct SubstContext<'b, 'a> {
    gsub: &'b Gsub<'a>,
    gdef: Option<&'b Gdef<'a>>,
    next_lig_id: u16,
}

impl<'b, 'a> SubstContext<'b, 'a> {
    fn apply_lookup(&mut self, buffer: &mut ShapeBuffer, lookup_index: u16, value: u32) {
        let Some((lookup, subtables)) = self.resolve_lookup(lookup_index) else {
            return;
        };
        let skip = Skip::new(self.gdef, &lookup);
        let reverse = subtables
            .iter()
            .any(|subtable| matches!(subtable, SubstitutionSubtable::Reverse(_)));
        if reverse {
            // right-to-left application; each step replaces a single glyph
            // in place, and re-reads whatever an earlier step produced
            let mut pos = buffer.len();
            while pos > 0 {
                pos -= 1;
                if skip.should_skip(&buffer.items()[pos]) {
                    continue;
                }
                self.apply_subtables_at(buffer, &subtables, pos, value, &skip, 0);
            }
        } else {
            let mut pos = 0;
            while pos < buffer.len() {
                if skip.should_skip(&buffer.items()[pos]) {
                    pos += 1;
                    continue;
                }
                match self.apply_subtables_at(buffer, &subtables, pos, value, &skip, 0) {
                    Some(next) => pos = next.max(pos + 1),
                    None => pos += 1,
                }
            }
        }
    }

    fn resolve_lookup(
        &self,
        lookup_index: u16,
    ) -> Option<(Lookup<'a>, Vec<SubstitutionSubtable<'a>>)> {
        let lookup = match self.gsub.lookup_list().get(lookup_index) {
            Ok(lookup) => lookup,
            Err(err) => {
                log::warn!("skipping malformed GSUB lookup {lookup_index}: {err}");
                return None;
            }
        };
        let subtables = (0..lookup.subtable_count())
            .filter_map(|i| match self.gsub.subtable(&lookup, i) {
                Ok(subtable) => Some(subtable),
                Err(err) => {
                    log::warn!(
                        "skipping malformed subtable {i} of GSUB lookup {lookup_index}: {err}"
                    );
                    None
                }
            })
            .collect();
        Some((lookup, subtables))
    }

    /// Try each subtable at `pos`; the first that applies wins. Returns the
    /// next position to scan from.
    fn apply_subtables_at(
        &mut self,
        buffer: &mut ShapeBuffer,
        subtables: &[SubstitutionSubtable<'a>],
        pos: usize,
        value: u32,
        skip: &Skip,
        depth: u32,
    ) -> Option<usize> {
        for subtable in subtables {
            if let Some(next) = self.apply_subtable_at(buffer, subtable, pos, value, skip, depth)
            {
                return Some(next);
            }
        }
        None
    }

    fn apply_subtable_at(
        &mut self,
        buffer: &mut ShapeBuffer,
        subtable: &SubstitutionSubtable<'a>,
        pos: usize,
        value: u32,
        skip: &Skip,
        depth: u32,
    ) -> Option<usize> {
        let glyph = buffer.items()[pos].glyph_id;
        match subtable {
            SubstitutionSubtable::Single(table) => {
                let substitute = table.substitute(glyph)?;
                self.set_glyph(buffer, pos, substitute);
                Some(pos + 1)
            }
            SubstitutionSubtable::Multiple(table) => {
                let sequence = table.sequence(glyph)?;
                let glyphs: Vec<GlyphId> = sequence.iter().map(|g| g.get()).collect();
                buffer.replace(pos, 1, &glyphs);
                for i in pos..pos + glyphs.len() {
                    let glyph = buffer.items()[i].glyph_id;
                    self.set_glyph(buffer, i, glyph);
                }
                // an empty sequence deletes the glyph; scanning resumes at
                // whatever slid into its place
                if glyphs.is_empty() {
                    Some(pos)
                } else {
                    Some(pos + glyphs.len())
                }
            }
            SubstitutionSubtable::Alternate(table) => {
                let alternates = table.alternates(glyph)?;
                if alternates.is_empty() {
                    return None;
                }
                // the feature value is a 1-based alternate index, clamped
                let index = (value.max(1) as usize - 1).min(alternates.len() - 1);
                self.set_glyph(buffer, pos, alternates[index].get());
                Some(pos + 1)
            }
            SubstitutionSubtable::Ligature(table) => {
                self.apply_ligature(buffer, table, pos, skip)
            }
            SubstitutionSubtable::Contextual(ctx) => {
                if depth >= MAX_NESTING_DEPTH {
                    return None;
                }
                let found = match_sequence_context(buffer, ctx, pos, skip)?;
                Some(self.apply_nested(buffer, found, depth))
            }
            SubstitutionSubtable::ChainContextual(ctx) => {
                if depth >= MAX_NESTING_DEPTH {
                    return None;
                }
                let found = match_chained_context(buffer, ctx, pos, skip)?;
                Some(self.apply_nested(buffer, found, depth))
            }
            SubstitutionSubtable::Reverse(table) => {
                self.apply_reverse(buffer, table, pos, skip)
            }
        }
    }

    fn set_glyph(&self, buffer: &mut ShapeBuffer, pos: usize, glyph: GlyphId) {
        let codepoint = buffer.items()[pos].codepoint;
        let class = classify(self.gdef, glyph, codepoint);
        let item = &mut buffer.items_mut()[pos];
        item.glyph_id = glyph;
        item.glyph_class = class;
    }

    fn apply_ligature(
        &mut self,
        buffer: &mut ShapeBuffer,
        table: &LigatureSubstFormat1<'a>,
        pos: usize,
        skip: &Skip,
    ) -> Option<usize> {
        let first = buffer.items()[pos].glyph_id;
        let set = table.ligature_set(first)?;
        'candidates: for i in 0..set.ligature_count() {
            let Ok(ligature) = set.ligature(i) else {
                continue;
            };
            let mut matched = vec![pos];
            let mut cursor = pos;
            for component in ligature.component_glyph_ids() {
                let Some(next) = next_unskipped(buffer, cursor, skip) else {
                    continue 'candidates;
                };
                if buffer.items()[next].glyph_id != component.get() {
                    continue 'candidates;
                }
                matched.push(next);
                cursor = next;
            }
            self.ligate(buffer, &matched, ligature.ligature_glyph());
            return Some(pos + 1);
        }
        None
    }

    /// Fuse the matched positions into one ligature glyph.
    ///
    /// Skipped glyphs interleaved with the components stay in the buffer
    /// and are tagged with the ligature id and the component they follow,
    /// so that mark-to-ligature positioning can find their anchor later.
    fn ligate(&mut self, buffer: &mut ShapeBuffer, matched: &[usize], lig_glyph: GlyphId) {
        let lig_id = self.next_lig_id;
        self.next_lig_id = self.next_lig_id.checked_add(1).unwrap_or(1);
        let first = matched[0];
        let last = *matched.last().unwrap();
        self.set_glyph(buffer, first, lig_glyph);
        {
            let item = &mut buffer.items_mut()[first];
            item.lig_id = lig_id;
            item.lig_component = 0;
        }
        let mut component = 1u16;
        for pos in first + 1..=last {
            if matched.contains(&pos) {
                component += 1;
            } else {
                let item = &mut buffer.items_mut()[pos];
                item.lig_id = lig_id;
                item.lig_component = component;
            }
        }
        for &pos in matched[1..].iter().rev() {
            buffer.remove(pos);
        }
    }

    fn apply_reverse(
        &mut self,
        buffer: &mut ShapeBuffer,
        table: &ReverseChainSingleSubstFormat1<'a>,
        pos: usize,
        skip: &Skip,
    ) -> Option<usize> {
        let glyph = buffer.items()[pos].glyph_id;
        let coverage_index = table.coverage().ok()?.get(glyph)?;
        if !match_backtrack(buffer, pos, table.backtrack_count(), skip, |i, g| {
            table
                .backtrack_coverage(i)
                .ok()
                .and_then(|cov| cov.get(g))
                .is_some()
        }) {
            return None;
        }
        if !match_lookahead(buffer, pos, table.lookahead_count(), skip, |i, g| {
            table
                .lookahead_coverage(i)
                .ok()
                .and_then(|cov| cov.get(g))
                .is_some()
        }) {
            return None;
        }
        let substitute = table.substitute(coverage_index)?;
        self.set_glyph(buffer, pos, substitute);
        Some(pos)
    }

    /// Run the nested lookups of a matched context, adjusting the matched
    /// positions for any buffer edits, and return the position to continue
    /// scanning from.
    fn apply_nested(&mut self, buffer: &mut ShapeBuffer, found: ContextMatch, depth: u32) -> usize {
        let ContextMatch {
            mut matched,
            records,
        } = found;
        for record in &records {
            let sequence_index = record.sequence_index.get() as usize;
            let Some(&at) = matched.get(sequence_index) else {
                continue;
            };
            if at >= buffer.len() {
                continue;
            }
            let before = buffer.len() as isize;
            self.apply_lookup_at(buffer, record.lookup_list_index.get(), at, depth + 1);
            let delta = buffer.len() as isize - before;
            if delta != 0 {
                for position in matched.iter_mut() {
                    if *position > at {
                        *position = (*position as isize + delta).max(at as isize) as usize;
                    }
                }
            }
        }
        matched
            .last()
            .map(|last| last + 1)
            .unwrap_or_default()
            .min(buffer.len())
            .max(1)
    }

    /// Apply a lookup at one exact position, as invoked from a context.
    fn apply_lookup_at(&mut self, buffer: &mut ShapeBuffer, lookup_index: u16, at: usize, depth: u32) {
        if depth >= MAX_NESTING_DEPTH {
            return;
        }
        let Some((lookup, subtables)) = self.resolve_lookup(lookup_index) else {
            return;
        };
        let skip = Skip::new(self.gdef, &lookup);
        if skip.should_skip(&buffer.items()[at]) {
            return;
        }
        self.apply_subtables_at(buffer, &subtables, at, 1, &skip, depth);
    }
}

// ---------- positioning ----------

struct PosContext<'b, 'a> {
    gpos: &'b Gpos<'a>,
    gdef: Option<&'b Gdef<'a>>,
    direction: Direction,
}

impl<'b, 'a> PosContext<'b, 'a> {
    fn apply_lookup(&self, buffer: &mut ShapeBuffer, lookup_index: u16) {
        let Some((lookup, subtables)) = self.resolve_lookup(lookup_index) else {
            return;
        };
        let skip = Skip::new(self.gdef, &lookup);
        let flag = lookup.lookup_flag();
        let mut pos = 0;
        while pos < buffer.len() {
            if skip.should_skip(&buffer.items()[pos]) {
                pos += 1;
                continue;
            }
            match self.apply_subtables_at(buffer, &subtables, pos, &skip, flag, 0) {
                Some(next) => pos = next.max(pos + 1),
                None => pos += 1,
            }
        }
    }

    fn resolve_lookup(
        &self,
        lookup_index: u16,
    ) -> Option<(Lookup<'a>, Vec<PositionSubtable<'a>>)> {
        let lookup = match self.gpos.lookup_list().get(lookup_index) {
            Ok(lookup) => lookup,
            Err(err) => {
                log::warn!("skipping malformed GPOS lookup {lookup_index}: {err}");
                return None;
            }
        };
        let subtables = (0..lookup.subtable_count())
            .filter_map(|i| match self.gpos.subtable(&lookup, i) {
                Ok(subtable) => Some(subtable),
                Err(err) => {
                    log::warn!(
                        "skipping malformed subtable {i} of GPOS lookup {lookup_index}: {err}"
                    );
                    None
                }
            })
            .collect();
        Some((lookup, subtables))
    }

    fn apply_subtables_at(
        &self,
        buffer: &mut ShapeBuffer,
        subtables: &[PositionSubtable<'a>],
        pos: usize,
        skip: &Skip,
        flag: LookupFlag,
        depth: u32,
    ) -> Option<usize> {
        for subtable in subtables {
            if let Some(next) =
                self.apply_subtable_at(buffer, subtable, pos, skip, flag, depth)
            {
                return Some(next);
            }
        }
        None
    }

    fn apply_subtable_at(
        &self,
        buffer: &mut ShapeBuffer,
        subtable: &PositionSubtable<'a>,
        pos: usize,
        skip: &Skip,
        flag: LookupFlag,
        depth: u32,
    ) -> Option<usize> {
        let glyph = buffer.items()[pos].glyph_id;
        match subtable {
            PositionSubtable::Single(table) => {
                let value = table.value(glyph)?;
                apply_value(&mut buffer.items_mut()[pos], &value);
                Some(pos + 1)
            }
            PositionSubtable::Pair(table) => {
                let second_pos = next_unskipped(buffer, pos, skip)?;
                let second = buffer.items()[second_pos].glyph_id;
                let (value1, value2) = table.pair(glyph, second)?;
                apply_value(&mut buffer.items_mut()[pos], &value1);
                apply_value(&mut buffer.items_mut()[second_pos], &value2);
                // when the second record carries an adjustment the pair is
                // consumed whole; otherwise the second glyph starts a new pair
                Some(if value2.is_zero() {
                    second_pos
                } else {
                    second_pos + 1
                })
            }
            PositionSubtable::Cursive(table) => {
                let entry = table.entry_anchor(glyph)?;
                let prev = prev_unskipped(buffer, pos, skip)?;
                let exit = table.exit_anchor(buffer.items()[prev].glyph_id)?;
                self.attach_cursive(buffer, prev, pos, exit, entry, flag);
                Some(pos + 1)
            }
            PositionSubtable::MarkToBase(table) => {
                let (mark_class, mark_anchor) = table.mark_anchor(glyph)?;
                let base = prev_non_mark(buffer, pos)?;
                let base_anchor =
                    table.base_anchor(buffer.items()[base].glyph_id, mark_class)?;
                attach_mark(buffer, pos, base, mark_anchor, base_anchor);
                Some(pos + 1)
            }
            PositionSubtable::MarkToLigature(table) => {
                let (mark_class, mark_anchor) = table.mark_anchor(glyph)?;
                let lig = prev_non_mark(buffer, pos)?;
                let lig_item = buffer.items()[lig];
                let mark_item = buffer.items()[pos];
                // a mark fused into the ligature knows which component it
                // followed; anything else hangs off the last component
                let component = if lig_item.lig_id != 0
                    && lig_item.lig_id == mark_item.lig_id
                    && mark_item.lig_component > 0
                {
                    mark_item.lig_component - 1
                } else {
                    u16::MAX
                };
                let anchor =
                    table.ligature_anchor(lig_item.glyph_id, component, mark_class)?;
                attach_mark(buffer, pos, lig, mark_anchor, anchor);
                Some(pos + 1)
            }
            PositionSubtable::MarkToMark(table) => {
                let (mark_class, mark_anchor) = table.mark1_anchor(glyph)?;
                let prev = prev_unskipped(buffer, pos, skip)?;
                let prev_item = buffer.items()[prev];
                if prev_item.glyph_class != GlyphClass::Mark {
                    return None;
                }
                let anchor = table.mark2_anchor(prev_item.glyph_id, mark_class)?;
                attach_mark(buffer, pos, prev, mark_anchor, anchor);
                Some(pos + 1)
            }
            PositionSubtable::Contextual(ctx) => {
                if depth >= MAX_NESTING_DEPTH {
                    return None;
                }
                let found = match_sequence_context(buffer, ctx, pos, skip)?;
                Some(self.apply_nested(buffer, found, depth))
            }
            PositionSubtable::ChainContextual(ctx) => {
                if depth >= MAX_NESTING_DEPTH {
                    return None;
                }
                let found = match_chained_context(buffer, ctx, pos, skip)?;
                Some(self.apply_nested(buffer, found, depth))
            }
        }
    }

    fn apply_nested(&self, buffer: &mut ShapeBuffer, found: ContextMatch, depth: u32) -> usize {
        for record in &found.records {
            let sequence_index = record.sequence_index.get() as usize;
            let Some(&at) = found.matched.get(sequence_index) else {
                continue;
            };
            self.apply_lookup_at(buffer, record.lookup_list_index.get(), at, depth + 1);
        }
        found.matched.last().map(|last| last + 1).unwrap_or(1)
    }

    fn apply_lookup_at(&self, buffer: &mut ShapeBuffer, lookup_index: u16, at: usize, depth: u32) {
        if depth >= MAX_NESTING_DEPTH {
            return;
        }
        let Some((lookup, subtables)) = self.resolve_lookup(lookup_index) else {
            return;
        };
        let skip = Skip::new(self.gdef, &lookup);
        if at >= buffer.len() || skip.should_skip(&buffer.items()[at]) {
            return;
        }
        self.apply_subtables_at(buffer, &subtables, at, &skip, lookup.lookup_flag(), depth);
    }

    /// Chain the entry anchor of `cur` onto the exit anchor of `prev`.
    fn attach_cursive(
        &self,
        buffer: &mut ShapeBuffer,
        prev: usize,
        cur: usize,
        exit: Anchor,
        entry: Anchor,
        flag: LookupFlag,
    ) {
        let items = buffer.items_mut();
        match self.direction {
            Direction::LeftToRight => {
                items[prev].x_advance = exit.x as i32 + items[prev].x_offset;
                let d = entry.x as i32 + items[cur].x_offset;
                items[cur].x_advance -= d;
                items[cur].x_offset -= d;
            }
            Direction::RightToLeft => {
                let d = exit.x as i32 + items[prev].x_offset;
                items[prev].x_advance -= d;
                items[prev].x_offset -= d;
                items[cur].x_advance = entry.x as i32 + items[cur].x_offset;
            }
            // vertical cursive chaining is not supported
            _ => return,
        }
        // with RIGHT_TO_LEFT set the last glyph of the chain stays on the
        // baseline, so the parent/child roles are swapped
        let (child, parent, child_anchor_y, parent_anchor_y) =
            if flag.contains(LookupFlag::RIGHT_TO_LEFT) {
                (prev, cur, exit.y, entry.y)
            } else {
                (cur, prev, entry.y, exit.y)
            };
        items[child].attach_kind = AttachKind::Cursive;
        items[child].attach_chain = parent as i32 - child as i32;
        items[child].y_offset = parent_anchor_y as i32 - child_anchor_y as i32;
    }
}

fn apply_value(item: &mut ShapeItem, value: &ValueRecord) {
    item.x_offset += value.x_placement as i32;
    item.y_offset += value.y_placement as i32;
    item.x_advance += value.x_advance as i32;
    item.y_advance += value.y_advance as i32;
}

/// The nearest preceding item that is not a mark.
fn prev_non_mark(buffer: &ShapeBuffer, from: usize) -> Option<usize> {
    buffer.items()[..from]
        .iter()
        .rposition(|item| item.glyph_class != GlyphClass::Mark)
}

fn attach_mark(
    buffer: &mut ShapeBuffer,
    mark: usize,
    parent: usize,
    mark_anchor: Anchor,
    parent_anchor: Anchor,
) {
    let item = &mut buffer.items_mut()[mark];
    item.x_offset = parent_anchor.x as i32 - mark_anchor.x as i32;
    item.y_offset = parent_anchor.y as i32 - mark_anchor.y as i32;
    item.attach_kind = AttachKind::Mark;
    item.attach_chain = parent as i32 - mark as i32;
}

/// Turn the attachment chains recorded during positioning into final
/// offsets.
fn resolve_attachments(buffer: &mut ShapeBuffer) {
    let len = buffer.len();
    let mut resolved = vec![false; len];
    for i in 0..len {
        resolve_attachment(buffer, i, &mut resolved);
    }
}

fn resolve_attachment(buffer: &mut ShapeBuffer, index: usize, resolved: &mut [bool]) {
    if resolved[index] {
        return;
    }
    // marking before recursing breaks attachment cycles in malformed fonts
    resolved[index] = true;
    let item = buffer.items()[index];
    if item.attach_kind == AttachKind::None {
        return;
    }
    let parent = index as i64 + item.attach_chain as i64;
    if parent < 0 || parent >= buffer.len() as i64 {
        return;
    }
    let parent = parent as usize;
    resolve_attachment(buffer, parent, resolved);
    let parent_item = buffer.items()[parent];
    match item.attach_kind {
        AttachKind::Cursive => {
            buffer.items_mut()[index].y_offset += parent_item.y_offset;
        }
        AttachKind::Mark => {
            // relative to the parent origin so far; make it relative to this
            // item's own pen position
            let advance_between: i32 = if parent < index {
                -buffer.items()[parent..index]
                    .iter()
                    .map(|item| item.x_advance)
                    .sum::<i32>()
            } else {
                buffer.items()[index + 1..=parent]
                    .iter()
                    .map(|item| item.x_advance)
                    .sum()
            };
            let item = &mut buffer.items_mut()[index];
            item.x_offset += parent_item.x_offset + advance_between;
            item.y_offset += parent_item.y_offset;
        }
        AttachKind::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_predicate_without_gdef_uses_codepoint_fallback() {
        let mut buffer = ShapeBuffer::new();
        buffer.add_codepoints(&['a' as u32, 0x0301, 'b' as u32]);
        for item in buffer.items_mut() {
            item.glyph_class = classify(None, GlyphId::new(1), item.codepoint);
        }
        let skip = Skip {
            gdef: None,
            flag: LookupFlag::IGNORE_MARKS,
            mark_set: None,
        };
        assert!(!skip.should_skip(&buffer.items()[0]));
        assert!(skip.should_skip(&buffer.items()[1]));
        assert_eq!(next_unskipped(&buffer, 0, &skip), Some(2));
        assert_eq!(prev_unskipped(&buffer, 2, &skip), Some(0));

        // base/ligature filters have nothing to go on without GDEF
        let skip = Skip {
            gdef: None,
            flag: LookupFlag::IGNORE_BASE_GLYPHS,
            mark_set: None,
        };
        assert!(!skip.should_skip(&buffer.items()[0]));
    }

    #[test]
    fn value_application_accumulates() {
        let mut item = ShapeItem::default();
        item.x_advance = 100;
        apply_value(
            &mut item,
            &ValueRecord {
                x_advance: -10,
                x_placement: 3,
                ..Default::default()
            },
        );
        apply_value(
            &mut item,
            &ValueRecord {
                x_advance: -5,
                ..Default::default()
            },
        );
        assert_eq!(item.x_advance, 85);
        assert_eq!(item.x_offset, 3);
    }
}
