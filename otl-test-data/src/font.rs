//! A small synthetic font exercising the full shaping pipeline.
//!
//! The font carries real `cmap`, `hmtx`, `GDEF`, `GSUB` and `GPOS` tables
//! assembled at runtime, with no outlines. Its substitution rules are the
//! classic Latin ones: `f i` and `f f i` ligatures under `liga`, a chained
//! contextual alternate under `calt`, pair kerning for `AV` and `To` under
//! `kern` (ignoring marks), and an acute mark that attaches to its base
//! under `mark`.

use otl_types::{Tag, CFF_SFNT_VERSION, TT_SFNT_VERSION};

use crate::bebuffer::BeBuffer;

/// The glyph repertoire, by name.
pub mod glyphs {
    pub const NOTDEF: u16 = 0;
    pub const H: u16 = 1;
    pub const E: u16 = 2;
    pub const L: u16 = 3;
    pub const O: u16 = 4;
    pub const A: u16 = 5;
    pub const V: u16 = 6;
    pub const T: u16 = 7;
    pub const F: u16 = 8;
    pub const I: u16 = 9;
    pub const C: u16 = 10;
    pub const F_I: u16 = 11;
    pub const F_F_I: u16 = 12;
    pub const ACUTE: u16 = 13;
    pub const V_ALT: u16 = 14;
}

pub const NUM_GLYPHS: u16 = 15;

/// Advance widths in font units, indexed by glyph id.
pub const ADVANCES: [u16; NUM_GLYPHS as usize] = [
    500, 1460, 1085, 497, 1168, 1336, 1303, 1175, 600, 534, 1072, 1134, 1748, 0, 1303,
];

/// The `AV` kern value.
pub const KERN_A_V: i16 = -87;
/// The `To` kern value.
pub const KERN_T_O: i16 = -52;

/// Anchor coordinates used by the mark attachment lookup.
pub mod anchors {
    pub const O_BASE: (i16, i16) = (550, 1400);
    pub const A_BASE: (i16, i16) = (600, 1500);
    pub const ACUTE_MARK: (i16, i16) = (50, 0);
}

const CMAP_MAPPINGS: &[(u32, u16)] = &[
    (0x41, glyphs::A),
    (0x48, glyphs::H),
    (0x54, glyphs::T),
    (0x56, glyphs::V),
    (0x63, glyphs::C),
    (0x65, glyphs::E),
    (0x66, glyphs::F),
    (0x69, glyphs::I),
    (0x6C, glyphs::L),
    (0x6F, glyphs::O),
    (0x301, glyphs::ACUTE),
];

fn coverage(glyph_ids: &[u16]) -> Vec<u8> {
    BeBuffer::new()
        .push(1u16)
        .push(glyph_ids.len() as u16)
        .push(glyph_ids)
        .into_vec()
}

fn anchor(x: i16, y: i16) -> Vec<u8> {
    BeBuffer::new().push(1u16).push(x).push(y).into_vec()
}

/// A script list with a single `DFLT` script listing the given features.
fn script_list(feature_indices: &[u16]) -> Vec<u8> {
    let lang_sys = BeBuffer::new()
        .push(0u16) // lookupOrderOffset
        .push(0xFFFFu16) // no required feature
        .push(feature_indices.len() as u16)
        .push(feature_indices)
        .into_vec();
    let script = BeBuffer::new()
        .push(4u16) // defaultLangSys directly after the header
        .push(0u16) // no named lang sys
        .push(lang_sys.as_slice())
        .into_vec();
    BeBuffer::new()
        .push(1u16)
        .push(Tag::new(b"DFLT"))
        .push(8u16)
        .push(script.as_slice())
        .into_vec()
}

fn feature_list(features: &[(Tag, &[u16])]) -> Vec<u8> {
    let mut buffer = BeBuffer::new().push(features.len() as u16);
    let mut offset = 2 + features.len() * 6;
    let mut bodies = Vec::new();
    for (tag, lookup_indices) in features {
        buffer = buffer.push(*tag).push(offset as u16);
        let body = BeBuffer::new()
            .push(0u16) // featureParamsOffset
            .push(lookup_indices.len() as u16)
            .push(*lookup_indices)
            .into_vec();
        offset += body.len();
        bodies.push(body);
    }
    for body in &bodies {
        buffer = buffer.push(body.as_slice());
    }
    buffer.into_vec()
}

fn lookup(lookup_type: u16, lookup_flag: u16, subtables: &[Vec<u8>]) -> Vec<u8> {
    let mut buffer = BeBuffer::new()
        .push(lookup_type)
        .push(lookup_flag)
        .push(subtables.len() as u16);
    let mut offset = 6 + subtables.len() * 2;
    for subtable in subtables {
        buffer = buffer.push(offset as u16);
        offset += subtable.len();
    }
    for subtable in subtables {
        buffer = buffer.push(subtable.as_slice());
    }
    buffer.into_vec()
}

fn lookup_list(lookups: &[Vec<u8>]) -> Vec<u8> {
    let mut buffer = BeBuffer::new().push(lookups.len() as u16);
    let mut offset = 2 + lookups.len() * 2;
    for lookup in lookups {
        buffer = buffer.push(offset as u16);
        offset += lookup.len();
    }
    for lookup in lookups {
        buffer = buffer.push(lookup.as_slice());
    }
    buffer.into_vec()
}

/// Assemble a GSUB/GPOS-shaped table from its three lists.
fn layout_table(scripts: Vec<u8>, features: Vec<u8>, lookups: Vec<u8>) -> Vec<u8> {
    let script_offset = 10usize;
    let feature_offset = script_offset + scripts.len();
    let lookup_offset = feature_offset + features.len();
    BeBuffer::new()
        .push([1u16, 0]) // version 1.0
        .push(script_offset as u16)
        .push(feature_offset as u16)
        .push(lookup_offset as u16)
        .push(scripts.as_slice())
        .push(features.as_slice())
        .push(lookups.as_slice())
        .into_vec()
}

/// The `f f i` / `f i` ligature subtable; the longer candidate is listed
/// first so it wins.
fn ligature_subst() -> Vec<u8> {
    let cov = coverage(&[glyphs::F]);
    let ffi = BeBuffer::new()
        .push(glyphs::F_F_I)
        .push(3u16)
        .push([glyphs::F, glyphs::I])
        .into_vec();
    let fi = BeBuffer::new()
        .push(glyphs::F_I)
        .push(2u16)
        .push([glyphs::I])
        .into_vec();
    let set_header = 2 + 2 * 2;
    let set = BeBuffer::new()
        .push(2u16)
        .push(set_header as u16)
        .push((set_header + ffi.len()) as u16)
        .push(ffi.as_slice())
        .push(fi.as_slice())
        .into_vec();
    let header = 8usize;
    BeBuffer::new()
        .push(1u16)
        .push(header as u16)
        .push(1u16)
        .push((header + cov.len()) as u16)
        .push(cov.as_slice())
        .push(set.as_slice())
        .into_vec()
}

fn single_subst_delta(covered: &[u16], delta: i16) -> Vec<u8> {
    let cov = coverage(covered);
    BeBuffer::new()
        .push(1u16)
        .push(6u16)
        .push(delta)
        .push(cov.as_slice())
        .into_vec()
}

/// A chained context (format 3) running nested lookups on a match.
fn chain_context(
    backtrack: &[&[u16]],
    input: &[&[u16]],
    lookahead: &[&[u16]],
    records: &[(u16, u16)],
) -> Vec<u8> {
    let header_len = 2
        + 2
        + backtrack.len() * 2
        + 2
        + input.len() * 2
        + 2
        + lookahead.len() * 2
        + 2
        + records.len() * 4;
    let coverages: Vec<Vec<u8>> = backtrack
        .iter()
        .chain(input)
        .chain(lookahead)
        .map(|glyph_ids| coverage(glyph_ids))
        .collect();
    let mut offsets = Vec::new();
    let mut offset = header_len;
    for cov in &coverages {
        offsets.push(offset as u16);
        offset += cov.len();
    }
    let mut offsets = offsets.into_iter();
    let mut buffer = BeBuffer::new().push(3u16).push(backtrack.len() as u16);
    for _ in backtrack {
        buffer = buffer.push(offsets.next().unwrap());
    }
    buffer = buffer.push(input.len() as u16);
    for _ in input {
        buffer = buffer.push(offsets.next().unwrap());
    }
    buffer = buffer.push(lookahead.len() as u16);
    for _ in lookahead {
        buffer = buffer.push(offsets.next().unwrap());
    }
    buffer = buffer.push(records.len() as u16);
    for (sequence_index, lookup_index) in records {
        buffer = buffer.push(*sequence_index).push(*lookup_index);
    }
    for cov in &coverages {
        buffer = buffer.push(cov.as_slice());
    }
    buffer.into_vec()
}

/// A pair positioning subtable adjusting the first advance, format 1.
fn pair_pos(sets: &[(u16, &[(u16, i16)])]) -> Vec<u8> {
    let firsts: Vec<u16> = sets.iter().map(|(first, _)| *first).collect();
    let cov = coverage(&firsts);
    let header_len = 10 + sets.len() * 2;
    let coverage_offset = header_len;
    let mut buffer = BeBuffer::new()
        .push(1u16)
        .push(coverage_offset as u16)
        .push(0x0004u16) // X_ADVANCE on the first glyph
        .push(0u16)
        .push(sets.len() as u16);
    let mut set_bodies = Vec::new();
    let mut offset = coverage_offset + cov.len();
    for (_, pairs) in sets {
        let mut body = BeBuffer::new().push(pairs.len() as u16);
        for (second, x_advance) in *pairs {
            body = body.push(*second).push(*x_advance);
        }
        let body = body.into_vec();
        buffer = buffer.push(offset as u16);
        offset += body.len();
        set_bodies.push(body);
    }
    buffer = buffer.push(cov.as_slice());
    for body in &set_bodies {
        buffer = buffer.push(body.as_slice());
    }
    buffer.into_vec()
}

/// A mark-to-base subtable with a single mark class.
fn mark_base_pos(marks: &[(u16, (i16, i16))], bases: &[(u16, (i16, i16))]) -> Vec<u8> {
    let mark_cov = coverage(&marks.iter().map(|(g, _)| *g).collect::<Vec<_>>());
    let base_cov = coverage(&bases.iter().map(|(g, _)| *g).collect::<Vec<_>>());

    // mark array: records then anchors, offsets relative to the array
    let mark_header = 2 + marks.len() * 4;
    let mut mark_array = BeBuffer::new().push(marks.len() as u16);
    for (i, _) in marks.iter().enumerate() {
        mark_array = mark_array.push(0u16).push((mark_header + i * 6) as u16);
    }
    for (_, (x, y)) in marks {
        mark_array = mark_array.push(anchor(*x, *y).as_slice());
    }
    let mark_array = mark_array.into_vec();

    let base_header = 2 + bases.len() * 2;
    let mut base_array = BeBuffer::new().push(bases.len() as u16);
    for (i, _) in bases.iter().enumerate() {
        base_array = base_array.push((base_header + i * 6) as u16);
    }
    for (_, (x, y)) in bases {
        base_array = base_array.push(anchor(*x, *y).as_slice());
    }
    let base_array = base_array.into_vec();

    let header = 12usize;
    let mark_cov_offset = header;
    let base_cov_offset = mark_cov_offset + mark_cov.len();
    let mark_array_offset = base_cov_offset + base_cov.len();
    let base_array_offset = mark_array_offset + mark_array.len();
    BeBuffer::new()
        .push(1u16)
        .push(mark_cov_offset as u16)
        .push(base_cov_offset as u16)
        .push(1u16) // one mark class
        .push(mark_array_offset as u16)
        .push(base_array_offset as u16)
        .push(mark_cov.as_slice())
        .push(base_cov.as_slice())
        .push(mark_array.as_slice())
        .push(base_array.as_slice())
        .into_vec()
}

fn gsub() -> Vec<u8> {
    let liga = lookup(4, 0, &[ligature_subst()]);
    let v_alt = lookup(1, 0, &[single_subst_delta(&[glyphs::V], 8)]);
    let calt = lookup(
        6,
        0,
        &[chain_context(
            &[&[glyphs::A]],
            &[&[glyphs::V]],
            &[&[glyphs::T]],
            &[(0, 1)],
        )],
    );
    layout_table(
        script_list(&[0, 1]),
        feature_list(&[
            (Tag::new(b"calt"), &[2]),
            (Tag::new(b"liga"), &[0]),
        ]),
        lookup_list(&[liga, v_alt, calt]),
    )
}

fn gpos() -> Vec<u8> {
    // kern ignores marks so that `A <acute> V` still kerns
    let kern = lookup(
        2,
        0x0008,
        &[pair_pos(&[
            (glyphs::A, &[(glyphs::V, KERN_A_V)]),
            (glyphs::T, &[(glyphs::O, KERN_T_O)]),
        ])],
    );
    let mark = lookup(
        4,
        0,
        &[mark_base_pos(
            &[(glyphs::ACUTE, anchors::ACUTE_MARK)],
            &[(glyphs::O, anchors::O_BASE), (glyphs::A, anchors::A_BASE)],
        )],
    );
    layout_table(
        script_list(&[0, 1]),
        feature_list(&[
            (Tag::new(b"kern"), &[0]),
            (Tag::new(b"mark"), &[1]),
        ]),
        lookup_list(&[kern, mark]),
    )
}

fn gdef() -> Vec<u8> {
    // classes: 1-10 and V.alt are bases, the ligatures are ligatures,
    // the acute is a mark
    let class_def = BeBuffer::new()
        .push(2u16)
        .push(4u16)
        .push([glyphs::H, glyphs::C, 1])
        .push([glyphs::F_I, glyphs::F_F_I, 2])
        .push([glyphs::ACUTE, glyphs::ACUTE, 3])
        .push([glyphs::V_ALT, glyphs::V_ALT, 1])
        .into_vec();
    BeBuffer::new()
        .push([1u16, 0]) // version 1.0
        .push(12u16) // glyphClassDef
        .push([0u16, 0, 0]) // no attach list, lig carets, mark attach classes
        .push(class_def.as_slice())
        .into_vec()
}

fn cmap() -> Vec<u8> {
    let mut groups = BeBuffer::new();
    for (codepoint, glyph_id) in CMAP_MAPPINGS {
        groups = groups
            .push(*codepoint)
            .push(*codepoint)
            .push(*glyph_id as u32);
    }
    let groups = groups.into_vec();
    let subtable_len = 16 + groups.len();
    let subtable = BeBuffer::new()
        .push(12u16)
        .push(0u16) // reserved
        .push(subtable_len as u32)
        .push(0u32) // language
        .push(CMAP_MAPPINGS.len() as u32)
        .push(groups.as_slice())
        .into_vec();
    BeBuffer::new()
        .push(0u16) // version
        .push(1u16) // one encoding record: (3, 10)
        .push(3u16)
        .push(10u16)
        .push(12u32)
        .push(subtable.as_slice())
        .into_vec()
}

fn maxp() -> Vec<u8> {
    BeBuffer::new()
        .push(0x00010000u32)
        .push(NUM_GLYPHS)
        .into_vec()
}

fn hhea() -> Vec<u8> {
    BeBuffer::new()
        .push(0x00010000u32)
        .push(1900i16) // ascender
        .push(-500i16) // descender
        .push([0u16; 13]) // line gap through metric data format
        .push(NUM_GLYPHS) // every glyph gets a long metric
        .into_vec()
}

fn hmtx() -> Vec<u8> {
    let mut buffer = BeBuffer::new();
    for advance in ADVANCES {
        buffer = buffer.push(advance).push(0i16);
    }
    buffer.into_vec()
}

fn build_font(sfnt_version: u32) -> Vec<u8> {
    // directory entries must be sorted by tag
    let tables: Vec<(Tag, Vec<u8>)> = vec![
        (Tag::new(b"GDEF"), gdef()),
        (Tag::new(b"GPOS"), gpos()),
        (Tag::new(b"GSUB"), gsub()),
        (Tag::new(b"cmap"), cmap()),
        (Tag::new(b"hhea"), hhea()),
        (Tag::new(b"hmtx"), hmtx()),
        (Tag::new(b"maxp"), maxp()),
    ];
    let mut buffer = BeBuffer::new()
        .push(sfnt_version)
        .push(tables.len() as u16)
        .push([0u16; 3]); // search params, unread
    let mut offset = 12 + tables.len() * 16;
    for (tag, data) in &tables {
        buffer = buffer
            .push(*tag)
            .push(0u32) // checksum, unread
            .push(offset as u32)
            .push(data.len() as u32);
        offset += data.len();
    }
    for (_, data) in &tables {
        buffer = buffer.push(data.as_slice());
    }
    buffer.into_vec()
}

/// A complete TrueType-flavored test font.
pub fn test_font() -> Vec<u8> {
    build_font(TT_SFNT_VERSION)
}

/// The same font behind a CFF-flavored (`OTTO`) directory.
pub fn test_font_cff_flavored() -> Vec<u8> {
    build_font(CFF_SFNT_VERSION)
}
