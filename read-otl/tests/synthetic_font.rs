//! Parse the synthetic test font end to end.

use otl_test_data::font::{self, glyphs, ADVANCES, KERN_A_V};
use read_otl::tables::gdef::GlyphClass;
use read_otl::tables::gpos::PositionSubtable;
use read_otl::tables::gsub::SubstitutionSubtable;
use read_otl::tables::layout::LookupFlag;
use read_otl::types::{GlyphId, Tag};
use read_otl::{FontRef, TableProvider};

fn gid(raw: u16) -> GlyphId {
    GlyphId::new(raw)
}

#[test]
fn every_table_parses() {
    let data = font::test_font();
    let font = FontRef::new(data.as_slice()).unwrap();
    font.cmap().unwrap();
    font.maxp().unwrap();
    font.hhea().unwrap();
    font.hmtx().unwrap();
    font.gdef().unwrap();
    font.gsub().unwrap();
    font.gpos().unwrap();
    assert_eq!(font.maxp().unwrap().num_glyphs(), font::NUM_GLYPHS);
}

#[test]
fn cmap_maps_the_repertoire() {
    let data = font::test_font();
    let font = FontRef::new(data.as_slice()).unwrap();
    let cmap = font.cmap().unwrap();
    assert_eq!(cmap.map_codepoint('A'), Some(gid(glyphs::A)));
    assert_eq!(cmap.map_codepoint('f'), Some(gid(glyphs::F)));
    assert_eq!(cmap.map_codepoint(0x301u32), Some(gid(glyphs::ACUTE)));
    assert_eq!(cmap.map_codepoint('z'), None);
}

#[test]
fn hmtx_serves_advances() {
    let data = font::test_font();
    let font = FontRef::new(data.as_slice()).unwrap();
    let hmtx = font.hmtx().unwrap();
    for (raw, advance) in ADVANCES.iter().enumerate() {
        assert_eq!(hmtx.advance(gid(raw as u16)), *advance);
    }
}

#[test]
fn gdef_classifies_the_repertoire() {
    let data = font::test_font();
    let font = FontRef::new(data.as_slice()).unwrap();
    let gdef = font.gdef().unwrap();
    assert_eq!(gdef.glyph_class(gid(glyphs::A)), GlyphClass::Base);
    assert_eq!(gdef.glyph_class(gid(glyphs::F_I)), GlyphClass::Ligature);
    assert_eq!(gdef.glyph_class(gid(glyphs::ACUTE)), GlyphClass::Mark);
    assert_eq!(gdef.glyph_class(gid(glyphs::NOTDEF)), GlyphClass::Unclassified);
}

#[test]
fn gsub_wiring() {
    let data = font::test_font();
    let font = FontRef::new(data.as_slice()).unwrap();
    let gsub = font.gsub().unwrap();

    let (_, script) = gsub
        .script_list()
        .select(&[Tag::new(b"latn")])
        .expect("DFLT script is the fallback");
    let lang_sys = script.select_lang_sys(None).unwrap();
    assert_eq!(lang_sys.required_feature_index(), None);
    assert_eq!(lang_sys.feature_indices().len(), 2);

    let (calt, _) = gsub.feature_list().get(0).unwrap();
    let (liga, liga_feature) = gsub.feature_list().get(1).unwrap();
    assert_eq!(calt, Tag::new(b"calt"));
    assert_eq!(liga, Tag::new(b"liga"));
    assert_eq!(liga_feature.lookup_list_indices()[0].get(), 0);

    assert_eq!(gsub.lookup_list().lookup_count(), 3);
    let lookup = gsub.lookup_list().get(0).unwrap();
    let subtable = gsub.subtable(&lookup, 0).unwrap();
    let SubstitutionSubtable::Ligature(liga_subtable) = subtable else {
        panic!("lookup 0 should be a ligature substitution");
    };
    let set = liga_subtable.ligature_set(gid(glyphs::F)).unwrap();
    assert_eq!(set.ligature_count(), 2);
    let ffi = set.ligature(0).unwrap();
    assert_eq!(ffi.ligature_glyph(), gid(glyphs::F_F_I));
    assert_eq!(ffi.component_count(), 3);

    let chain = gsub.lookup_list().get(2).unwrap();
    assert!(matches!(
        gsub.subtable(&chain, 0).unwrap(),
        SubstitutionSubtable::ChainContextual(_)
    ));
}

#[test]
fn gpos_wiring() {
    let data = font::test_font();
    let font = FontRef::new(data.as_slice()).unwrap();
    let gpos = font.gpos().unwrap();

    let kern = gpos.lookup_list().get(0).unwrap();
    assert!(kern.lookup_flag().contains(LookupFlag::IGNORE_MARKS));
    let PositionSubtable::Pair(pair) = gpos.subtable(&kern, 0).unwrap() else {
        panic!("lookup 0 should be a pair adjustment");
    };
    let (first, second) = pair.pair(gid(glyphs::A), gid(glyphs::V)).unwrap();
    assert_eq!(first.x_advance, KERN_A_V);
    assert!(second.is_zero());
    assert!(pair.pair(gid(glyphs::A), gid(glyphs::T)).is_none());

    let mark = gpos.lookup_list().get(1).unwrap();
    let PositionSubtable::MarkToBase(mark_base) = gpos.subtable(&mark, 0).unwrap() else {
        panic!("lookup 1 should be mark-to-base");
    };
    let (class, anchor) = mark_base.mark_anchor(gid(glyphs::ACUTE)).unwrap();
    assert_eq!(class, 0);
    assert_eq!(
        (anchor.x, anchor.y),
        font::anchors::ACUTE_MARK,
    );
    let base = mark_base.base_anchor(gid(glyphs::O), 0).unwrap();
    assert_eq!((base.x, base.y), font::anchors::O_BASE);
}
