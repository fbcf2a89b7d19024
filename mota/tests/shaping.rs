//! End-to-end shaping over the synthetic test font.

use mota::{Direction, Feature, ShapeBuffer, Shaper};
use otl_test_data::font::{self, anchors, glyphs, ADVANCES, KERN_A_V, KERN_T_O};
use read_otl::types::GlyphId;
use read_otl::FontRef;

fn gid(raw: u16) -> GlyphId {
    GlyphId::new(raw)
}

fn shape(text: &str, features: &[&str]) -> (Vec<GlyphId>, Vec<i32>, Vec<u32>) {
    shape_font(&font::test_font(), text, features)
}

fn shape_font(font_data: &[u8], text: &str, features: &[&str]) -> (Vec<GlyphId>, Vec<i32>, Vec<u32>) {
    let font = FontRef::new(font_data).unwrap();
    let shaper = Shaper::new(&font);
    let features: Vec<Feature> = features.iter().map(|f| f.parse().unwrap()).collect();
    let mut buffer = ShapeBuffer::new();
    buffer.add_str(text);
    shaper.shape(&mut buffer, &features);
    (
        buffer.glyphs().collect(),
        buffer.positions().map(|pos| pos.x_advance).collect(),
        buffer.items().iter().map(|item| item.cluster).collect(),
    )
}

fn advance_of(glyph: u16) -> i32 {
    ADVANCES[glyph as usize] as i32
}

#[test]
fn hello_maps_and_advances() {
    let (glyph_ids, advances, clusters) = shape("Hello", &[]);
    assert_eq!(
        glyph_ids,
        [glyphs::H, glyphs::E, glyphs::L, glyphs::L, glyphs::O].map(gid)
    );
    assert_eq!(advances, [1460, 1085, 497, 497, 1168]);
    assert_eq!(clusters, [0, 1, 2, 3, 4]);
}

#[test]
fn pair_kerning_shortens_the_first_advance() {
    let (glyph_ids, advances, _) = shape("AV", &[]);
    assert_eq!(glyph_ids, [glyphs::A, glyphs::V].map(gid));
    assert_eq!(
        advances,
        [advance_of(glyphs::A) + KERN_A_V as i32, advance_of(glyphs::V)]
    );

    let (glyph_ids, advances, _) = shape("To", &[]);
    assert_eq!(glyph_ids, [glyphs::T, glyphs::O].map(gid));
    assert_eq!(
        advances,
        [advance_of(glyphs::T) + KERN_T_O as i32, advance_of(glyphs::O)]
    );
}

#[test]
fn fi_ligature_collapses_two_glyphs() {
    let (glyph_ids, advances, clusters) = shape("fi", &[]);
    assert_eq!(glyph_ids, [gid(glyphs::F_I)]);
    assert_eq!(advances, [advance_of(glyphs::F_I)]);
    assert_eq!(clusters, [0]);
}

#[test]
fn longer_ligature_wins() {
    let (glyph_ids, _, clusters) = shape("ffi", &[]);
    assert_eq!(glyph_ids, [gid(glyphs::F_F_I)]);
    assert_eq!(clusters, [0]);
}

#[test]
fn office_ligates_in_the_middle() {
    let (glyph_ids, advances, clusters) = shape("office", &[]);
    assert_eq!(
        glyph_ids,
        [glyphs::O, glyphs::F_F_I, glyphs::C, glyphs::E].map(gid)
    );
    assert_eq!(advances, [1168, 1748, 1072, 1085]);
    // clusters survive the three-to-one fusion
    assert_eq!(clusters, [0, 1, 4, 5]);
}

#[test]
fn disabling_liga_preserves_the_pair() {
    let (glyph_ids, _, clusters) = shape("fi", &["-liga"]);
    assert_eq!(glyph_ids, [glyphs::F, glyphs::I].map(gid));
    assert_eq!(clusters, [0, 1]);
}

#[test]
fn chained_context_substitutes_through_a_nested_lookup() {
    // A V T matches backtrack/input/lookahead and rewrites the V
    let (glyph_ids, _, _) = shape("AVT", &[]);
    assert_eq!(glyph_ids, [glyphs::A, glyphs::V_ALT, glyphs::T].map(gid));

    // the alternate V is not a kerning pair with A, so the kern disappears
    let (_, advances, _) = shape("AVT", &[]);
    assert_eq!(advances[0], advance_of(glyphs::A));
}

#[test]
fn disabled_feature_is_equivalent_to_absent() {
    let (glyph_ids, advances, _) = shape("AVT", &["-calt"]);
    assert_eq!(glyph_ids, [glyphs::A, glyphs::V, glyphs::T].map(gid));
    // with the plain V back, the AV kern applies again
    assert_eq!(advances[0], advance_of(glyphs::A) + KERN_A_V as i32);
}

#[test]
fn kern_skips_marks_between_the_pair() {
    let (glyph_ids, advances, _) = shape("A\u{301}V", &[]);
    assert_eq!(glyph_ids, [glyphs::A, glyphs::ACUTE, glyphs::V].map(gid));
    // the kern lookup ignores the acute and still pairs A with V
    assert_eq!(advances[0], advance_of(glyphs::A) + KERN_A_V as i32);
    assert_eq!(advances[1], 0);
}

#[test]
fn mark_attaches_to_preceding_base() {
    let font_data = font::test_font();
    let font = FontRef::new(font_data.as_slice()).unwrap();
    let shaper = Shaper::new(&font);
    let run = shaper.shape_str("o\u{301}");
    assert_eq!(run.glyphs, [glyphs::O, glyphs::ACUTE].map(gid));
    let mark = run.positions[1];
    // anchor delta, pulled back over the advance of the base
    let expected_x =
        (anchors::O_BASE.0 - anchors::ACUTE_MARK.0) as i32 - advance_of(glyphs::O);
    assert_eq!(mark.x_offset, expected_x);
    assert_eq!(mark.y_offset, (anchors::O_BASE.1 - anchors::ACUTE_MARK.1) as i32);
}

#[test]
fn mark_attachment_accounts_for_kerned_base() {
    // the base advance is kerned before the mark offset is resolved
    let (_, advances, _) = shape("A\u{301}V", &[]);
    let font_data = font::test_font();
    let font = FontRef::new(font_data.as_slice()).unwrap();
    let shaper = Shaper::new(&font);
    let run = shaper.shape_str("A\u{301}V");
    let expected_x = (anchors::A_BASE.0 - anchors::ACUTE_MARK.0) as i32 - advances[0];
    assert_eq!(run.positions[1].x_offset, expected_x);
    assert_eq!(run.positions[1].y_offset, anchors::A_BASE.1 as i32);
}

#[test]
fn empty_input_empty_output() {
    let (glyph_ids, advances, clusters) = shape("", &[]);
    assert!(glyph_ids.is_empty());
    assert!(advances.is_empty());
    assert!(clusters.is_empty());

    let font_data = font::test_font();
    let font = FontRef::new(font_data.as_slice()).unwrap();
    let shaper = Shaper::new(&font);
    let mut buffer = ShapeBuffer::new();
    shaper.shape(&mut buffer, &[]);
    assert!(buffer.is_empty());
}

#[test]
fn unmapped_codepoints_become_notdef() {
    let (glyph_ids, advances, _) = shape("z", &[]);
    assert_eq!(glyph_ids, [GlyphId::NOTDEF]);
    // notdef is never substituted, but it still has an advance
    assert_eq!(advances, [advance_of(glyphs::NOTDEF)]);
}

#[test]
fn cff_flavored_font_shapes_identically() {
    let ttf = font::test_font();
    let otto = font::test_font_cff_flavored();
    for text in ["Hello", "office", "AV", "A\u{301}V", "AVT", "fi"] {
        let shaped_ttf = shape_font(&ttf, text, &[]);
        let shaped_otto = shape_font(&otto, text, &[]);
        assert_eq!(shaped_ttf, shaped_otto, "divergence on {text:?}");
    }
}

#[test]
fn clusters_stay_monotonic_everywhere() {
    for text in ["Hello", "office", "ffi", "fifi", "A\u{301}V", "AVT"] {
        let (_, _, clusters) = shape(text, &[]);
        assert!(
            clusters.windows(2).all(|pair| pair[0] <= pair[1]),
            "clusters regressed for {text:?}: {clusters:?}"
        );
    }
}

#[test]
fn explicit_direction_is_respected() {
    let font_data = font::test_font();
    let font = FontRef::new(font_data.as_slice()).unwrap();
    let shaper = Shaper::new(&font);
    let mut buffer = ShapeBuffer::new();
    buffer.set_direction(Direction::RightToLeft);
    buffer.add_str("AV");
    shaper.shape(&mut buffer, &[]);
    assert_eq!(buffer.direction(), Some(Direction::RightToLeft));
    // logical order is unchanged; kerning applies either way
    let advances: Vec<i32> = buffer.positions().map(|p| p.x_advance).collect();
    assert_eq!(advances[0], advance_of(glyphs::A) + KERN_A_V as i32);
}
