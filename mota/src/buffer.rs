//! The shape buffer: an ordered, mutable sequence of shape items.

use read_otl::tables::gdef::GlyphClass;
use read_otl::types::{GlyphId, Tag};

use crate::unicode;

/// The progression direction of a text run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    /// `true` for the two horizontal directions.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }
}

/// How an item is attached to another, if at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttachKind {
    #[default]
    None,
    Mark,
    Cursive,
}

/// One slot in the buffer: a glyph in flight through the pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShapeItem {
    /// The current glyph.
    pub glyph_id: GlyphId,
    /// The code point the item originated from; retained for classification
    /// fallbacks after substitution.
    pub codepoint: u32,
    /// Which input code point(s) this item derives from. Monotonically
    /// non-decreasing across the buffer.
    pub cluster: u32,
    /// The GDEF class of the current glyph.
    pub glyph_class: GlyphClass,
    /// Non-zero id shared by a ligature and the marks trailing inside it.
    pub lig_id: u16,
    /// 1-based component index for a mark inside a ligature, 0 otherwise.
    pub lig_component: u16,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Attachment produced by a GPOS lookup, resolved at the end of the
    /// positioning pass.
    pub attach_kind: AttachKind,
    /// Signed item distance to the attachment parent.
    pub attach_chain: i32,
}

/// The final position of one shaped glyph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// An ordered sequence of shape items plus the run's segment properties.
///
/// A buffer is filled with code points, handed to a
/// [`Shaper`](crate::Shaper) which mutates it in place, and then read out.
#[derive(Clone, Debug, Default)]
pub struct ShapeBuffer {
    items: Vec<ShapeItem>,
    direction: Option<Direction>,
    script: Option<Tag>,
    language: Option<Tag>,
}

impl ShapeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all items and segment properties, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
        self.direction = None;
        self.script = None;
        self.language = None;
    }

    /// Append one code point with an explicit cluster value.
    pub fn push(&mut self, codepoint: u32, cluster: u32) {
        self.items.push(ShapeItem {
            codepoint,
            cluster,
            ..Default::default()
        });
    }

    /// Append a string, clustering by char index.
    pub fn add_str(&mut self, text: &str) {
        let base = self.items.len() as u32;
        for (i, ch) in text.chars().enumerate() {
            self.push(ch as u32, base + i as u32);
        }
    }

    /// Append code points, clustering by index.
    pub fn add_codepoints(&mut self, codepoints: &[u32]) {
        let base = self.items.len() as u32;
        for (i, &codepoint) in codepoints.iter().enumerate() {
            self.push(codepoint, base + i as u32);
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }

    pub fn script(&self) -> Option<Tag> {
        self.script
    }

    pub fn set_script(&mut self, script: Tag) {
        self.script = Some(script);
    }

    pub fn language(&self) -> Option<Tag> {
        self.language
    }

    pub fn set_language(&mut self, language: Tag) {
        self.language = Some(language);
    }

    /// Fill in unset segment properties from the buffer contents.
    ///
    /// The direction is taken from the first strongly-directional code
    /// point, defaulting to left-to-right; the script from the first code
    /// point with a known script.
    pub fn guess_segment_properties(&mut self) {
        if self.direction.is_none() {
            let guessed = self
                .items
                .iter()
                .find_map(|item| unicode::strong_direction(item.codepoint))
                .unwrap_or(Direction::LeftToRight);
            self.direction = Some(guessed);
        }
        if self.script.is_none() {
            self.script = self
                .items
                .iter()
                .find_map(|item| unicode::script_tag(item.codepoint));
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ShapeItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [ShapeItem] {
        &mut self.items
    }

    /// The glyph ids, in buffer order.
    pub fn glyphs(&self) -> impl Iterator<Item = GlyphId> + '_ {
        self.items.iter().map(|item| item.glyph_id)
    }

    /// The positions, in buffer order.
    pub fn positions(&self) -> impl Iterator<Item = GlyphPosition> + '_ {
        self.items.iter().map(|item| GlyphPosition {
            x_advance: item.x_advance,
            y_advance: item.y_advance,
            x_offset: item.x_offset,
            y_offset: item.y_offset,
        })
    }

    /// Replace `count` items starting at `start` with the given glyphs.
    ///
    /// Every output item inherits the cluster (and source code point) of the
    /// first replaced item, which keeps clusters monotonic. An empty
    /// replacement deletes the items.
    pub(crate) fn replace(&mut self, start: usize, count: usize, glyphs: &[GlyphId]) {
        let template = self.items[start];
        self.items.splice(
            start..start + count,
            glyphs.iter().map(|&glyph_id| ShapeItem {
                glyph_id,
                codepoint: template.codepoint,
                cluster: template.cluster,
                ..Default::default()
            }),
        );
    }

    /// Remove the item at `index`.
    pub(crate) fn remove(&mut self, index: usize) -> ShapeItem {
        self.items.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters(buffer: &ShapeBuffer) -> Vec<u32> {
        buffer.items().iter().map(|item| item.cluster).collect()
    }

    #[test]
    fn add_str_clusters_by_char() {
        let mut buffer = ShapeBuffer::new();
        buffer.add_str("héllo");
        assert_eq!(buffer.len(), 5);
        assert_eq!(clusters(&buffer), [0, 1, 2, 3, 4]);
        assert_eq!(buffer.items()[1].codepoint, 'é' as u32);
    }

    #[test]
    fn replace_preserves_first_cluster() {
        let mut buffer = ShapeBuffer::new();
        buffer.add_codepoints(&[10, 11, 12, 13]);
        buffer.replace(1, 2, &[GlyphId::new(99)]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(clusters(&buffer), [0, 1, 3]);
        assert_eq!(buffer.items()[1].glyph_id, GlyphId::new(99));

        // one-to-many expansion propagates the cluster to every output
        buffer.replace(2, 1, &[GlyphId::new(7), GlyphId::new(8)]);
        assert_eq!(clusters(&buffer), [0, 1, 3, 3]);
    }

    #[test]
    fn guess_direction_defaults_to_ltr() {
        let mut buffer = ShapeBuffer::new();
        buffer.add_str("123");
        buffer.guess_segment_properties();
        assert_eq!(buffer.direction(), Some(Direction::LeftToRight));

        let mut buffer = ShapeBuffer::new();
        buffer.add_str("שלום");
        buffer.guess_segment_properties();
        assert_eq!(buffer.direction(), Some(Direction::RightToLeft));
        assert_eq!(buffer.script(), Some(Tag::new(b"hebr")));
    }

    #[test]
    fn explicit_direction_wins() {
        let mut buffer = ShapeBuffer::new();
        buffer.set_direction(Direction::RightToLeft);
        buffer.add_str("abc");
        buffer.guess_segment_properties();
        assert_eq!(buffer.direction(), Some(Direction::RightToLeft));
    }
}
