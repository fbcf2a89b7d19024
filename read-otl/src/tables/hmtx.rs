//! the horizontal metrics table

use crate::font_data::FontData;
use crate::read::{FontReadWithArgs, ReadArgs, ReadError};
use crate::types::{BigEndian, FixedSize, GlyphId, Tag};

pub const TAG: Tag = Tag::new(b"hmtx");

/// An advance width paired with a left side bearing.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct LongMetric {
    pub advance: BigEndian<u16>,
    pub side_bearing: BigEndian<i16>,
}

// SAFETY: repr(C), no padding, all fields are raw byte arrays.
unsafe impl bytemuck::Zeroable for LongMetric {}
unsafe impl bytemuck::AnyBitPattern for LongMetric {}

impl FixedSize for LongMetric {
    const RAW_BYTE_LEN: usize = 4;
}

/// The `hmtx` table.
///
/// Glyphs past the last long metric share its advance and carry only a side
/// bearing.
#[derive(Clone)]
pub struct Hmtx<'a> {
    h_metrics: &'a [LongMetric],
    left_side_bearings: &'a [BigEndian<i16>],
}

impl ReadArgs for Hmtx<'_> {
    /// (number_of_h_metrics, num_glyphs)
    type Args = (u16, u16);
}

impl<'a> FontReadWithArgs<'a> for Hmtx<'a> {
    fn read_with_args(data: FontData<'a>, args: &(u16, u16)) -> Result<Self, ReadError> {
        let (number_of_h_metrics, num_glyphs) = *args;
        let mut cursor = data.cursor();
        let h_metrics = cursor.read_array(number_of_h_metrics as usize)?;
        let remainder = num_glyphs.saturating_sub(number_of_h_metrics);
        let left_side_bearings = cursor.read_array(remainder as usize)?;
        Ok(Hmtx {
            h_metrics,
            left_side_bearings,
        })
    }
}

impl Hmtx<'_> {
    /// The advance width of the given glyph, in font units.
    pub fn advance(&self, glyph_id: GlyphId) -> u16 {
        let idx = (glyph_id.to_u16() as usize).min(self.h_metrics.len().saturating_sub(1));
        self.h_metrics
            .get(idx)
            .map(|metric| metric.advance.get())
            .unwrap_or_default()
    }

    /// The left side bearing of the given glyph, in font units.
    pub fn side_bearing(&self, glyph_id: GlyphId) -> i16 {
        let idx = glyph_id.to_u16() as usize;
        if let Some(metric) = self.h_metrics.get(idx) {
            return metric.side_bearing.get();
        }
        self.left_side_bearings
            .get(idx.saturating_sub(self.h_metrics.len()))
            .map(|bearing| bearing.get())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_glyphs_share_last_advance() {
        // two long metrics, two bare side bearings
        let data = [
            0x02, 0x00, 0x00, 10, // advance 512, lsb 10
            0x01, 0x00, 0x00, 20, // advance 256, lsb 20
            0x00, 30, 0x00, 40,
        ];
        let hmtx = Hmtx::read_with_args(FontData::new(&data), &(2, 4)).unwrap();
        assert_eq!(hmtx.advance(GlyphId::new(0)), 512);
        assert_eq!(hmtx.advance(GlyphId::new(1)), 256);
        assert_eq!(hmtx.advance(GlyphId::new(2)), 256);
        assert_eq!(hmtx.advance(GlyphId::new(3)), 256);
        assert_eq!(hmtx.side_bearing(GlyphId::new(1)), 20);
        assert_eq!(hmtx.side_bearing(GlyphId::new(3)), 40);
    }

    #[test]
    fn truncated_metrics_fail() {
        let data = [0x02, 0x00, 0x00, 10];
        assert!(Hmtx::read_with_args(FontData::new(&data), &(2, 2)).is_err());
    }
}
