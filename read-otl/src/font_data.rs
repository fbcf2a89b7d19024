//! raw font bytes

use std::ops::{Range, RangeBounds};

use bytemuck::AnyBitPattern;

use crate::read::ReadError;
use crate::types::{BigEndian, FixedSize, Scalar};

/// A reference to raw binary font data.
///
/// This is a wrapper around a byte slice, providing the bounds-checked
/// primitive reads everything else is built from.
#[derive(Debug, Default, Clone, Copy)]
pub struct FontData<'a> {
    bytes: &'a [u8],
}

/// A cursor for sequential reads during table parsing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cursor<'a> {
    pos: usize,
    data: FontData<'a>,
}

impl<'a> FontData<'a> {
    /// Empty data, useful for some tests and defaults.
    pub const EMPTY: FontData<'static> = FontData { bytes: &[] };

    /// Create a new `FontData` with these bytes.
    pub const fn new(bytes: &'a [u8]) -> Self {
        FontData { bytes }
    }

    /// The length of the data, in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if the data has a length of zero bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `self[pos..]`, or `None` if `pos` is out of bounds.
    pub fn split_off(&self, pos: usize) -> Option<FontData<'a>> {
        self.bytes.get(pos..).map(|bytes| FontData { bytes })
    }

    /// Returns a sub-range of the data, or `None` if out of bounds.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Option<FontData<'a>> {
        let bounds = (range.start_bound().cloned(), range.end_bound().cloned());
        self.bytes.get(bounds).map(|bytes| FontData { bytes })
    }

    /// Read a scalar at the provided location in the data.
    pub fn read_at<T: Scalar + FixedSize>(&self, offset: usize) -> Result<T, ReadError> {
        let end = offset
            .checked_add(T::RAW_BYTE_LEN)
            .ok_or(ReadError::OutOfBounds)?;
        self.bytes
            .get(offset..end)
            .and_then(T::read)
            .ok_or(ReadError::OutOfBounds)
    }

    /// Read a raw big-endian value at the provided location in the data.
    pub fn read_be_at<T: Scalar + FixedSize>(
        &self,
        offset: usize,
    ) -> Result<BigEndian<T>, ReadError> {
        let end = offset
            .checked_add(T::RAW_BYTE_LEN)
            .ok_or(ReadError::OutOfBounds)?;
        self.bytes
            .get(offset..end)
            .and_then(BigEndian::from_slice)
            .ok_or(ReadError::OutOfBounds)
    }

    /// Interpret the bytes at the provided range as a slice of `T`.
    ///
    /// Returns an error if `range` is out of bounds for the underlying data,
    /// or if the length of the range is not a multiple of the item size.
    pub fn read_array<T: AnyBitPattern + FixedSize>(
        &self,
        range: Range<usize>,
    ) -> Result<&'a [T], ReadError> {
        let bytes = self
            .bytes
            .get(range.clone())
            .ok_or(ReadError::OutOfBounds)?;
        if bytes
            .len()
            .checked_rem(std::mem::size_of::<T>())
            .unwrap_or(1)
            != 0
        {
            return Err(ReadError::InvalidArrayLen);
        }
        Ok(bytemuck::cast_slice(bytes))
    }

    pub(crate) fn cursor(&self) -> Cursor<'a> {
        Cursor {
            pos: 0,
            data: *self,
        }
    }

    /// Return the data as a byte slice.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> From<&'a [u8]> for FontData<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        FontData { bytes }
    }
}

impl<'a> Cursor<'a> {
    /// Read a scalar and advance the cursor.
    pub(crate) fn read<T: Scalar + FixedSize>(&mut self) -> Result<T, ReadError> {
        let temp = self.data.read_at(self.pos);
        self.advance::<T>();
        temp
    }

    /// Read an array of `count` raw values and advance the cursor past it.
    pub(crate) fn read_array<T: AnyBitPattern + FixedSize>(
        &mut self,
        count: usize,
    ) -> Result<&'a [T], ReadError> {
        let len = count
            .checked_mul(T::RAW_BYTE_LEN)
            .ok_or(ReadError::OutOfBounds)?;
        let end = self.pos.checked_add(len).ok_or(ReadError::OutOfBounds)?;
        let temp = self.data.read_array(self.pos..end);
        self.pos = end;
        temp
    }

    pub(crate) fn advance<T: FixedSize>(&mut self) {
        self.pos = self.pos.saturating_add(T::RAW_BYTE_LEN);
    }

    pub(crate) fn advance_by(&mut self, n_bytes: usize) {
        self.pos = self.pos.saturating_add(n_bytes);
    }

    /// The current byte position of the cursor.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GlyphId;

    #[test]
    fn bounds_checked_reads() {
        let data = FontData::new(&[0, 1, 0, 2, 0xFF]);
        assert_eq!(data.read_at::<u16>(0), Ok(1));
        assert_eq!(data.read_at::<u16>(2), Ok(2));
        assert!(matches!(
            data.read_at::<u16>(4),
            Err(ReadError::OutOfBounds)
        ));
        assert!(matches!(
            data.read_at::<u32>(usize::MAX),
            Err(ReadError::OutOfBounds)
        ));
    }

    #[test]
    fn arrays_are_zero_copy() {
        let data = FontData::new(&[0, 1, 0, 2, 0, 3]);
        let array = data.read_array::<BigEndian<GlyphId>>(0..6).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[2].get(), GlyphId::new(3));
        assert!(matches!(
            data.read_array::<BigEndian<GlyphId>>(0..5),
            Err(ReadError::InvalidArrayLen)
        ));
    }

    #[test]
    fn cursor_reads_in_order() {
        let data = FontData::new(&[0, 1, 0xFF, 0xFE, 0, 0, 0, 9]);
        let mut cursor = data.cursor();
        assert_eq!(cursor.read::<u16>(), Ok(1));
        assert_eq!(cursor.read::<i16>(), Ok(-2));
        assert_eq!(cursor.read::<u32>(), Ok(9));
        assert!(cursor.read::<u8>().is_err());
    }
}
