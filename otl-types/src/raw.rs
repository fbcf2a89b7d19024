//! Raw big-endian scalars and the unaligned wrapper around them.

pub(crate) mod sealed {
    /// A byte array that can back a scalar.
    pub trait BeByteArray: Copy + AsRef<[u8]> {
        fn from_slice(slice: &[u8]) -> Option<Self>;
    }

    impl<const N: usize> BeByteArray for [u8; N] {
        #[inline]
        fn from_slice(slice: &[u8]) -> Option<Self> {
            slice.try_into().ok()
        }
    }
}

/// A trait for font scalars.
///
/// This is an internal trait for encoding and decoding the big-endian bytes
/// that represent some type in a font file.
pub trait Scalar: Sized + Copy {
    /// The raw byte representation of this type.
    type Raw: sealed::BeByteArray;

    /// Create an instance of this type from raw big-endian bytes.
    fn from_raw(raw: Self::Raw) -> Self;

    /// Encode this type as raw big-endian bytes.
    fn to_raw(self) -> Self::Raw;

    /// Attempt to read a scalar from a slice.
    ///
    /// This will always succeed if `slice.len() == Self::RAW_BYTE_LEN`, and
    /// will always return `None` otherwise.
    #[inline]
    fn read(slice: &[u8]) -> Option<Self> {
        sealed::BeByteArray::from_slice(slice).map(Self::from_raw)
    }
}

/// A trait for types with a known, constant size in the font file.
pub trait FixedSize: Sized {
    /// The raw size of this type, in bytes.
    const RAW_BYTE_LEN: usize;
}

macro_rules! int_scalar {
    ($ty:ty, $raw:ty) => {
        impl Scalar for $ty {
            type Raw = $raw;

            #[inline]
            fn to_raw(self) -> $raw {
                self.to_be_bytes()
            }

            #[inline]
            fn from_raw(raw: $raw) -> Self {
                Self::from_be_bytes(raw)
            }
        }

        impl FixedSize for $ty {
            const RAW_BYTE_LEN: usize = std::mem::size_of::<$raw>();
        }
    };
}

int_scalar!(u8, [u8; 1]);
int_scalar!(i8, [u8; 1]);
int_scalar!(u16, [u8; 2]);
int_scalar!(i16, [u8; 2]);
int_scalar!(u32, [u8; 4]);
int_scalar!(i32, [u8; 4]);

/// A wrapper around raw big-endian bytes for some type.
///
/// Values of this type may appear anywhere in a parsed table, at any
/// alignment, and are converted to native types on access.
#[repr(transparent)]
pub struct BigEndian<T: Scalar>(T::Raw);

// SAFETY: `BigEndian<T>` contains only a single field, `<T as Scalar>::Raw`,
// which is only ever a byte array.
unsafe impl<T: Scalar + Copy + 'static> bytemuck::Zeroable for BigEndian<T> {}
unsafe impl<T: Scalar + Copy + 'static> bytemuck::AnyBitPattern for BigEndian<T> {}

impl<T: Scalar> BigEndian<T> {
    /// Construct a new `BigEndian<T>` from raw bytes.
    #[inline]
    pub fn new(raw: T::Raw) -> Self {
        Self(raw)
    }

    /// Attempt to construct a new value from this slice.
    ///
    /// This will fail if `slice.len() != T::RAW_BYTE_LEN`.
    #[inline]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        sealed::BeByteArray::from_slice(slice).map(Self)
    }

    /// Convert this raw value to its native representation.
    #[inline]
    pub fn get(self) -> T {
        T::from_raw(self.0)
    }

    /// The raw big-endian bytes.
    #[inline]
    pub fn be_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: Scalar> Clone for BigEndian<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Scalar> Copy for BigEndian<T> {}

impl<T: Scalar> From<T> for BigEndian<T> {
    #[inline]
    fn from(val: T) -> Self {
        Self(val.to_raw())
    }
}

impl<T: Scalar + Default> Default for BigEndian<T> {
    fn default() -> Self {
        Self::from(T::default())
    }
}

impl<T: Scalar + PartialEq> PartialEq for BigEndian<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Scalar + Eq> Eq for BigEndian<T> {}

// so that a native value can be compared against a raw one in tests and
// binary searches
impl<T: Scalar + PartialEq> PartialEq<T> for BigEndian<T> {
    fn eq(&self, other: &T) -> bool {
        self.get() == *other
    }
}

impl<T: Scalar + PartialOrd> PartialOrd for BigEndian<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.get().partial_cmp(&other.get())
    }
}

impl<T: Scalar + Ord> Ord for BigEndian<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.get().cmp(&other.get())
    }
}

impl<T: Scalar + std::fmt::Debug> std::fmt::Debug for BigEndian<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.get().fmt(f)
    }
}

impl<T: Scalar + FixedSize> FixedSize for BigEndian<T> {
    const RAW_BYTE_LEN: usize = T::RAW_BYTE_LEN;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_roundtrips() {
        assert_eq!(u16::from_raw(0x1234u16.to_raw()), 0x1234);
        assert_eq!(i16::from_raw((-20i16).to_raw()), -20);
        assert_eq!(u32::read(&[0, 1, 0, 0]), Some(0x10000));
        assert_eq!(u32::read(&[0, 1, 0]), None);
    }

    #[test]
    fn big_endian_get() {
        let raw = BigEndian::<u16>::from_slice(&[0x12, 0x34]).unwrap();
        assert_eq!(raw.get(), 0x1234);
        assert_eq!(raw, 0x1234u16);
    }
}
