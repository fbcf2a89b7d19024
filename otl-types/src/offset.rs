//! Offsets to tables and subtables.
//!
//! Offsets are always relative to the start of some parent table, and an
//! offset of zero conventionally means "table not present".

macro_rules! impl_offset {
    ($name:ident, $ty:ty, $raw:ty, $bits:literal) => {
        #[doc = concat!("A", " ", stringify!($bits), "-bit offset from the start of a parent table.")]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($ty);

        impl $name {
            /// Construct a new offset.
            pub const fn new(raw: $ty) -> Self {
                Self(raw)
            }

            /// `true` if this offset is zero.
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }

            /// The offset as a byte index.
            pub const fn to_usize(self) -> usize {
                self.0 as usize
            }

            /// The byte index, or `None` for a null offset.
            pub fn non_null(self) -> Option<usize> {
                if self.0 == 0 {
                    None
                } else {
                    Some(self.0 as usize)
                }
            }
        }

        impl crate::raw::Scalar for $name {
            type Raw = $raw;

            fn to_raw(self) -> Self::Raw {
                self.0.to_be_bytes()
            }

            fn from_raw(raw: Self::Raw) -> Self {
                Self(<$ty>::from_be_bytes(raw))
            }
        }

        impl crate::raw::FixedSize for $name {
            const RAW_BYTE_LEN: usize = std::mem::size_of::<$raw>();
        }
    };
}

impl_offset!(Offset16, u16, [u8; 2], 16);
impl_offset!(Offset32, u32, [u8; 4], 32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_offsets() {
        assert!(Offset16::new(0).is_null());
        assert_eq!(Offset16::new(0).non_null(), None);
        assert_eq!(Offset32::new(10).non_null(), Some(10));
    }
}
