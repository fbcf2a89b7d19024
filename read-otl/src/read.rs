//! Traits for interpreting font data

use crate::font_data::FontData;
use crate::types::{MajorMinor, Tag};

/// A type that can be read from raw table data.
///
/// This trait is implemented for all tables that are self-describing: that
/// is, tables that do not require any external state in order to interpret
/// their underlying bytes. (Tables that require external state implement
/// [`FontReadWithArgs`] instead.)
pub trait FontRead<'a>: Sized {
    /// Read an instance of `Self` from the provided data, performing
    /// validation.
    ///
    /// This method is responsible for ensuring the input data is consistent:
    /// that versioned fields are present as required by the version, and
    /// that array lengths are not out-of-bounds.
    fn read(data: FontData<'a>) -> Result<Self, ReadError>;
}

/// A trait for a type that needs additional arguments to be read.
pub trait ReadArgs {
    type Args: Copy;
}

/// A trait for types that require external data in order to be constructed.
pub trait FontReadWithArgs<'a>: Sized + ReadArgs {
    /// Read an item, using the provided args.
    ///
    /// If a type requires multiple arguments, they will be passed as a tuple.
    fn read_with_args(data: FontData<'a>, args: &Self::Args) -> Result<Self, ReadError>;
}

/// An error that occurs when reading font data.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    /// A read would exceed the table bounds, or an offset landed outside
    /// its parent range.
    OutOfBounds,
    /// A format value outside the enumerated set.
    // i64 is flexible enough to store any value we might encounter
    InvalidFormat(i64),
    /// A major version outside the accepted set.
    InvalidVersion(MajorMinor),
    /// The file does not start with a recognized sfnt version.
    InvalidSfnt(u32),
    /// An array length was not a multiple of its item size.
    InvalidArrayLen,
    /// An offset that must not be null was null.
    NullOffset,
    /// The requested table is not in the font.
    TableIsMissing(Tag),
    /// A structural invariant of the data was broken.
    MalformedData(&'static str),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::OutOfBounds => write!(f, "An offset was out of bounds"),
            ReadError::InvalidFormat(x) => write!(f, "Invalid format '{x}'"),
            ReadError::InvalidVersion(version) => {
                write!(f, "Unsupported version {}.{}", version.major, version.minor)
            }
            ReadError::InvalidSfnt(version) => write!(f, "Invalid sfnt version 0x{version:08X}"),
            ReadError::InvalidArrayLen => {
                write!(f, "Specified array length not a multiple of item size")
            }
            ReadError::NullOffset => write!(f, "An offset was unexpectedly null"),
            ReadError::TableIsMissing(tag) => write!(f, "the {tag} table is missing"),
            ReadError::MalformedData(msg) => write!(f, "Malformed data: '{msg}'"),
        }
    }
}

impl std::error::Error for ReadError {}
