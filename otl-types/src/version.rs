//! Table version numbers.

/// A major/minor version pair, as used by the layout tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MajorMinor {
    /// The major version number.
    pub major: u16,
    /// The minor version number.
    pub minor: u16,
}

impl MajorMinor {
    pub const VERSION_1_0: MajorMinor = MajorMinor::new(1, 0);
    pub const VERSION_1_1: MajorMinor = MajorMinor::new(1, 1);
    pub const VERSION_1_2: MajorMinor = MajorMinor::new(1, 2);
    pub const VERSION_1_3: MajorMinor = MajorMinor::new(1, 3);

    /// Create a new version with the provided major and minor parts.
    pub const fn new(major: u16, minor: u16) -> Self {
        MajorMinor { major, minor }
    }

    /// `true` if this version can be read by code written against `other`.
    ///
    /// Minor version bumps are additive, so a version is compatible with any
    /// earlier minor version of the same major version.
    pub fn compatible(self, other: MajorMinor) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl crate::raw::Scalar for MajorMinor {
    type Raw = [u8; 4];

    fn to_raw(self) -> Self::Raw {
        let [a, b] = self.major.to_be_bytes();
        let [c, d] = self.minor.to_be_bytes();
        [a, b, c, d]
    }

    fn from_raw(raw: Self::Raw) -> Self {
        let major = u16::from_be_bytes([raw[0], raw[1]]);
        let minor = u16::from_be_bytes([raw[2], raw[3]]);
        MajorMinor { major, minor }
    }
}

impl crate::raw::FixedSize for MajorMinor {
    const RAW_BYTE_LEN: usize = 4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility() {
        assert!(MajorMinor::VERSION_1_2.compatible(MajorMinor::VERSION_1_0));
        assert!(MajorMinor::VERSION_1_0.compatible(MajorMinor::VERSION_1_0));
        assert!(!MajorMinor::VERSION_1_0.compatible(MajorMinor::VERSION_1_2));
        assert!(!MajorMinor::new(2, 0).compatible(MajorMinor::VERSION_1_0));
    }
}
