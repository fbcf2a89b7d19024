//! Feature settings requested by the caller.

use std::fmt;
use std::str::FromStr;

use read_otl::types::{InvalidTag, Tag};

/// A feature selection: a tag and the value to set it to.
///
/// A value of 0 turns the feature off; for alternate-selection lookups the
/// value doubles as a 1-based alternate index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Feature {
    pub tag: Tag,
    pub value: u32,
}

impl Feature {
    /// Create a new feature setting.
    pub fn new(tag: Tag, value: u32) -> Self {
        Feature { tag, value }
    }
}

/// An error parsing a feature string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseFeatureError {
    Empty,
    InvalidTag(InvalidTag),
    InvalidValue,
}

impl fmt::Display for ParseFeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty feature string"),
            Self::InvalidTag(err) => write!(f, "invalid feature tag: {err}"),
            Self::InvalidValue => write!(f, "invalid feature value"),
        }
    }
}

impl std::error::Error for ParseFeatureError {}

impl From<InvalidTag> for ParseFeatureError {
    fn from(err: InvalidTag) -> Self {
        Self::InvalidTag(err)
    }
}

impl FromStr for Feature {
    type Err = ParseFeatureError;

    /// Parses the common feature-string grammar: `"kern"` and `"+kern"`
    /// enable, `"-kern"` disables, `"kern=2"` sets an explicit value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseFeatureError::Empty);
        }
        if let Some(rest) = s.strip_prefix('-') {
            return Ok(Feature::new(Tag::new_checked(rest.as_bytes())?, 0));
        }
        let s = s.strip_prefix('+').unwrap_or(s);
        if let Some((tag, value)) = s.split_once('=') {
            let value: u32 = value.parse().map_err(|_| ParseFeatureError::InvalidValue)?;
            return Ok(Feature::new(Tag::new_checked(tag.as_bytes())?, value));
        }
        Ok(Feature::new(Tag::new_checked(s.as_bytes())?, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_string_grammar() {
        assert_eq!(
            "kern".parse::<Feature>().unwrap(),
            Feature::new(Tag::new(b"kern"), 1)
        );
        assert_eq!(
            "+liga".parse::<Feature>().unwrap(),
            Feature::new(Tag::new(b"liga"), 1)
        );
        assert_eq!(
            "-liga".parse::<Feature>().unwrap(),
            Feature::new(Tag::new(b"liga"), 0)
        );
        assert_eq!(
            "aalt=3".parse::<Feature>().unwrap(),
            Feature::new(Tag::new(b"aalt"), 3)
        );
        // short tags are space padded
        assert_eq!(
            "cv1=2".parse::<Feature>().unwrap(),
            Feature::new(Tag::new(b"cv1 "), 2)
        );
        assert!("".parse::<Feature>().is_err());
        assert!("kern=x".parse::<Feature>().is_err());
        assert!("toolong".parse::<Feature>().is_err());
    }
}
