//! Dotted numeric pack versions.
//!
//! Pack authors write free-form version strings. Collision resolution only
//! needs an ordering, so versions are read as up to four dot-separated
//! unsigned integers (`major.minor.build.revision`); missing trailing
//! components are zero. Anything else ranks as `0.0.0.0`, the lowest version.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::codec::Decoded;

/// Maximum number of version components.
const MAX_COMPONENTS: usize = 4;

/// Errors parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The string is empty or whitespace.
    #[error("empty version")]
    Empty,

    /// More than four components.
    #[error("version '{0}' has more than four components")]
    TooManyComponents(String),

    /// A component is not an unsigned integer.
    #[error("invalid version component '{component}' in '{version}'")]
    InvalidComponent { version: String, component: String },
}

/// A comparable pack version.
///
/// # Example
///
/// ```
/// use contentpack::pack::PackVersion;
///
/// let older: PackVersion = "2.0.9".parse().unwrap();
/// let newer: PackVersion = "2.1".parse().unwrap();
/// assert!(newer > older);
///
/// // Unparseable text ranks lowest
/// let bogus = PackVersion::parse_lenient("beta");
/// assert!(bogus.used_fallback());
/// assert_eq!(bogus.value, PackVersion::ZERO);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackVersion([u32; MAX_COMPONENTS]);

impl PackVersion {
    /// `0.0.0.0`.
    pub const ZERO: PackVersion = PackVersion([0; MAX_COMPONENTS]);

    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self([major, minor, build, revision])
    }

    /// Parse `text`, falling back to [`PackVersion::ZERO`] with the reason.
    pub fn parse_lenient(text: &str) -> Decoded<PackVersion, VersionError> {
        match text.parse() {
            Ok(version) => Decoded::parsed(version),
            Err(e) => Decoded::kept(Self::ZERO, e),
        }
    }

    pub fn major(&self) -> u32 {
        self.0[0]
    }

    pub fn minor(&self) -> u32 {
        self.0[1]
    }

    pub fn build(&self) -> u32 {
        self.0[2]
    }

    pub fn revision(&self) -> u32 {
        self.0[3]
    }
}

impl FromStr for PackVersion {
    type Err = VersionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut parts = [0u32; MAX_COMPONENTS];
        for (i, component) in trimmed.split('.').enumerate() {
            if i >= MAX_COMPONENTS {
                return Err(VersionError::TooManyComponents(text.to_string()));
            }
            let valid = !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit());
            parts[i] = valid
                .then(|| component.parse().ok())
                .flatten()
                .ok_or_else(|| VersionError::InvalidComponent {
                    version: text.to_string(),
                    component: component.to_string(),
                })?;
        }

        Ok(Self(parts))
    }
}

impl fmt::Display for PackVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, build, revision] = self.0;
        write!(f, "{}.{}.{}.{}", major, minor, build, revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pads_missing_components() {
        let v: PackVersion = "2.1".parse().unwrap();
        assert_eq!(v, PackVersion::new(2, 1, 0, 0));
        assert_eq!(v.major(), 2);
        assert_eq!(v.minor(), 1);
        assert_eq!(v.build(), 0);
        assert_eq!(v.revision(), 0);
    }

    #[test]
    fn test_parse_four_components() {
        let v: PackVersion = " 1.2.3.4 ".parse().unwrap();
        assert_eq!(v, PackVersion::new(1, 2, 3, 4));
        assert_eq!(v.to_string(), "1.2.3.4");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!("".parse::<PackVersion>(), Err(VersionError::Empty));
        assert!(matches!(
            "1.2.3.4.5".parse::<PackVersion>(),
            Err(VersionError::TooManyComponents(_))
        ));
        for text in ["1..2", "v1.0", "1.0-beta", "-1.0", "+1", "1.", "99999999999"] {
            assert!(
                matches!(
                    text.parse::<PackVersion>(),
                    Err(VersionError::InvalidComponent { .. })
                ),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_ordering_is_numeric_not_lexical() {
        let a: PackVersion = "2.0.9".parse().unwrap();
        let b: PackVersion = "2.1.0".parse().unwrap();
        let c: PackVersion = "2.10".parse().unwrap();

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_trailing_zeros_compare_equal() {
        let a: PackVersion = "1.0".parse().unwrap();
        let b: PackVersion = "1.0.0.0".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_lenient_parse_falls_back_to_zero() {
        let decoded = PackVersion::parse_lenient("latest");
        assert_eq!(decoded.value, PackVersion::ZERO);
        assert!(decoded.used_fallback());

        let decoded = PackVersion::parse_lenient("3.2");
        assert_eq!(decoded.value, PackVersion::new(3, 2, 0, 0));
        assert!(!decoded.used_fallback());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_order_matches_tuple_order(
                a in proptest::array::uniform4(0u32..50),
                b in proptest::array::uniform4(0u32..50),
            ) {
                let va: PackVersion = format!("{}.{}.{}.{}", a[0], a[1], a[2], a[3]).parse()?;
                let vb: PackVersion = format!("{}.{}.{}.{}", b[0], b[1], b[2], b[3]).parse()?;
                prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
            }
        }
    }
}
