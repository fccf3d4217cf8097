// src/version/mod.rs

//! Resource versions and version ranges
//!
//! Versions have the form `major[.minor[.micro[.qualifier]]]`. Missing numeric
//! parts default to zero and the qualifier defaults to empty. Ordering compares
//! the numeric triple first, then the qualifier lexicographically.
//!
//! Ranges use interval notation:
//! - `[1.0,2.0)` → 1.0 <= v < 2.0
//! - `(1.0,2.0]` → 1.0 < v <= 2.0
//! - `1.0` → v >= 1.0 (a bare version means "at least")

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing versions or ranges
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid numeric component '{component}' in version '{input}'")]
    InvalidNumber { input: String, component: String },

    #[error("Invalid qualifier '{qualifier}' in version '{input}'")]
    InvalidQualifier { input: String, qualifier: String },

    #[error("Too many components in version '{0}'")]
    TooManyComponents(String),

    #[error("Invalid version range '{0}'")]
    InvalidRange(String),
}

/// A parsed version: numeric triple plus an optional qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    /// The lowest version, `0.0.0`
    pub const EMPTY: Version = Version {
        major: 0,
        minor: 0,
        micro: 0,
        qualifier: String::new(),
    };

    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Attach a qualifier to this version
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Parse a version string
    ///
    /// Examples:
    /// - "1" → 1.0.0
    /// - "1.5.6" → 1.5.6
    /// - "2.0.0.beta-1" → 2.0.0 with qualifier "beta-1"
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut parts = input.splitn(4, '.');
        let mut numbers = [0u64; 3];

        for slot in numbers.iter_mut() {
            match parts.next() {
                Some(part) => {
                    *slot = parse_component(input, part)?;
                }
                None => break,
            }
        }

        let qualifier = parts.next().unwrap_or("");
        if input.ends_with('.') && qualifier.is_empty() {
            // "1.2.3." leaves a dangling separator
            return Err(VersionError::InvalidQualifier {
                input: input.to_string(),
                qualifier: String::new(),
            });
        }
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            let err = if qualifier.contains('.') {
                VersionError::TooManyComponents(input.to_string())
            } else {
                VersionError::InvalidQualifier {
                    input: input.to_string(),
                    qualifier: qualifier.to_string(),
                }
            };
            return Err(err);
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier: qualifier.to_string(),
        })
    }
}

fn parse_component(input: &str, part: &str) -> Result<u64, VersionError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            input: input.to_string(),
            component: part.to_string(),
        });
    }
    part.parse::<u64>().map_err(|_| VersionError::InvalidNumber {
        input: input.to_string(),
        component: part.to_string(),
    })
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A version interval with an inclusive or exclusive bound on each side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub floor: Version,
    pub floor_inclusive: bool,
    /// Upper bound and whether it is inclusive; `None` means unbounded
    pub ceiling: Option<(Version, bool)>,
}

impl VersionRange {
    /// Range matching every version at or above `floor`
    pub fn at_least(floor: Version) -> Self {
        Self {
            floor,
            floor_inclusive: true,
            ceiling: None,
        }
    }

    /// Range matching exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            floor: version.clone(),
            floor_inclusive: true,
            ceiling: Some((version, true)),
        }
    }

    /// Parse interval notation or a bare version
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        let invalid = || VersionError::InvalidRange(s.to_string());

        let floor_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            Some(_) => return Ok(Self::at_least(Version::parse(s)?)),
            None => return Err(VersionError::Empty),
        };

        let ceiling_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };

        if s.len() < 2 {
            return Err(invalid());
        }
        let inner = &s[1..s.len() - 1];
        let (low, high) = inner.split_once(',').ok_or_else(invalid)?;

        let floor = Version::parse(low)?;

        // "[1.0,)" leaves the ceiling open
        if high.trim().is_empty() {
            return Ok(Self {
                floor,
                floor_inclusive,
                ceiling: None,
            });
        }

        let ceiling = Version::parse(high)?;
        if ceiling < floor {
            return Err(invalid());
        }

        Ok(Self {
            floor,
            floor_inclusive,
            ceiling: Some((ceiling, ceiling_inclusive)),
        })
    }

    /// Check if a version falls within this range
    pub fn includes(&self, version: &Version) -> bool {
        let above_floor = if self.floor_inclusive {
            version >= &self.floor
        } else {
            version > &self.floor
        };

        let below_ceiling = match &self.ceiling {
            None => true,
            Some((ceiling, true)) => version <= ceiling,
            Some((ceiling, false)) => version < ceiling,
        };

        above_floor && below_ceiling
    }

    /// Render this range as a filter over the given attribute
    ///
    /// Exclusive bounds are written as negated inclusive comparisons since the
    /// filter language only has `>=` and `<=`.
    pub fn to_filter(&self, attr: &str) -> String {
        let floor = if self.floor_inclusive {
            format!("({}>={})", attr, self.floor)
        } else {
            format!("(!({}<={}))", attr, self.floor)
        };

        match &self.ceiling {
            None => floor,
            Some((ceiling, true)) => format!("(&{}({}<={}))", floor, attr, ceiling),
            Some((ceiling, false)) => format!("(&{}(!({}>={})))", floor, attr, ceiling),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None if self.floor_inclusive => write!(f, "{}", self.floor),
            None => write!(f, "({},)", self.floor),
            Some((ceiling, inclusive)) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                ceiling,
                if *inclusive { ']' } else { ')' }
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_short_forms() {
        assert_eq!(Version::parse("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(Version::parse("1.5").unwrap(), Version::new(1, 5, 0));
        assert_eq!(Version::parse(" 1.5.6 ").unwrap(), Version::new(1, 5, 6));
    }

    #[test]
    fn test_version_parse_qualifier() {
        let v = Version::parse("2.0.0.beta-1").unwrap();
        assert_eq!(v, Version::new(2, 0, 0).with_qualifier("beta-1"));
        assert_eq!(v.to_string(), "2.0.0.beta-1");
    }

    #[test]
    fn test_version_parse_errors() {
        assert_eq!(Version::parse(""), Err(VersionError::Empty));
        assert!(matches!(
            Version::parse("1.x"),
            Err(VersionError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Version::parse("1.2.3.q!"),
            Err(VersionError::InvalidQualifier { .. })
        ));
        assert!(matches!(
            Version::parse("1.2.3.a.b"),
            Err(VersionError::TooManyComponents(_))
        ));
        assert!(Version::parse("1.2.3.").is_err());
        assert!(Version::parse("-1").is_err());
    }

    #[test]
    fn test_version_ordering() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(v("1.2.3") < v("1.2.4"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.0.0") < v("1.0.0.a"));
        assert!(v("1.0.0.alpha") < v("1.0.0.beta"));
        assert_eq!(v("1"), v("1.0.0"));
    }

    #[test]
    fn test_range_parse_and_includes() {
        let r = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(r.includes(&Version::new(1, 0, 0)));
        assert!(r.includes(&Version::new(1, 9, 9)));
        assert!(!r.includes(&Version::new(2, 0, 0)));

        let r = VersionRange::parse("(1.0,2.0]").unwrap();
        assert!(!r.includes(&Version::new(1, 0, 0)));
        assert!(r.includes(&Version::new(2, 0, 0)));
    }

    #[test]
    fn test_range_bare_version_is_at_least() {
        let r = VersionRange::parse("1.5").unwrap();
        assert!(r.includes(&Version::new(99, 0, 0)));
        assert!(!r.includes(&Version::new(1, 4, 9)));
        assert_eq!(r.to_string(), "1.5.0");
    }

    #[test]
    fn test_range_parse_errors() {
        assert!(VersionRange::parse("[1.0,2.0").is_err());
        assert!(VersionRange::parse("[2.0,1.0]").is_err());
        assert!(VersionRange::parse("[1.0]").is_err());
    }

    #[test]
    fn test_range_open_ceiling() {
        let r = VersionRange::parse("(1.0,)").unwrap();
        assert!(!r.includes(&Version::new(1, 0, 0)));
        assert!(r.includes(&Version::new(1, 0, 1)));
        assert_eq!(r.to_string(), "(1.0.0,)");
        assert_eq!(r.to_filter("version"), "(!(version<=1.0.0))");
    }

    #[test]
    fn test_range_to_filter() {
        let r = VersionRange::parse("[1.0,2.0)").unwrap();
        assert_eq!(
            r.to_filter("version"),
            "(&(version>=1.0.0)(!(version>=2.0.0)))"
        );

        let r = VersionRange::exact(Version::new(1, 5, 6));
        assert_eq!(r.to_filter("version"), "(&(version>=1.5.6)(version<=1.5.6))");
        assert_eq!(r.to_string(), "[1.5.6,1.5.6]");
    }
}
