//! # Versions and Version Ranges
//!
//! Four-part versions (`major.minor.micro.qualifier`) and interval ranges over
//! them.
//!
//! Range syntax:
//!
//! ```text
//! [1.0,2.0)   1.0 <= v < 2.0
//! (1.0,2.0]   1.0 <  v <= 2.0
//! [1.0,1.0]   v == 1.0
//! 1.0         1.0 <= v        (no ceiling)
//! ```

use crate::{FeatureError, FeatureResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// =============================================================================
// VERSION
// =============================================================================

/// A parsed version.
///
/// Ordering compares the numeric segments first, then the qualifier as a
/// plain string, so `1.0.0 < 1.0.0.RC1 < 1.0.0.SNAPSHOT < 1.0.1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    /// Create a version without qualifier.
    #[must_use]
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// The `0.0.0` version.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Attach a qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Parse a version string.
    ///
    /// Missing segments default to zero. A `-` right after the numeric part
    /// starts the qualifier, so `1.2.3-SNAPSHOT` parses like `1.2.3.SNAPSHOT`
    /// and `2-rc1` like `2.0.0.rc1`.
    pub fn parse(input: &str) -> FeatureResult<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(FeatureError::version(input, "empty version"));
        }

        let mut segments = [0u64; 3];
        let mut rest = text;
        let mut qualifier = None;

        for (index, slot) in segments.iter_mut().enumerate() {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return Err(FeatureError::version(
                    input,
                    format!("expected a number at '{rest}'"),
                ));
            }
            *slot = rest[..digits].parse().map_err(|_| {
                FeatureError::version(input, format!("segment '{}' out of range", &rest[..digits]))
            })?;
            rest = &rest[digits..];

            match rest.chars().next() {
                None => break,
                Some('-') => {
                    qualifier = Some(&rest[1..]);
                    rest = "";
                    break;
                }
                Some('.') if index == 2 => {
                    qualifier = Some(&rest[1..]);
                    rest = "";
                    break;
                }
                Some('.') => rest = &rest[1..],
                Some(other) => {
                    return Err(FeatureError::version(
                        input,
                        format!("unexpected character '{other}'"),
                    ));
                }
            }
        }

        if !rest.is_empty() {
            return Err(FeatureError::version(input, format!("trailing '{rest}'")));
        }
        let qualifier = match qualifier {
            Some("") => return Err(FeatureError::version(input, "empty qualifier")),
            Some(q) => q,
            None => "",
        };
        if let Some(bad) = qualifier
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(FeatureError::version(
                input,
                format!("invalid qualifier character '{bad}'"),
            ));
        }

        Ok(Self {
            major: segments[0],
            minor: segments[1],
            micro: segments[2],
            qualifier: qualifier.to_string(),
        })
    }

    /// Numeric segment by position (0 = major, 1 = minor, 2 = micro).
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<u64> {
        match index {
            0 => Some(self.major),
            1 => Some(self.minor),
            2 => Some(self.micro),
            _ => None,
        }
    }

    /// Check if this is the `0.0.0` version.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// First version of the next major line.
    #[must_use]
    pub fn next_major(&self) -> Self {
        Self::new(self.major.saturating_add(1), 0, 0)
    }

    /// First version of the next minor line.
    #[must_use]
    pub fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1), 0)
    }
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

impl std::str::FromStr for Version {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// VERSION RANGE
// =============================================================================

/// An interval of versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub floor: Version,
    pub floor_inclusive: bool,
    /// `None` means unbounded.
    pub ceiling: Option<Version>,
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    /// `floor <= v`, no ceiling.
    #[must_use]
    pub fn at_least(floor: Version) -> Self {
        Self {
            floor,
            floor_inclusive: true,
            ceiling: None,
            ceiling_inclusive: false,
        }
    }

    /// `v == version`.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            floor: version.clone(),
            floor_inclusive: true,
            ceiling: Some(version),
            ceiling_inclusive: true,
        }
    }

    /// `floor <= v < ceiling`.
    #[must_use]
    pub fn half_open(floor: Version, ceiling: Version) -> Self {
        Self {
            floor,
            floor_inclusive: true,
            ceiling: Some(ceiling),
            ceiling_inclusive: false,
        }
    }

    /// Parse a bracketed range or a bare floor version.
    pub fn parse(input: &str) -> FeatureResult<Self> {
        let text = input.trim();
        let floor_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Ok(Self::at_least(Version::parse(text)?)),
        };
        let ceiling_inclusive = match text.chars().last() {
            Some(']') if text.len() > 1 => true,
            Some(')') if text.len() > 1 => false,
            _ => {
                return Err(FeatureError::version(input, "range is missing its closing bracket"));
            }
        };

        let inner = &text[1..text.len() - 1];
        let Some((left, right)) = inner.split_once(',') else {
            return Err(FeatureError::version(input, "range needs two comma-separated bounds"));
        };
        if right.contains(',') {
            return Err(FeatureError::version(input, "range has more than two bounds"));
        }

        let floor = Version::parse(left).map_err(|e| rebase(e, input))?;
        if right.trim().is_empty() && !ceiling_inclusive {
            // `(v,)` / `[v,)`: open-ended, as written by Display.
            return Ok(Self {
                floor,
                floor_inclusive,
                ceiling: None,
                ceiling_inclusive: false,
            });
        }
        let ceiling = Version::parse(right).map_err(|e| rebase(e, input))?;

        if floor > ceiling {
            return Err(FeatureError::version(input, "floor is above ceiling"));
        }
        if floor == ceiling && !(floor_inclusive && ceiling_inclusive) {
            return Err(FeatureError::version(input, "range is empty"));
        }

        Ok(Self {
            floor,
            floor_inclusive,
            ceiling: Some(ceiling),
            ceiling_inclusive,
        })
    }

    /// Check if `version` lies inside the range.
    #[must_use]
    pub fn includes(&self, version: &Version) -> bool {
        let above_floor = if self.floor_inclusive {
            *version >= self.floor
        } else {
            *version > self.floor
        };
        let below_ceiling = match &self.ceiling {
            None => true,
            Some(ceiling) if self.ceiling_inclusive => version <= ceiling,
            Some(ceiling) => version < ceiling,
        };
        above_floor && below_ceiling
    }

    /// Check if the range admits exactly one version.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.floor_inclusive
            && self.ceiling_inclusive
            && self.ceiling.as_ref() == Some(&self.floor)
    }
}

fn rebase(error: FeatureError, input: &str) -> FeatureError {
    match error {
        FeatureError::MalformedVersion { reason, .. } => FeatureError::version(input, reason),
        other => other,
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None if self.floor_inclusive => write!(f, "{}", self.floor),
            None => write!(f, "({},)", self.floor),
            Some(ceiling) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                ceiling,
                if self.ceiling_inclusive { ']' } else { ')' },
            ),
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
