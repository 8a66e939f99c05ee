//! # Range Policies
//!
//! A range policy derives an acceptable [`VersionRange`] from a single floor
//! version. Each named policy is a pure function with fixed bound rules:
//!
//! | policy        | floor `1.2.3`      |
//! |---------------|--------------------|
//! | `exact`       | `[1.2.3,1.2.3]`    |
//! | `same-major`  | `[1.2.3,2.0.0)`    |
//! | `same-minor`  | `[1.2.3,1.3.0)`    |
//! | `at-least`    | `1.2.3`            |
//!
//! Mask macros cover everything else. `${range;[==,=+)}` takes the bracket
//! characters literally and builds each bound from the floor, one mask
//! character per segment:
//!
//! - `=` keep the segment (position 4: copy the qualifier)
//! - `+` / `-` increment / decrement it
//! - `0`..`9` replace it with that digit
//! - `~` leave it out
//!
//! so `${range;[==,=+)}` maps `1.2.3` to `[1.2,1.3)`. `${version;<mask>}`
//! builds a single floor-inclusive version the same way.

use crate::version::{Version, VersionRange};
use crate::{FeatureError, FeatureResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Floor version meaning "any version".
pub const UNCONSTRAINED_VERSION: &str = "0.0.0";

// =============================================================================
// MASKS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaskOp {
    Keep,
    Increment,
    Decrement,
    Literal(u64),
    Skip,
}

/// A per-segment version mask such as `=+` or `===`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMask {
    source: String,
    ops: Vec<MaskOp>,
}

impl VersionMask {
    fn parse(mask: &str, policy: &str) -> FeatureResult<Self> {
        if mask.is_empty() || mask.chars().count() > 4 {
            return Err(FeatureError::UnknownRangePolicy(policy.to_string()));
        }
        let mut ops = Vec::with_capacity(4);
        for (index, c) in mask.chars().enumerate() {
            let op = match (index, c) {
                (3, '=') => MaskOp::Keep,
                (3, '~') => MaskOp::Skip,
                (3, _) => return Err(FeatureError::UnknownRangePolicy(policy.to_string())),
                (_, '=') => MaskOp::Keep,
                (_, '+') => MaskOp::Increment,
                (_, '-') => MaskOp::Decrement,
                (_, '~') => MaskOp::Skip,
                (_, d) if d.is_ascii_digit() => MaskOp::Literal(u64::from(d as u8 - b'0')),
                _ => return Err(FeatureError::UnknownRangePolicy(policy.to_string())),
            };
            ops.push(op);
        }
        Ok(Self {
            source: mask.to_string(),
            ops,
        })
    }

    /// Render the masked version text for `version`.
    fn apply(&self, version: &Version) -> FeatureResult<String> {
        let mut parts: Vec<String> = Vec::with_capacity(self.ops.len());
        for (index, op) in self.ops.iter().enumerate() {
            if index == 3 {
                if *op == MaskOp::Keep && !version.qualifier.is_empty() {
                    parts.push(version.qualifier.clone());
                }
                continue;
            }
            let current = version.segment(index).unwrap_or(0);
            let value = match op {
                MaskOp::Keep => current,
                MaskOp::Increment => current.saturating_add(1),
                MaskOp::Decrement => current.checked_sub(1).ok_or_else(|| {
                    FeatureError::version(
                        &version.to_string(),
                        format!("mask '{}' decrements a zero segment", self.source),
                    )
                })?,
                MaskOp::Literal(digit) => *digit,
                MaskOp::Skip => continue,
            };
            parts.push(value.to_string());
        }
        if parts.is_empty() {
            return Err(FeatureError::version(
                &version.to_string(),
                format!("mask '{}' produced an empty version", self.source),
            ));
        }
        Ok(parts.join("."))
    }
}

// =============================================================================
// RANGE POLICY
// =============================================================================

/// A named rule for deriving a range from a floor version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// `[v,v]`.
    #[default]
    Exact,
    /// `[v,(major+1).0.0)`.
    SameMajor,
    /// `[v,major.(minor+1).0)`.
    SameMinor,
    /// `v <= x`, no ceiling.
    AtLeast,
    /// `${range;<open><floor-mask>,<ceiling-mask><close>}`.
    RangeMacro {
        floor_inclusive: bool,
        floor: VersionMask,
        ceiling: VersionMask,
        ceiling_inclusive: bool,
    },
    /// `${version;<mask>}`: floor-inclusive, no ceiling.
    VersionMacro(VersionMask),
}

impl RangePolicy {
    /// Parse a policy name or mask macro.
    pub fn parse(input: &str) -> FeatureResult<Self> {
        let text = input.trim();
        match text {
            "exact" => return Ok(Self::Exact),
            "same-major" => return Ok(Self::SameMajor),
            "same-minor" => return Ok(Self::SameMinor),
            "at-least" => return Ok(Self::AtLeast),
            _ => {}
        }

        let unknown = || FeatureError::UnknownRangePolicy(input.to_string());
        let body = text
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(unknown)?;
        let (kind, argument) = body.split_once(';').ok_or_else(unknown)?;

        match kind {
            "version" => Ok(Self::VersionMacro(VersionMask::parse(argument, input)?)),
            "range" => {
                let floor_inclusive = match argument.chars().next() {
                    Some('[') => true,
                    Some('(') => false,
                    _ => return Err(unknown()),
                };
                let ceiling_inclusive = match argument.chars().last() {
                    Some(']') => true,
                    Some(')') => false,
                    _ => return Err(unknown()),
                };
                if argument.len() < 3 {
                    return Err(unknown());
                }
                let inner = &argument[1..argument.len() - 1];
                let (floor, ceiling) = inner.split_once(',').ok_or_else(unknown)?;
                Ok(Self::RangeMacro {
                    floor_inclusive,
                    floor: VersionMask::parse(floor, input)?,
                    ceiling: VersionMask::parse(ceiling, input)?,
                    ceiling_inclusive,
                })
            }
            _ => Err(unknown()),
        }
    }

    /// Apply the policy to a floor version, returning the range text.
    pub fn apply(&self, floor: &Version) -> FeatureResult<String> {
        let text = match self {
            Self::Exact => VersionRange::exact(floor.clone()).to_string(),
            Self::SameMajor => VersionRange::half_open(floor.clone(), floor.next_major()).to_string(),
            Self::SameMinor => VersionRange::half_open(floor.clone(), floor.next_minor()).to_string(),
            Self::AtLeast => VersionRange::at_least(floor.clone()).to_string(),
            Self::VersionMacro(mask) => mask.apply(floor)?,
            Self::RangeMacro {
                floor_inclusive,
                floor: floor_mask,
                ceiling: ceiling_mask,
                ceiling_inclusive,
            } => format!(
                "{}{},{}{}",
                if *floor_inclusive { '[' } else { '(' },
                floor_mask.apply(floor)?,
                ceiling_mask.apply(floor)?,
                if *ceiling_inclusive { ']' } else { ')' },
            ),
        };
        Ok(text)
    }
}

impl fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::SameMajor => f.write_str("same-major"),
            Self::SameMinor => f.write_str("same-minor"),
            Self::AtLeast => f.write_str("at-least"),
            Self::VersionMacro(mask) => write!(f, "${{version;{}}}", mask.source),
            Self::RangeMacro {
                floor_inclusive,
                floor,
                ceiling,
                ceiling_inclusive,
            } => write!(
                f,
                "${{range;{}{},{}{}}}",
                if *floor_inclusive { '[' } else { '(' },
                floor.source,
                ceiling.source,
                if *ceiling_inclusive { ']' } else { ')' },
            ),
        }
    }
}

impl std::str::FromStr for RangePolicy {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RangePolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RangePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// EFFECTIVE RANGE
// =============================================================================

/// The range a dependency actually imposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveRange {
    /// No version filtering at all.
    Unconstrained,
    /// A validated range together with its textual form.
    ///
    /// For literal ranges `text` is the caller's input, untouched.
    Bounded { text: String, range: VersionRange },
}

impl EffectiveRange {
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Self::Unconstrained)
    }

    #[must_use]
    pub fn range(&self) -> Option<&VersionRange> {
        match self {
            Self::Unconstrained => None,
            Self::Bounded { range, .. } => Some(range),
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Unconstrained => None,
            Self::Bounded { text, .. } => Some(text),
        }
    }
}

impl fmt::Display for EffectiveRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("unconstrained"),
            Self::Bounded { text, .. } => f.write_str(text),
        }
    }
}

/// Compute the range a dependency on `floor_version` imposes under `policy`.
///
/// - a zero floor (`0.0.0`, `0`, ...) is [`EffectiveRange::Unconstrained`]
/// - a literal range (`[`/`(`) is validated and kept verbatim
/// - anything else is a version fed through the policy
pub fn compute_effective_range(
    floor_version: &str,
    policy: &RangePolicy,
) -> FeatureResult<EffectiveRange> {
    let text = floor_version.trim();

    if text.starts_with('[') || text.starts_with('(') {
        let range = VersionRange::parse(text)?;
        return Ok(EffectiveRange::Bounded {
            text: text.to_string(),
            range,
        });
    }

    let floor = Version::parse(text)?;
    if floor.is_zero() {
        return Ok(EffectiveRange::Unconstrained);
    }

    let derived = policy.apply(&floor)?;
    let range = VersionRange::parse(&derived)?;
    Ok(EffectiveRange::Bounded {
        text: derived,
        range,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn effective(floor: &str, policy: &str) -> String {
        let policy = RangePolicy::parse(policy).unwrap();
        compute_effective_range(floor, &policy).unwrap().to_string()
    }

    #[test]
    fn named_policies() {
        assert_eq!(effective("1.2.3", "exact"), "[1.2.3,1.2.3]");
        assert_eq!(effective("1.2.3", "same-major"), "[1.2.3,2.0.0)");
        assert_eq!(effective("1.2.3", "same-minor"), "[1.2.3,1.3.0)");
        assert_eq!(effective("1.2.3", "at-least"), "1.2.3");
    }

    #[test]
    fn same_major_keeps_qualifier_on_floor() {
        assert_eq!(
            effective("2.0.0-SNAPSHOT", "same-major"),
            "[2.0.0.SNAPSHOT,3.0.0)"
        );
    }

    #[test]
    fn zero_floor_is_unconstrained() {
        for policy in ["exact", "same-major", "${range;[==,=+)}"] {
            let policy = RangePolicy::parse(policy).unwrap();
            assert_eq!(
                compute_effective_range(UNCONSTRAINED_VERSION, &policy).unwrap(),
                EffectiveRange::Unconstrained
            );
        }
    }

    #[test]
    fn literal_range_is_verbatim() {
        assert_eq!(effective("[1.0,2)", "same-major"), "[1.0,2)");
        assert_eq!(effective("(1,5]", "exact"), "(1,5]");
    }

    #[test]
    fn literal_range_is_still_validated() {
        let result = compute_effective_range("[2.0,1.0)", &RangePolicy::Exact);
        assert!(matches!(result, Err(FeatureError::MalformedVersion { .. })));
    }

    #[test]
    fn range_macro_masks() {
        assert_eq!(effective("1.2.3", "${range;[==,=+)}"), "[1.2,1.3)");
        assert_eq!(effective("1.2.3", "${range;[====,====]}"), "[1.2.3,1.2.3]");
        assert_eq!(effective("1.2.3.q", "${range;[====,+)}"), "[1.2.3.q,2)");
        assert_eq!(effective("1.2.3", "${range;(=,=9]}"), "(1,1.9]");
    }

    #[test]
    fn version_macro_is_floor_only() {
        assert_eq!(effective("4.5.6", "${version;=}"), "4");
        let policy = RangePolicy::parse("${version;==}").unwrap();
        let result = compute_effective_range("4.5.6", &policy).unwrap();
        let range = result.range().unwrap();
        assert!(range.ceiling.is_none());
        assert!(range.includes(&Version::new(4, 5, 0)));
    }

    #[test]
    fn decrementing_zero_fails() {
        let policy = RangePolicy::parse("${range;[-,=)}").unwrap();
        let result = compute_effective_range("0.5.0", &policy);
        assert!(matches!(result, Err(FeatureError::MalformedVersion { .. })));
    }

    #[test]
    fn malformed_floor_fails() {
        let result = compute_effective_range("one.two", &RangePolicy::SameMajor);
        assert!(matches!(result, Err(FeatureError::MalformedVersion { .. })));
    }

    #[test]
    fn unknown_policies_are_rejected() {
        for bad in [
            "newest",
            "${range;==}",
            "${range;[==,=+}",
            "${range;[=====,=)}",
            "${range;[==x,=)}",
            "${bogus;==}",
            "${range;[==,=+)",
        ] {
            assert!(
                matches!(RangePolicy::parse(bad), Err(FeatureError::UnknownRangePolicy(_))),
                "expected failure for {bad:?}"
            );
        }
    }

    #[test]
    fn policy_display_round_trips() {
        for text in ["exact", "same-major", "same-minor", "at-least", "${range;[==,=+)}", "${version;===}"] {
            let policy = RangePolicy::parse(text).unwrap();
            assert_eq!(policy.to_string(), text);
        }
    }
}
