//! # Filters
//!
//! LDAP-style filter expressions used by requirements to select capabilities.
//!
//! ```text
//! (&(osgi.identity=http)(type=feature)(version>=2.0.0)(!(version>=3.0.0)))
//! ```
//!
//! Supported: `&`, `|`, `!`, `=`, `~=`, `>=`, `<=`, presence (`attr=*`) and
//! substrings (`attr=pre*mid*post`). A backslash escapes `(`, `)`, `*` and `\`
//! inside values.

use crate::resource::AttrValue;
use crate::version::{Version, VersionRange};
use crate::{FeatureError, FeatureResult};
use std::collections::BTreeMap;
use std::fmt;

/// Comparison operator of a simple filter item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

impl CompareOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Approx => "~=",
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare {
        attribute: String,
        op: CompareOp,
        value: String,
    },
    Present(String),
    Substring {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
}

impl Filter {
    /// Parse a filter expression.
    pub fn parse(input: &str) -> FeatureResult<Self> {
        let mut parser = Parser {
            input,
            pos: 0,
        };
        parser.skip_ws();
        let filter = parser.filter()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error("unexpected text after filter"));
        }
        Ok(filter)
    }

    /// `(attribute=value)` with `value` taken literally.
    pub fn equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Compare {
            attribute: attribute.into(),
            op: CompareOp::Equal,
            value: value.into(),
        }
    }

    /// Conjunction; a single term is returned unwrapped.
    pub fn and(mut terms: Vec<Filter>) -> Self {
        if terms.len() == 1 {
            if let Some(term) = terms.pop() {
                return term;
            }
        }
        Self::And(terms)
    }

    /// Filter terms restricting `attribute` to `range`.
    ///
    /// Exact ranges become a single equality, exclusive bounds are written as
    /// negated inclusive comparisons.
    pub fn version_terms(attribute: &str, range: &VersionRange) -> Vec<Filter> {
        if range.is_exact() {
            return vec![Self::equal(attribute, range.floor.to_string())];
        }

        let compare = |op, version: &Version| Self::Compare {
            attribute: attribute.to_string(),
            op,
            value: version.to_string(),
        };

        let mut terms = Vec::with_capacity(2);
        if range.floor_inclusive {
            terms.push(compare(CompareOp::GreaterEq, &range.floor));
        } else {
            terms.push(Self::Not(Box::new(compare(CompareOp::LessEq, &range.floor))));
        }
        if let Some(ceiling) = &range.ceiling {
            if range.ceiling_inclusive {
                terms.push(compare(CompareOp::LessEq, ceiling));
            } else {
                terms.push(Self::Not(Box::new(compare(CompareOp::GreaterEq, ceiling))));
            }
        }
        terms
    }

    /// Evaluate against a capability's attributes.
    pub fn matches(&self, attributes: &BTreeMap<String, AttrValue>) -> bool {
        match self {
            Self::And(terms) => terms.iter().all(|t| t.matches(attributes)),
            Self::Or(terms) => terms.iter().any(|t| t.matches(attributes)),
            Self::Not(term) => !term.matches(attributes),
            Self::Present(attribute) => attributes.contains_key(attribute),
            Self::Compare {
                attribute,
                op,
                value,
            } => attributes
                .get(attribute)
                .is_some_and(|actual| compare_value(actual, *op, value)),
            Self::Substring {
                attribute,
                initial,
                any,
                last,
            } => attributes.get(attribute).is_some_and(|actual| {
                let check = |text: &str| {
                    substring_matches(text, initial.as_deref(), any, last.as_deref())
                };
                match actual {
                    AttrValue::String(text) => check(text),
                    AttrValue::StringList(items) => items.iter().any(|item| check(item)),
                    other => check(&other.to_clause_text()),
                }
            }),
        }
    }
}

// =============================================================================
// MATCHING
// =============================================================================

fn compare_value(actual: &AttrValue, op: CompareOp, expected: &str) -> bool {
    match actual {
        AttrValue::String(text) => compare_str(text, op, expected),
        AttrValue::Version(version) => compare_version(version, op, expected),
        AttrValue::Long(number) => compare_long(*number, op, expected),
        AttrValue::StringList(items) => items.iter().any(|t| compare_str(t, op, expected)),
        AttrValue::VersionList(items) => items.iter().any(|v| compare_version(v, op, expected)),
        AttrValue::LongList(items) => items.iter().any(|n| compare_long(*n, op, expected)),
    }
}

fn compare_ord<T: Ord>(actual: &T, op: CompareOp, expected: &T) -> bool {
    match op {
        CompareOp::Equal | CompareOp::Approx => actual == expected,
        CompareOp::GreaterEq => actual >= expected,
        CompareOp::LessEq => actual <= expected,
    }
}

fn compare_str(actual: &str, op: CompareOp, expected: &str) -> bool {
    if op == CompareOp::Approx {
        return approx(actual) == approx(expected);
    }
    compare_ord(&actual, op, &expected)
}

fn compare_version(actual: &Version, op: CompareOp, expected: &str) -> bool {
    Version::parse(expected).is_ok_and(|expected| compare_ord(actual, op, &expected))
}

fn compare_long(actual: i64, op: CompareOp, expected: &str) -> bool {
    expected
        .trim()
        .parse::<i64>()
        .is_ok_and(|expected| compare_ord(&actual, op, &expected))
}

fn approx(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring_matches(text: &str, initial: Option<&str>, any: &[String], last: Option<&str>) -> bool {
    let mut rest = text;
    if let Some(prefix) = initial {
        match rest.strip_prefix(prefix) {
            Some(remaining) => rest = remaining,
            None => return false,
        }
    }
    for part in any {
        match rest.find(part.as_str()) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    last.is_none_or(|suffix| rest.ends_with(suffix))
}

// =============================================================================
// DISPLAY
// =============================================================================

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(terms) | Self::Or(terms) => {
                f.write_str(if matches!(self, Self::And(_)) { "(&" } else { "(|" })?;
                for term in terms {
                    write!(f, "{term}")?;
                }
                f.write_str(")")
            }
            Self::Not(term) => write!(f, "(!{term})"),
            Self::Present(attribute) => write!(f, "({attribute}=*)"),
            Self::Compare {
                attribute,
                op,
                value,
            } => write!(f, "({}{}{})", attribute, op.as_str(), escape(value)),
            Self::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    f.write_str(&escape(initial))?;
                }
                f.write_str("*")?;
                for part in any {
                    write!(f, "{}*", escape(part))?;
                }
                if let Some(last) = last {
                    f.write_str(&escape(last))?;
                }
                f.write_str(")")
            }
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> FeatureError {
        let offending = self.input.get(self.pos..).unwrap_or("");
        let offending = if offending.is_empty() { "<end>" } else { offending };
        FeatureError::expression(self.input, offending, reason)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> FeatureResult<()> {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn filter(&mut self) -> FeatureResult<Filter> {
        self.expect('(')?;
        self.skip_ws();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_ws();
                Filter::Not(Box::new(self.filter()?))
            }
            _ => self.item()?,
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> FeatureResult<Vec<Filter>> {
        let mut terms = Vec::new();
        self.skip_ws();
        while self.peek() == Some('(') {
            terms.push(self.filter()?);
            self.skip_ws();
        }
        if terms.is_empty() {
            return Err(self.error("expected at least one nested filter"));
        }
        Ok(terms)
    }

    fn item(&mut self) -> FeatureResult<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.pos += c.len_utf8();
        }
        let attribute = self.input[start..self.pos].trim();
        if attribute.is_empty() {
            return Err(self.error("expected an attribute name"));
        }
        let attribute = attribute.to_string();

        let op = match self.bump() {
            Some('=') => CompareOp::Equal,
            Some('~') => {
                self.expect('=')?;
                CompareOp::Approx
            }
            Some('>') => {
                self.expect('=')?;
                CompareOp::GreaterEq
            }
            Some('<') => {
                self.expect('=')?;
                CompareOp::LessEq
            }
            _ => {
                self.pos = start;
                return Err(self.error("expected an operator"));
            }
        };

        // Value pieces split at unescaped '*'.
        let mut pieces = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated filter value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    let Some(escaped) = self.bump() else {
                        return Err(self.error("dangling escape"));
                    };
                    if let Some(piece) = pieces.last_mut() {
                        piece.push(escaped);
                    }
                }
                Some('*') if op == CompareOp::Equal => {
                    self.pos += 1;
                    pieces.push(String::new());
                }
                Some(c) => {
                    self.pos += c.len_utf8();
                    if let Some(piece) = pieces.last_mut() {
                        piece.push(c);
                    }
                }
            }
        }

        if pieces.len() == 1 {
            let value = pieces.pop().unwrap_or_default();
            return Ok(Filter::Compare {
                attribute,
                op,
                value,
            });
        }
        if pieces.len() == 2 && pieces.iter().all(String::is_empty) {
            return Ok(Filter::Present(attribute));
        }

        let last = pieces.pop().filter(|p| !p.is_empty());
        let mut pieces = pieces.into_iter();
        let initial = pieces.next().filter(|p| !p.is_empty());
        let any = pieces.filter(|p| !p.is_empty()).collect();
        Ok(Filter::Substring {
            attribute,
            initial,
            any,
            last,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
