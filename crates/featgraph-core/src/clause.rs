//! # Clause Parser
//!
//! Parses the declarative capability/requirement syntax:
//!
//! ```text
//! expression := clause (',' clause)*
//! clause     := path (';' path)* (';' param)*
//! param      := name '=' value            attribute, String
//!             | name ':' type '=' value   typed attribute
//!             | name ':=' value           directive
//! ```
//!
//! Values are either bare tokens (trimmed) or double-quoted strings with
//! backslash escapes. Separators inside quotes are literal, which is how list
//! values carry commas: `tags:List<String>="a,b"`.

use crate::resource::AttrValue;
use crate::version::Version;
use crate::{FeatureError, FeatureResult};
use std::collections::BTreeMap;

/// One parsed clause: its paths share the same parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    pub paths: Vec<String>,
    pub directives: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, AttrValue>,
}

/// Parse a full expression into clauses.
pub fn parse_clauses(expression: &str) -> FeatureResult<Vec<Clause>> {
    if expression.trim().is_empty() {
        return Err(FeatureError::expression(expression, expression, "empty expression"));
    }
    split_top_level(expression, expression, ',')?
        .into_iter()
        .map(|clause| parse_clause(expression, clause))
        .collect()
}

fn parse_clause(expression: &str, text: &str) -> FeatureResult<Clause> {
    let mut clause = Clause::default();

    for piece in split_top_level(expression, text, ';')? {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            return Err(FeatureError::expression(expression, text, "empty clause element"));
        }

        let Some(eq) = trimmed.find('=') else {
            if !(clause.attributes.is_empty() && clause.directives.is_empty()) {
                return Err(FeatureError::expression(
                    expression,
                    trimmed,
                    "path after parameters",
                ));
            }
            if trimmed.contains('"') {
                return Err(FeatureError::expression(expression, trimmed, "quote in path"));
            }
            clause.paths.push(trimmed.to_string());
            continue;
        };

        let key = trimmed[..eq].trim();
        let raw_value = &trimmed[eq + 1..];

        if let Some(name) = key.strip_suffix(':') {
            let name = checked_name(expression, trimmed, name)?;
            let value = unquote(expression, trimmed, raw_value)?;
            if clause.directives.insert(name.to_string(), value).is_some() {
                return Err(FeatureError::expression(expression, trimmed, "duplicate directive"));
            }
        } else {
            let (name, type_name) = match key.split_once(':') {
                Some((name, type_name)) => (name, Some(type_name.trim())),
                None => (key, None),
            };
            let name = checked_name(expression, trimmed, name)?;
            let value = unquote(expression, trimmed, raw_value)?;
            let value = typed_value(expression, trimmed, type_name, value)?;
            if clause.attributes.insert(name.to_string(), value).is_some() {
                return Err(FeatureError::expression(expression, trimmed, "duplicate attribute"));
            }
        }
    }

    if clause.paths.is_empty() {
        return Err(FeatureError::expression(expression, text, "clause has no path"));
    }
    Ok(clause)
}

fn checked_name<'a>(expression: &str, piece: &str, name: &'a str) -> FeatureResult<&'a str> {
    let name = name.trim();
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '"') {
        return Err(FeatureError::expression(expression, piece, "invalid parameter name"));
    }
    Ok(name)
}

/// Split `text` at `separator` characters outside quotes.
fn split_top_level<'a>(
    expression: &str,
    text: &'a str,
    separator: char,
) -> FeatureResult<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    if quoted {
        return Err(FeatureError::expression(expression, &text[start..], "unterminated quote"));
    }
    parts.push(&text[start..]);

    if separator == ',' {
        if let Some(empty) = parts.iter().find(|p| p.trim().is_empty()) {
            return Err(FeatureError::expression(expression, empty, "empty clause"));
        }
    }
    Ok(parts)
}

/// Strip quotes and resolve escapes; bare values are trimmed.
fn unquote(expression: &str, piece: &str, raw: &str) -> FeatureResult<String> {
    let value = raw.trim();
    let Some(body) = value.strip_prefix('"') else {
        if value.contains('"') {
            return Err(FeatureError::expression(expression, piece, "stray quote in value"));
        }
        return Ok(value.to_string());
    };

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => out.push(next),
                None => {
                    return Err(FeatureError::expression(expression, piece, "dangling escape"));
                }
            },
            '"' => {
                if chars.as_str().trim().is_empty() {
                    return Ok(out);
                }
                return Err(FeatureError::expression(
                    expression,
                    piece,
                    "text after closing quote",
                ));
            }
            other => out.push(other),
        }
    }
    Err(FeatureError::expression(expression, piece, "unterminated quote"))
}

fn typed_value(
    expression: &str,
    piece: &str,
    type_name: Option<&str>,
    value: String,
) -> FeatureResult<AttrValue> {
    let version = |text: &str| {
        Version::parse(text).map_err(|e| FeatureError::expression(expression, piece, e.to_string()))
    };
    let long = |text: &str| {
        text.trim()
            .parse::<i64>()
            .map_err(|_| FeatureError::expression(expression, piece, "invalid Long value"))
    };
    let items = |text: &str| -> Vec<String> {
        if text.trim().is_empty() {
            Vec::new()
        } else {
            text.split(',').map(|item| item.trim().to_string()).collect()
        }
    };

    let value = match type_name {
        None | Some("String") => AttrValue::String(value),
        Some("Version") => AttrValue::Version(version(&value)?),
        Some("Long") => AttrValue::Long(long(&value)?),
        Some("List" | "List<String>") => AttrValue::StringList(items(&value)),
        Some("List<Version>") => AttrValue::VersionList(
            items(&value)
                .iter()
                .map(|item| version(item))
                .collect::<FeatureResult<_>>()?,
        ),
        Some("List<Long>") => AttrValue::LongList(
            items(&value)
                .iter()
                .map(|item| long(item))
                .collect::<FeatureResult<_>>()?,
        ),
        Some(_) => {
            return Err(FeatureError::expression(
                expression,
                piece,
                "unsupported attribute type",
            ));
        }
    };
    Ok(value)
}

// =============================================================================
// TESTS
// =============================================================================
