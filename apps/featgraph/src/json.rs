//! # JSON Property Mapping
//!
//! Configuration properties travel as plain JSON on the wire and in files:
//!
//! | JSON             | property  |
//! |------------------|-----------|
//! | string           | `String`  |
//! | integer          | `Long`    |
//! | boolean          | `Boolean` |
//! | array of strings | `List`    |
//!
//! Anything else (floats, null, objects, mixed arrays) is rejected.

use featgraph_core::config::{Properties, PropertyValue};
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON value with no property counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("property '{0}': only integer numbers are supported")]
    NotAnInteger(String),

    #[error("property '{0}': list items must be strings")]
    MixedList(String),

    #[error("property '{0}': unsupported JSON value")]
    Unsupported(String),

    #[error("properties must be a JSON object")]
    NotAnObject,
}

/// Convert one JSON value into a property value.
pub fn property_from_json(key: &str, value: Value) -> Result<PropertyValue, JsonError> {
    match value {
        Value::String(text) => Ok(PropertyValue::String(text)),
        Value::Bool(flag) => Ok(PropertyValue::Boolean(flag)),
        Value::Number(number) => number
            .as_i64()
            .map(PropertyValue::Long)
            .ok_or_else(|| JsonError::NotAnInteger(key.to_string())),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                _ => Err(JsonError::MixedList(key.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::List),
        Value::Null | Value::Object(_) => Err(JsonError::Unsupported(key.to_string())),
    }
}

/// Convert a JSON object into a property map.
pub fn properties_from_json(value: Value) -> Result<Properties, JsonError> {
    let Value::Object(object) = value else {
        return Err(JsonError::NotAnObject);
    };
    object
        .into_iter()
        .map(|(key, value)| property_from_json(&key, value).map(|value| (key, value)))
        .collect()
}

pub fn property_to_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::String(text) => Value::String(text.clone()),
        PropertyValue::Long(number) => Value::from(*number),
        PropertyValue::Boolean(flag) => Value::Bool(*flag),
        PropertyValue::List(items) => Value::from(items.clone()),
    }
}

pub fn properties_to_json(properties: &Properties) -> Value {
    let object: Map<String, Value> = properties
        .iter()
        .map(|(key, value)| (key.clone(), property_to_json(value)))
        .collect();
    Value::Object(object)
}

// =============================================================================
// TESTS
// =============================================================================
