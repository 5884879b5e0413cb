// src/graphql/value.rs
//! GraphQL input literals.
//!
//! Mutation content is written inline as a GraphQL object literal. Literals
//! are `graphql_parser` AST values, so quoting and escaping come from its
//! formatter; this module only builds them and checks what the AST cannot
//! express (key syntax, `Int` range).

use graphql_parser::query::{Number, Value as AstValue};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A GraphQL input value. Object keys render in sorted order.
pub type GqlValue = AstValue<'static, String>;

#[derive(Error, Debug, PartialEq)]
pub enum LiteralError {
    /// Object keys become GraphQL names: `/[_A-Za-z][_0-9A-Za-z]*/`.
    #[error("invalid GraphQL name: {0:?}")]
    InvalidName(String),
    #[error("null has no input literal here")]
    Null,
    /// GraphQL `Int` is a signed 32-bit integer.
    #[error("{0} does not fit a GraphQL Int")]
    IntOutOfRange(i64),
    #[error("value is not serializable: {0}")]
    Serialization(String),
}

/// Builds an object literal, validating each key.
pub fn object<K: Into<String>>(
    entries: impl IntoIterator<Item = (K, GqlValue)>,
) -> Result<GqlValue, LiteralError> {
    let mut fields = BTreeMap::new();
    for (key, value) in entries {
        let key = key.into();
        check_name(&key)?;
        fields.insert(key, value);
    }
    Ok(GqlValue::Object(fields))
}

pub fn string(value: impl Into<String>) -> GqlValue {
    GqlValue::String(value.into())
}

pub fn strings(items: &[String]) -> GqlValue {
    GqlValue::List(items.iter().cloned().map(GqlValue::String).collect())
}

pub fn int(value: i64) -> Result<GqlValue, LiteralError> {
    i32::try_from(value)
        .map(|i| GqlValue::Int(Number::from(i)))
        .map_err(|_| LiteralError::IntOutOfRange(value))
}

/// Converts JSON into a literal.
///
/// `null` is rejected: the remote schema has no nullable content fields
/// written by this service.
pub fn from_json(value: &Value) -> Result<GqlValue, LiteralError> {
    match value {
        Value::Null => Err(LiteralError::Null),
        Value::Bool(b) => Ok(GqlValue::Boolean(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => int(i),
            (None, Some(x)) if n.is_f64() => Ok(GqlValue::Float(x)),
            _ => Err(LiteralError::Serialization(format!("{} is not representable", n))),
        },
        Value::String(s) => Ok(string(s.as_str())),
        Value::Array(items) => items
            .iter()
            .map(from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(GqlValue::List),
        Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| Ok((k.clone(), from_json(v)?)))
                .collect::<Result<Vec<_>, LiteralError>>()?;
            object(entries)
        }
    }
}

/// Converts serializable data through its JSON form.
pub fn from_serialize<T: serde::Serialize>(data: &T) -> Result<GqlValue, LiteralError> {
    let json = serde_json::to_value(data).map_err(|e| LiteralError::Serialization(e.to_string()))?;
    from_json(&json)
}

fn check_name(name: &str) -> Result<(), LiteralError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(LiteralError::InvalidName(name.to_string()))
    }
}
