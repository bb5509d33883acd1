// src/models/record.rs
//! Loosely shaped credential records.
//!
//! A [`Record`] is a nested map from field name to a primitive (text or
//! integer) or another record. Field order inside a record carries no
//! meaning; the schema decides traversal order.

use crate::error::SchemaMismatchError;
use num_bigint::BigInt;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;

/// A single record entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Text(String),
    /// Integers and timestamps (milliseconds).
    Integer(BigInt),
    Record(Record),
}

impl Field {
    pub fn kind(&self) -> &'static str {
        match self {
            Field::Text(_) => "text",
            Field::Integer(_) => "integer",
            Field::Record(_) => "record",
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Text(value.to_string())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Text(value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Field::Integer(BigInt::from(value))
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Field::Integer(BigInt::from(value))
    }
}

impl From<u16> for Field {
    fn from(value: u16) -> Self {
        Field::Integer(BigInt::from(value))
    }
}

impl From<BigInt> for Field {
    fn from(value: BigInt) -> Self {
        Field::Integer(value)
    }
}

impl From<Record> for Field {
    fn from(value: Record) -> Self {
        Field::Record(value)
    }
}

/// Nested credential record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Field>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Field>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a record from a JSON object.
    ///
    /// Strings become text, integral numbers become integers and objects
    /// become nested records. Anything else is rejected.
    pub fn from_json(value: &JsonValue) -> Result<Self, SchemaMismatchError> {
        match value {
            JsonValue::Object(map) => Self::from_map(map, ""),
            other => Err(SchemaMismatchError::InvalidRecord {
                path: String::new(),
                reason: format!("expected an object, found {}", json_kind(other)),
            }),
        }
    }

    fn from_map(map: &Map<String, JsonValue>, prefix: &str) -> Result<Self, SchemaMismatchError> {
        let mut record = Record::new();
        for (key, value) in map {
            let path = join_path(prefix, key);
            let field = match value {
                JsonValue::String(s) => Field::Text(s.clone()),
                JsonValue::Number(n) => Field::Integer(number_to_bigint(n).ok_or_else(|| {
                    SchemaMismatchError::InvalidRecord {
                        path: path.clone(),
                        reason: format!("{} is not an integer", n),
                    }
                })?),
                JsonValue::Object(inner) => Field::Record(Self::from_map(inner, &path)?),
                other => {
                    return Err(SchemaMismatchError::InvalidRecord {
                        reason: format!("unsupported {} value", json_kind(other)),
                        path,
                    })
                }
            };
            record.fields.insert(key.clone(), field);
        }
        Ok(record)
    }

    /// JSON form of the record. Integers of any size stay JSON numbers.
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (key, field) in &self.fields {
            let value = match field {
                Field::Text(s) => JsonValue::String(s.clone()),
                Field::Integer(i) => bigint_to_json(i),
                Field::Record(r) => r.to_json(),
            };
            map.insert(key.clone(), value);
        }
        JsonValue::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Record::from_json(&value).map_err(D::Error::custom)
    }
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn number_to_bigint(n: &Number) -> Option<BigInt> {
    // numbers keep their source digits, so integers of any size parse exactly
    n.to_string().parse().ok()
}

fn bigint_to_json(i: &BigInt) -> JsonValue {
    match i.to_string().parse::<Number>() {
        Ok(n) => JsonValue::Number(n),
        Err(_) => JsonValue::String(i.to_string()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
