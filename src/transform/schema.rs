// src/transform/schema.rs
//! Transformation schemas.
//!
//! A schema mirrors the shape of a record. Each leaf holds the ordered chain
//! of encoding steps for that field. Entry order is the traversal order of
//! the walker and therefore the order of the canonical bytes, so it is kept
//! exactly as declared.

use crate::error::SchemaMismatchError;
use crate::models::record::join_path;
use crate::transform::step::Step;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// Encoding chain applied to a record primitive.
    Leaf(Vec<Step>),
    /// Nested schema applied to a nested record.
    Branch(Schema),
}

/// Ordered schema tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    entries: Vec<(String, SchemaNode)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a leaf. Re-declaring a key replaces it in place.
    pub fn leaf(self, key: impl Into<String>, steps: impl IntoIterator<Item = Step>) -> Self {
        self.entry(key.into(), SchemaNode::Leaf(steps.into_iter().collect()))
    }

    /// Appends a nested schema. Re-declaring a key replaces it in place.
    pub fn branch(self, key: impl Into<String>, schema: Schema) -> Self {
        self.entry(key.into(), SchemaNode::Branch(schema))
    }

    fn entry(mut self, key: String, node: SchemaNode) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((key, node)),
        }
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dotted paths of every leaf, in traversal order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (key, node) in &self.entries {
            let path = join_path(prefix, key);
            match node {
                SchemaNode::Leaf(_) => out.push(path),
                SchemaNode::Branch(inner) => inner.collect_paths(&path, out),
            }
        }
    }

    /// Loads a schema from its JSON form.
    ///
    /// Unknown step identifiers and empty chains are rejected here rather
    /// than at first use.
    pub fn from_json(value: &JsonValue) -> Result<Self, SchemaMismatchError> {
        match value {
            JsonValue::Object(map) => Self::from_map(map, ""),
            _ => Err(SchemaMismatchError::Malformed {
                path: String::new(),
                reason: "schema must be an object".into(),
            }),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, SchemaMismatchError> {
        let value: JsonValue =
            serde_json::from_str(s).map_err(|e| SchemaMismatchError::Malformed {
                path: String::new(),
                reason: e.to_string(),
            })?;
        Self::from_json(&value)
    }

    fn from_map(map: &Map<String, JsonValue>, prefix: &str) -> Result<Self, SchemaMismatchError> {
        let mut schema = Schema::new();
        for (key, value) in map {
            let path = join_path(prefix, key);
            let node = match value {
                JsonValue::Object(inner) => SchemaNode::Branch(Self::from_map(inner, &path)?),
                JsonValue::Array(items) => SchemaNode::Leaf(parse_chain(items, &path)?),
                _ => {
                    return Err(SchemaMismatchError::Malformed {
                        path,
                        reason: "expected a step list or a nested schema".into(),
                    })
                }
            };
            schema.entries.push((key.clone(), node));
        }
        Ok(schema)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (key, node) in &self.entries {
            let value = match node {
                SchemaNode::Leaf(steps) => {
                    JsonValue::Array(steps.iter().map(|s| JsonValue::String(s.name())).collect())
                }
                SchemaNode::Branch(inner) => inner.to_json(),
            };
            map.insert(key.clone(), value);
        }
        JsonValue::Object(map)
    }
}

fn parse_chain(items: &[JsonValue], path: &str) -> Result<Vec<Step>, SchemaMismatchError> {
    if items.is_empty() {
        return Err(SchemaMismatchError::Malformed {
            path: path.to_string(),
            reason: "empty step list".into(),
        });
    }
    items
        .iter()
        .map(|item| {
            let id = item.as_str().ok_or_else(|| SchemaMismatchError::Malformed {
                path: path.to_string(),
                reason: format!("step identifier must be a string, found {}", item),
            })?;
            id.parse::<Step>().map_err(|_| SchemaMismatchError::UnknownStep {
                path: path.to_string(),
                step: id.to_string(),
            })
        })
        .collect()
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Schema::from_json(&value).map_err(D::Error::custom)
    }
}
