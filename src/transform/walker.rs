// src/transform/walker.rs
//! Schema walker.
//!
//! The schema drives iteration: for each schema entry, in declared order,
//! nested schemas recurse into the matching nested record and leaves run
//! their encoding chain on the matching record primitive. The record is only
//! consulted for leaf values.

use crate::error::{SchemaMismatchError, TransformError};
use crate::models::record::{join_path, Field, Record};
use crate::transform::encoder::apply_chain;
use crate::transform::schema::{Schema, SchemaNode};
use crate::transform::value::Value;
use log::debug;

/// Prepared values paired with their dotted field paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prepared {
    entries: Vec<(String, Value)>,
}

impl Prepared {
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.iter().find(|(p, _)| p == path).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

/// Walks `record` against `schema` and returns one value per schema leaf,
/// in schema order.
pub fn prepare(record: &Record, schema: &Schema) -> Result<Vec<Value>, TransformError> {
    prepare_named(record, schema).map(Prepared::into_values)
}

/// Same as [`prepare`], keeping the dotted path of each value.
pub fn prepare_named(record: &Record, schema: &Schema) -> Result<Prepared, TransformError> {
    let mut prepared = Prepared::default();
    walk(record, schema, "", &mut prepared.entries)?;
    Ok(prepared)
}

fn walk(
    record: &Record,
    schema: &Schema,
    prefix: &str,
    out: &mut Vec<(String, Value)>,
) -> Result<(), TransformError> {
    for (key, node) in schema.entries() {
        let path = join_path(prefix, key);
        let field = match record.get(key) {
            Some(field) => field,
            None => return Err(SchemaMismatchError::MissingField { path }.into()),
        };

        match (node, field) {
            (SchemaNode::Branch(inner), Field::Record(nested)) => {
                walk(nested, inner, &path, out)?;
            }
            (SchemaNode::Branch(_), _) => {
                return Err(SchemaMismatchError::ExpectedRecord { path }.into());
            }
            (SchemaNode::Leaf(_), Field::Record(_)) => {
                return Err(SchemaMismatchError::ExpectedPrimitive { path }.into());
            }
            (SchemaNode::Leaf(steps), primitive) => {
                let input = match Value::from_field(primitive) {
                    Some(v) => v,
                    None => return Err(SchemaMismatchError::ExpectedPrimitive { path }.into()),
                };
                let value = apply_chain(steps, input).map_err(|source| TransformError::Encoding {
                    path: path.clone(),
                    source,
                })?;
                debug!("prepared `{}` as {}", path, value.kind());
                out.push((path, value));
            }
        }
    }
    Ok(())
}
