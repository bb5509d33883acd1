// src/transform/mod.rs
//! Schema-driven transformation of credential records.

pub mod canonical;
pub mod encoder;
pub mod passport;
pub mod schema;
pub mod step;
pub mod value;
pub mod walker;

pub use canonical::{canonical_digest, canonical_layout, canonicalize};
pub use encoder::{apply, apply_chain};
pub use schema::{Schema, SchemaNode};
pub use step::{Step, Width};
pub use value::Value;
pub use walker::{prepare, prepare_named, Prepared};
