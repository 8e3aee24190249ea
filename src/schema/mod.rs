//! Model schemas and the engine that checks them.
//!
//! A [`Schema`] maps field names to validation rules. [`validate_schema`]
//! discovers the primary key and rejects malformed schemas;
//! [`validate_instance`] turns instance values into a persistence-ready
//! document.

mod engine;
#[allow(clippy::module_inception)]
mod schema;

pub use engine::{validate_instance, validate_schema, ValidatedInstance};
pub use schema::{Field, Schema};
