//! Models: definitions, their registered form and instances.
//!
//! A [`ModelDefinition`] is what the caller registers. The repository wraps
//! it into a [`RegisteredModel`] bound to the database, and hands out
//! [`ModelInstance`]s that hold field values and know how to save
//! themselves.

mod context;
mod definition;
mod instance;
mod registered;

pub use context::DatabaseContext;
pub use definition::ModelDefinition;
pub use instance::ModelInstance;
pub use registered::RegisteredModel;

pub(crate) use context::DESTROYED;
pub(crate) use definition::is_valid_model_name;
