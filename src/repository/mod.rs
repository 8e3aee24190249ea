//! The repository: registration, lifecycle and the read path.

mod config;
mod query;
#[allow(clippy::module_inception)]
mod repository;

pub use config::{ConfigError, RepositoryConfig};
pub use query::{GetQuery, Query};
pub use repository::{LifecycleState, Repository};
