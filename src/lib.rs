//! gitodm - a schema-validated object-document mapper
//!
//! Models are registered with a [`Repository`] as a name plus a [`Schema`]
//! of validation rules, one of which is marked as the primary key. After
//! `init`, every model has a table in the repository's database and
//! instances can be created, validated and saved. A save is an upsert by
//! primary key.
//!
//! Storage sits behind the [`DocumentStore`](store::DocumentStore) trait.
//! [`MemoryStore`](store::MemoryStore) keeps everything in process;
//! [`GitStore`](store::GitStore) keeps one Git repository per database
//! where every write is a commit.
//!
//! # Example
//!
//! ```no_run
//! use gitodm::store::GitStore;
//! use gitodm::{validation, ModelDefinition, Repository, RepositoryConfig, Schema};
//!
//! # async fn run() -> gitodm::OdmResult<()> {
//! let store = GitStore::open("./data")?;
//! let repo = Repository::new(RepositoryConfig::new("library"), store);
//!
//! repo.register(
//!     "book",
//!     ModelDefinition::new(
//!         Schema::new()
//!             .field("isbn", validation::primary_string())
//!             .field("title", validation::string().required()),
//!     ),
//! )?;
//! repo.init().await?;
//!
//! let mut book = repo.new_model("book")?;
//! book.set("isbn", "978-0").set("title", "Dune");
//! book.save().await?;
//!
//! let found = repo.query("book")?.get("978-0").run_object().await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logging;
pub mod model;
pub mod repository;
pub mod schema;
pub mod store;
pub mod validation;

pub use error::{ErrorKind, ModelFailure, OdmError, OdmResult, RepositoryError, SchemaError, ValidationError};
pub use logging::{init_logging, LogConfig};
pub use model::{ModelDefinition, ModelInstance, RegisteredModel};
pub use repository::{ConfigError, GetQuery, LifecycleState, Query, Repository, RepositoryConfig};
pub use schema::{validate_instance, validate_schema, Field, Schema, ValidatedInstance};
