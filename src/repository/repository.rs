//! The repository: model registry and lifecycle state machine.

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{error, info, warn, Dispatch};

use super::config::RepositoryConfig;
use super::query::Query;
use crate::error::{ModelFailure, OdmError, OdmResult};
use crate::model::{is_valid_model_name, DatabaseContext, ModelDefinition, ModelInstance, RegisteredModel, DESTROYED};
use crate::store::DocumentStore;

const REGISTER_AFTER_INIT: &str = "Models can only be registered before the Repository has been initialised";
const SCHEMA_NOT_OBJECT: &str = "The object is invalid, the schema of the model must be an object";
const INVALID_NAME: &str = "The name is invalid, the name can only contain alphabetic characters";
const CREATE_BEFORE_INIT: &str = "Models can only be created after the Repository has been initialised";
const ALREADY_INITIALISING: &str = "The Repository is already being initialised";
const DESTROY_BEFORE_INIT: &str = "The Repository can only be destroyed after the Repository has been initialised";

/// Phase of a [`Repository`], gating which operations are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Accepting registrations.
    Registering,
    /// The first `init` call is in flight.
    Initializing,
    /// Models may be created, saved and queried.
    Initialized,
    /// The database has been dropped. Terminal.
    Destroyed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Registering => "registering",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Destroyed => "destroyed",
        };
        write!(f, "{}", name)
    }
}

struct Registry {
    state: LifecycleState,
    /// set while any `init` runs, including a re-init of an initialised
    /// repository, whose state stays `Initialized`
    init_in_flight: bool,
    /// in registration order
    models: Vec<RegisteredModel>,
}

/// Ends an `init` call, including one whose future was dropped.
///
/// A first init that did not succeed returns the repository to
/// `Registering`.
struct InitGuard<'a> {
    registry: &'a Mutex<Registry>,
    succeeded: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        registry.init_in_flight = false;
        if registry.state == LifecycleState::Initializing {
            registry.state = if self.succeeded {
                LifecycleState::Initialized
            } else {
                LifecycleState::Registering
            };
        }
    }
}

/// Owns the registered models and the lifecycle of one database.
///
/// Register models, `init` once, then create instances with
/// [`new_model`](Self::new_model) and save them.
///
/// ```no_run
/// use gitodm::store::MemoryStore;
/// use gitodm::{validation, ModelDefinition, Repository, RepositoryConfig, Schema};
///
/// # async fn run() -> gitodm::OdmResult<()> {
/// let repo = Repository::new(RepositoryConfig::new("app"), MemoryStore::new());
///
/// let person = Schema::new()
///     .field("id", validation::primary_string())
///     .field("name", validation::string());
/// repo.register("person", ModelDefinition::new(person))?;
/// repo.init().await?;
///
/// let mut ada = repo.new_model("person")?;
/// ada.set("id", "p1").set("name", "Ada");
/// ada.save().await?;
/// # Ok(())
/// # }
/// ```
pub struct Repository {
    config: RepositoryConfig,
    context: DatabaseContext,
    registry: Mutex<Registry>,
}

impl Repository {
    pub fn new<S>(config: RepositoryConfig, store: S) -> Self
    where
        S: DocumentStore + 'static,
    {
        let context = DatabaseContext::new(Arc::new(store), config.database.clone());
        Self {
            config,
            context,
            registry: Mutex::new(Registry {
                state: LifecycleState::Registering,
                init_in_flight: false,
                models: Vec::new(),
            }),
        }
    }

    /// Send this repository's log events to `dispatch` instead of the global
    /// subscriber. Models created afterwards log there too.
    pub fn with_logger(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.context.set_dispatch(dispatch.into());
        for model in self.registry.get_mut().models.iter_mut() {
            model.set_context(self.context.clone());
        }
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.registry.lock().state
    }

    /// Registered model names in registration order.
    pub fn model_names(&self) -> Vec<String> {
        self.registry
            .lock()
            .models
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Register a model. Only legal before `init`.
    pub fn register(&self, name: &str, definition: ModelDefinition) -> OdmResult<()> {
        self.context.scoped_sync(|| {
            let mut registry = self.registry.lock();
            if registry.state != LifecycleState::Registering {
                return Err(OdmError::repository(REGISTER_AFTER_INIT));
            }

            let schema = definition
                .into_schema()
                .ok_or_else(|| OdmError::repository(SCHEMA_NOT_OBJECT))?;

            if !is_valid_model_name(name) {
                return Err(OdmError::repository(INVALID_NAME));
            }

            if registry.models.iter().any(|m| m.name() == name) {
                return Err(OdmError::repository(format!(
                    "Model '{}' has already been registered, please choose a different model name",
                    name
                )));
            }

            registry
                .models
                .push(RegisteredModel::new(name, schema, self.context.clone()));
            info!("Model '{}' registered successfully", name);
            Ok(())
        })
    }

    /// Ensure the database exists and every model's table is in place.
    ///
    /// Models are initialised concurrently and independently. One failure is
    /// returned as-is; several come back together as
    /// [`OdmError::Initialization`] in registration order. Tables created
    /// for other models are kept.
    pub async fn init(&self) -> OdmResult<()> {
        self.context.scoped(self.run_init()).await
    }

    async fn run_init(&self) -> OdmResult<()> {
        let (mut guard, models) = {
            let mut registry = self.registry.lock();
            if registry.state == LifecycleState::Destroyed {
                return Err(OdmError::repository(DESTROYED));
            }
            if registry.init_in_flight {
                return Err(OdmError::repository(ALREADY_INITIALISING));
            }

            registry.init_in_flight = true;
            if registry.state == LifecycleState::Registering {
                registry.state = LifecycleState::Initializing;
            }
            let guard = InitGuard {
                registry: &self.registry,
                succeeded: false,
            };
            (guard, registry.models.clone())
        };

        let result = self.initialize(&models).await;
        match &result {
            Ok(()) => guard.succeeded = true,
            Err(e) => error!(error = %e, "initialisation failed"),
        }
        result
    }

    async fn initialize(&self, models: &[RegisteredModel]) -> OdmResult<()> {
        self.ensure_database().await?;

        let outcomes = join_all(models.iter().map(|model| model.init())).await;

        let mut failures: Vec<ModelFailure> = models
            .iter()
            .zip(outcomes)
            .filter_map(|(model, outcome)| {
                outcome.err().map(|error| {
                    warn!(model = %model.name(), error = %error, "model initialisation failed");
                    ModelFailure {
                        model: model.name().to_string(),
                        error,
                    }
                })
            })
            .collect();

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0).error),
            _ => Err(OdmError::Initialization { failures }),
        }
    }

    async fn ensure_database(&self) -> OdmResult<()> {
        let store = self.context.store();
        let db = self.context.database();

        let databases = store.list_databases().await?;
        if !databases.iter().any(|d| d == db) {
            store.create_database(db).await?;
            info!("Db '{}' created successfully.", db);
        }
        Ok(())
    }

    /// The registered model, if instances may be created right now.
    fn registered(&self, name: &str) -> OdmResult<RegisteredModel> {
        let registry = self.registry.lock();
        match registry.state {
            LifecycleState::Initialized => {}
            LifecycleState::Destroyed => return Err(OdmError::repository(DESTROYED)),
            LifecycleState::Registering | LifecycleState::Initializing => {
                return Err(OdmError::repository(CREATE_BEFORE_INIT))
            }
        }

        registry
            .models
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .ok_or_else(|| {
                OdmError::repository(format!(
                    "Model '{}' has not been registered, please register this model using Repository.register()",
                    name
                ))
            })
    }

    /// A fresh, empty instance of a registered model.
    pub fn new_model(&self, name: &str) -> OdmResult<ModelInstance> {
        self.registered(name).map(|model| model.instantiate())
    }

    /// A read query against a registered model's table.
    pub fn query(&self, name: &str) -> OdmResult<Query> {
        self.registered(name).map(Query::new)
    }

    /// Drop the database. The repository is unusable afterwards.
    pub async fn destroy(&self) -> OdmResult<()> {
        self.context.scoped(self.run_destroy()).await
    }

    async fn run_destroy(&self) -> OdmResult<()> {
        {
            let mut registry = self.registry.lock();
            if registry.state != LifecycleState::Initialized {
                return Err(OdmError::repository(DESTROY_BEFORE_INIT));
            }
            if registry.init_in_flight {
                return Err(OdmError::repository(ALREADY_INITIALISING));
            }
            registry.state = LifecycleState::Destroyed;
        }
        self.context.mark_destroyed(true);

        let result = self.drop_database().await;
        if let Err(e) = &result {
            error!(error = %e, "destroy failed");
            self.registry.lock().state = LifecycleState::Initialized;
            self.context.mark_destroyed(false);
        }
        result
    }

    async fn drop_database(&self) -> OdmResult<()> {
        let store = self.context.store();
        let db = self.context.database();

        let databases = store.list_databases().await?;
        if databases.iter().any(|d| d == db) {
            store.drop_database(db).await?;
            info!("Db '{}' destroyed successfully.", db);
        }
        Ok(())
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("models", &self.model_names())
            .finish()
    }
}
