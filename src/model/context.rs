//! Database access shared by a repository and every model it hands out.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::error::{OdmError, OdmResult};
use crate::store::DocumentStore;

pub(crate) const DESTROYED: &str = "The Repository has been destroyed";

/// Store handle, database name and destroyed flag, cheap to clone.
#[derive(Clone)]
pub struct DatabaseContext {
    store: Arc<dyn DocumentStore>,
    db: String,
    destroyed: Arc<AtomicBool>,
    dispatch: Option<Dispatch>,
}

impl DatabaseContext {
    pub(crate) fn new(store: Arc<dyn DocumentStore>, db: impl Into<String>) -> Self {
        Self {
            store,
            db: db.into(),
            destroyed: Arc::new(AtomicBool::new(false)),
            dispatch: None,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn database(&self) -> &str {
        &self.db
    }

    pub(crate) fn set_dispatch(&mut self, dispatch: Dispatch) {
        self.dispatch = Some(dispatch);
    }

    pub(crate) fn mark_destroyed(&self, destroyed: bool) {
        self.destroyed.store(destroyed, Ordering::SeqCst);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Fail if the owning repository has been destroyed.
    pub(crate) fn ensure_live(&self) -> OdmResult<()> {
        if self.is_destroyed() {
            return Err(OdmError::repository(DESTROYED));
        }
        Ok(())
    }

    /// Run a future with this repository's logger, if one was supplied.
    pub(crate) async fn scoped<F: Future>(&self, fut: F) -> F::Output {
        match &self.dispatch {
            Some(dispatch) => fut.with_subscriber(dispatch.clone()).await,
            None => fut.await,
        }
    }

    /// Run a closure with this repository's logger, if one was supplied.
    pub(crate) fn scoped_sync<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

impl std::fmt::Debug for DatabaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseContext")
            .field("db", &self.db)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}
