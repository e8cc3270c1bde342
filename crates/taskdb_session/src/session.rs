//! Session lifecycle orchestration.

use crate::auth::AuthenticatedUser;
use crate::config::AppConfig;
use crate::error::{SessionError, SessionResult};
use crate::sanitize::database_name;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use taskdb_live::{CachedQuery, LiveQueryEngine, QueryScope, Subscription};
use taskdb_store::{
    DocumentBackend, DocumentStore, FileBackend, Item, StoreResult, OWNER_INDEX, TASKS_COLLECTION,
};
use taskdb_sync::{
    BasicCredentials, ReplicationCoordinator, ReplicationState, ReplicationTransport,
    ReplicatorConfig,
};

/// Lifecycle state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// No session has been initialized.
    NotInitialized,
    /// Initialization is in progress.
    Connecting,
    /// The session is fully usable.
    Open,
    /// Initialization failed; a new `initialize_session` call is needed.
    Error(String),
}

/// Outcome of a best-effort session close.
///
/// Close never raises: every failed step is captured here instead.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Failures encountered while closing, in step order.
    pub errors: Vec<SessionError>,
}

impl CloseReport {
    /// Checks if every close step succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Produces the document backend for a given database name.
///
/// Called once per `initialize_session`; returning the backing storage
/// for an existing name must reopen it, not recreate it.
pub type BackendFactory = Box<dyn Fn(&str) -> StoreResult<Box<dyn DocumentBackend>> + Send + Sync>;

/// The live resources of one open session.
struct ActiveSession {
    user: AuthenticatedUser,
    database_name: String,
    store: Arc<DocumentStore>,
    engine: LiveQueryEngine,
    queries: SessionQueries,
    coordinator: ReplicationCoordinator,
}

/// The two standing queries compiled at initialization.
struct SessionQueries {
    all: CachedQuery,
    mine: CachedQuery,
}

struct Inner {
    lifecycle: LifecycleState,
    session: Option<ActiveSession>,
}

/// Orchestrates the store, live queries, and replication for one
/// authenticated user.
///
/// The manager is a monitor: lifecycle operations take exclusive access,
/// so no caller ever observes a half-initialized or half-closed session.
/// Document mutations and live-query (re)subscription share access and
/// may run concurrently once the session is `Open`.
///
/// Exactly one session is active at a time. Initializing while a session
/// is open returns a session state error; `close_session` followed by a
/// new `initialize_session` switches users.
pub struct SessionManager {
    config: AppConfig,
    transport: Arc<dyn ReplicationTransport>,
    backend_factory: BackendFactory,
    inner: RwLock<Inner>,
}

impl SessionManager {
    /// Creates a manager with a custom backend factory.
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn ReplicationTransport>,
        backend_factory: BackendFactory,
    ) -> Self {
        Self {
            config,
            transport,
            backend_factory,
            inner: RwLock::new(Inner {
                lifecycle: LifecycleState::NotInitialized,
                session: None,
            }),
        }
    }

    /// Creates a manager whose stores live under `data_dir`, one
    /// directory per database name.
    pub fn file_backed(
        config: AppConfig,
        transport: Arc<dyn ReplicationTransport>,
        data_dir: PathBuf,
    ) -> Self {
        let factory: BackendFactory = Box::new(move |name| {
            let backend = FileBackend::open(&data_dir.join(name))?;
            Ok(Box::new(backend) as Box<dyn DocumentBackend>)
        });
        Self::new(config, transport, factory)
    }

    /// Returns the current lifecycle state.
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.inner.read().lifecycle.clone()
    }

    /// Returns the current replication state.
    ///
    /// `Stopped` when no session (or no replicator) exists.
    pub fn replication_state(&self) -> ReplicationState {
        match &self.inner.read().session {
            Some(session) => session.coordinator.state(),
            None => ReplicationState::Stopped,
        }
    }

    /// Returns the open session's database name.
    pub fn database_name(&self) -> Option<String> {
        self.inner
            .read()
            .session
            .as_ref()
            .map(|s| s.database_name.clone())
    }

    /// Initializes a session for the given user.
    ///
    /// Derives the per-user database name, opens or reopens the store,
    /// ensures the task collection and owner index exist, compiles the
    /// standing queries, validates the endpoint URL, and starts
    /// replication. On full success the lifecycle moves
    /// `NotInitialized → Connecting → Open`.
    ///
    /// # Errors
    ///
    /// Any setup failure moves the lifecycle to `Error(detail)` and
    /// returns the failure; partially built resources are released and
    /// replication is never started after an earlier step fails. A
    /// malformed endpoint URL in particular yields
    /// `SessionError::Configuration` with replication still `Stopped`.
    pub fn initialize_session(&self, user: AuthenticatedUser) -> SessionResult<()> {
        let mut inner = self.inner.write();
        match inner.lifecycle {
            LifecycleState::NotInitialized | LifecycleState::Error(_) => {}
            LifecycleState::Connecting | LifecycleState::Open => {
                return Err(SessionError::session_state(
                    "a session is already active; close it first",
                ));
            }
        }
        inner.lifecycle = LifecycleState::Connecting;

        match self.build_session(user) {
            Ok(session) => {
                tracing::debug!(
                    user = session.user.username(),
                    database = session.database_name,
                    "session open"
                );
                inner.session = Some(session);
                inner.lifecycle = LifecycleState::Open;
                Ok(())
            }
            Err(e) => {
                inner.lifecycle = LifecycleState::Error(e.to_string());
                Err(e)
            }
        }
    }

    fn build_session(&self, user: AuthenticatedUser) -> SessionResult<ActiveSession> {
        let database_name = database_name(user.username());

        let backend = (self.backend_factory)(&database_name)?;
        let store = Arc::new(DocumentStore::open(database_name.clone(), backend)?);

        let result = self.build_session_over(&user, &database_name, &store);
        if result.is_err() {
            // Release the store so a retry can reopen it
            if let Err(close_err) = store.close() {
                tracing::warn!(error = %close_err, "store close failed during setup rollback");
            }
        }

        result.map(|(engine, queries, coordinator)| ActiveSession {
            user,
            database_name,
            store,
            engine,
            queries,
            coordinator,
        })
    }

    fn build_session_over(
        &self,
        user: &AuthenticatedUser,
        database_name: &str,
        store: &Arc<DocumentStore>,
    ) -> SessionResult<(LiveQueryEngine, SessionQueries, ReplicationCoordinator)> {
        store.ensure_collection(TASKS_COLLECTION)?;
        store.create_index(OWNER_INDEX)?;

        let queries = SessionQueries {
            all: CachedQuery::all_items(),
            mine: CachedQuery::my_items(user.user_id()),
        };
        let engine = LiveQueryEngine::new(Arc::clone(store));

        // Replication starts only once everything local is in place
        self.config.validate_endpoint()?;
        let replicator_config = Arc::new(ReplicatorConfig::new(
            self.config.endpoint_url.clone(),
            TASKS_COLLECTION,
            BasicCredentials::new(user.username(), user.password()),
        ));

        let coordinator = ReplicationCoordinator::new(Arc::clone(&self.transport));
        coordinator.start(replicator_config)?;

        tracing::debug!(database = database_name, "replication started");
        Ok((engine, queries, coordinator))
    }

    /// Closes the session.
    ///
    /// Runs independent best-effort steps in order: remove the live-query
    /// listener, stop the replicator (which removes its status listener
    /// first), then close the store. A failed step never skips the rest;
    /// failures are logged and collected into the returned report. After
    /// close the lifecycle is `NotInitialized` and a new
    /// `initialize_session` call is required.
    pub fn close_session(&self) -> CloseReport {
        let mut inner = self.inner.write();
        let mut report = CloseReport::default();

        if let Some(session) = inner.session.take() {
            session.engine.unsubscribe_current();

            if let Err(e) = session.coordinator.stop() {
                tracing::warn!(error = %e, "replicator stop failed during close");
                report.errors.push(e.into());
            }

            if let Err(e) = session.store.close() {
                tracing::warn!(error = %e, "store close failed during close");
                report.errors.push(e.into());
            }
        }

        inner.lifecycle = LifecycleState::NotInitialized;
        report
    }

    /// Pauses background sync.
    ///
    /// Lifecycle state and query subscriptions are unaffected. A safe
    /// no-op when no replicator exists.
    pub fn pause_sync(&self) -> SessionResult<()> {
        match &self.inner.read().session {
            Some(session) => session.coordinator.pause().map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Resumes background sync with the configuration built at
    /// initialization.
    ///
    /// A safe no-op when no replicator exists.
    pub fn resume_sync(&self) -> SessionResult<()> {
        match &self.inner.read().session {
            Some(session) => session.coordinator.resume().map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Adds a task owned by the session user.
    ///
    /// # Errors
    ///
    /// Returns a session state error unless the session is `Open`.
    pub fn add_task(&self, summary: &str) -> SessionResult<Item> {
        let inner = self.inner.read();
        let session = Self::require_open(&inner)?;
        Ok(session.store.add_task(summary, session.user.user_id())?)
    }

    /// Fetches a task by id.
    pub fn get_task(&self, id: &str) -> SessionResult<Option<Item>> {
        let inner = self.inner.read();
        let session = Self::require_open(&inner)?;
        Ok(session.store.get(id)?)
    }

    /// Updates a task's completion flag and summary.
    ///
    /// The ownership check runs against the stored owner id; a mutation
    /// by a non-owner fails and leaves the document unchanged.
    pub fn update_task(&self, item: &Item, is_complete: bool, summary: &str) -> SessionResult<()> {
        let inner = self.inner.read();
        let session = Self::require_open(&inner)?;
        session
            .store
            .update(item, is_complete, summary, session.user.user_id())?;
        Ok(())
    }

    /// Deletes a task.
    ///
    /// Gated by the same ownership check as `update_task`.
    pub fn delete_task(&self, item: &Item) -> SessionResult<()> {
        let inner = self.inner.read();
        let session = Self::require_open(&inner)?;
        session.store.delete(item, session.user.user_id())?;
        Ok(())
    }

    /// Subscribes to a live query over the chosen scope.
    ///
    /// Replaces any previously active subscription. `Mine` is bound to
    /// the session user id compiled at initialization; it is not
    /// re-evaluated without a new session. The initial result list is
    /// delivered immediately, then once per change batch.
    pub fn subscribe(
        &self,
        scope: QueryScope,
    ) -> SessionResult<(Subscription, Receiver<Vec<Item>>)> {
        let inner = self.inner.read();
        let session = Self::require_open(&inner)?;
        let query = match scope {
            QueryScope::All => session.queries.all.clone(),
            QueryScope::Mine => session.queries.mine.clone(),
        };
        Ok(session.engine.subscribe(query)?)
    }

    /// Removes a live-query subscription.
    ///
    /// No delivery is attempted for the handle after this returns. A
    /// no-op when the session is closed or the handle is stale.
    pub fn unsubscribe(&self, subscription: Subscription) {
        if let Some(session) = &self.inner.read().session {
            session.engine.unsubscribe(subscription);
        }
    }

    fn require_open(inner: &Inner) -> Result<&ActiveSession, SessionError> {
        match (&inner.lifecycle, &inner.session) {
            (LifecycleState::Open, Some(session)) => Ok(session),
            _ => Err(SessionError::session_state("session is not open")),
        }
    }
}
