//! Transactional-session collaborator.
//!
//! The dispatcher knows nothing about storage. It opens one [`Session`] per
//! request (when a [`SessionSource`] is configured), hands it to the handler
//! through the request context, and settles it when the request ends:
//!
//! - handler and resolvers succeed → `commit`
//! - anything fails → `rollback`
//! - the request future is dropped before either → `rollback` on a spawned task
//!
//! `commit` and `rollback` must be no-ops when no transaction is open, so the
//! dispatcher can call them unconditionally.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, warn};

use crate::error::SessionError;
use crate::handler::BoxFuture;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options for [`Session::begin`]. `Default` leaves both to the backend.
#[derive(Clone, Debug, Default)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
}

/// One request's connection to the data store.
pub trait Session: Send + 'static {
    /// Opens a transaction. Fails with [`SessionError::AlreadyInTransaction`]
    /// if one is already open.
    fn begin(&mut self, options: TxOptions) -> BoxFuture<'_, Result<(), SessionError>>;

    /// Commits the open transaction; no-op outside a transaction.
    fn commit(&mut self) -> BoxFuture<'_, Result<(), SessionError>>;

    /// Rolls back the open transaction; no-op outside a transaction.
    fn rollback(&mut self) -> BoxFuture<'_, Result<(), SessionError>>;

    fn in_transaction(&self) -> bool;

    /// Access to the concrete session type for query execution.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Opens sessions, typically by checking a connection out of a pool.
pub trait SessionSource: Send + Sync + 'static {
    /// `timeout` bounds the lifetime of the session's operations, if set.
    fn open(&self, timeout: Option<Duration>) -> Result<Box<dyn Session>, SessionError>;
}

/// Shared handle to the request's session.
///
/// The request context and the dispatcher each hold one; the session itself
/// is never shared between requests.
#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<Box<dyn Session>>>);

impl SessionHandle {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub async fn begin(&self, options: TxOptions) -> Result<(), SessionError> {
        self.0.lock().await.begin(options).await
    }

    pub async fn commit(&self) -> Result<(), SessionError> {
        self.0.lock().await.commit().await
    }

    pub async fn rollback(&self) -> Result<(), SessionError> {
        self.0.lock().await.rollback().await
    }

    pub async fn in_transaction(&self) -> bool {
        self.0.lock().await.in_transaction()
    }

    /// Locks the session for direct use.
    ///
    /// ```rust,ignore
    /// let mut session = handle.lock().await;
    /// let conn = session.as_any_mut().downcast_mut::<PgSession>().unwrap();
    /// ```
    pub async fn lock(&self) -> MutexGuard<'_, Box<dyn Session>> {
        self.0.lock().await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionHandle").field(&"..").finish()
    }
}

/// Settles a request's session on every exit path.
///
/// `commit` and `rollback` consume the tracked handle only on success; a
/// failed commit leaves it in place so the caller can still roll back. A guard
/// dropped while still holding a handle rolls it back on a spawned task.
pub(crate) struct SessionGuard {
    handle: Option<SessionHandle>,
}

impl SessionGuard {
    pub(crate) fn new(handle: Option<SessionHandle>) -> Self {
        Self { handle }
    }

    pub(crate) async fn commit(&mut self) -> Result<(), SessionError> {
        if let Some(handle) = &self.handle {
            handle.commit().await?;
            self.handle = None;
        }
        Ok(())
    }

    pub(crate) async fn rollback(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.rollback().await {
                error!("rollback failed: {e}");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else { return };

        warn!("request ended with an unsettled session, rolling back");
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    if let Err(e) = handle.rollback().await {
                        error!("rollback failed: {e}");
                    }
                });
            }
            Err(_) => error!("no runtime available, session left unsettled"),
        }
    }
}
