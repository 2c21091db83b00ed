// ============================================================================
// Transaction managers
// ============================================================================
//
// A manager owns the lifecycle of session handles from one factory and
// exposes the scoped-acquisition primitives (`session`, `transaction`) plus
// the execution primitives (`with_session`, `with_transaction`). The
// `SyncManager`/`AsyncManager` enums tag the native and bridged variants at
// wiring time so callers never branch on the mode themselves.

pub mod non_blocking;
pub mod sync;

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;

use crate::bridge::async_to_sync::AsyncToSyncTransactionManager;
use crate::bridge::sync_to_async::SyncToAsyncTransactionManager;
use crate::core::{DbError, Result};
use crate::inject::{AsyncTransactional, SyncTransactional};
use crate::session::{AsyncSession, SyncSession};

pub use non_blocking::{AsyncSessionScope, AsyncTransactionManager, AsyncTransactionScope};
pub use sync::{SessionScope, SyncTransactionManager, TransactionScope};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_manager_id() -> u64 {
    NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    // Manager ids with a transaction scope open on this thread. A sync
    // transaction scope never migrates threads, so thread-locality is
    // exactly the scope's dynamic extent.
    static SYNC_TX_SCOPES: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

pub(crate) fn enter_sync_transaction(manager_id: u64) -> Result<()> {
    SYNC_TX_SCOPES.with(|scopes| {
        if scopes.borrow_mut().insert(manager_id) {
            Ok(())
        } else {
            Err(DbError::NestedTransaction)
        }
    })
}

pub(crate) fn exit_sync_transaction(manager_id: u64) {
    SYNC_TX_SCOPES.with(|scopes| {
        scopes.borrow_mut().remove(&manager_id);
    });
}

tokio::task_local! {
    // Async twin of SYNC_TX_SCOPES: manager ids whose `with_transaction`
    // scope encloses the current future.
    pub(crate) static ASYNC_TX_SCOPES: HashSet<u64>;
}

pub(crate) fn async_transaction_active(manager_id: u64) -> bool {
    ASYNC_TX_SCOPES
        .try_with(|scopes| scopes.contains(&manager_id))
        .unwrap_or(false)
}

/// Run `fut` with `manager_id` registered as inside-a-transaction, failing
/// fast when the id is already registered for the current task.
pub(crate) async fn scope_async_transaction<T, F>(manager_id: u64, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if async_transaction_active(manager_id) {
        return Err(DbError::NestedTransaction);
    }
    let mut scopes = ASYNC_TX_SCOPES
        .try_with(|scopes| scopes.clone())
        .unwrap_or_default();
    scopes.insert(manager_id);
    ASYNC_TX_SCOPES.scope(scopes, fut).await
}

/// Blocking manager variant selected at wiring time: either a native
/// blocking backend or a non-blocking backend driven on the calling thread.
pub enum SyncManager {
    Native(SyncTransactionManager),
    Bridged(AsyncToSyncTransactionManager),
}

impl SyncManager {
    /// Scoped read-only acquisition. Only native managers hand out raw
    /// scope guards; bridged handles cannot leave their completion loop.
    pub fn session(&self) -> Result<SessionScope> {
        match self {
            SyncManager::Native(manager) => manager.session(),
            SyncManager::Bridged(_) => Err(DbError::UnsupportedOperation(
                "scope guards are not available on a bridged manager; use with_session".into(),
            )),
        }
    }

    pub fn transaction(&self) -> Result<TransactionScope> {
        match self {
            SyncManager::Native(manager) => manager.transaction(),
            SyncManager::Bridged(_) => Err(DbError::UnsupportedOperation(
                "scope guards are not available on a bridged manager; use with_transaction".into(),
            )),
        }
    }

    /// Open a session, hand it to `op`, close on every exit path. No
    /// commit or rollback is attempted.
    pub fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        match self {
            SyncManager::Native(manager) => manager.with_session(op),
            SyncManager::Bridged(manager) => manager.with_session(op),
        }
    }

    /// Open a session, hand it to `op`, commit on success, roll back on
    /// failure, close in both cases. `op`'s error propagates unchanged.
    pub fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        match self {
            SyncManager::Native(manager) => manager.with_transaction(op),
            SyncManager::Bridged(manager) => manager.with_transaction(op),
        }
    }

    /// Session-injecting wrapper: `read_only` selects the session scope,
    /// otherwise the transaction scope.
    pub fn transactional(&self, read_only: bool) -> SyncTransactional<'_> {
        SyncTransactional::new(self, read_only)
    }
}

/// Non-blocking manager variant selected at wiring time: either a native
/// non-blocking backend or a blocking backend driven through the worker
/// pool.
pub enum AsyncManager {
    Native(AsyncTransactionManager),
    Bridged(SyncToAsyncTransactionManager),
}

impl AsyncManager {
    pub async fn session(&self) -> Result<AsyncSessionScope> {
        match self {
            AsyncManager::Native(manager) => manager.session().await,
            AsyncManager::Bridged(_) => Err(DbError::UnsupportedOperation(
                "scope guards are not available on a bridged manager; use with_session".into(),
            )),
        }
    }

    pub async fn transaction(&self) -> Result<AsyncTransactionScope> {
        match self {
            AsyncManager::Native(manager) => manager.transaction().await,
            AsyncManager::Bridged(_) => Err(DbError::UnsupportedOperation(
                "scope guards are not available on a bridged manager; use with_transaction".into(),
            )),
        }
    }

    pub async fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        match self {
            AsyncManager::Native(manager) => manager.with_session(op).await,
            AsyncManager::Bridged(manager) => manager.with_session(op).await,
        }
    }

    pub async fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        match self {
            AsyncManager::Native(manager) => manager.with_transaction(op).await,
            AsyncManager::Bridged(manager) => manager.with_transaction(op).await,
        }
    }

    pub fn transactional(&self, read_only: bool) -> AsyncTransactional<'_> {
        AsyncTransactional::new(self, read_only)
    }
}
