use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::bridge::pool::{BlockingPool, WorkerLease};
use crate::core::{DbError, Record, Result};
use crate::session::{
    AsyncSession, QueryResult, SessionState, Statement, SyncSession, SyncSessionFactory,
};
use crate::transaction::non_blocking::{drive_session_scope, drive_transaction_scope};
use crate::transaction::{next_manager_id, scope_async_transaction};

/// Non-blocking face over a blocking session handle.
///
/// Every storage-touching verb ships the boxed handle to the scope's pinned
/// worker thread and awaits the reply; the handle never runs a verb on two
/// different threads. `add` stays on the caller because staging is pure
/// in-memory bookkeeping.
///
/// Cancellation is run-to-completion: dropping an in-flight verb future lets
/// the verb finish on the worker, which then rolls back and closes the
/// abandoned handle on its own thread.
pub struct BridgedAsyncSession {
    lease: WorkerLease,
    session: Option<Box<dyn SyncSession>>,
}

impl BridgedAsyncSession {
    pub(crate) fn new(lease: WorkerLease, session: Box<dyn SyncSession>) -> Self {
        Self {
            lease,
            session: Some(session),
        }
    }

    fn handle_mut(&mut self, verb: &'static str) -> Result<&mut dyn SyncSession> {
        match self.session.as_mut() {
            Some(session) => Ok(session.as_mut()),
            None => Err(handle_lost(verb)),
        }
    }

    async fn offload<T, F>(&mut self, verb: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SyncSession) -> Result<T> + Send + 'static,
    {
        let mut session = self.session.take().ok_or_else(|| handle_lost(verb))?;
        let (reply_tx, reply_rx) = oneshot::channel::<(Box<dyn SyncSession>, Result<T>)>();

        self.lease
            .submit(Box::new(move || {
                let outcome = op(session.as_mut());
                if let Err((session, _)) = reply_tx.send((session, outcome)) {
                    // Caller dropped the verb future mid-flight. The verb
                    // already ran; discard its outcome and release the
                    // handle here, on its own thread.
                    release_abandoned(session);
                }
            }))
            .await?;

        let (session, outcome) = reply_rx
            .await
            .map_err(|_| DbError::Bridge(format!("worker dropped the {verb} reply")))?;
        self.session = Some(session);
        outcome
    }
}

fn handle_lost(verb: &'static str) -> DbError {
    DbError::Bridge(format!("session handle lost before {verb}"))
}

fn release_abandoned(mut session: Box<dyn SyncSession>) {
    if session.state() == SessionState::Closed {
        return;
    }
    if let Err(err) = session.rollback() {
        log::error!("rollback failed for abandoned bridged session: {err}");
    }
    if let Err(err) = session.close() {
        log::warn!("close failed for abandoned bridged session: {err}");
    }
}

#[async_trait]
impl AsyncSession for BridgedAsyncSession {
    async fn execute(&mut self, stmt: Statement) -> Result<QueryResult> {
        self.offload("execute", move |s| s.execute(stmt)).await
    }

    fn add(&mut self, record: Record) -> Result<()> {
        self.handle_mut("add")?.add(record)
    }

    async fn flush(&mut self) -> Result<()> {
        self.offload("flush", |s| s.flush()).await
    }

    async fn refresh(&mut self, record: &mut Record) -> Result<()> {
        let mut snapshot = record.clone();
        let refreshed = self
            .offload("refresh", move |s| {
                s.refresh(&mut snapshot)?;
                Ok(snapshot)
            })
            .await?;
        *record = refreshed;
        Ok(())
    }

    async fn merge(&mut self, record: Record) -> Result<Record> {
        self.offload("merge", move |s| s.merge(record)).await
    }

    async fn delete(&mut self, record: &Record) -> Result<()> {
        let record = record.clone();
        self.offload("delete", move |s| s.delete(&record)).await
    }

    async fn commit(&mut self) -> Result<()> {
        self.offload("commit", |s| s.commit()).await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.offload("rollback", |s| s.rollback()).await
    }

    async fn close(&mut self) -> Result<()> {
        self.offload("close", |s| s.close()).await
    }

    fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(SessionState::Closed)
    }
}

impl Drop for BridgedAsyncSession {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.state() == SessionState::Closed {
            return;
        }
        if !self
            .lease
            .try_submit(Box::new(move || release_abandoned(session)))
        {
            log::warn!(
                "bridged session dropped while its worker queue is unavailable; \
                 handle released on the calling thread"
            );
        }
    }
}

/// Non-blocking transaction manager over a blocking factory. Each scope
/// leases one worker from the pool, opens the blocking session on that
/// worker, and drives every verb of the scope through it.
pub struct SyncToAsyncTransactionManager {
    factory: Arc<dyn SyncSessionFactory>,
    pool: Arc<BlockingPool>,
    id: u64,
}

impl SyncToAsyncTransactionManager {
    pub fn new(factory: Arc<dyn SyncSessionFactory>, pool: Arc<BlockingPool>) -> Self {
        log::info!("init sync-to-async bridged transaction manager");
        Self {
            factory,
            pool,
            id: next_manager_id(),
        }
    }

    pub fn session_factory(&self) -> Arc<dyn SyncSessionFactory> {
        Arc::clone(&self.factory)
    }

    pub fn pool(&self) -> Arc<BlockingPool> {
        Arc::clone(&self.pool)
    }

    async fn open_bridged(&self) -> Result<Box<dyn AsyncSession>> {
        let lease = self.pool.lease();
        let factory = Arc::clone(&self.factory);
        let (reply_tx, reply_rx) = oneshot::channel();
        lease
            .submit(Box::new(move || {
                let _ = reply_tx.send(factory.open_session());
            }))
            .await?;
        let session = reply_rx
            .await
            .map_err(|_| DbError::Bridge("worker dropped the open reply".into()))??;
        log::debug!("bridged session pinned to worker {}", lease.worker_index());
        Ok(Box::new(BridgedAsyncSession::new(lease, session)))
    }

    /// Open a session scope on a pinned worker, run `op`, close on every
    /// exit path.
    pub async fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        let session = self.open_bridged().await?;
        drive_session_scope(session, op).await
    }

    /// Transactional scope on a pinned worker: commit on success, roll back
    /// on failure, close in both cases. Fails with `NestedTransaction` when
    /// the current task is already inside a transaction of this manager.
    pub async fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        scope_async_transaction(self.id, async {
            let session = self.open_bridged().await?;
            drive_transaction_scope(session, op).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::driver::MemorySyncFactory;
    use futures::FutureExt;
    use uuid::Uuid;

    fn manager() -> SyncToAsyncTransactionManager {
        let factory = Arc::new(MemorySyncFactory::new(DriverConfig::default()));
        SyncToAsyncTransactionManager::new(factory, BlockingPool::shared())
    }

    #[tokio::test]
    async fn test_commit_visible_to_next_scope() {
        let manager = manager();
        let id = Uuid::new_v4();

        manager
            .with_transaction(move |session| {
                async move {
                    let record = Record::new("items", id).with_field("name", "bolt");
                    session.add(record)?;
                    session.flush().await
                }
                .boxed()
            })
            .await
            .unwrap();

        let found = manager
            .with_session(move |session| {
                async move { session.execute(Statement::select_by_id("items", id)).await }.boxed()
            })
            .await
            .unwrap();
        assert_eq!(found.row_count(), 1);
    }

    #[tokio::test]
    async fn test_operation_error_rolls_back() {
        let manager = manager();
        let id = Uuid::new_v4();

        let result: Result<()> = manager
            .with_transaction(move |session| {
                async move {
                    session.add(Record::new("items", id).with_field("name", "nut"))?;
                    session.flush().await?;
                    Err(DbError::storage("flush", "boom"))
                }
                .boxed()
            })
            .await;
        assert!(result.is_err());

        let found = manager
            .with_session(move |session| {
                async move { session.execute(Statement::select_by_id("items", id)).await }.boxed()
            })
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_nested_transaction_rejected() {
        let manager = Arc::new(manager());
        let inner = Arc::clone(&manager);

        let result: Result<()> = manager
            .with_transaction(move |_session| {
                async move {
                    inner
                        .with_transaction(|_inner| async move { Ok(()) }.boxed())
                        .await
                }
                .boxed()
            })
            .await;
        assert!(matches!(result, Err(DbError::NestedTransaction)));
    }
}
