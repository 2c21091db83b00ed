use std::sync::Arc;

use futures::future::BoxFuture;

use crate::core::{DbError, Result};
use crate::session::{AsyncSession, AsyncSessionFactory};
use crate::transaction::{async_transaction_active, next_manager_id, scope_async_transaction};

/// Native non-blocking transaction manager. Mirrors
/// [`SyncTransactionManager`](crate::transaction::SyncTransactionManager)
/// with suspending scopes; operation closures return a boxed future borrowing
/// the injected handle.
pub struct AsyncTransactionManager {
    factory: Arc<dyn AsyncSessionFactory>,
    id: u64,
}

impl AsyncTransactionManager {
    pub fn new(factory: Arc<dyn AsyncSessionFactory>) -> Self {
        log::info!("init async transaction manager");
        Self {
            factory,
            id: next_manager_id(),
        }
    }

    pub fn session_factory(&self) -> Arc<dyn AsyncSessionFactory> {
        Arc::clone(&self.factory)
    }

    /// Scoped acquisition for read-only use. The guard must be released
    /// with `close().await`; async teardown cannot run in `Drop`.
    pub async fn session(&self) -> Result<AsyncSessionScope> {
        Ok(AsyncSessionScope::new(self.factory.open_session().await?))
    }

    /// Scoped transactional acquisition. Complete it with `commit().await`
    /// or `rollback().await`. Nesting detection covers `with_transaction`
    /// scopes of this manager on the current task; guard-to-guard nesting
    /// inside one task is the caller's responsibility.
    pub async fn transaction(&self) -> Result<AsyncTransactionScope> {
        if async_transaction_active(self.id) {
            return Err(DbError::NestedTransaction);
        }
        Ok(AsyncTransactionScope::new(
            self.factory.open_session().await?,
        ))
    }

    /// Open a session scope, run `op` inside it, close on every exit path.
    pub async fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        let session = self.factory.open_session().await?;
        drive_session_scope(session, op).await
    }

    /// Open a transaction scope, run `op` inside it, commit on success,
    /// roll back on failure, close in both cases. Fails fast with
    /// `NestedTransaction` when called from inside an active
    /// `with_transaction` of this manager.
    pub async fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        scope_async_transaction(self.id, async {
            let session = self.factory.open_session().await?;
            drive_transaction_scope(session, op).await
        })
        .await
    }
}

/// Run `op` against an open session and close it afterwards, keeping `op`'s
/// error over a close failure.
pub(crate) async fn drive_session_scope<T, F>(
    mut session: Box<dyn AsyncSession>,
    op: F,
) -> Result<T>
where
    T: Send + 'static,
    F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
{
    let result = op(session.as_mut()).await;
    finish_scope(session, result).await
}

/// Run `op` with transactional semantics: commit on success, rollback on
/// failure (including a failed commit), close last.
pub(crate) async fn drive_transaction_scope<T, F>(
    mut session: Box<dyn AsyncSession>,
    op: F,
) -> Result<T>
where
    T: Send + 'static,
    F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
{
    let result = match op(session.as_mut()).await {
        Ok(value) => match session.commit().await {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                if let Err(rb) = session.rollback().await {
                    log::error!("rollback failed after commit error: {rb}");
                }
                Err(commit_err)
            }
        },
        Err(op_err) => {
            if let Err(rb) = session.rollback().await {
                log::error!("rollback failed after operation error: {rb}");
            }
            Err(op_err)
        }
    };
    finish_scope(session, result).await
}

async fn finish_scope<T>(mut session: Box<dyn AsyncSession>, result: Result<T>) -> Result<T> {
    match session.close().await {
        Ok(()) => result,
        Err(close_err) => match result {
            Ok(_) => Err(close_err),
            Err(op_err) => {
                log::warn!("session close failed after scope error: {close_err}");
                Err(op_err)
            }
        },
    }
}

/// Guard for a read-only async session scope. Must be released with
/// `close().await`; dropping it un-closed only logs, because the teardown
/// verbs suspend.
pub struct AsyncSessionScope {
    session: Option<Box<dyn AsyncSession>>,
}

impl AsyncSessionScope {
    fn new(session: Box<dyn AsyncSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn handle_mut(&mut self) -> &mut dyn AsyncSession {
        self.session
            .as_mut()
            .expect("session scope already released")
            .as_mut()
    }

    pub async fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for AsyncSessionScope {
    fn drop(&mut self) {
        if self.session.is_some() {
            log::warn!(
                "async session scope dropped without close; async teardown cannot run in Drop, \
                 use scope.close().await"
            );
        }
    }
}

/// Guard for an async transaction scope. Complete it with `commit().await`
/// or `rollback().await`.
pub struct AsyncTransactionScope {
    session: Option<Box<dyn AsyncSession>>,
}

impl AsyncTransactionScope {
    fn new(session: Box<dyn AsyncSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn handle_mut(&mut self) -> &mut dyn AsyncSession {
        self.session
            .as_mut()
            .expect("transaction scope already completed")
            .as_mut()
    }

    pub async fn commit(mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let result = match session.commit().await {
            Ok(()) => Ok(()),
            Err(commit_err) => {
                if let Err(rb) = session.rollback().await {
                    log::error!("rollback failed after commit error: {rb}");
                }
                Err(commit_err)
            }
        };
        finish_scope(session, result).await
    }

    pub async fn rollback(mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let rolled_back = session.rollback().await;
        finish_scope(session, rolled_back).await
    }
}

impl Drop for AsyncTransactionScope {
    fn drop(&mut self) {
        if self.session.is_some() {
            log::warn!(
                "async transaction scope dropped without commit or rollback; async teardown \
                 cannot run in Drop, the handle is discarded un-rolled-back"
            );
        }
    }
}
