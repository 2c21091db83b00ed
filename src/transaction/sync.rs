use std::sync::Arc;

use crate::core::Result;
use crate::session::{SyncSession, SyncSessionFactory};
use crate::transaction::{enter_sync_transaction, exit_sync_transaction, next_manager_id};

/// Native blocking transaction manager. Constructed once at wiring time and
/// never mutated afterwards; every scope opens a fresh session from the
/// factory and releases it on exit.
pub struct SyncTransactionManager {
    factory: Arc<dyn SyncSessionFactory>,
    id: u64,
}

impl SyncTransactionManager {
    pub fn new(factory: Arc<dyn SyncSessionFactory>) -> Self {
        log::info!("init sync transaction manager");
        Self {
            factory,
            id: next_manager_id(),
        }
    }

    pub fn session_factory(&self) -> Arc<dyn SyncSessionFactory> {
        Arc::clone(&self.factory)
    }

    /// Scoped acquisition for read-only use. The guard closes the handle on
    /// drop; no commit or rollback runs.
    pub fn session(&self) -> Result<SessionScope> {
        Ok(SessionScope::new(self.factory.open_session()?))
    }

    /// Scoped transactional acquisition. Exactly one of `commit`/`rollback`
    /// runs before `close`; dropping the guard without completing it rolls
    /// back. Opening a second transaction on this manager from inside an
    /// active one fails with `NestedTransaction`.
    pub fn transaction(&self) -> Result<TransactionScope> {
        enter_sync_transaction(self.id)?;
        match self.factory.open_session() {
            Ok(session) => Ok(TransactionScope::new(session, self.id)),
            Err(err) => {
                exit_sync_transaction(self.id);
                Err(err)
            }
        }
    }

    /// Open a session scope, run `op` inside it, close on every exit path.
    pub fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        let session = self.factory.open_session()?;
        complete_session_scope(session, op)
    }

    /// Open a transaction scope, run `op` inside it, commit on success,
    /// roll back on failure, close in both cases.
    pub fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        enter_sync_transaction(self.id)?;
        let result = self
            .factory
            .open_session()
            .and_then(|session| complete_transaction_scope(session, op));
        exit_sync_transaction(self.id);
        result
    }
}

/// Run `op` against an open session and close the session afterwards,
/// keeping `op`'s error over a close failure.
pub(crate) fn complete_session_scope<T, F>(mut session: Box<dyn SyncSession>, op: F) -> Result<T>
where
    F: FnOnce(&mut dyn SyncSession) -> Result<T>,
{
    let result = op(session.as_mut());
    finish_scope(session, result)
}

/// Run `op` against an open session with transactional semantics: commit on
/// success, rollback on failure (including a failed commit), close last.
pub(crate) fn complete_transaction_scope<T, F>(
    mut session: Box<dyn SyncSession>,
    op: F,
) -> Result<T>
where
    F: FnOnce(&mut dyn SyncSession) -> Result<T>,
{
    let result = match op(session.as_mut()) {
        Ok(value) => match session.commit() {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                if let Err(rb) = session.rollback() {
                    log::error!("rollback failed after commit error: {rb}");
                }
                Err(commit_err)
            }
        },
        Err(op_err) => {
            if let Err(rb) = session.rollback() {
                log::error!("rollback failed after operation error: {rb}");
            }
            Err(op_err)
        }
    };
    finish_scope(session, result)
}

fn finish_scope<T>(mut session: Box<dyn SyncSession>, result: Result<T>) -> Result<T> {
    match session.close() {
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

/// RAII guard for a read-only session scope. Closes the handle when dropped.
pub struct SessionScope {
    session: Option<Box<dyn SyncSession>>,
}

impl SessionScope {
    fn new(session: Box<dyn SyncSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn handle_mut(&mut self) -> &mut dyn SyncSession {
        self.session
            .as_mut()
            .expect("session scope already released")
            .as_mut()
    }

    /// Explicitly close, surfacing the close error that `Drop` would only
    /// log.
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => Ok(()),
        }
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close() {
                log::warn!("session close failed in drop: {err}");
            }
        }
    }
}

/// RAII guard for a transaction scope. `commit`/`rollback` consume the
/// guard; dropping it un-completed rolls back.
pub struct TransactionScope {
    session: Option<Box<dyn SyncSession>>,
    manager_id: u64,
}

impl TransactionScope {
    fn new(session: Box<dyn SyncSession>, manager_id: u64) -> Self {
        Self {
            session: Some(session),
            manager_id,
        }
    }

    pub fn handle_mut(&mut self) -> &mut dyn SyncSession {
        self.session
            .as_mut()
            .expect("transaction scope already completed")
            .as_mut()
    }

    pub fn commit(mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let result = match session.commit() {
            Ok(()) => Ok(()),
            Err(commit_err) => {
                if let Err(rb) = session.rollback() {
                    log::error!("rollback failed after commit error: {rb}");
                }
                Err(commit_err)
            }
        };
        let result = finish_scope(session, result);
        exit_sync_transaction(self.manager_id);
        result
    }

    pub fn rollback(mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let rolled_back = session.rollback();
        let result = finish_scope(session, rolled_back);
        exit_sync_transaction(self.manager_id);
        result
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::warn!("transaction scope dropped without commit or rollback; rolling back");
            if let Err(err) = session.rollback() {
                log::error!("rollback failed in drop: {err}");
            }
            if let Err(err) = session.close() {
                log::warn!("session close failed in drop: {err}");
            }
            exit_sync_transaction(self.manager_id);
        }
    }
}
