use std::sync::Arc;

use crate::core::{Record, Result};
use crate::session::{
    AsyncSession, AsyncSessionFactory, QueryResult, SessionState, Statement, SyncSession,
};
use crate::transaction::sync::{complete_session_scope, complete_transaction_scope};
use crate::transaction::{enter_sync_transaction, exit_sync_transaction, next_manager_id};

/// Drive one suspension to completion on the calling thread.
///
/// Used once per verb rather than around a whole scope, so delegate code
/// inside a scope stays plain blocking code and never re-enters an executor
/// that is already parked on this thread.
pub fn run_blocking<F: Future>(fut: F) -> F::Output {
    futures::executor::block_on(fut)
}

/// Blocking face over a non-blocking session handle. Each verb runs its
/// suspension to completion on the calling thread; the caller observes an
/// ordinary blocking session.
pub struct BridgedSyncSession {
    session: Box<dyn AsyncSession>,
}

impl BridgedSyncSession {
    pub(crate) fn new(session: Box<dyn AsyncSession>) -> Self {
        Self { session }
    }
}

impl SyncSession for BridgedSyncSession {
    fn execute(&mut self, stmt: Statement) -> Result<QueryResult> {
        run_blocking(self.session.execute(stmt))
    }

    fn add(&mut self, record: Record) -> Result<()> {
        self.session.add(record)
    }

    fn flush(&mut self) -> Result<()> {
        run_blocking(self.session.flush())
    }

    fn refresh(&mut self, record: &mut Record) -> Result<()> {
        run_blocking(self.session.refresh(record))
    }

    fn merge(&mut self, record: Record) -> Result<Record> {
        run_blocking(self.session.merge(record))
    }

    fn delete(&mut self, record: &Record) -> Result<()> {
        run_blocking(self.session.delete(record))
    }

    fn commit(&mut self) -> Result<()> {
        run_blocking(self.session.commit())
    }

    fn rollback(&mut self) -> Result<()> {
        run_blocking(self.session.rollback())
    }

    fn close(&mut self) -> Result<()> {
        run_blocking(self.session.close())
    }

    fn state(&self) -> SessionState {
        self.session.state()
    }
}

/// Blocking transaction manager over a non-blocking factory. Must be driven
/// from a plain thread; calling it from inside a runtime worker stalls that
/// worker for the duration of each verb.
pub struct AsyncToSyncTransactionManager {
    factory: Arc<dyn AsyncSessionFactory>,
    id: u64,
}

impl AsyncToSyncTransactionManager {
    pub fn new(factory: Arc<dyn AsyncSessionFactory>) -> Self {
        log::info!("init async-to-sync bridged transaction manager");
        Self {
            factory,
            id: next_manager_id(),
        }
    }

    pub fn session_factory(&self) -> Arc<dyn AsyncSessionFactory> {
        Arc::clone(&self.factory)
    }

    fn open_bridged(&self) -> Result<Box<dyn SyncSession>> {
        let session = run_blocking(self.factory.open_session())?;
        Ok(Box::new(BridgedSyncSession::new(session)))
    }

    /// Open a session scope, run `op` inside it, close on every exit path.
    pub fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        let session = self.open_bridged()?;
        complete_session_scope(session, op)
    }

    /// Transactional scope: commit on success, roll back on failure, close
    /// in both cases. Fails with `NestedTransaction` when this thread is
    /// already inside a transaction of this manager.
    pub fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        enter_sync_transaction(self.id)?;
        let result = self
            .open_bridged()
            .and_then(|session| complete_transaction_scope(session, op));
        exit_sync_transaction(self.id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::core::DbError;
    use crate::driver::MemoryAsyncFactory;
    use uuid::Uuid;

    fn manager() -> AsyncToSyncTransactionManager {
        let factory = Arc::new(MemoryAsyncFactory::new(DriverConfig::default()));
        AsyncToSyncTransactionManager::new(factory)
    }

    #[test]
    fn test_commit_visible_to_next_scope() {
        let manager = manager();
        let id = Uuid::new_v4();

        manager
            .with_transaction(|session| {
                session.add(Record::new("items", id).with_field("name", "washer"))?;
                session.flush()
            })
            .unwrap();

        let found = manager
            .with_session(|session| session.execute(Statement::select_by_id("items", id)))
            .unwrap();
        assert_eq!(found.row_count(), 1);
    }

    #[test]
    fn test_operation_error_rolls_back() {
        let manager = manager();
        let id = Uuid::new_v4();

        let result: Result<()> = manager.with_transaction(|session| {
            session.add(Record::new("items", id).with_field("name", "gasket"))?;
            session.flush()?;
            Err(DbError::storage("flush", "boom"))
        });
        assert!(result.is_err());

        let found = manager
            .with_session(|session| session.execute(Statement::select_by_id("items", id)))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_transaction_rejected() {
        let manager = manager();

        let result: Result<()> = manager.with_transaction(|_session| {
            manager.with_transaction(|_inner| Ok(())).map(|_: ()| ())
        });
        assert!(matches!(result, Err(DbError::NestedTransaction)));
    }

    #[test]
    fn test_state_transitions_through_bridge() {
        let manager = manager();
        manager
            .with_session(|session| {
                assert_eq!(session.state(), SessionState::Open);
                session.execute(Statement::select_all("items"))?;
                assert_eq!(session.state(), SessionState::Active);
                Ok(())
            })
            .unwrap();
    }
}
