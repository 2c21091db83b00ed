use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
#[cfg(test)]
use uuid::Uuid;

use crate::config::DriverConfig;
use crate::core::{DbError, Record, Result};
use crate::driver::store::{StoreState, Workspace};
use crate::session::{
    AsyncSession, AsyncSessionFactory, QueryResult, SessionState, Statement,
};

/// Factory for non-blocking in-memory sessions. Mirrors
/// [`MemorySyncFactory`](crate::driver::MemorySyncFactory) with the committed
/// store behind an async lock.
pub struct MemoryAsyncFactory {
    store: Arc<RwLock<StoreState>>,
    config: DriverConfig,
}

impl MemoryAsyncFactory {
    pub fn new(config: DriverConfig) -> Self {
        log::info!(
            "memory driver (non-blocking): pool_size={} max_overflow={} recycle={}s timeout={}s",
            config.pool_size,
            config.max_overflow,
            config.pool_recycle_secs,
            config.pool_timeout_secs
        );
        Self {
            store: Arc::new(RwLock::new(StoreState::new())),
            config,
        }
    }

    /// Declare a unique field for a collection, enforced at flush/commit.
    pub async fn add_unique_index(&self, collection: &str, field: &str) {
        let mut state = self.store.write().await;
        state.add_unique_index(collection, field);
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

#[async_trait]
impl AsyncSessionFactory for MemoryAsyncFactory {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>> {
        log::debug!("opening non-blocking memory session");
        Ok(Box::new(MemoryAsyncSession {
            store: Arc::clone(&self.store),
            workspace: Workspace::default(),
            state: SessionState::Open,
        }))
    }
}

/// Non-blocking unit-of-work over the shared in-memory store.
pub struct MemoryAsyncSession {
    store: Arc<RwLock<StoreState>>,
    workspace: Workspace,
    state: SessionState,
}

impl MemoryAsyncSession {
    fn ensure_usable(&mut self, verb: &str) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(DbError::invalid_state(verb, self.state));
        }
        self.state = SessionState::Active;
        Ok(())
    }

    async fn flush_staged(&mut self) -> Result<()> {
        let state = self.store.read().await;
        self.workspace.flush(&state)
    }
}

#[async_trait]
impl AsyncSession for MemoryAsyncSession {
    async fn execute(&mut self, stmt: Statement) -> Result<QueryResult> {
        self.ensure_usable("execute")?;
        let state = self.store.read().await;
        Ok(state.query(&self.workspace.overlay, &stmt))
    }

    fn add(&mut self, record: Record) -> Result<()> {
        self.ensure_usable("add")?;
        self.workspace.stage_insert(record);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.ensure_usable("flush")?;
        self.flush_staged().await
    }

    async fn refresh(&mut self, record: &mut Record) -> Result<()> {
        self.ensure_usable("refresh")?;
        let state = self.store.read().await;
        match state.lookup(&self.workspace.overlay, &record.collection, record.id) {
            Some(stored) => {
                *record = stored;
                Ok(())
            }
            None => Err(DbError::not_found(&record.collection, record.id)),
        }
    }

    async fn merge(&mut self, mut record: Record) -> Result<Record> {
        self.ensure_usable("merge")?;
        let existing = {
            let state = self.store.read().await;
            state.lookup(&self.workspace.overlay, &record.collection, record.id)
        };
        if let Some(existing) = existing {
            if let Some(created_at) = existing.get("created_at") {
                record.set("created_at", created_at.clone());
            }
        }
        self.workspace.stage_merge(record.clone());
        Ok(record)
    }

    async fn delete(&mut self, record: &Record) -> Result<()> {
        self.ensure_usable("delete")?;
        self.workspace.stage_delete(&record.collection, record.id);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_usable("commit")?;
        if self.workspace.has_pending() {
            self.flush_staged().await.map_err(|e| e.with_verb("commit"))?;
        }
        let overlay = std::mem::take(&mut self.workspace.overlay);
        let mut state = self.store.write().await;
        state.apply(overlay)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_usable("rollback")?;
        self.workspace.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.workspace.clear();
        self.state = SessionState::Closed;
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn factory() -> MemoryAsyncFactory {
        let factory = MemoryAsyncFactory::new(DriverConfig::default());
        factory.add_unique_index("items", "name").await;
        factory
    }

    fn widget() -> Record {
        Record::new("items", Uuid::new_v4()).with_field("name", "Widget")
    }

    #[tokio::test]
    async fn test_commit_publishes_to_other_sessions() {
        let factory = factory().await;
        let mut writer = factory.open_session().await.unwrap();
        writer.add(widget()).unwrap();
        writer.flush().await.unwrap();
        writer.commit().await.unwrap();
        writer.close().await.unwrap();

        let mut reader = factory.open_session().await.unwrap();
        let rows = reader.execute(Statement::select_all("items")).await.unwrap();
        assert_eq!(rows.row_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_at_flush() {
        let factory = factory().await;
        let mut session = factory.open_session().await.unwrap();
        session.add(widget()).unwrap();
        session.add(widget()).unwrap();
        let err = session.flush().await.unwrap_err();
        assert!(matches!(err, DbError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_verbs_on_closed_session_fail() {
        let factory = factory().await;
        let mut session = factory.open_session().await.unwrap();
        session.close().await.unwrap();
        let err = session.flush().await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));
    }
}
