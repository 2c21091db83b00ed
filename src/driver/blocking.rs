use std::sync::{Arc, RwLock};

#[cfg(test)]
use uuid::Uuid;

use crate::config::DriverConfig;
use crate::core::{DbError, Record, Result};
use crate::driver::store::{StoreState, Workspace};
use crate::session::{
    QueryResult, SessionState, Statement, SyncSession, SyncSessionFactory,
};

/// Factory for blocking in-memory sessions. One factory owns one committed
/// store; every session it opens stages privately against that store.
pub struct MemorySyncFactory {
    store: Arc<RwLock<StoreState>>,
    config: DriverConfig,
}

impl MemorySyncFactory {
    pub fn new(config: DriverConfig) -> Self {
        log::info!(
            "memory driver (blocking): pool_size={} max_overflow={} recycle={}s timeout={}s",
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
    pub fn add_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        let mut state = self.store.write()?;
        state.add_unique_index(collection, field);
        Ok(())
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

impl SyncSessionFactory for MemorySyncFactory {
    fn open_session(&self) -> Result<Box<dyn SyncSession>> {
        log::debug!("opening blocking memory session");
        Ok(Box::new(MemorySyncSession {
            store: Arc::clone(&self.store),
            workspace: Workspace::default(),
            state: SessionState::Open,
        }))
    }
}

/// Blocking unit-of-work over the shared in-memory store.
pub struct MemorySyncSession {
    store: Arc<RwLock<StoreState>>,
    workspace: Workspace,
    state: SessionState,
}

impl MemorySyncSession {
    fn ensure_usable(&mut self, verb: &str) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(DbError::invalid_state(verb, self.state));
        }
        self.state = SessionState::Active;
        Ok(())
    }

    fn flush_staged(&mut self) -> Result<()> {
        let state = self.store.read()?;
        self.workspace.flush(&state)
    }
}

impl SyncSession for MemorySyncSession {
    fn execute(&mut self, stmt: Statement) -> Result<QueryResult> {
        self.ensure_usable("execute")?;
        let state = self.store.read()?;
        Ok(state.query(&self.workspace.overlay, &stmt))
    }

    fn add(&mut self, record: Record) -> Result<()> {
        self.ensure_usable("add")?;
        self.workspace.stage_insert(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_usable("flush")?;
        self.flush_staged()
    }

    fn refresh(&mut self, record: &mut Record) -> Result<()> {
        self.ensure_usable("refresh")?;
        let state = self.store.read()?;
        match state.lookup(&self.workspace.overlay, &record.collection, record.id) {
            Some(stored) => {
                *record = stored;
                Ok(())
            }
            None => Err(DbError::not_found(&record.collection, record.id)),
        }
    }

    fn merge(&mut self, mut record: Record) -> Result<Record> {
        self.ensure_usable("merge")?;
        let existing = {
            let state = self.store.read()?;
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

    fn delete(&mut self, record: &Record) -> Result<()> {
        self.ensure_usable("delete")?;
        self.workspace.stage_delete(&record.collection, record.id);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_usable("commit")?;
        if self.workspace.has_pending() {
            self.flush_staged().map_err(|e| e.with_verb("commit"))?;
        }
        let overlay = std::mem::take(&mut self.workspace.overlay);
        let mut state = self.store.write()?;
        state.apply(overlay)
    }

    fn rollback(&mut self) -> Result<()> {
        self.ensure_usable("rollback")?;
        self.workspace.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
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
