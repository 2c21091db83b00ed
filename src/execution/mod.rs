// ============================================================================
// Execution strategies
// ============================================================================
//
// Stateless verb sets over a session handle. Repositories call these instead
// of the handle directly so the same repository code runs against native and
// bridged handles alike. The mode tag exists for diagnostics only; hot-path
// verbs never branch on it.

use crate::core::{Mode, Record, Result};
use crate::session::{AsyncSession, QueryResult, Statement, SyncSession};

/// Verb set over blocking sessions. Driver errors propagate unchanged apart
/// from being tagged with the verb that surfaced them.
#[derive(Debug, Clone, Copy)]
pub struct SyncExec {
    mode: Mode,
}

impl SyncExec {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn execute(&self, session: &mut dyn SyncSession, stmt: Statement) -> Result<QueryResult> {
        log::debug!("[{}] execute: {stmt}", self.mode);
        session.execute(stmt).map_err(|e| e.with_verb("execute"))
    }

    pub fn add(&self, session: &mut dyn SyncSession, record: Record) -> Result<()> {
        log::debug!("[{}] add: {}/{}", self.mode, record.collection, record.id);
        session.add(record).map_err(|e| e.with_verb("add"))
    }

    pub fn flush(&self, session: &mut dyn SyncSession) -> Result<()> {
        log::debug!("[{}] flush", self.mode);
        session.flush().map_err(|e| e.with_verb("flush"))
    }

    pub fn refresh(&self, session: &mut dyn SyncSession, record: &mut Record) -> Result<()> {
        log::debug!("[{}] refresh: {}/{}", self.mode, record.collection, record.id);
        session.refresh(record).map_err(|e| e.with_verb("refresh"))
    }

    pub fn merge(&self, session: &mut dyn SyncSession, record: Record) -> Result<Record> {
        log::debug!("[{}] merge: {}/{}", self.mode, record.collection, record.id);
        session.merge(record).map_err(|e| e.with_verb("merge"))
    }

    pub fn delete(&self, session: &mut dyn SyncSession, record: &Record) -> Result<()> {
        log::debug!("[{}] delete: {}/{}", self.mode, record.collection, record.id);
        session.delete(record).map_err(|e| e.with_verb("delete"))
    }
}

/// Verb set over non-blocking sessions.
#[derive(Debug, Clone, Copy)]
pub struct AsyncExec {
    mode: Mode,
}

impl AsyncExec {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub async fn execute(
        &self,
        session: &mut dyn AsyncSession,
        stmt: Statement,
    ) -> Result<QueryResult> {
        log::debug!("[{}] execute: {stmt}", self.mode);
        session.execute(stmt).await.map_err(|e| e.with_verb("execute"))
    }

    pub fn add(&self, session: &mut dyn AsyncSession, record: Record) -> Result<()> {
        log::debug!("[{}] add: {}/{}", self.mode, record.collection, record.id);
        session.add(record).map_err(|e| e.with_verb("add"))
    }

    pub async fn flush(&self, session: &mut dyn AsyncSession) -> Result<()> {
        log::debug!("[{}] flush", self.mode);
        session.flush().await.map_err(|e| e.with_verb("flush"))
    }

    pub async fn refresh(
        &self,
        session: &mut dyn AsyncSession,
        record: &mut Record,
    ) -> Result<()> {
        log::debug!("[{}] refresh: {}/{}", self.mode, record.collection, record.id);
        session.refresh(record).await.map_err(|e| e.with_verb("refresh"))
    }

    pub async fn merge(&self, session: &mut dyn AsyncSession, record: Record) -> Result<Record> {
        log::debug!("[{}] merge: {}/{}", self.mode, record.collection, record.id);
        session.merge(record).await.map_err(|e| e.with_verb("merge"))
    }

    pub async fn delete(&self, session: &mut dyn AsyncSession, record: &Record) -> Result<()> {
        log::debug!("[{}] delete: {}/{}", self.mode, record.collection, record.id);
        session.delete(record).await.map_err(|e| e.with_verb("delete"))
    }
}
