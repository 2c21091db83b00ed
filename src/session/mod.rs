// ============================================================================
// Session contracts
// ============================================================================
//
// A session is a unit-of-work handle against a storage engine. It exists in
// two flavors with the same verb set: `SyncSession` (blocking) and
// `AsyncSession` (non-blocking). Transaction managers own the lifecycle of a
// handle; repositories only ever see it as a trait object passed into their
// operations.

mod statement;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{Record, Result};

pub use statement::{QueryResult, Statement};

/// Lifecycle of a session handle. A handle moves open → active → closed
/// exactly once and is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Constructed, no verb invoked yet.
    Open,
    /// At least one verb has run.
    Active,
    /// Released; every further verb fails with `InvalidState`.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Open => "open",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Blocking unit-of-work handle.
///
/// Exactly one owner for its lifetime; never shared across two concurrent
/// transaction scopes. Verbs on a closed handle fail with
/// [`DbError::InvalidState`](crate::core::DbError::InvalidState).
pub trait SyncSession: Send {
    fn execute(&mut self, stmt: Statement) -> Result<QueryResult>;

    /// Stage an entity for insertion. Staging never touches storage; the
    /// write becomes visible to this session at `flush` and to others at
    /// `commit`.
    fn add(&mut self, record: Record) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Reload a record's fields from the session's view of storage.
    fn refresh(&mut self, record: &mut Record) -> Result<()>;

    /// Upsert a record, preserving the stored `created_at` of an existing
    /// row, and return the effective merged record.
    fn merge(&mut self, record: Record) -> Result<Record>;

    fn delete(&mut self, record: &Record) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Release the handle. Closing an already-closed handle is a no-op.
    fn close(&mut self) -> Result<()>;

    fn state(&self) -> SessionState;
}

/// Non-blocking unit-of-work handle. Same verb set as [`SyncSession`];
/// storage-touching verbs suspend instead of blocking. `add` stays
/// synchronous because staging is pure in-memory bookkeeping.
#[async_trait]
pub trait AsyncSession: Send {
    async fn execute(&mut self, stmt: Statement) -> Result<QueryResult>;

    fn add(&mut self, record: Record) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    async fn refresh(&mut self, record: &mut Record) -> Result<()>;

    async fn merge(&mut self, record: Record) -> Result<Record>;

    async fn delete(&mut self, record: &Record) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    fn state(&self) -> SessionState;
}

/// Zero-argument constructor for blocking sessions. Owned by a transaction
/// manager; shared between a native manager and its bridging delegate.
pub trait SyncSessionFactory: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn SyncSession>>;
}

/// Zero-argument constructor for non-blocking sessions.
#[async_trait]
pub trait AsyncSessionFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>>;
}
