#![allow(dead_code)]

//! Probe sessions shared by the integration suites. They record every verb
//! with the thread it ran on, so the suites can assert scope ordering and
//! worker affinity without a real storage engine.

use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use duotx::core::{DbError, Record, Result};
use duotx::session::{
    AsyncSession, AsyncSessionFactory, QueryResult, SessionState, Statement, SyncSession,
    SyncSessionFactory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Open,
    Execute,
    Add,
    Flush,
    Commit,
    Rollback,
    Close,
}

/// One recorded verb: what ran, and the name of the thread it ran on.
#[derive(Debug, Clone)]
pub struct Trace {
    pub event: Event,
    pub thread: String,
}

#[derive(Default)]
pub struct Probe {
    traces: Mutex<Vec<Trace>>,
}

impl Probe {
    pub fn record(&self, event: Event) {
        let thread = thread::current()
            .name()
            .unwrap_or("unnamed")
            .to_string();
        self.traces.lock().unwrap().push(Trace { event, thread });
    }

    pub fn events(&self) -> Vec<Event> {
        self.traces.lock().unwrap().iter().map(|t| t.event).collect()
    }

    pub fn traces(&self) -> Vec<Trace> {
        self.traces.lock().unwrap().clone()
    }
}

fn fail(verb: &str) -> DbError {
    DbError::storage(verb, "instructed to fail")
}

pub struct ProbeSyncSession {
    probe: Arc<Probe>,
    state: SessionState,
    fail_on_commit: bool,
    fail_on_flush: bool,
}

impl SyncSession for ProbeSyncSession {
    fn execute(&mut self, _stmt: Statement) -> Result<QueryResult> {
        self.state = SessionState::Active;
        self.probe.record(Event::Execute);
        Ok(QueryResult::new(Vec::new()))
    }

    fn add(&mut self, _record: Record) -> Result<()> {
        self.state = SessionState::Active;
        self.probe.record(Event::Add);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.state = SessionState::Active;
        self.probe.record(Event::Flush);
        if self.fail_on_flush {
            return Err(fail("flush"));
        }
        Ok(())
    }

    fn refresh(&mut self, _record: &mut Record) -> Result<()> {
        self.state = SessionState::Active;
        Ok(())
    }

    fn merge(&mut self, record: Record) -> Result<Record> {
        self.state = SessionState::Active;
        Ok(record)
    }

    fn delete(&mut self, _record: &Record) -> Result<()> {
        self.state = SessionState::Active;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.probe.record(Event::Commit);
        if self.fail_on_commit {
            return Err(fail("commit"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.probe.record(Event::Rollback);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.state != SessionState::Closed {
            self.probe.record(Event::Close);
            self.state = SessionState::Closed;
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[derive(Default)]
pub struct ProbeSyncFactory {
    pub probe: Arc<Probe>,
    pub fail_on_commit: bool,
    pub fail_on_flush: bool,
}

impl SyncSessionFactory for ProbeSyncFactory {
    fn open_session(&self) -> Result<Box<dyn SyncSession>> {
        self.probe.record(Event::Open);
        Ok(Box::new(ProbeSyncSession {
            probe: Arc::clone(&self.probe),
            state: SessionState::Open,
            fail_on_commit: self.fail_on_commit,
            fail_on_flush: self.fail_on_flush,
        }))
    }
}

pub struct ProbeAsyncSession {
    probe: Arc<Probe>,
    state: SessionState,
    fail_on_commit: bool,
}

#[async_trait]
impl AsyncSession for ProbeAsyncSession {
    async fn execute(&mut self, _stmt: Statement) -> Result<QueryResult> {
        self.state = SessionState::Active;
        self.probe.record(Event::Execute);
        Ok(QueryResult::new(Vec::new()))
    }

    fn add(&mut self, _record: Record) -> Result<()> {
        self.state = SessionState::Active;
        self.probe.record(Event::Add);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.state = SessionState::Active;
        self.probe.record(Event::Flush);
        Ok(())
    }

    async fn refresh(&mut self, _record: &mut Record) -> Result<()> {
        self.state = SessionState::Active;
        Ok(())
    }

    async fn merge(&mut self, record: Record) -> Result<Record> {
        self.state = SessionState::Active;
        Ok(record)
    }

    async fn delete(&mut self, _record: &Record) -> Result<()> {
        self.state = SessionState::Active;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.probe.record(Event::Commit);
        if self.fail_on_commit {
            return Err(fail("commit"));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.probe.record(Event::Rollback);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.state != SessionState::Closed {
            self.probe.record(Event::Close);
            self.state = SessionState::Closed;
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

#[derive(Default)]
pub struct ProbeAsyncFactory {
    pub probe: Arc<Probe>,
    pub fail_on_commit: bool,
}

#[async_trait]
impl AsyncSessionFactory for ProbeAsyncFactory {
    async fn open_session(&self) -> Result<Box<dyn AsyncSession>> {
        self.probe.record(Event::Open);
        Ok(Box::new(ProbeAsyncSession {
            probe: Arc::clone(&self.probe),
            state: SessionState::Open,
            fail_on_commit: self.fail_on_commit,
        }))
    }
}
