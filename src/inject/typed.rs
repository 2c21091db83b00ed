use futures::future::BoxFuture;

use crate::core::Result;
use crate::session::{AsyncSession, SyncSession};
use crate::transaction::{AsyncManager, SyncManager};

/// Session-injecting wrapper around a blocking manager.
///
/// The operation's first parameter is the session slot; the `run*` variants
/// carry zero to three residual arguments through to the operation in
/// declaration order. `read_only` selects the plain session scope, otherwise
/// the operation runs inside a transaction scope.
pub struct SyncTransactional<'m> {
    manager: &'m SyncManager,
    read_only: bool,
}

impl<'m> SyncTransactional<'m> {
    pub(crate) fn new(manager: &'m SyncManager, read_only: bool) -> Self {
        Self { manager, read_only }
    }

    fn scope<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        if self.read_only {
            self.manager.with_session(op)
        } else {
            self.manager.with_transaction(op)
        }
    }

    pub fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession) -> Result<T>,
    {
        self.scope(op)
    }

    pub fn run1<T, A1, F>(&self, op: F, a1: A1) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession, A1) -> Result<T>,
    {
        self.scope(move |session| op(session, a1))
    }

    pub fn run2<T, A1, A2, F>(&self, op: F, a1: A1, a2: A2) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession, A1, A2) -> Result<T>,
    {
        self.scope(move |session| op(session, a1, a2))
    }

    pub fn run3<T, A1, A2, A3, F>(&self, op: F, a1: A1, a2: A2, a3: A3) -> Result<T>
    where
        F: FnOnce(&mut dyn SyncSession, A1, A2, A3) -> Result<T>,
    {
        self.scope(move |session| op(session, a1, a2, a3))
    }
}

/// Non-blocking twin of [`SyncTransactional`]. Operations return a boxed
/// future borrowing the injected handle; residual arguments must be owned
/// (`Send + 'static`) because they cross into the scope's future.
pub struct AsyncTransactional<'m> {
    manager: &'m AsyncManager,
    read_only: bool,
}

impl<'m> AsyncTransactional<'m> {
    pub(crate) fn new(manager: &'m AsyncManager, read_only: bool) -> Self {
        Self { manager, read_only }
    }

    async fn scope<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        if self.read_only {
            self.manager.with_session(op).await
        } else {
            self.manager.with_transaction(op).await
        }
    }

    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<T>> + Send,
    {
        self.scope(op).await
    }

    pub async fn run1<T, A1, F>(&self, op: F, a1: A1) -> Result<T>
    where
        T: Send + 'static,
        A1: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession, A1) -> BoxFuture<'s, Result<T>> + Send,
    {
        self.scope(move |session| op(session, a1)).await
    }

    pub async fn run2<T, A1, A2, F>(&self, op: F, a1: A1, a2: A2) -> Result<T>
    where
        T: Send + 'static,
        A1: Send + 'static,
        A2: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession, A1, A2) -> BoxFuture<'s, Result<T>> + Send,
    {
        self.scope(move |session| op(session, a1, a2)).await
    }

    pub async fn run3<T, A1, A2, A3, F>(&self, op: F, a1: A1, a2: A2, a3: A3) -> Result<T>
    where
        T: Send + 'static,
        A1: Send + 'static,
        A2: Send + 'static,
        A3: Send + 'static,
        F: for<'s> FnOnce(&'s mut dyn AsyncSession, A1, A2, A3) -> BoxFuture<'s, Result<T>> + Send,
    {
        self.scope(move |session| op(session, a1, a2, a3)).await
    }
}
