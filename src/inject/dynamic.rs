use futures::future::BoxFuture;
use thiserror::Error;

use crate::core::{Result, Value};
use crate::session::{AsyncSession, SyncSession};
use crate::transaction::{AsyncManager, SyncManager};

/// Decoration-time binding failures. Everything except `Arity` is caught
/// before the operation can ever run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("operation '{operation}' declares no session slot")]
    NoSessionSlot { operation: String },

    #[error("operation '{operation}' declares more than one session slot")]
    MultipleSessionSlots { operation: String },

    #[error("operation '{operation}' is declared {declared} but the manager is {manager}")]
    SchedulingMismatch {
        operation: String,
        declared: SchedulingModel,
        manager: SchedulingModel,
    },

    #[error("operation '{operation}' takes {expected} residual arguments, got {actual}")]
    Arity {
        operation: String,
        expected: usize,
        actual: usize,
    },
}

/// Which completion style an operation is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingModel {
    Blocking,
    Suspending,
}

impl std::fmt::Display for SchedulingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SchedulingModel::Blocking => "blocking",
            SchedulingModel::Suspending => "suspending",
        })
    }
}

/// Per-slot role in an operation's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The injected session lands here.
    Session,
    /// A caller-supplied positional value lands here.
    Value,
}

/// Declared shape of a runtime-assembled operation: a name for diagnostics,
/// the scheduling flavor its body is written for, and the parameter
/// manifest.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    name: String,
    scheduling: SchedulingModel,
    params: Vec<ParamKind>,
}

impl OperationSpec {
    pub fn new(name: &str, scheduling: SchedulingModel) -> Self {
        Self {
            name: name.to_string(),
            scheduling,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, kind: ParamKind) -> Self {
        self.params.push(kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheduling(&self) -> SchedulingModel {
        self.scheduling
    }

    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }
}

/// Resolved slot layout, computed once at decoration time and reused on
/// every call. Call-time argument splicing never re-derives the session
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionBinding {
    session_slot: usize,
    residual_arity: usize,
}

impl InjectionBinding {
    pub fn session_slot(&self) -> usize {
        self.session_slot
    }

    pub fn residual_arity(&self) -> usize {
        self.residual_arity
    }
}

fn bind(
    spec: &OperationSpec,
    manager: SchedulingModel,
) -> std::result::Result<InjectionBinding, BindingError> {
    if spec.scheduling != manager {
        return Err(BindingError::SchedulingMismatch {
            operation: spec.name.clone(),
            declared: spec.scheduling,
            manager,
        });
    }
    let mut slots = spec
        .params
        .iter()
        .enumerate()
        .filter(|(_, kind)| **kind == ParamKind::Session)
        .map(|(index, _)| index);
    let session_slot = slots.next().ok_or_else(|| BindingError::NoSessionSlot {
        operation: spec.name.clone(),
    })?;
    if slots.next().is_some() {
        return Err(BindingError::MultipleSessionSlots {
            operation: spec.name.clone(),
        });
    }
    Ok(InjectionBinding {
        session_slot,
        residual_arity: spec.params.len() - 1,
    })
}

pub type SyncOperationFn = Box<dyn Fn(&mut dyn SyncSession, &[Value]) -> Result<Value> + Send + Sync>;

pub type AsyncOperationFn =
    Box<dyn for<'s> Fn(&'s mut dyn AsyncSession, Vec<Value>) -> BoxFuture<'s, Result<Value>> + Send + Sync>;

/// Validate `spec` against the manager's blocking model and produce a
/// callable whose session slot is already resolved.
pub fn decorate_sync<'m>(
    manager: &'m SyncManager,
    spec: OperationSpec,
    read_only: bool,
    body: SyncOperationFn,
) -> Result<DecoratedSyncOperation<'m>> {
    let binding = bind(&spec, SchedulingModel::Blocking)?;
    log::debug!(
        "decorated '{}': session slot {}, {} residual",
        spec.name,
        binding.session_slot,
        binding.residual_arity
    );
    Ok(DecoratedSyncOperation {
        spec,
        binding,
        manager,
        read_only,
        body,
    })
}

/// Suspending twin of [`decorate_sync`].
pub fn decorate_async<'m>(
    manager: &'m AsyncManager,
    spec: OperationSpec,
    read_only: bool,
    body: AsyncOperationFn,
) -> Result<DecoratedAsyncOperation<'m>> {
    let binding = bind(&spec, SchedulingModel::Suspending)?;
    log::debug!(
        "decorated '{}': session slot {}, {} residual",
        spec.name,
        binding.session_slot,
        binding.residual_arity
    );
    Ok(DecoratedAsyncOperation {
        spec,
        binding,
        manager,
        read_only,
        body,
    })
}

/// A runtime-assembled blocking operation with its binding resolved. `call`
/// only checks residual arity; the session is spliced at the recorded slot
/// and positional values land on the residual slots in declaration order.
pub struct DecoratedSyncOperation<'m> {
    spec: OperationSpec,
    binding: InjectionBinding,
    manager: &'m SyncManager,
    read_only: bool,
    body: SyncOperationFn,
}

impl DecoratedSyncOperation<'_> {
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn binding(&self) -> InjectionBinding {
        self.binding
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.binding.residual_arity {
            return Err(BindingError::Arity {
                operation: self.spec.name.clone(),
                expected: self.binding.residual_arity,
                actual: args.len(),
            }
            .into());
        }
        let body = &self.body;
        let op = move |session: &mut dyn SyncSession| body(session, args);
        if self.read_only {
            self.manager.with_session(op)
        } else {
            self.manager.with_transaction(op)
        }
    }
}

/// Suspending twin of [`DecoratedSyncOperation`]. Arguments are owned
/// because they cross into the scope's future.
pub struct DecoratedAsyncOperation<'m> {
    spec: OperationSpec,
    binding: InjectionBinding,
    manager: &'m AsyncManager,
    read_only: bool,
    body: AsyncOperationFn,
}

impl DecoratedAsyncOperation<'_> {
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn binding(&self) -> InjectionBinding {
        self.binding
    }

    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        if args.len() != self.binding.residual_arity {
            return Err(BindingError::Arity {
                operation: self.spec.name.clone(),
                expected: self.binding.residual_arity,
                actual: args.len(),
            }
            .into());
        }
        let body = &self.body;
        fn hrtb<F>(f: F) -> F
        where
            F: for<'s> FnOnce(&'s mut dyn AsyncSession) -> BoxFuture<'s, Result<Value>>,
        {
            f
        }
        let op = hrtb(move |session| body(session, args));
        if self.read_only {
            self.manager.with_session(op).await
        } else {
            self.manager.with_transaction(op).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::FutureExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::DriverConfig;
    use crate::core::{DbError, Record};
    use crate::driver::{MemoryAsyncFactory, MemorySyncFactory};
    use crate::session::Statement;
    use crate::transaction::{AsyncTransactionManager, SyncTransactionManager};

    fn sync_manager() -> SyncManager {
        let factory = Arc::new(MemorySyncFactory::new(DriverConfig::default()));
        SyncManager::Native(SyncTransactionManager::new(factory))
    }

    fn spec(params: &[ParamKind]) -> OperationSpec {
        params.iter().fold(
            OperationSpec::new("op", SchedulingModel::Blocking),
            |spec, kind| spec.param(*kind),
        )
    }

    #[test]
    fn test_no_session_slot_rejected_at_decoration() {
        let manager = sync_manager();
        let result = decorate_sync(
            &manager,
            spec(&[ParamKind::Value]),
            true,
            Box::new(|_, _| Ok(Value::Null)),
        );
        assert!(matches!(
            result,
            Err(DbError::Binding(BindingError::NoSessionSlot { .. }))
        ));
    }

    #[test]
    fn test_multiple_session_slots_rejected_at_decoration() {
        let manager = sync_manager();
        let result = decorate_sync(
            &manager,
            spec(&[ParamKind::Session, ParamKind::Session]),
            true,
            Box::new(|_, _| Ok(Value::Null)),
        );
        assert!(matches!(
            result,
            Err(DbError::Binding(BindingError::MultipleSessionSlots { .. }))
        ));
    }

    #[test]
    fn test_scheduling_mismatch_rejected_at_decoration() {
        let manager = sync_manager();
        let result = decorate_sync(
            &manager,
            OperationSpec::new("op", SchedulingModel::Suspending).param(ParamKind::Session),
            true,
            Box::new(|_, _| Ok(Value::Null)),
        );
        assert!(matches!(
            result,
            Err(DbError::Binding(BindingError::SchedulingMismatch { .. }))
        ));
    }

    #[test]
    fn test_arity_checked_at_call_time() {
        let manager = sync_manager();
        let op = decorate_sync(
            &manager,
            spec(&[ParamKind::Session, ParamKind::Value]),
            true,
            Box::new(|_, _| Ok(Value::Null)),
        )
        .unwrap();
        assert_eq!(op.binding().session_slot(), 0);
        assert_eq!(op.binding().residual_arity(), 1);

        let result = op.call(&[]);
        assert!(matches!(
            result,
            Err(DbError::Binding(BindingError::Arity {
                expected: 1,
                actual: 0,
                ..
            }))
        ));
    }

    #[test]
    fn test_session_spliced_mid_list() {
        let manager = sync_manager();
        let op = decorate_sync(
            &manager,
            spec(&[ParamKind::Value, ParamKind::Session, ParamKind::Value]),
            false,
            Box::new(|session, args| {
                let Value::Text(name) = &args[0] else {
                    return Err(DbError::storage("call", "name must be text"));
                };
                let Value::Integer(quantity) = &args[1] else {
                    return Err(DbError::storage("call", "quantity must be an integer"));
                };
                let quantity = *quantity;
                let id = Uuid::new_v4();
                session.add(
                    Record::new("items", id)
                        .with_field("name", name.as_str())
                        .with_field("quantity", quantity),
                )?;
                session.flush()?;
                Ok(Value::Uuid(id))
            }),
        )
        .unwrap();
        assert_eq!(op.binding().session_slot(), 1);

        let id = op
            .call(&[Value::Text("spliced".into()), Value::Integer(7)])
            .unwrap();
        let Value::Uuid(id) = id else {
            panic!("expected uuid result");
        };

        let found = manager
            .with_session(|session| session.execute(Statement::select_by_id("items", id)))
            .unwrap();
        assert_eq!(found.row_count(), 1);
    }

    #[tokio::test]
    async fn test_async_decorated_call() {
        let factory = Arc::new(MemoryAsyncFactory::new(DriverConfig::default()));
        let manager = AsyncManager::Native(AsyncTransactionManager::new(factory));
        let op = decorate_async(
            &manager,
            OperationSpec::new("count", SchedulingModel::Suspending).param(ParamKind::Session),
            true,
            Box::new(|session, _args| {
                async move {
                    let result = session.execute(Statement::select_all("items")).await?;
                    Ok(Value::Integer(result.row_count() as i64))
                }
                .boxed()
            }),
        )
        .unwrap();

        let count = op.call(Vec::new()).await.unwrap();
        assert_eq!(count, Value::Integer(0));
    }
}
