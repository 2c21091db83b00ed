//! Session injection over live managers: scope selection by `read_only`,
//! residual argument binding, and the dynamic layer's decoration-time
//! validation.

mod common;

use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use common::{Event, Probe, ProbeSyncFactory};
use duotx::config::{BridgeConfig, DbConfig, DriverConfig};
use duotx::core::{DbError, Mode, Record, Result, Value};
use duotx::driver::MemorySyncFactory;
use duotx::inject::{
    decorate_async, decorate_sync, BindingError, OperationSpec, ParamKind, SchedulingModel,
};
use duotx::session::Statement;
use duotx::transaction::{SyncManager, SyncTransactionManager};
use duotx::bridge::{BlockingPool, SyncToAsyncTransactionManager};
use duotx::transaction::AsyncManager;

fn probe_manager(probe: &Arc<Probe>) -> SyncManager {
    SyncManager::Native(SyncTransactionManager::new(Arc::new(ProbeSyncFactory {
        probe: Arc::clone(probe),
        fail_on_commit: false,
        fail_on_flush: false,
    })))
}

fn memory_manager() -> SyncManager {
    let factory = MemorySyncFactory::new(DriverConfig::default());
    factory.add_unique_index("items", "name").unwrap();
    SyncManager::Native(SyncTransactionManager::new(Arc::new(factory)))
}

#[test]
fn read_only_selects_session_scope() {
    let probe = Arc::new(Probe::default());
    let manager = probe_manager(&probe);

    manager
        .transactional(true)
        .run(|session| session.execute(Statement::select_all("items")).map(|_| ()))
        .unwrap();

    assert_eq!(probe.events(), vec![Event::Open, Event::Execute, Event::Close]);
}

#[test]
fn writable_selects_transaction_scope() {
    let probe = Arc::new(Probe::default());
    let manager = probe_manager(&probe);

    manager
        .transactional(false)
        .run(|session| session.add(Record::new("items", Uuid::new_v4())))
        .unwrap();

    assert_eq!(
        probe.events(),
        vec![Event::Open, Event::Add, Event::Commit, Event::Close]
    );
}

#[test]
fn residual_arguments_bind_in_declaration_order() {
    let manager = memory_manager();
    let id = Uuid::new_v4();

    manager
        .transactional(false)
        .run3(
            |session, id: Uuid, name: String, quantity: i64| {
                session.add(
                    Record::new("items", id)
                        .with_field("name", name.as_str())
                        .with_field("quantity", quantity),
                )?;
                session.flush()
            },
            id,
            "ordered".to_string(),
            9,
        )
        .unwrap();

    let record = manager
        .transactional(true)
        .run1(
            |session, id: Uuid| session.execute(Statement::select_by_id("items", id)),
            id,
        )
        .unwrap()
        .into_optional()
        .unwrap();
    assert_eq!(record.text("name").unwrap(), "ordered");
    assert_eq!(record.integer("quantity").unwrap(), 9);
}

#[test]
fn dynamic_decoration_validates_manifest() {
    let manager = memory_manager();

    let no_session = decorate_sync(
        &manager,
        OperationSpec::new("no_session", SchedulingModel::Blocking).param(ParamKind::Value),
        true,
        Box::new(|_, _| Ok(Value::Null)),
    );
    assert!(matches!(
        no_session.map(|_| ()),
        Err(DbError::Binding(BindingError::NoSessionSlot { .. }))
    ));

    let two_sessions = decorate_sync(
        &manager,
        OperationSpec::new("two_sessions", SchedulingModel::Blocking)
            .param(ParamKind::Session)
            .param(ParamKind::Session),
        true,
        Box::new(|_, _| Ok(Value::Null)),
    );
    assert!(matches!(
        two_sessions.map(|_| ()),
        Err(DbError::Binding(BindingError::MultipleSessionSlots { .. }))
    ));

    let wrong_flavor = decorate_sync(
        &manager,
        OperationSpec::new("wrong_flavor", SchedulingModel::Suspending)
            .param(ParamKind::Session),
        true,
        Box::new(|_, _| Ok(Value::Null)),
    );
    assert!(matches!(
        wrong_flavor.map(|_| ()),
        Err(DbError::Binding(BindingError::SchedulingMismatch { .. }))
    ));
}

#[test]
fn dynamic_call_checks_arity_only() {
    let manager = memory_manager();
    let op = decorate_sync(
        &manager,
        OperationSpec::new("insert", SchedulingModel::Blocking)
            .param(ParamKind::Value)
            .param(ParamKind::Session),
        false,
        Box::new(|session, args| {
            let Value::Text(name) = &args[0] else {
                return Err(DbError::storage("call", "name must be text"));
            };
            let id = Uuid::new_v4();
            session.add(Record::new("items", id).with_field("name", name.as_str()))?;
            session.flush()?;
            Ok(Value::Uuid(id))
        }),
    )
    .unwrap();
    assert_eq!(op.binding().session_slot(), 1);
    assert_eq!(op.binding().residual_arity(), 1);

    let too_many = op.call(&[Value::Text("a".into()), Value::Text("b".into())]);
    assert!(matches!(
        too_many,
        Err(DbError::Binding(BindingError::Arity {
            expected: 1,
            actual: 2,
            ..
        }))
    ));

    let id = op.call(&[Value::Text("dynamic".into())]).unwrap();
    assert!(matches!(id, Value::Uuid(_)));
}

#[tokio::test]
async fn dynamic_async_operation_over_bridged_manager() {
    let config = DbConfig::new(Mode::SyncBridgedAsync).workers(2);
    let factory = MemorySyncFactory::new(config.driver.clone());
    let pool = Arc::new(
        BlockingPool::new(&BridgeConfig {
            workers: Some(2),
            queue_depth: 8,
        })
        .unwrap(),
    );
    let manager = AsyncManager::Bridged(SyncToAsyncTransactionManager::new(
        Arc::new(factory),
        pool,
    ));

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

    assert_eq!(op.call(Vec::new()).await.unwrap(), Value::Integer(0));
}

#[test]
fn dynamic_write_rolls_back_with_the_scope() {
    let manager = memory_manager();
    let op = decorate_sync(
        &manager,
        OperationSpec::new("failing_insert", SchedulingModel::Blocking)
            .param(ParamKind::Session),
        false,
        Box::new(|session, _args| {
            session.add(Record::new("items", Uuid::new_v4()).with_field("name", "ghost"))?;
            session.flush()?;
            Err(DbError::storage("flush", "boom"))
        }),
    )
    .unwrap();

    assert!(op.call(&[]).is_err());

    let remaining: Result<_> =
        manager.with_session(|session| session.execute(Statement::select_all("items")));
    assert!(remaining.unwrap().is_empty());
}
