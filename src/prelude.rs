//! Recommended API entrypoints grouped by abstraction level.
//!
//! `dx` is the stable default for applications that only need the service
//! facade. `advanced` is an explicit escape hatch for the session, manager
//! and bridging internals.

pub mod dx {
    //! Stable high-level surface: wire once, call domain operations.
    pub use crate::config::DbConfig;
    pub use crate::core::{DbError, Mode, Result};
    pub use crate::model::{Item, NewItem};
    pub use crate::selector::{build, build_async, build_sync};
    pub use crate::service::{AsyncItemService, ItemService, SyncItemService};
    pub use crate::Db;
}

pub mod advanced {
    //! Escape hatch for the transaction and bridging internals.
    //!
    //! App-level product code should normally stay on `prelude::dx`.
    pub use crate::bridge::{BlockingPool, PoolStats, WorkerLease};
    pub use crate::core::{Record, Value};
    pub use crate::driver::{MemoryAsyncFactory, MemorySyncFactory};
    pub use crate::execution::{AsyncExec, SyncExec};
    pub use crate::inject::{
        decorate_async, decorate_sync, BindingError, OperationSpec, ParamKind, SchedulingModel,
    };
    pub use crate::session::{
        AsyncSession, AsyncSessionFactory, QueryResult, SessionState, Statement, SyncSession,
        SyncSessionFactory,
    };
    pub use crate::transaction::{
        AsyncManager, AsyncTransactionManager, SyncManager, SyncTransactionManager,
    };
}
