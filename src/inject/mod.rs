//! Session injection.
//!
//! Supplies a live session to exactly one slot of an operation and binds the
//! remaining arguments untouched. The typed layer does slot resolution at
//! compile time and is what the service layer uses; the dynamic layer covers
//! operations assembled at runtime from a declared parameter manifest.

pub mod dynamic;
pub mod typed;

pub use dynamic::{
    decorate_async, decorate_sync, BindingError, DecoratedAsyncOperation, DecoratedSyncOperation,
    InjectionBinding, OperationSpec, ParamKind, SchedulingModel,
};
pub use typed::{AsyncTransactional, SyncTransactional};
