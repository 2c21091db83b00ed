//! Cross-context bridging.
//!
//! The only place where the two scheduling models meet. `sync_to_async`
//! drives a blocking session from a non-blocking caller by pinning every
//! storage-touching verb of one scope to a single worker thread of a bounded
//! pool. `async_to_sync` drives a non-blocking session from a blocking caller
//! by running each suspension to completion on the calling thread itself.

pub mod async_to_sync;
pub mod pool;
pub mod sync_to_async;

pub use async_to_sync::{run_blocking, AsyncToSyncTransactionManager, BridgedSyncSession};
pub use pool::{BlockingPool, PoolStats, WorkerLease};
pub use sync_to_async::{BridgedAsyncSession, SyncToAsyncTransactionManager};
