//! Reference in-memory storage driver.
//!
//! Stands in for a real database driver behind the session contracts:
//! committed state lives in a shared store, every session stages its writes
//! in a private workspace (read-your-own-writes after `flush`), and `commit`
//! publishes the workspace atomically. A unique-field index per collection
//! surfaces constraint violations at `flush`/`commit`, the way a SQL driver
//! would.

mod blocking;
mod non_blocking;
mod store;

pub use blocking::{MemorySyncFactory, MemorySyncSession};
pub use non_blocking::{MemoryAsyncFactory, MemoryAsyncSession};
