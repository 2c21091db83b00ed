//! Mode-driven wiring.
//!
//! Resolves a [`DbConfig`] into a fully wired facade: driver factory,
//! manager (native or bridged), execution strategy and repository. All
//! branching on the mode happens here, once; everything above and below runs
//! the same code in all four modes.

use std::sync::Arc;

use crate::bridge::{run_blocking, AsyncToSyncTransactionManager, BlockingPool,
    SyncToAsyncTransactionManager};
use crate::config::DbConfig;
use crate::core::{DbError, Mode, Result};
use crate::driver::{MemoryAsyncFactory, MemorySyncFactory};
use crate::execution::{AsyncExec, SyncExec};
use crate::model::COLLECTION;
use crate::repository::{ItemAsyncRepository, ItemSyncRepository};
use crate::service::{AsyncItemService, ItemService, SyncItemService};
use crate::transaction::{
    AsyncManager, AsyncTransactionManager, SyncManager, SyncTransactionManager,
};

/// Wire the facade flavor declared by the mode: blocking facade for
/// `NativeSync`/`AsyncBridgedSync`, non-blocking for the other two.
pub fn build(config: &DbConfig) -> Result<ItemService> {
    if config.mode.caller_is_async() {
        Ok(ItemService::Async(build_async(config)?))
    } else {
        Ok(ItemService::Sync(build_sync(config)?))
    }
}

/// Wire a blocking facade.
pub fn build_sync(config: &DbConfig) -> Result<SyncItemService> {
    config.validate()?;
    let manager = match config.mode {
        Mode::NativeSync => {
            let factory = MemorySyncFactory::new(config.driver.clone());
            factory.add_unique_index(COLLECTION, "name")?;
            SyncManager::Native(SyncTransactionManager::new(Arc::new(factory)))
        }
        Mode::AsyncBridgedSync => {
            let factory = MemoryAsyncFactory::new(config.driver.clone());
            run_blocking(factory.add_unique_index(COLLECTION, "name"));
            SyncManager::Bridged(AsyncToSyncTransactionManager::new(Arc::new(factory)))
        }
        other => {
            return Err(DbError::Config(format!(
                "mode '{other}' does not declare a blocking facade"
            )));
        }
    };
    log::info!("wired {} item service", config.mode);
    Ok(SyncItemService::new(
        manager,
        ItemSyncRepository::new(SyncExec::new(config.mode)),
    ))
}

/// Wire a non-blocking facade. `SyncBridgedAsync` builds its own worker pool
/// from the bridge section of the config.
pub fn build_async(config: &DbConfig) -> Result<AsyncItemService> {
    config.validate()?;
    let manager = match config.mode {
        Mode::NativeAsync => {
            let factory = MemoryAsyncFactory::new(config.driver.clone());
            run_blocking(factory.add_unique_index(COLLECTION, "name"));
            AsyncManager::Native(AsyncTransactionManager::new(Arc::new(factory)))
        }
        Mode::SyncBridgedAsync => {
            let factory = MemorySyncFactory::new(config.driver.clone());
            factory.add_unique_index(COLLECTION, "name")?;
            let pool = Arc::new(BlockingPool::new(&config.bridge)?);
            AsyncManager::Bridged(SyncToAsyncTransactionManager::new(Arc::new(factory), pool))
        }
        other => {
            return Err(DbError::Config(format!(
                "mode '{other}' does not declare a non-blocking facade"
            )));
        }
    };
    log::info!("wired {} item service", config.mode);
    Ok(AsyncItemService::new(
        manager,
        ItemAsyncRepository::new(AsyncExec::new(config.mode)),
    ))
}
