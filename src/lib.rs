// ============================================================================
// duotx Library
// ============================================================================

pub mod bridge;
pub mod config;
pub mod core;
pub mod driver;
pub mod execution;
pub mod inject;
pub mod model;
pub mod prelude;
pub mod repository;
pub mod selector;
pub mod service;
pub mod session;
pub mod transaction;

// Re-export main types for convenience
pub use crate::config::DbConfig;
pub use crate::core::{DbError, Mode, Record, Result, Value};
pub use crate::service::{AsyncItemService, ItemService, SyncItemService};
pub use crate::session::{AsyncSession, QueryResult, SessionState, Statement, SyncSession};
pub use crate::transaction::{AsyncManager, SyncManager};

// ============================================================================
// High-level entry point
// ============================================================================

/// Wire a service facade for one mode.
///
/// This is the recommended way to use duotx in applications: pick the mode,
/// wire once, and call plain domain operations. The same calls behave
/// identically in all four modes.
///
/// # Examples
///
/// ```
/// use duotx::{Db, Mode};
/// use duotx::config::DbConfig;
/// use duotx::model::NewItem;
///
/// # fn main() -> duotx::Result<()> {
/// let db = Db::open(DbConfig::new(Mode::NativeSync))?;
/// let service = db.service().as_sync().unwrap();
///
/// let item = service.create(NewItem::new("widget").quantity(3))?;
/// assert_eq!(service.get(item.id)?, Some(item));
/// # Ok(())
/// # }
/// ```
pub struct Db {
    config: DbConfig,
    service: ItemService,
}

impl Db {
    /// Validate the configuration and wire the facade it declares.
    pub fn open(config: DbConfig) -> Result<Self> {
        let service = selector::build(&config)?;
        Ok(Self { config, service })
    }

    /// Wire from `DUOTX_*` environment variables.
    pub fn open_from_env() -> Result<Self> {
        Self::open(DbConfig::from_env()?)
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn service(&self) -> &ItemService {
        &self.service
    }
}
