use std::path::Path;

use serde::Deserialize;

use crate::core::{DbError, Mode, Result};

/// Top-level wiring configuration: the mode plus bridge and driver
/// parameters. The driver section is passed through to the storage driver
/// unexamined by the core.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub mode: Mode,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

impl DbConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            bridge: BridgeConfig::default(),
            driver: DriverConfig::default(),
        }
    }

    /// Set the worker count of the bridging pool.
    pub fn workers(mut self, workers: usize) -> Self {
        self.bridge.workers = Some(workers);
        self
    }

    /// Set the per-worker job queue depth of the bridging pool.
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.bridge.queue_depth = depth;
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.driver.pool_size = size;
        self
    }

    /// Parse from a JSON document.
    ///
    /// ```
    /// use duotx::config::DbConfig;
    ///
    /// let config = DbConfig::from_json_str(r#"{"mode": "sync_bridged_async"}"#).unwrap();
    /// assert!(config.mode.is_bridged());
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| DbError::Config(e.to_string()))?;
        Self::from_json_str(&raw)
    }

    /// Build from `DUOTX_*` environment variables. `DUOTX_MODE` selects the
    /// mode (default `native_async`); the rest override individual fields.
    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("DUOTX_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => Mode::NativeAsync,
        };
        let mut config = Self::new(mode);
        if let Some(workers) = env_usize("DUOTX_WORKERS")? {
            config.bridge.workers = Some(workers);
        }
        if let Some(depth) = env_usize("DUOTX_QUEUE_DEPTH")? {
            config.bridge.queue_depth = depth;
        }
        if let Some(size) = env_usize("DUOTX_POOL_SIZE")? {
            config.driver.pool_size = size;
        }
        if let Some(overflow) = env_usize("DUOTX_MAX_OVERFLOW")? {
            config.driver.max_overflow = overflow;
        }
        if let Some(recycle) = env_usize("DUOTX_POOL_RECYCLE")? {
            config.driver.pool_recycle_secs = recycle as u64;
        }
        if let Some(timeout) = env_usize("DUOTX_POOL_TIMEOUT")? {
            config.driver.pool_timeout_secs = timeout as u64;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bridge.queue_depth == 0 {
            return Err(DbError::Config("queue_depth must be > 0".into()));
        }
        if self.bridge.workers == Some(0) {
            return Err(DbError::Config("workers must be > 0".into()));
        }
        if self.driver.pool_size == 0 {
            return Err(DbError::Config("pool_size must be > 0".into()));
        }
        Ok(())
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DbError::Config(format!("{name} must be an integer, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Worker pool parameters for the sync-to-async bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Worker thread count. `None` means
    /// `min(32, available_parallelism + 4)`.
    pub workers: Option<usize>,
    /// Bounded per-worker job queue depth; submissions queue when full.
    pub queue_depth: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            workers: None,
            queue_depth: 32,
        }
    }
}

/// Connection parameters handed to the underlying storage driver. Opaque to
/// the transaction core.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    pub pool_size: usize,
    pub max_overflow: usize,
    pub pool_recycle_secs: u64,
    pub pool_timeout_secs: u64,
    pub echo: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            pool_size: 20,
            max_overflow: 10,
            pool_recycle_secs: 10,
            pool_timeout_secs: 5,
            echo: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DbConfig::new(Mode::NativeSync);
        assert_eq!(config.bridge.queue_depth, 32);
        assert_eq!(config.driver.pool_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = DbConfig::new(Mode::SyncBridgedAsync)
            .workers(4)
            .queue_depth(8)
            .pool_size(50);
        assert_eq!(config.bridge.workers, Some(4));
        assert_eq!(config.bridge.queue_depth, 8);
        assert_eq!(config.driver.pool_size, 50);
    }

    #[test]
    fn test_from_json() {
        let config = DbConfig::from_json_str(
            r#"{"mode": "async_bridged_sync", "bridge": {"workers": 2, "queue_depth": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.mode, Mode::AsyncBridgedSync);
        assert_eq!(config.bridge.workers, Some(2));
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mode": "native_sync"}}"#).unwrap();
        let config = DbConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, Mode::NativeSync);
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        assert!(DbConfig::new(Mode::NativeSync).queue_depth(0).validate().is_err());
        assert!(DbConfig::new(Mode::NativeSync).workers(0).validate().is_err());
        assert!(DbConfig::new(Mode::NativeSync).pool_size(0).validate().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe {
            std::env::set_var("DUOTX_MODE", "sync_bridged_async");
            std::env::set_var("DUOTX_WORKERS", "3");
        }
        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.mode, Mode::SyncBridgedAsync);
        assert_eq!(config.bridge.workers, Some(3));
        unsafe {
            std::env::remove_var("DUOTX_MODE");
            std::env::remove_var("DUOTX_WORKERS");
        }
    }
}
