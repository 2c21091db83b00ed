use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::DbError;

/// Backend/caller scheduling combination, fixed at wiring time.
///
/// The first word names the caller's scheduling model, the second the
/// backend's. `NativeSync` and `NativeAsync` run without any bridging;
/// the other two route every storage-touching verb through a
/// [`CrossContextBridge`](crate::bridge) adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Blocking callers over a blocking backend.
    NativeSync,
    /// Non-blocking callers over a non-blocking backend.
    NativeAsync,
    /// Non-blocking callers driving a blocking backend through the worker pool.
    SyncBridgedAsync,
    /// Blocking callers driving a non-blocking backend on the calling thread.
    AsyncBridgedSync,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::NativeSync,
        Mode::NativeAsync,
        Mode::SyncBridgedAsync,
        Mode::AsyncBridgedSync,
    ];

    /// Whether callers above the selector see a non-blocking facade.
    pub fn caller_is_async(self) -> bool {
        matches!(self, Mode::NativeAsync | Mode::SyncBridgedAsync)
    }

    /// Whether the underlying session implementation is non-blocking.
    pub fn backend_is_async(self) -> bool {
        matches!(self, Mode::NativeAsync | Mode::AsyncBridgedSync)
    }

    /// Whether the mode crosses scheduling models.
    pub fn is_bridged(self) -> bool {
        self.caller_is_async() != self.backend_is_async()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::NativeSync => "native_sync",
            Mode::NativeAsync => "native_async",
            Mode::SyncBridgedAsync => "sync_bridged_async",
            Mode::AsyncBridgedSync => "async_bridged_sync",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native_sync" => Ok(Mode::NativeSync),
            "native_async" => Ok(Mode::NativeAsync),
            "sync_bridged_async" => Ok(Mode::SyncBridgedAsync),
            "async_bridged_sync" => Ok(Mode::AsyncBridgedSync),
            other => Err(DbError::Config(format!("unknown mode '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!("uniform_async_db".parse::<Mode>().is_err());
    }

    #[test]
    fn test_bridged_classification() {
        assert!(!Mode::NativeSync.is_bridged());
        assert!(!Mode::NativeAsync.is_bridged());
        assert!(Mode::SyncBridgedAsync.is_bridged());
        assert!(Mode::AsyncBridgedSync.is_bridged());
        assert!(Mode::SyncBridgedAsync.caller_is_async());
        assert!(!Mode::SyncBridgedAsync.backend_is_async());
    }
}
