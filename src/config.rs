//! Registry configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable holding the snapshot path.
pub const SNAPSHOT_PATH_ENV: &str = "SERVICE_ALERTS_SNAPSHOT_PATH";

/// Configuration for an `AlertRegistry`.
///
/// Without a snapshot path the registry runs purely in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// File the full alert list is persisted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl RegistryConfig {
    /// In-memory configuration with no persistence.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Configuration persisting to `path`.
    pub fn with_snapshot_path(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `SERVICE_ALERTS_SNAPSHOT_PATH`. Unset or empty means in-memory.
    pub fn from_env() -> Self {
        match std::env::var(SNAPSHOT_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::with_snapshot_path(path.trim()),
            _ => {
                tracing::warn!(
                    "{} not set, alerts will not survive a restart",
                    SNAPSHOT_PATH_ENV
                );
                Self::in_memory()
            }
        }
    }

    /// The configured snapshot path, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Whether alerts are persisted.
    pub fn is_persistent(&self) -> bool {
        self.snapshot_path.is_some()
    }
}
