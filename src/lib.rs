//! # service-alerts
//!
//! Concurrent in-memory registry of transit service alerts.
//!
//! The registry answers one question quickly:
//!
//! > Which alerts currently affect this line (and, optionally, this direction)?
//!
//! ## Architecture
//!
//! ```text
//! create / update / bulk_update / remove
//!         ↓
//!   AlertStore (id → alert) ──► AlertIndexes (line, line+direction)
//!         ↓
//!   snapshot file (full alert list, rewritten on every mutation)
//! ```
//!
//! ## Guarantees
//!
//! - Each index is always the exact inverse of the stored alerts
//! - Reindexing writes only the keys that changed
//! - A missing or corrupt snapshot starts the registry empty instead of failing
//! - Snapshot failures never fail a mutation; memory stays authoritative

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod store;
pub mod index;
pub mod registry;
pub mod snapshot;
pub mod canonical;
pub mod config;
pub mod error;

// Re-exports
pub use types::{AlertId, AffectedJourney, AffectsSpec, ServiceAlert, AlertList, AlertQuery};
pub use store::{AlertStore, InMemoryAlertStore};
pub use index::{
    AlertIndexes, IndexKind, IndexViolation, KeyDelta, KeyIndex, ReindexSummary,
    LINE_DIRECTION_SEPARATOR, line_direction_key,
};
pub use registry::{AlertRegistry, RegistryStats};
pub use snapshot::{load_alerts, save_alerts, SnapshotFile, SNAPSHOT_SCHEMA_VERSION};
pub use config::RegistryConfig;
pub use error::{RegistryError, SnapshotError};
