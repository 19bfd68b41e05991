//! The alert registry: primary store, both indexes, and snapshot persistence.
//!
//! ## Concurrency
//!
//! The store and both indexes live behind one `RwLock`. A mutation takes
//! the write lock, swaps the record and applies its index delta, then
//! releases the lock before any snapshot I/O. Readers therefore never see
//! a half-applied reindex.
//!
//! Snapshot writes are serialized by a separate writer mutex. The alert
//! list is copied while holding that mutex, so a later mutation's snapshot
//! can never be overwritten by an earlier one.
//!
//! ## Persistence
//!
//! Every mutation rewrites the full snapshot. Failures are logged and the
//! in-memory state stays authoritative.

use std::path::Path;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::index::{line_direction_key, AlertIndexes, IndexKind, IndexViolation};
use crate::snapshot;
use crate::store::{AlertStore, InMemoryAlertStore};
use crate::types::{AlertId, AlertList, AlertQuery, ServiceAlert};

/// Counts describing the registry's current contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Stored alerts.
    pub alert_count: usize,
    /// Keys in the line index.
    pub line_keys: usize,
    /// Keys in the line+direction index.
    pub line_direction_keys: usize,
}

struct RegistryState<S> {
    store: S,
    indexes: AlertIndexes,
    /// Highest timestamp used in an issued id.
    last_issued_ms: i64,
}

impl<S: AlertStore> RegistryState<S> {
    /// Store `alert` and reindex it against whatever it replaced.
    fn upsert(&mut self, alert: ServiceAlert) -> Option<ServiceAlert> {
        let id = alert.id.clone();
        let previous = self.store.put(alert);
        self.indexes
            .reindex(&id, previous.as_ref(), self.store.get(&id));
        previous
    }

    fn delete(&mut self, id: &AlertId) -> Option<ServiceAlert> {
        let previous = self.store.remove(id)?;
        self.indexes.reindex(id, Some(&previous), None);
        Some(previous)
    }

    /// Issue an id unique among stored alerts and earlier issues.
    fn issue_id(&mut self, agency_id: &str, now_ms: i64) -> AlertId {
        let mut candidate = now_ms.max(self.last_issued_ms + 1);
        let mut id = AlertId::for_agency(agency_id, candidate);
        while self.store.contains(&id) {
            candidate += 1;
            id = AlertId::for_agency(agency_id, candidate);
        }
        self.last_issued_ms = candidate;
        id
    }

    fn lookup(&self, kind: IndexKind, key: &str) -> Vec<ServiceAlert> {
        self.indexes
            .index(kind)
            .get(key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.store.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Concurrent registry of service alerts indexed by line and line+direction.
///
/// Construct with [`AlertRegistry::open`] to load the configured snapshot,
/// and call [`AlertRegistry::close`] on shutdown.
pub struct AlertRegistry<S: AlertStore = InMemoryAlertStore> {
    state: RwLock<RegistryState<S>>,
    config: RegistryConfig,
    snapshot_writer: Mutex<()>,
}

impl AlertRegistry<InMemoryAlertStore> {
    /// Create an empty registry. Nothing is loaded until [`load`](Self::load).
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_store(InMemoryAlertStore::new(), config)
    }

    /// Create an empty registry with no persistence.
    pub fn in_memory() -> Self {
        Self::new(RegistryConfig::in_memory())
    }

    /// Create a registry and load its snapshot, if any.
    pub fn open(config: RegistryConfig) -> Self {
        let registry = Self::new(config);
        registry.load();
        registry
    }
}

impl<S: AlertStore> AlertRegistry<S> {
    /// Create a registry over an existing store.
    ///
    /// Alerts already in `store` are indexed immediately.
    pub fn with_store(mut store: S, config: RegistryConfig) -> Self {
        // An alert under an empty id could never be addressed.
        store.remove(&AlertId::default());

        let mut indexes = AlertIndexes::new();
        for alert in store.values() {
            indexes.reindex(&alert.id, None, Some(&alert));
        }

        Self {
            state: RwLock::new(RegistryState {
                store,
                indexes,
                last_issued_ms: 0,
            }),
            config,
            snapshot_writer: Mutex::new(()),
        }
    }

    /// The configured snapshot path, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.config.snapshot_path()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Load alerts from the snapshot path, returning how many were loaded.
    ///
    /// A missing path or file loads nothing. A read or decode failure is
    /// logged and leaves the registry as it was.
    pub fn load(&self) -> usize {
        let Some(path) = self.snapshot_path() else {
            return 0;
        };

        let alerts = match snapshot::load_alerts(path) {
            Ok(Some(alerts)) => alerts,
            Ok(None) => {
                info!(path = %path.display(), "no service alert snapshot found, starting empty");
                return 0;
            }
            Err(e) => {
                error!(
                    target: "service_alerts::snapshot",
                    path = %path.display(),
                    error = %e,
                    "error loading service alerts"
                );
                return 0;
            }
        };

        let mut state = self.state.write();
        let mut loaded = 0;
        for alert in alerts {
            if let Err(e) = alert.validate_for_update() {
                warn!(
                    target: "service_alerts::snapshot",
                    alert_id = %alert.id,
                    error = %e,
                    "skipping invalid alert in snapshot"
                );
                continue;
            }
            state.upsert(alert);
            loaded += 1;
        }
        drop(state);

        info!(path = %path.display(), count = loaded, "loaded service alerts");
        loaded
    }

    /// Persist the current alerts and release the registry.
    pub fn close(self) {
        self.persist();
        info!(count = self.len(), "service alert registry closed");
    }

    /// Write the snapshot now, reporting the outcome.
    ///
    /// A registry without a snapshot path succeeds without writing.
    pub fn save_now(&self) -> Result<(), RegistryError> {
        let Some(path) = self.snapshot_path() else {
            return Ok(());
        };

        let _writer = self.snapshot_writer.lock();
        let alerts = self.state.read().store.values();
        snapshot::save_alerts(path, &alerts)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save_now() {
            error!(
                target: "service_alerts::snapshot",
                path = ?self.snapshot_path(),
                error = %e,
                "error saving service alerts"
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Store a new alert under a freshly issued `<agency_id>_<millis>` id.
    ///
    /// Any id on `alert` is ignored. An unset creation time defaults to now.
    pub fn create(
        &self,
        agency_id: &str,
        mut alert: ServiceAlert,
    ) -> Result<ServiceAlert, RegistryError> {
        if agency_id.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "agency id is required to create an alert".to_string(),
            ));
        }
        alert.validate_affects()?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        if !alert.has_creation_time() {
            alert.created_at_unix_ms = Some(now_ms);
        }

        {
            let mut state = self.state.write();
            alert.id = state.issue_id(agency_id, now_ms);
            state.upsert(alert.clone());
        }

        info!(alert_id = %alert.id, agency_id = agency_id, "created service alert");
        self.persist();
        Ok(alert)
    }

    /// Insert or replace an alert under its own id.
    ///
    /// Returns the record it replaced, if any.
    pub fn update(&self, alert: ServiceAlert) -> Result<Option<ServiceAlert>, RegistryError> {
        alert.validate_for_update()?;

        let previous = self.state.write().upsert(alert);
        self.persist();
        Ok(previous)
    }

    /// Apply `update` to each alert in order, then persist once.
    ///
    /// The whole batch is validated first; one bad record rejects it with
    /// nothing applied. An empty batch does nothing. Returns the number of
    /// alerts applied.
    pub fn bulk_update(&self, alerts: Vec<ServiceAlert>) -> Result<usize, RegistryError> {
        if alerts.is_empty() {
            return Ok(0);
        }
        for alert in &alerts {
            alert.validate_for_update()?;
        }

        let count = alerts.len();
        for alert in alerts {
            self.state.write().upsert(alert);
        }

        info!(count = count, "applied service alert batch");
        self.persist();
        Ok(count)
    }

    /// Remove an alert, returning it if it existed.
    ///
    /// Removing an unknown id changes nothing and writes no snapshot.
    pub fn remove(&self, id: &AlertId) -> Option<ServiceAlert> {
        let previous = self.state.write().delete(id)?;
        info!(alert_id = %id, "removed service alert");
        self.persist();
        Some(previous)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch an alert by id.
    pub fn get(&self, id: &AlertId) -> Option<ServiceAlert> {
        self.state.read().store.get(id).cloned()
    }

    /// List alerts matching `query`, ordered by id.
    pub fn list_all(&self, query: &AlertQuery) -> AlertList {
        let state = self.state.read();
        let alerts = state
            .store
            .values()
            .into_iter()
            .filter(|a| query.matches(a))
            .collect();
        AlertList::complete(alerts)
    }

    /// Alerts affecting a line in any direction.
    pub fn find_by_line(&self, line_id: &str) -> Vec<ServiceAlert> {
        self.state.read().lookup(IndexKind::Line, line_id)
    }

    /// Alerts affecting a line in a specific direction.
    ///
    /// Only journeys that name this direction match; alerts covering the
    /// line without a direction are not included.
    pub fn find_by_line_and_direction(&self, line_id: &str, direction: &str) -> Vec<ServiceAlert> {
        let key = line_direction_key(line_id, direction);
        self.state.read().lookup(IndexKind::LineDirection, &key)
    }

    /// Line ids that currently have at least one alert.
    pub fn lines(&self) -> Vec<String> {
        self.state
            .read()
            .indexes
            .lines()
            .keys()
            .map(str::to_string)
            .collect()
    }

    /// Number of stored alerts.
    pub fn len(&self) -> usize {
        self.state.read().store.len()
    }

    /// Whether no alerts are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counts.
    pub fn stats(&self) -> RegistryStats {
        let state = self.state.read();
        RegistryStats {
            alert_count: state.store.len(),
            line_keys: state.indexes.lines().len(),
            line_direction_keys: state.indexes.line_directions().len(),
        }
    }

    /// Check both indexes exactly mirror the stored alerts.
    pub fn check_indexes(&self) -> Result<(), IndexViolation> {
        let state = self.state.read();
        let alerts = state.store.values();
        state.indexes.verify(&alerts)
    }
}
