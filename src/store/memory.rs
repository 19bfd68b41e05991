//! In-memory alert store.

use std::collections::BTreeMap;

use crate::types::{AlertId, ServiceAlert};
use super::AlertStore;

/// In-memory alert store.
///
/// Uses a BTreeMap so `values` comes back ordered by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertStore {
    alerts: BTreeMap<AlertId, ServiceAlert>,
}

impl InMemoryAlertStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn put(&mut self, alert: ServiceAlert) -> Option<ServiceAlert> {
        self.alerts.insert(alert.id.clone(), alert)
    }

    fn get(&self, id: &AlertId) -> Option<&ServiceAlert> {
        self.alerts.get(id)
    }

    fn remove(&mut self, id: &AlertId) -> Option<ServiceAlert> {
        self.alerts.remove(id)
    }

    fn contains(&self, id: &AlertId) -> bool {
        self.alerts.contains_key(id)
    }

    fn values(&self) -> Vec<ServiceAlert> {
        self.alerts.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.alerts.len()
    }
}
