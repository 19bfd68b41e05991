//! Primary alert storage.

pub mod memory;

use crate::types::{AlertId, ServiceAlert};

/// Trait for the primary id → alert mapping.
///
/// The registry serializes access behind its own lock, so implementations
/// only need to be `Send + Sync`; they do not synchronize internally.
/// `values` must iterate in a deterministic order.
pub trait AlertStore: Send + Sync {
    /// Insert or replace an alert under its id, returning the previous record.
    fn put(&mut self, alert: ServiceAlert) -> Option<ServiceAlert>;

    /// Fetch an alert by id.
    fn get(&self, id: &AlertId) -> Option<&ServiceAlert>;

    /// Remove an alert, returning the previous record.
    fn remove(&mut self, id: &AlertId) -> Option<ServiceAlert>;

    /// Whether an alert with this id is stored.
    fn contains(&self, id: &AlertId) -> bool {
        self.get(id).is_some()
    }

    /// Point-in-time copy of every stored alert.
    fn values(&self) -> Vec<ServiceAlert>;

    /// Number of stored alerts.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub use memory::InMemoryAlertStore;
