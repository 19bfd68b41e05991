//! Query and result types for listing alerts.

use serde::{Deserialize, Serialize};

use super::alert::ServiceAlert;

/// Filter for `AlertRegistry::list_all`.
///
/// An empty query matches every alert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertQuery {
    /// Only alerts whose id was issued for this agency (`<agency>_...`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
}

impl AlertQuery {
    /// Query matching every alert.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query restricted to one agency.
    pub fn for_agency(agency_id: impl Into<String>) -> Self {
        Self {
            agency_id: Some(agency_id.into()),
        }
    }

    /// Whether an alert passes this filter.
    pub fn matches(&self, alert: &ServiceAlert) -> bool {
        match &self.agency_id {
            Some(agency) => alert.id.belongs_to_agency(agency),
            None => true,
        }
    }
}

/// List of alerts returned by `list_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertList {
    /// Matching alerts, ordered by id.
    pub alerts: Vec<ServiceAlert>,
    /// Whether results were truncated. Listing is never truncated today.
    pub limit_exceeded: bool,
}

impl AlertList {
    /// Wrap a complete list.
    pub fn complete(alerts: Vec<ServiceAlert>) -> Self {
        Self {
            alerts,
            limit_exceeded: false,
        }
    }

    /// Number of alerts.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
