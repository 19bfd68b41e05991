//! Alert record types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::RegistryError;
use crate::index::LINE_DIRECTION_SEPARATOR;

/// Unique identifier for a service alert.
///
/// Registry-assigned ids have the form `<agencyId>_<unixMillis>`; ids
/// supplied by an upstream feed are kept verbatim. An empty id means the
/// record has not been assigned one yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a registry-style id for an agency and timestamp.
    pub fn for_agency(agency_id: &str, unix_ms: i64) -> Self {
        Self(format!("{}_{}", agency_id, unix_ms))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is unassigned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the id was issued for the given agency, i.e. it reads
    /// `<agency_id>_<digits>`.
    pub fn belongs_to_agency(&self, agency_id: &str) -> bool {
        self.0
            .strip_prefix(agency_id)
            .and_then(|rest| rest.strip_prefix('_'))
            .map_or(false, |millis| {
                !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit())
            })
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AlertId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AlertId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A vehicle journey affected by an alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffectedJourney {
    /// Line (route) identifier. Required.
    pub line_id: String,
    /// Direction of travel, when the alert is limited to one direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl AffectedJourney {
    /// A journey covering every direction on a line.
    pub fn line(line_id: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            direction: None,
        }
    }

    /// A journey limited to one direction on a line.
    pub fn line_direction(line_id: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            direction: Some(direction.into()),
        }
    }
}

/// What an alert affects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectsSpec {
    /// Affected vehicle journeys, in the order supplied.
    #[serde(default)]
    pub vehicle_journeys: Vec<AffectedJourney>,
}

/// A service alert (situation).
///
/// The registry owns the canonical copy; callers always receive clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAlert {
    /// Alert identifier. Ignored by `create`, which assigns its own.
    #[serde(default)]
    pub id: AlertId,
    /// Creation time in unix milliseconds. `None` or `Some(0)` means unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_unix_ms: Option<i64>,
    /// Short human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Affected journeys.
    #[serde(default)]
    pub affects: AffectsSpec,
}

impl ServiceAlert {
    /// Create an empty, unassigned alert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<AlertId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, unix_ms: i64) -> Self {
        self.created_at_unix_ms = Some(unix_ms);
        self
    }

    /// Set the summary text.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the description text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append an affected journey.
    pub fn with_journey(mut self, journey: AffectedJourney) -> Self {
        self.affects.vehicle_journeys.push(journey);
        self
    }

    /// Affected journeys.
    pub fn journeys(&self) -> &[AffectedJourney] {
        &self.affects.vehicle_journeys
    }

    /// Distinct line ids this alert affects.
    pub fn line_ids(&self) -> BTreeSet<&str> {
        self.journeys().iter().map(|j| j.line_id.as_str()).collect()
    }

    /// Whether a creation time has been set.
    pub fn has_creation_time(&self) -> bool {
        matches!(self.created_at_unix_ms, Some(t) if t != 0)
    }

    /// Check the affected journeys are well formed.
    ///
    /// Every journey needs a non-empty line id; a direction, when present,
    /// must be non-empty.
    pub fn validate_affects(&self) -> Result<(), RegistryError> {
        for (i, journey) in self.journeys().iter().enumerate() {
            if journey.line_id.is_empty() {
                return Err(RegistryError::InvalidArgument(format!(
                    "alert {:?}: journey {} has an empty line id",
                    self.id.as_str(),
                    i
                )));
            }
            if matches!(journey.direction.as_deref(), Some("")) {
                return Err(RegistryError::InvalidArgument(format!(
                    "alert {:?}: journey {} on line {} has an empty direction",
                    self.id.as_str(),
                    i,
                    journey.line_id
                )));
            }
            let separated = journey.line_id.contains(LINE_DIRECTION_SEPARATOR)
                || journey
                    .direction
                    .as_deref()
                    .map_or(false, |d| d.contains(LINE_DIRECTION_SEPARATOR));
            if separated {
                return Err(RegistryError::InvalidArgument(format!(
                    "alert {:?}: journey {} may not contain {:?} in its line id or direction",
                    self.id.as_str(),
                    i,
                    LINE_DIRECTION_SEPARATOR
                )));
            }
        }
        Ok(())
    }

    /// Check the record is acceptable for `update`: it needs an id and
    /// well-formed journeys.
    pub fn validate_for_update(&self) -> Result<(), RegistryError> {
        if self.id.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "alert id is required for update".to_string(),
            ));
        }
        self.validate_affects()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agency_id_format() {
        let id = AlertId::for_agency("agencyX", 1_700_000_000_123);
        assert_eq!(id.as_str(), "agencyX_1700000000123");
        assert!(id.belongs_to_agency("agencyX"));
        assert!(!id.belongs_to_agency("agency"));
        assert!(!id.belongs_to_agency("agencyY"));
    }

    #[test]
    fn test_agency_match_needs_digit_suffix() {
        let nested = AlertId::for_agency("a_b", 1000);
        assert!(nested.belongs_to_agency("a_b"));
        assert!(!nested.belongs_to_agency("a"));

        assert!(!AlertId::new("a_").belongs_to_agency("a"));
        assert!(!AlertId::new("a_12x").belongs_to_agency("a"));
    }

    #[test]
    fn test_separator_rejected_in_journeys() {
        let in_line = ServiceAlert::new()
            .with_id("x")
            .with_journey(AffectedJourney::line_direction("a_|_b", "c"));
        assert!(matches!(
            in_line.validate_affects(),
            Err(RegistryError::InvalidArgument(_))
        ));

        let in_direction = ServiceAlert::new()
            .with_id("x")
            .with_journey(AffectedJourney::line_direction("a", "b_|_c"));
        assert!(matches!(
            in_direction.validate_for_update(),
            Err(RegistryError::InvalidArgument(_))
        ));

        let plain = ServiceAlert::new()
            .with_id("x")
            .with_journey(AffectedJourney::line_direction("a_b", "c|d"));
        assert!(plain.validate_affects().is_ok());
    }

    #[test]
    fn test_line_ids_are_distinct() {
        let alert = ServiceAlert::new()
            .with_journey(AffectedJourney::line_direction("10", "0"))
            .with_journey(AffectedJourney::line_direction("10", "1"))
            .with_journey(AffectedJourney::line("20"));

        let lines: Vec<_> = alert.line_ids().into_iter().collect();
        assert_eq!(lines, vec!["10", "20"]);
    }

    #[test]
    fn test_creation_time_zero_is_unset() {
        assert!(!ServiceAlert::new().has_creation_time());
        assert!(!ServiceAlert::new().with_created_at(0).has_creation_time());
        assert!(ServiceAlert::new().with_created_at(5).has_creation_time());
    }

    #[test]
    fn test_validate_rejects_empty_line() {
        let alert = ServiceAlert::new()
            .with_id("a_1")
            .with_journey(AffectedJourney::line(""));
        assert!(matches!(
            alert.validate_for_update(),
            Err(RegistryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_direction() {
        let alert = ServiceAlert::new()
            .with_id("a_1")
            .with_journey(AffectedJourney::line_direction("10", ""));
        assert!(alert.validate_for_update().is_err());
    }

    #[test]
    fn test_validate_requires_id_for_update() {
        let alert = ServiceAlert::new().with_journey(AffectedJourney::line("10"));
        assert!(alert.validate_affects().is_ok());
        assert!(alert.validate_for_update().is_err());
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let alert: ServiceAlert = serde_json::from_str(
            r#"{"id":"a_1","affects":{"vehicle_journeys":[{"line_id":"5"}]}}"#,
        )
        .unwrap();
        assert_eq!(alert.id.as_str(), "a_1");
        assert_eq!(alert.created_at_unix_ms, None);
        assert_eq!(alert.journeys(), &[AffectedJourney::line("5")]);
    }
}
