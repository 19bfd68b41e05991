//! Secondary indexes over the alert store.
//!
//! Two indexes are maintained:
//!
//! - **line**: `line_id` → ids of alerts affecting that line
//! - **line+direction**: `line_id + "_|_" + direction` → ids of alerts
//!   affecting that line in that direction (journeys without a direction
//!   do not contribute)
//!
//! ## Reindexing
//!
//! Every mutation is expressed as `(old, new)` for one alert id. The key
//! sets derived from both sides are diffed and only the difference is
//! written: keys in `old − new` lose the id, keys in `new − old` gain it,
//! shared keys are untouched. A key whose id set becomes empty is removed.
//!
//! Provided each index is the exact inverse of the store before the call,
//! it is again afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AlertId, ServiceAlert};

/// Separator between line id and direction in composite keys.
pub const LINE_DIRECTION_SEPARATOR: &str = "_|_";

/// Build the composite line+direction key.
///
/// Validation keeps the separator out of both parts, so the key is unique
/// per pair.
pub fn line_direction_key(line_id: &str, direction: &str) -> String {
    format!("{}{}{}", line_id, LINE_DIRECTION_SEPARATOR, direction)
}

/// Distinct line keys for an alert (empty for `None`).
pub fn line_keys(alert: Option<&ServiceAlert>) -> BTreeSet<String> {
    alert
        .map(|a| a.journeys().iter().map(|j| j.line_id.clone()).collect())
        .unwrap_or_default()
}

/// Distinct line+direction keys for an alert (empty for `None`).
pub fn line_direction_keys(alert: Option<&ServiceAlert>) -> BTreeSet<String> {
    alert
        .map(|a| {
            a.journeys()
                .iter()
                .filter_map(|j| {
                    j.direction
                        .as_deref()
                        .map(|d| line_direction_key(&j.line_id, d))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Which secondary index a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Keyed by line id.
    Line,
    /// Keyed by composite line+direction.
    LineDirection,
}

impl IndexKind {
    /// Derive this index's keys for an alert.
    pub fn keys_for(&self, alert: Option<&ServiceAlert>) -> BTreeSet<String> {
        match self {
            Self::Line => line_keys(alert),
            Self::LineDirection => line_direction_keys(alert),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::LineDirection => write!(f, "line_direction"),
        }
    }
}

/// Keys to retract and insert for one alert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDelta {
    /// Keys the alert no longer maps to.
    pub removed: Vec<String>,
    /// Keys the alert newly maps to.
    pub added: Vec<String>,
}

impl KeyDelta {
    /// Diff two key sets.
    pub fn between(old: &BTreeSet<String>, new: &BTreeSet<String>) -> Self {
        Self {
            removed: old.difference(new).cloned().collect(),
            added: new.difference(old).cloned().collect(),
        }
    }

    /// Whether applying this delta would change nothing.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// A derived key → alert id set index.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    entries: BTreeMap<String, BTreeSet<AlertId>>,
}

impl KeyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a delta for one alert id.
    pub fn apply(&mut self, id: &AlertId, delta: &KeyDelta) {
        for key in &delta.removed {
            if let Some(ids) = self.entries.get_mut(key) {
                ids.remove(id);
                if ids.is_empty() {
                    self.entries.remove(key);
                }
            }
        }
        for key in &delta.added {
            self.entries
                .entry(key.clone())
                .or_default()
                .insert(id.clone());
        }
    }

    /// Ids indexed under a key.
    pub fn get(&self, key: &str) -> Option<&BTreeSet<AlertId>> {
        self.entries.get(key)
    }

    /// Whether `id` is indexed under `key`.
    pub fn contains(&self, key: &str, id: &AlertId) -> bool {
        self.entries.get(key).map_or(false, |ids| ids.contains(id))
    }

    /// Indexed keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, ids)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<AlertId>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Number of key changes made by one reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexSummary {
    /// Line keys gained.
    pub lines_added: usize,
    /// Line keys lost.
    pub lines_removed: usize,
    /// Line+direction keys gained.
    pub line_directions_added: usize,
    /// Line+direction keys lost.
    pub line_directions_removed: usize,
}

impl ReindexSummary {
    /// Whether no index changed.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// A disagreement between an index and the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexViolation {
    /// The store says the alert affects a key the index does not list.
    #[error("{index} index is missing alert {id} under key {key:?}")]
    Missing {
        /// Index containing the problem.
        index: IndexKind,
        /// Expected key.
        key: String,
        /// Missing alert.
        id: AlertId,
    },
    /// The index lists an alert that is gone or no longer affects the key.
    #[error("{index} index has stale alert {id} under key {key:?}")]
    Stale {
        /// Index containing the problem.
        index: IndexKind,
        /// Offending key.
        key: String,
        /// Stale alert.
        id: AlertId,
    },
    /// A key was left behind with no ids.
    #[error("{index} index has empty key {key:?}")]
    EmptyKey {
        /// Index containing the problem.
        index: IndexKind,
        /// Empty key.
        key: String,
    },
}

/// The line and line+direction indexes, updated together.
#[derive(Debug, Clone, Default)]
pub struct AlertIndexes {
    lines: KeyIndex,
    line_directions: KeyIndex,
}

impl AlertIndexes {
    /// Create empty indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// The line index.
    pub fn lines(&self) -> &KeyIndex {
        &self.lines
    }

    /// The line+direction index.
    pub fn line_directions(&self) -> &KeyIndex {
        &self.line_directions
    }

    /// The index of the given kind.
    pub fn index(&self, kind: IndexKind) -> &KeyIndex {
        match kind {
            IndexKind::Line => &self.lines,
            IndexKind::LineDirection => &self.line_directions,
        }
    }

    /// Move the indexes for `id` from `old` to `new`.
    ///
    /// Pass `old = None` for a fresh alert and `new = None` for a removal.
    pub fn reindex(
        &mut self,
        id: &AlertId,
        old: Option<&ServiceAlert>,
        new: Option<&ServiceAlert>,
    ) -> ReindexSummary {
        let line_delta = KeyDelta::between(
            &IndexKind::Line.keys_for(old),
            &IndexKind::Line.keys_for(new),
        );
        let direction_delta = KeyDelta::between(
            &IndexKind::LineDirection.keys_for(old),
            &IndexKind::LineDirection.keys_for(new),
        );

        self.lines.apply(id, &line_delta);
        self.line_directions.apply(id, &direction_delta);

        let summary = ReindexSummary {
            lines_added: line_delta.added.len(),
            lines_removed: line_delta.removed.len(),
            line_directions_added: direction_delta.added.len(),
            line_directions_removed: direction_delta.removed.len(),
        };

        debug!(
            alert_id = %id,
            lines_added = summary.lines_added,
            lines_removed = summary.lines_removed,
            line_directions_added = summary.line_directions_added,
            line_directions_removed = summary.line_directions_removed,
            "reindexed alert"
        );

        summary
    }

    /// Check both indexes are the exact inverse of `alerts`.
    pub fn verify<'a>(
        &self,
        alerts: impl IntoIterator<Item = &'a ServiceAlert>,
    ) -> Result<(), IndexViolation> {
        let mut expected_lines: BTreeMap<String, BTreeSet<AlertId>> = BTreeMap::new();
        let mut expected_directions: BTreeMap<String, BTreeSet<AlertId>> = BTreeMap::new();

        for alert in alerts {
            for key in line_keys(Some(alert)) {
                expected_lines.entry(key).or_default().insert(alert.id.clone());
            }
            for key in line_direction_keys(Some(alert)) {
                expected_directions.entry(key).or_default().insert(alert.id.clone());
            }
        }

        verify_index(IndexKind::Line, &self.lines, &expected_lines)?;
        verify_index(IndexKind::LineDirection, &self.line_directions, &expected_directions)
    }
}

fn verify_index(
    kind: IndexKind,
    index: &KeyIndex,
    expected: &BTreeMap<String, BTreeSet<AlertId>>,
) -> Result<(), IndexViolation> {
    for (key, ids) in expected {
        for id in ids {
            if !index.contains(key, id) {
                return Err(IndexViolation::Missing {
                    index: kind,
                    key: key.clone(),
                    id: id.clone(),
                });
            }
        }
    }

    for (key, ids) in index.iter() {
        if ids.is_empty() {
            return Err(IndexViolation::EmptyKey {
                index: kind,
                key: key.to_string(),
            });
        }
        let wanted = expected.get(key);
        for id in ids {
            if !wanted.map_or(false, |w| w.contains(id)) {
                return Err(IndexViolation::Stale {
                    index: kind,
                    key: key.to_string(),
                    id: id.clone(),
                });
            }
        }
    }

    Ok(())
}
