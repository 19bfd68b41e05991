//! On-disk snapshot of the full alert list.
//!
//! A snapshot is a JSON envelope carrying every alert plus an xxh64
//! checksum of the canonical alert bytes:
//!
//! ```text
//! { "schema_version": "1.0.0", "written_at_unix_ms": ..., "alert_count": N,
//!   "checksum": "<16 hex>", "alerts": [ ... ] }
//! ```
//!
//! A bare JSON array of alerts is also accepted on load.
//!
//! Writes go to `<path>.tmp` first and are renamed over `<path>`, so a
//! reader never sees a partially written file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, checksum_hex, to_canonical_bytes};
use crate::error::SnapshotError;
use crate::types::ServiceAlert;

/// Version written into every snapshot. Loads accept the same major version.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

/// Snapshot envelope as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Schema version of the writer.
    pub schema_version: String,
    /// When the snapshot was written.
    pub written_at_unix_ms: i64,
    /// Number of alerts in `alerts`.
    pub alert_count: u64,
    /// xxh64 hex of the canonical encoding of `alerts`.
    pub checksum: String,
    /// Alerts ordered by id.
    pub alerts: Vec<ServiceAlert>,
}

impl SnapshotFile {
    /// Build an envelope for alerts, sorting them by id.
    pub fn new(alerts: &[ServiceAlert]) -> Result<Self, SnapshotError> {
        let mut alerts = alerts.to_vec();
        alerts.sort_by(|a, b| a.id.cmp(&b.id));

        let bytes = to_canonical_bytes(&alerts).map_err(SnapshotError::Encode)?;

        Ok(Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            written_at_unix_ms: chrono::Utc::now().timestamp_millis(),
            alert_count: alerts.len() as u64,
            checksum: checksum_hex(&bytes),
            alerts,
        })
    }

    /// Check the schema version and checksum.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        if major_version(&self.schema_version) != major_version(SNAPSHOT_SCHEMA_VERSION) {
            return Err(SnapshotError::UnsupportedSchema(self.schema_version.clone()));
        }

        let actual = canonical_hash_hex(&self.alerts).map_err(SnapshotError::Encode)?;
        if actual != self.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }

        Ok(())
    }
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Read alerts from a snapshot file.
///
/// Returns `Ok(None)` if the file does not exist or is empty.
pub fn load_alerts(path: &Path) -> Result<Option<Vec<ServiceAlert>>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    decode_alerts(&bytes).map(Some)
}

/// Decode snapshot bytes in either the envelope or plain-list format.
pub fn decode_alerts(bytes: &[u8]) -> Result<Vec<ServiceAlert>, SnapshotError> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(SnapshotError::Decode)?;

    if value.is_array() {
        return serde_json::from_value(value).map_err(SnapshotError::Decode);
    }

    let file: SnapshotFile = serde_json::from_value(value).map_err(SnapshotError::Decode)?;
    file.verify()?;
    Ok(file.alerts)
}

/// Write alerts to a snapshot file, replacing it atomically.
///
/// Parent directories are created as needed.
pub fn save_alerts(path: &Path, alerts: &[ServiceAlert]) -> Result<(), SnapshotError> {
    let file = SnapshotFile::new(alerts)?;
    let bytes = serde_json::to_vec_pretty(&file).map_err(SnapshotError::Encode)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);
    if let Err(e) = write_then_rename(&tmp_path, path, &bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

fn write_then_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    {
        let mut out = File::create(tmp_path)?;
        out.write_all(bytes)?;
        out.sync_all()?;
    }

    #[cfg(windows)]
    {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }
    fs::rename(tmp_path, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
