//! Watermark store — the timestamp boundary of the last completed cycle.
//!
//! Persists a JSON document at `<home>/.tandem/watermark.json`:
//!
//! ```json
//! { "last_cycle_at": "2024-03-01T10:00:00" }
//! ```
//!
//! Writes use the same atomic `.tmp` + rename pattern as the config file.
//! A bare string payload (just the timestamp, as written by early versions)
//! still loads; offset-bearing values have the offset stripped, not
//! converted. Missing file → [`default_epoch`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use tandem_core::config::tandem_root;

use crate::error::{io_err, SyncError};
use crate::timestamp::strip_offset;

/// The watermark assumed when none has ever been saved: far enough in the
/// past that every ordered record exceeds it on the first cycle.
pub fn default_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

#[derive(Debug, Clone, Serialize)]
struct WatermarkFile {
    last_cycle_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WatermarkCompat {
    Structured { last_cycle_at: String },
    Legacy(String),
}

/// Path to the watermark JSON, rooted at `home`.
///
/// `~/.tandem/watermark.json`
pub fn store_path_at(home: &Path) -> PathBuf {
    tandem_root(home).join("watermark.json")
}

/// Load the watermark, or [`default_epoch`] when no file exists yet.
pub fn load_at(home: &Path) -> Result<NaiveDateTime, SyncError> {
    let path = store_path_at(home);
    if !path.exists() {
        return Ok(default_epoch());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let raw = match serde_json::from_str::<WatermarkCompat>(&contents)? {
        WatermarkCompat::Structured { last_cycle_at } => last_cycle_at,
        WatermarkCompat::Legacy(raw) => raw,
    };
    parse_stored(&raw).ok_or(SyncError::Watermark { path, raw })
}

/// Save the watermark atomically, truncated to second precision.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, watermark: NaiveDateTime) -> Result<(), SyncError> {
    let path = store_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid watermark path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let payload = WatermarkFile {
        last_cycle_at: truncate_to_seconds(watermark)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
    };
    let json = serde_json::to_string_pretty(&payload)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Drop sub-second precision; the wire format carries whole seconds only.
pub fn truncate_to_seconds(instant: NaiveDateTime) -> NaiveDateTime {
    instant.with_nanosecond(0).unwrap_or(instant)
}

fn parse_stored(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive);
    }
    // Offset-bearing value from an older deployment: keep the wall clock,
    // drop the offset.
    DateTime::parse_from_rfc3339(raw).ok().map(strip_offset)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
