//! JSON documents written into a bundle.
//!
//! Field names and order follow what the target app reads, and the writer
//! always emits them the same way so that repeated exports are byte-stable.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};

use super::ArchiveError;
use crate::domain::{Diary, Mood};

/// App version the bundle claims to come from
pub const MANIFEST_VERSION: &str = "0.91.6";

/// Suffix of the per-day record files
pub const RECORD_SUFFIX: &str = ".json";

/// Platform the bundle claims to come from
pub const MANIFEST_PLATFORM: &str = "Android";

/// The manifest timestamp is always rendered at UTC+08:00
const MANIFEST_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// `version.json` at the bundle root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionManifest {
    pub version: String,
    pub file_suffix: String,
    pub platform: String,
    pub date_time: String,
}

impl VersionManifest {
    /// Manifest for an archive created at `time`
    pub fn new(time: f64) -> Result<Self, ArchiveError> {
        Ok(Self {
            version: MANIFEST_VERSION.to_string(),
            file_suffix: RECORD_SUFFIX.to_string(),
            platform: MANIFEST_PLATFORM.to_string(),
            date_time: format_manifest_time(time)?,
        })
    }
}

/// One attachment reference inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEntry {
    /// `appdata/<Folder>/<md5>.<ext>`
    pub resource_uri: String,

    /// Numeric media type
    pub resource_type: u8,
}

/// Per-diary record (`YYYY-MM-DD.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiaryRecord {
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<Mood>,
    pub weather: Option<String>,
    pub location: Option<String>,
    pub top: bool,
    pub private: bool,
    pub tags: Vec<String>,
    pub resources: Vec<ResourceEntry>,
    pub id: String,
    pub create_time: String,
    pub update_time: String,
}

impl DiaryRecord {
    /// Build the record for `diary` with its already-materialized resources.
    ///
    /// There is no edit history, so both timestamps are the diary's time.
    pub fn new(diary: &Diary, resources: Vec<ResourceEntry>) -> Result<Self, ArchiveError> {
        let timestamp = format_record_time(diary.time)?;

        Ok(Self {
            title: None,
            content: diary.content.clone(),
            mood: diary.mood,
            weather: None,
            location: None,
            top: false,
            private: false,
            tags: Vec::new(),
            resources,
            id: diary.uuid.clone(),
            create_time: timestamp.clone(),
            update_time: timestamp,
        })
    }
}

/// Write `value` as 2-space indented JSON (raw UTF-8, no trailing newline)
pub fn write_json<T: Serialize>(file: File, value: &T) -> Result<(), ArchiveError> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write `value` to a new file at `path`
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    write_json(File::create(path)?, value)
}

// ============================================================================
// Timestamp formatting
// ============================================================================

fn to_utc(time: f64) -> Result<DateTime<Utc>, ArchiveError> {
    let micros = (time * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() > i64::MAX as f64 {
        return Err(ArchiveError::InvalidTimestamp(time));
    }

    let micros = micros as i64;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;

    DateTime::from_timestamp(secs, nanos).ok_or(ArchiveError::InvalidTimestamp(time))
}

/// ISO-8601 at UTC+08:00, e.g. `2024-06-23T10:35:55.741136+08:00`.
///
/// Microseconds are omitted when they are zero.
pub fn format_manifest_time(time: f64) -> Result<String, ArchiveError> {
    let offset = FixedOffset::east_opt(MANIFEST_UTC_OFFSET_SECS)
        .ok_or(ArchiveError::InvalidTimestamp(time))?;
    let dt = to_utc(time)?.with_timezone(&offset);

    let pattern = if dt.timestamp_subsec_micros() == 0 {
        "%Y-%m-%dT%H:%M:%S%:z"
    } else {
        "%Y-%m-%dT%H:%M:%S%.6f%:z"
    };
    Ok(dt.format(pattern).to_string())
}

/// Host-local `YYYY-MM-DDTHH:MM:SS.mmm` without offset (milliseconds truncated)
pub fn format_record_time(time: f64) -> Result<String, ArchiveError> {
    let dt = to_utc(time)?.with_timezone(&Local);
    Ok(dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
}

/// Host-local calendar day `YYYY-MM-DD`, used as the record filename stem
pub fn record_day(time: f64) -> Result<String, ArchiveError> {
    let dt = to_utc(time)?.with_timezone(&Local);
    Ok(dt.format("%Y-%m-%d").to_string())
}
