//! The archive aggregate and its serializer.
//!
//! An `Archive` is built once per conversion run, filled with diaries by a
//! source adapter, then consumed by a single export:
//!
//! ```rust,ignore
//! use swbk::archive::{Archive, ZipExport};
//!
//! let mut archive = Archive::new(None);
//! archive.add_diary(diary);
//! archive.export_as_zip(ZipExport::new("export.zip").with_cleanup(true))?;
//! ```

pub mod compress;
pub mod hasher;
pub mod record;
pub mod serializer;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::diary::now_seconds;
use crate::domain::Diary;

pub use compress::{compress_dir, list_entries, list_tree, ZipExport};
pub use record::{DiaryRecord, ResourceEntry, VersionManifest};
pub use serializer::{APPDATA_DIR, VERSION_FILE};

/// Errors that can occur while building or exporting an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid media content: {0}")]
    InvalidContent(String),

    #[error("Invalid export target: {0}")]
    InvalidTarget(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Where an export goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// Plain directory (created if missing, must be empty otherwise)
    Folder(PathBuf),

    /// Zip file built through a scratch directory
    Zip(ZipExport),
}

/// What an export materialized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Directory holding the unpacked tree
    pub root: PathBuf,

    /// Zip file, for zip exports
    pub archive_path: Option<PathBuf>,

    /// Record filenames in diary order
    pub records: Vec<String>,

    /// Media files written
    pub media_written: usize,

    /// Media whose content was already present in the tree
    pub media_reused: usize,

    /// Media skipped (unknown type or missing source file)
    pub media_skipped: usize,
}

impl ExportSummary {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }
}

/// A full bundle: creation time plus ordered diaries
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    /// Creation time, seconds since the Unix epoch (used by the manifest)
    pub time: f64,

    /// Diaries in export order
    pub diaries: Vec<Diary>,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Archive {
    /// Create an empty archive (`time` defaults to now)
    pub fn new(time: Option<f64>) -> Self {
        Self {
            time: time.unwrap_or_else(now_seconds),
            diaries: Vec::new(),
        }
    }

    /// Append a diary
    pub fn add_diary(&mut self, diary: Diary) {
        self.diaries.push(diary);
    }

    /// Number of diaries
    pub fn len(&self) -> usize {
        self.diaries.len()
    }

    /// Check if the archive has no diaries
    pub fn is_empty(&self) -> bool {
        self.diaries.is_empty()
    }

    /// Export the archive, consuming it
    pub fn export(self, target: ExportTarget) -> Result<ExportSummary, ArchiveError> {
        info!(diaries = self.diaries.len(), "Exporting archive");

        let summary = match &target {
            ExportTarget::Folder(path) => {
                prepare_folder(path)?;
                serializer::write_tree(&self, path)?
            }
            ExportTarget::Zip(options) => compress::export_zip(&self, options)?,
        };

        info!(
            records = summary.records.len(),
            media_written = summary.media_written,
            media_reused = summary.media_reused,
            media_skipped = summary.media_skipped,
            "Export complete"
        );
        Ok(summary)
    }

    /// Export into a directory
    pub fn export_as_folder(self, path: impl Into<PathBuf>) -> Result<ExportSummary, ArchiveError> {
        self.export(ExportTarget::Folder(path.into()))
    }

    /// Export into a zip file
    pub fn export_as_zip(self, options: ZipExport) -> Result<ExportSummary, ArchiveError> {
        self.export(ExportTarget::Zip(options))
    }
}

/// Create the export folder, refusing files and non-empty directories
fn prepare_folder(path: &Path) -> Result<(), ArchiveError> {
    if path.exists() {
        if !path.is_dir() || fs::read_dir(path)?.next().is_some() {
            return Err(ArchiveError::AlreadyExists(path.to_path_buf()));
        }
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
