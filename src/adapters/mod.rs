//! Source adapters.
//!
//! Adapters read a foreign diary export and normalize it into `Diary` values
//! (timestamp, optional stable id, text, optional mood, ordered media) that
//! the archive serializer consumes.

pub mod emoscroll;
pub mod icity;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::archive::{Archive, ArchiveError};
use crate::domain::Diary;

pub use emoscroll::{EmoscrollSource, Emotion};
pub use icity::{ICitySource, ScrapedEntry};

/// Errors that can occur while reading a source export
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid source data: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Trait for diary sources
#[async_trait]
pub trait DiarySource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Read every diary, in source order
    async fn collect(&self) -> Result<Vec<Diary>, SourceError>;
}

/// Collect all diaries of `source` into a new archive
pub async fn build_archive(
    source: &dyn DiarySource,
    time: Option<f64>,
) -> Result<Archive, SourceError> {
    let diaries = source.collect().await?;
    info!(source = source.name(), diaries = diaries.len(), "Collected diaries");

    let mut archive = Archive::new(time);
    for diary in diaries {
        archive.add_diary(diary);
    }
    Ok(archive)
}
