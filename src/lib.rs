//! swbk - Convert diary exports into swbk archive bundles
//!
//! Reads diaries from other journaling apps and writes them as a
//! self-contained bundle the swbk diary app can import.
//!
//! # Architecture
//!
//! The core is the archive model and its serializer:
//! - Media files are stored under content-addressed names (MD5 of the bytes)
//! - Each diary becomes one JSON record named after its calendar day
//! - The tree is written as a folder or compressed into a zip
//!
//! # Modules
//!
//! - `domain`: Data structures (Diary, Media, Mood)
//! - `archive`: Archive aggregate, hashing, record layout, zip export
//! - `adapters`: Source readers (emoscroll backups, scraped iCity entries)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Convert an emoscroll backup into a zip bundle
//! swbk emoscroll backup.esm -o diaries.zip
//!
//! # Convert scraped iCity entries into a folder
//! swbk icity entries.json --folder -o ./bundle
//!
//! # List what a bundle contains
//! swbk inspect diaries.zip
//! ```

pub mod adapters;
pub mod archive;
pub mod cli;
pub mod config;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{DiarySource, EmoscrollSource, ICitySource, SourceError};
pub use archive::{Archive, ArchiveError, ExportSummary, ExportTarget, ZipExport};
pub use domain::{Diary, Media, MediaContent, MediaType, Mood};
