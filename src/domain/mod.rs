//! Domain types for swbk archives.
//!
//! This module contains the in-memory diary model:
//! - Media: One attachment (bytes or a file reference)
//! - Diary: One journal entry with its attachments
//! - Mood: Display mood tags understood by the target app

pub mod diary;
pub mod media;
pub mod mood;

// Re-export commonly used types
pub use diary::{normalize_line_breaks, Diary};
pub use media::{detect_image_extension, sniff_image_format, Media, MediaContent, MediaType};
pub use mood::Mood;
