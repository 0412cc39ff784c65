//! Media attachments.
//!
//! A `Media` is one image/audio/video blob attached to a diary. Its archive
//! filename is derived from a hash of its bytes, so two attachments with the
//! same content and extension always land on the same file.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::archive::hasher;
use crate::archive::ArchiveError;

/// Extension used when neither an override nor a path suffix is available
pub const UNKNOWN_EXTENSION: &str = "unknown";

/// Kind of attachment, numbered the way the target app numbers resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaType {
    #[default]
    Unknown = 0,
    Image = 1,
    Audio = 2,
    Video = 3,
}

impl MediaType {
    /// Subfolder under `appdata/` (Unknown media are never written)
    pub fn folder_name(self) -> Option<&'static str> {
        match self {
            MediaType::Unknown => None,
            MediaType::Image => Some("Image"),
            MediaType::Audio => Some("Audio"),
            MediaType::Video => Some("Video"),
        }
    }

    /// Value of the record's `ResourceType` field
    pub fn resource_type(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Unknown => write!(f, "unknown"),
            MediaType::Image => write!(f, "image"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

/// Where the bytes of an attachment live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaContent {
    /// Owned in-memory buffer
    Bytes(Vec<u8>),

    /// Existing file; must stay in place until the export finishes
    Path(PathBuf),
}

/// One attachment of a diary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// Attachment kind
    pub media_type: MediaType,

    /// Bytes or file reference
    pub content: MediaContent,

    /// Lowercase extension without the leading dot
    pub extension: String,
}

impl Media {
    /// Create a media item.
    ///
    /// An explicit `extension` wins; otherwise the suffix of a path content is
    /// used, falling back to `"unknown"`.
    pub fn new(
        content: MediaContent,
        media_type: MediaType,
        extension: Option<&str>,
    ) -> Result<Self, ArchiveError> {
        if let MediaContent::Path(path) = &content {
            if path.as_os_str().is_empty() {
                return Err(ArchiveError::InvalidContent(
                    "media path is empty".to_string(),
                ));
            }
        }

        let extension = match extension.filter(|e| !e.is_empty()) {
            Some(ext) => {
                if ext.contains(|c: char| c == '/' || c == '\\') {
                    return Err(ArchiveError::InvalidContent(format!(
                        "invalid media extension: {}",
                        ext
                    )));
                }
                ext.to_lowercase()
            }
            None => match &content {
                MediaContent::Path(path) => path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| UNKNOWN_EXTENSION.to_string()),
                MediaContent::Bytes(_) => UNKNOWN_EXTENSION.to_string(),
            },
        };

        Ok(Self {
            media_type,
            content,
            extension,
        })
    }

    /// Create a media item owning `bytes`
    pub fn from_bytes(
        bytes: impl Into<Vec<u8>>,
        media_type: MediaType,
        extension: Option<&str>,
    ) -> Result<Self, ArchiveError> {
        Self::new(MediaContent::Bytes(bytes.into()), media_type, extension)
    }

    /// Create a media item referencing an existing file
    pub fn from_path(
        path: impl Into<PathBuf>,
        media_type: MediaType,
        extension: Option<&str>,
    ) -> Result<Self, ArchiveError> {
        Self::new(MediaContent::Path(path.into()), media_type, extension)
    }

    /// MD5 hex digest of the content
    pub fn content_hash(&self) -> Result<String, ArchiveError> {
        match &self.content {
            MediaContent::Bytes(bytes) => Ok(hasher::hash_bytes(bytes)),
            MediaContent::Path(path) => hasher::hash_file(path),
        }
    }

    /// Content-addressed filename: `<md5>.<extension>`.
    ///
    /// Recomputed on every call.
    pub fn filename(&self) -> Result<String, ArchiveError> {
        Ok(format!("{}.{}", self.content_hash()?, self.extension))
    }

    /// Relative URI inside the archive (`appdata/<Folder>/<filename>`).
    ///
    /// Returns `None` for Unknown media, which are never exported.
    pub fn resource_uri(&self) -> Result<Option<String>, ArchiveError> {
        match self.media_type.folder_name() {
            Some(folder) => Ok(Some(format!("appdata/{}/{}", folder, self.filename()?))),
            None => Ok(None),
        }
    }

    /// Whether the content can be materialized (bytes, or a path that exists)
    pub fn is_available(&self) -> bool {
        match &self.content {
            MediaContent::Bytes(_) => true,
            MediaContent::Path(path) => path.is_file(),
        }
    }
}

/// Detect an image format from its magic bytes.
///
/// Returns the lowercase format name (`png`, `jpeg`, `gif`, `webp`, `bmp`,
/// `tiff`) or `None` when the file is unreadable or not a known image.
pub fn detect_image_extension(path: &Path) -> Option<String> {
    let mut header = [0u8; 12];
    let mut file = File::open(path).ok()?;
    let read = file.read(&mut header).ok()?;
    sniff_image_format(&header[..read]).map(str::to_string)
}

/// Image format of an in-memory buffer, judged by its first bytes
pub fn sniff_image_format(header: &[u8]) -> Option<&'static str> {
    if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        Some("gif")
    } else if header.len() >= 12 && &header[..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        Some("webp")
    } else if header.starts_with(b"BM") {
        Some("bmp")
    } else if header.starts_with(b"II*\0") || header.starts_with(b"MM\0*") {
        Some("tiff")
    } else {
        None
    }
}
