//! Diary entries.

use chrono::Utc;
use uuid::Uuid;

use super::media::Media;
use super::mood::Mood;
use crate::archive::ArchiveError;

/// One journal entry
#[derive(Debug, Clone, PartialEq)]
pub struct Diary {
    /// Creation time, seconds since the Unix epoch
    pub time: f64,

    /// Stable identifier (source id when available, random otherwise)
    pub uuid: String,

    /// Markdown text, including inline media references
    pub content: String,

    /// Optional mood tag
    pub mood: Option<Mood>,

    /// Attachments in the order they are referenced in `content`
    pub medias: Vec<Media>,
}

impl Diary {
    /// Create a diary; missing fields default to now, a fresh v4 UUID and
    /// empty content.
    pub fn new(time: Option<f64>, uuid: Option<String>, content: Option<String>) -> Self {
        Self {
            time: time.unwrap_or_else(now_seconds),
            uuid: uuid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            content: content.unwrap_or_default(),
            mood: None,
            medias: Vec::new(),
        }
    }

    /// Set the mood
    pub fn with_mood(mut self, mood: Option<Mood>) -> Self {
        self.mood = mood;
        self
    }

    /// Attach a media item without touching the content
    pub fn add_media(&mut self, media: Media) {
        self.medias.push(media);
    }

    /// Attach a media item and append an inline reference to it:
    /// `\n\n![<label>](appdata/<Folder>/<filename>)`.
    ///
    /// Unknown media are attached but not referenced, since they are never
    /// exported.
    pub fn embed_media(&mut self, label: &str, media: Media) -> Result<(), ArchiveError> {
        if let Some(uri) = media.resource_uri()? {
            self.content.push_str(&format!("\n\n![{}]({})", label, uri));
        }
        self.add_media(media);
        Ok(())
    }

    /// Number of attachments
    pub fn media_count(&self) -> usize {
        self.medias.len()
    }

    /// Length of the text content in bytes
    pub fn content_len(&self) -> usize {
        self.content.len()
    }
}

/// Turn every newline into a markdown hard break (`"  \n"`)
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace('\n', "  \n")
}

/// Current time in fractional seconds
pub(crate) fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaType;

    #[test]
    fn test_diary_defaults() {
        let a = Diary::new(None, None, None);
        let b = Diary::new(None, None, None);

        assert!(a.content.is_empty());
        assert!(a.mood.is_none());
        assert_eq!(a.media_count(), 0);
        assert_ne!(a.uuid, b.uuid);
        assert!(a.time > 1_600_000_000.0);
    }

    #[test]
    fn test_diary_keeps_source_id() {
        let diary = Diary::new(Some(1_700_000_000.0), Some("emo-1".to_string()), Some("hi".into()));
        assert_eq!(diary.uuid, "emo-1");
        assert_eq!(diary.time, 1_700_000_000.0);
        assert_eq!(diary.content_len(), 2);
    }

    #[test]
    fn test_medias_are_per_instance() {
        let mut a = Diary::new(None, None, None);
        let b = Diary::new(None, None, None);

        a.add_media(Media::from_bytes(b"x".to_vec(), MediaType::Image, None).unwrap());

        assert_eq!(a.media_count(), 1);
        assert_eq!(b.media_count(), 0);
    }

    #[test]
    fn test_embed_media_appends_reference() {
        let mut diary = Diary::new(None, None, Some("line one".into()));
        let media = Media::from_bytes(b"hello".to_vec(), MediaType::Image, Some("png")).unwrap();

        diary.embed_media("Image 1", media).unwrap();

        assert_eq!(
            diary.content,
            "line one\n\n![Image 1](appdata/Image/5d41402abc4b2a76b9719d911017c592.png)"
        );
        assert_eq!(diary.media_count(), 1);
    }

    #[test]
    fn test_embed_unknown_media_is_not_referenced() {
        let mut diary = Diary::new(None, None, Some("text".into()));
        let media = Media::from_bytes(b"blob".to_vec(), MediaType::Unknown, None).unwrap();

        diary.embed_media("Blob", media).unwrap();

        assert_eq!(diary.content, "text");
        assert_eq!(diary.media_count(), 1);
    }

    #[test]
    fn test_normalize_line_breaks() {
        assert_eq!(normalize_line_breaks("a\nb\n"), "a  \nb  \n");
        assert_eq!(normalize_line_breaks("single"), "single");
    }
}
