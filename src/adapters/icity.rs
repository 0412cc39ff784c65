//! iCity scrape adapter.
//!
//! Logging in and walking the diary pages happens in a browser session
//! outside this crate; what arrives here is the list of scraped entries
//! (text, publish time, photo URLs) as JSON. Photo bytes are downloaded over
//! HTTP and embedded into the diaries.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DiarySource, SourceError};
use crate::config::ICitySettings;
use crate::domain::{normalize_line_breaks, sniff_image_format, Diary, Media, MediaType};

/// Publish time format of scraped entries (always UTC)
const PUBLISHED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One diary entry as scraped from a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedEntry {
    /// Visible diary text
    pub text: String,

    /// `datetime` attribute of the entry's `<time>` element
    pub datetime: String,

    /// Photo `src` attributes, possibly with a `/<W>x<H>` thumbnail suffix
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Diary source downloading the photos of scraped entries
pub struct ICitySource {
    entries: Vec<ScrapedEntry>,
    client: reqwest::Client,
}

impl ICitySource {
    /// Create a source for already-parsed entries
    pub fn new(entries: Vec<ScrapedEntry>, settings: &ICitySettings) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| SourceError::Invalid(format!("user agent: {}", e)))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&settings.referer)
                .map_err(|e| SourceError::Invalid(format!("referer: {}", e)))?,
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { entries, client })
    }

    /// Load entries from a JSON file (array of `ScrapedEntry`)
    pub fn from_file(path: &Path, settings: &ICitySettings) -> Result<Self, SourceError> {
        if !path.is_file() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let entries: Vec<ScrapedEntry> = serde_json::from_str(&content)?;
        info!(path = %path.display(), entries = entries.len(), "Loaded scraped entries");

        Self::new(entries, settings)
    }

    /// Scraped entries in page order
    pub fn entries(&self) -> &[ScrapedEntry] {
        &self.entries
    }

    /// Download one photo
    async fn fetch_photo(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        debug!(url, "Fetching photo");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl DiarySource for ICitySource {
    fn name(&self) -> &str {
        "icity"
    }

    async fn collect(&self) -> Result<Vec<Diary>, SourceError> {
        let mut diaries = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let mut photos = Vec::with_capacity(entry.photos.len());
            for url in entry.photos.iter().map(|u| full_size_url(u)) {
                let bytes = self.fetch_photo(&url).await?;
                photos.push((bytes, url));
            }
            diaries.push(entry_to_diary(entry, photos)?);
        }

        Ok(diaries)
    }
}

/// Build a diary from a scraped entry and its downloaded `(bytes, url)` photos.
///
/// The diary gets a fresh random id; the site exposes none.
pub fn entry_to_diary(
    entry: &ScrapedEntry,
    photos: Vec<(Vec<u8>, String)>,
) -> Result<Diary, SourceError> {
    let time = parse_published(&entry.datetime)?;
    let mut diary = Diary::new(Some(time), None, Some(normalize_line_breaks(&entry.text)));

    for (index, (bytes, url)) in photos.into_iter().enumerate() {
        let extension = url_extension(&url).or_else(|| sniff_image_format(&bytes));
        let media = Media::from_bytes(bytes, MediaType::Image, extension)?;
        diary.embed_media(&format!("Image {}", index + 1), media)?;
    }

    Ok(diary)
}

/// Strip one trailing `/<W>x<H>` thumbnail suffix from a photo URL
pub fn full_size_url(url: &str) -> String {
    if let Some((base, last)) = url.rsplit_once('/') {
        if let Some((w, h)) = last.split_once('x') {
            let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            if is_number(w) && is_number(h) {
                return base.to_string();
            }
        }
    }
    url.to_string()
}

/// Suffix after the last `.` of the URL's final path segment.
///
/// Query and fragment are ignored. Returns `None` when the segment has no
/// usable alphanumeric suffix.
pub fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = segment.rsplit_once('.')?;

    if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

/// Parse a scraped publish time into seconds since the epoch
pub fn parse_published(datetime: &str) -> Result<f64, SourceError> {
    let parsed = NaiveDateTime::parse_from_str(datetime, PUBLISHED_FORMAT)
        .map_err(|e| SourceError::Invalid(format!("publish time '{}': {}", datetime, e)))?;
    Ok(parsed.and_utc().timestamp() as f64)
}
