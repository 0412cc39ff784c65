//! Emoscroll backup adapter.
//!
//! An `.esm` backup is a zip holding the app's SQLite database
//! (`app_database`) next to `images/<imageId>` and `songs/<songId>` blobs.
//! The backup is unpacked into a private temp directory owned by the source;
//! diaries reference those files by path, so the source must outlive the
//! export.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::{DiarySource, SourceError};
use crate::domain::{detect_image_extension, normalize_line_breaks, Diary, Media, MediaType, Mood};

/// Database file inside the backup
pub const DATABASE_FILE: &str = "app_database";

/// Emotion tags used by the emoscroll app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Joy,
    Thought,
    Sadness,
    Worry,
    Surprise,
    Fear,
    Anger,
}

impl Emotion {
    /// Closest mood of the target app, if any
    pub fn mood(self) -> Option<Mood> {
        match self {
            Emotion::Joy => Some(Mood::Happy),
            Emotion::Thought => Some(Mood::Confused),
            Emotion::Sadness => Some(Mood::Cry),
            Emotion::Anger => Some(Mood::Angry),
            Emotion::Worry | Emotion::Surprise | Emotion::Fear => None,
        }
    }
}

impl std::str::FromStr for Emotion {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, SourceError> {
        match s {
            "JOY" => Ok(Emotion::Joy),
            "THOUGHT" => Ok(Emotion::Thought),
            "SADNESS" => Ok(Emotion::Sadness),
            "WORRY" => Ok(Emotion::Worry),
            "SURPRISE" => Ok(Emotion::Surprise),
            "FEAR" => Ok(Emotion::Fear),
            "ANGER" => Ok(Emotion::Anger),
            _ => Err(SourceError::Invalid(format!("Unknown emotion: {}", s))),
        }
    }
}

/// Row of the `Emo` table
#[derive(Debug, Clone)]
struct EmoRow {
    emo_id: String,
    content: String,
    create_time_ms: i64,
    emotion: Option<String>,
    is_recycled: bool,
}

/// Row of the `Image` table
#[derive(Debug, Clone)]
struct ImageRow {
    image_id: String,
    emo_id: String,
    order: i64,
}

/// Row of the `Song` table
#[derive(Debug, Clone)]
struct SongRow {
    song_id: String,
    title: String,
    artist: String,
}

/// Tables read from the backup database
#[derive(Debug, Default)]
struct BackupTables {
    emos: Vec<EmoRow>,
    images: Vec<ImageRow>,
    songs: HashMap<String, SongRow>,
    /// emoId -> songId
    song_refs: HashMap<String, String>,
}

/// Diary source reading an emoscroll backup
pub struct EmoscrollSource {
    /// Original backup file
    backup: PathBuf,

    /// Unpacked backup
    workdir: TempDir,
}

impl EmoscrollSource {
    /// Unpack `backup` into a private temp directory
    pub fn open(backup: &Path) -> Result<Self, SourceError> {
        if !backup.is_file() {
            return Err(SourceError::NotFound(backup.to_path_buf()));
        }

        let workdir = TempDir::new()?;
        let mut zip = ZipArchive::new(File::open(backup)?)?;
        zip.extract(workdir.path())?;
        info!(backup = %backup.display(), files = zip.len(), "Unpacked emoscroll backup");

        Ok(Self {
            backup: backup.to_path_buf(),
            workdir,
        })
    }

    /// Backup file this source was opened from
    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// Directory holding the unpacked backup
    pub fn root(&self) -> &Path {
        self.workdir.path()
    }

    /// Read all non-recycled entries as diaries, in table order
    pub fn read_diaries(&self) -> Result<Vec<Diary>, SourceError> {
        let db_path = self.root().join(DATABASE_FILE);
        if !db_path.is_file() {
            return Err(SourceError::NotFound(db_path));
        }

        let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let tables = load_tables(&conn)?;
        debug!(
            emos = tables.emos.len(),
            images = tables.images.len(),
            songs = tables.songs.len(),
            "Loaded backup tables"
        );

        let mut diaries = Vec::new();
        for emo in tables.emos.iter().filter(|e| !e.is_recycled) {
            diaries.push(self.emo_to_diary(emo, &tables)?);
        }
        Ok(diaries)
    }

    fn emo_to_diary(&self, emo: &EmoRow, tables: &BackupTables) -> Result<Diary, SourceError> {
        let mut diary = Diary::new(
            Some(emo.create_time_ms as f64 / 1000.0),
            Some(emo.emo_id.clone()),
            Some(normalize_line_breaks(&emo.content)),
        );

        for image in tables.images.iter().filter(|i| i.emo_id == emo.emo_id) {
            let Some(media) = self.image_media("images", &image.image_id)? else {
                continue;
            };
            diary.embed_media(&format!("Image {}", image.order), media)?;
        }

        let song = tables
            .song_refs
            .get(&emo.emo_id)
            .and_then(|song_id| tables.songs.get(song_id));
        if let Some(song) = song {
            if let Some(cover) = self.image_media("songs", &song.song_id)? {
                let uri = cover.resource_uri()?.unwrap_or_default();
                diary.content.push_str(&format!(
                    "\n\n> ![Cover]({})  \n> Title: {}  \n> Artist: {}  ",
                    uri, song.title, song.artist
                ));
                diary.add_media(cover);
            }
        }

        diary.mood = match emo.emotion.as_deref() {
            Some(tag) => match tag.parse::<Emotion>() {
                Ok(emotion) => emotion.mood(),
                Err(e) => {
                    warn!(emo = %emo.emo_id, error = %e, "Ignoring emotion");
                    None
                }
            },
            None => None,
        };

        Ok(diary)
    }

    /// Image media for a blob of the backup, or `None` if the blob is missing
    fn image_media(&self, folder: &str, id: &str) -> Result<Option<Media>, SourceError> {
        let path = self.root().join(folder).join(id);
        if !path.is_file() {
            warn!(path = %path.display(), "Skipping missing backup image");
            return Ok(None);
        }

        let extension = detect_image_extension(&path);
        Ok(Some(Media::from_path(path, MediaType::Image, extension.as_deref())?))
    }
}

#[async_trait]
impl DiarySource for EmoscrollSource {
    fn name(&self) -> &str {
        "emoscroll"
    }

    async fn collect(&self) -> Result<Vec<Diary>, SourceError> {
        self.read_diaries()
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, SourceError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Load the tables the conversion needs; missing tables read as empty
fn load_tables(conn: &Connection) -> Result<BackupTables, SourceError> {
    let mut tables = BackupTables::default();

    if table_exists(conn, "Emo")? {
        let mut stmt =
            conn.prepare("SELECT emoId, content, createTime, emotion, isRecycled FROM Emo")?;
        let rows = stmt.query_map([], |row| {
            Ok(EmoRow {
                emo_id: row.get(0)?,
                content: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                create_time_ms: row.get(2)?,
                emotion: row.get(3)?,
                is_recycled: row.get::<_, Option<bool>>(4)?.unwrap_or(false),
            })
        })?;
        tables.emos = rows.collect::<Result<_, _>>()?;
    }

    if table_exists(conn, "Image")? {
        let mut stmt = conn.prepare("SELECT imageId, emoId, \"order\" FROM Image")?;
        let rows = stmt.query_map([], |row| {
            Ok(ImageRow {
                image_id: row.get(0)?,
                emo_id: row.get(1)?,
                order: row.get(2)?,
            })
        })?;
        tables.images = rows.collect::<Result<_, _>>()?;
    }

    if table_exists(conn, "Song")? {
        let mut stmt = conn.prepare("SELECT songId, title, artist FROM Song")?;
        let rows = stmt.query_map([], |row| {
            Ok(SongRow {
                song_id: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                artist: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?;
        for song in rows {
            let song = song?;
            tables.songs.insert(song.song_id.clone(), song);
        }
    }

    if table_exists(conn, "EmoSongCrossRef")? {
        let mut stmt = conn.prepare("SELECT emoId, songId FROM EmoSongCrossRef")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for pair in rows {
            let (emo_id, song_id) = pair?;
            tables.song_refs.insert(emo_id, song_id);
        }
    }

    Ok(tables)
}
