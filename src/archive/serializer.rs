//! Folder layout writer.
//!
//! Lays out a bundle under a root directory:
//!
//! ```text
//! <root>/
//! ├── version.json
//! ├── YYYY-MM-DD.json        # one per diary, `(1)`, `(2)`... on collision
//! └── appdata/
//!     ├── Audio/<md5>.<ext>
//!     ├── Video/<md5>.<ext>
//!     └── Image/<md5>.<ext>
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::record::{
    record_day, write_json, write_json_file, DiaryRecord, ResourceEntry, VersionManifest,
    RECORD_SUFFIX,
};
use super::{Archive, ArchiveError, ExportSummary};
use crate::domain::{Diary, MediaContent, MediaType};

/// Manifest filename at the bundle root
pub const VERSION_FILE: &str = "version.json";

/// Directory holding all media folders
pub const APPDATA_DIR: &str = "appdata";

/// Media folders, in creation order
const MEDIA_TYPES: [MediaType; 3] = [MediaType::Audio, MediaType::Video, MediaType::Image];

/// Write the full bundle tree for `archive` into `root` (which must exist and
/// be empty).
pub(crate) fn write_tree(archive: &Archive, root: &Path) -> Result<ExportSummary, ArchiveError> {
    let mut summary = ExportSummary::new(root.to_path_buf());

    write_json_file(&root.join(VERSION_FILE), &VersionManifest::new(archive.time)?)?;

    let appdata = root.join(APPDATA_DIR);
    fs::create_dir(&appdata)?;
    for media_type in MEDIA_TYPES {
        if let Some(folder) = media_type.folder_name() {
            fs::create_dir(appdata.join(folder))?;
        }
    }

    for diary in &archive.diaries {
        let resources = write_media(diary, &appdata, &mut summary)?;
        let record = DiaryRecord::new(diary, resources)?;

        let stem = record_day(diary.time)?;
        let (file, path) = create_unique(root, &stem, RECORD_SUFFIX)?;
        write_json(file, &record)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        debug!(diary = %diary.uuid, record = %name, "Wrote diary record");
        summary.records.push(name);
    }

    Ok(summary)
}

/// Materialize the media of one diary and return its resource list
fn write_media(
    diary: &Diary,
    appdata: &Path,
    summary: &mut ExportSummary,
) -> Result<Vec<ResourceEntry>, ArchiveError> {
    let mut resources = Vec::new();

    for media in &diary.medias {
        let Some(folder) = media.media_type.folder_name() else {
            debug!(diary = %diary.uuid, "Skipping media with unknown type");
            summary.media_skipped += 1;
            continue;
        };

        if !media.is_available() {
            if let MediaContent::Path(path) = &media.content {
                warn!(diary = %diary.uuid, path = %path.display(), "Skipping missing media file");
            }
            summary.media_skipped += 1;
            continue;
        }

        let filename = media.filename()?;
        let target = appdata.join(folder).join(&filename);

        // Content-addressed: an existing file already holds these bytes
        if target.exists() {
            summary.media_reused += 1;
        } else {
            match &media.content {
                MediaContent::Bytes(bytes) => fs::write(&target, bytes)?,
                MediaContent::Path(source) => {
                    fs::copy(source, &target)?;
                }
            }
            summary.media_written += 1;
        }

        resources.push(ResourceEntry {
            resource_uri: format!("{}/{}/{}", APPDATA_DIR, folder, filename),
            resource_type: media.media_type.resource_type(),
        });
    }

    Ok(resources)
}

/// Create `<stem><suffix>` in `dir`, or `<stem>(1)<suffix>`, `<stem>(2)<suffix>`...
/// if taken. Never overwrites an existing file.
pub fn create_unique(dir: &Path, stem: &str, suffix: &str) -> io::Result<(File, PathBuf)> {
    let mut counter = 0u32;

    loop {
        let name = if counter == 0 {
            format!("{}{}", stem, suffix)
        } else {
            format!("{}({}){}", stem, counter, suffix)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}
