//! Zip export.
//!
//! The bundle is first laid out in a private scratch directory, then every
//! file of that tree is deflated into the zip under its relative path.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::serializer::write_tree;
use super::{Archive, ArchiveError, ExportSummary};

/// Options for exporting to a zip file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipExport {
    /// Destination zip file (must not exist)
    pub path: PathBuf,

    /// Scratch directory for the unpacked tree (derived from `path` if unset)
    pub scratch_dir: Option<PathBuf>,

    /// Remove the scratch directory once the export ends
    pub cleanup: bool,
}

impl ZipExport {
    /// Export to `path`, keeping the scratch tree for inspection
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scratch_dir: None,
            cleanup: false,
        }
    }

    /// Use a specific scratch directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Set whether the scratch directory is removed afterwards
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Scratch directory used for this export.
    ///
    /// Defaults to a hidden sibling of the zip: `.<name>.tmp`.
    pub fn scratch_path(&self) -> PathBuf {
        if let Some(dir) = &self.scratch_dir {
            return dir.clone();
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "swbk".to_string());
        let parent = self.path.parent().unwrap_or(Path::new("."));
        parent.join(format!(".{}.tmp", name))
    }
}

/// Lay out `archive` in a fresh scratch tree and compress it into the zip
pub(crate) fn export_zip(archive: &Archive, options: &ZipExport) -> Result<ExportSummary, ArchiveError> {
    if options.path.exists() {
        return Err(ArchiveError::AlreadyExists(options.path.clone()));
    }

    let scratch = options.scratch_path();
    check_scratch(&options.path, &scratch)?;
    if scratch.exists() {
        warn!(path = %scratch.display(), "Removing stale scratch directory");
        fs::remove_dir_all(&scratch)?;
    }
    fs::create_dir_all(&scratch)?;

    let result = write_tree(archive, &scratch).and_then(|mut summary| {
        let entries = compress_dir(&scratch, &options.path)?;
        info!(path = %options.path.display(), entries, "Wrote zip archive");
        summary.archive_path = Some(options.path.clone());
        Ok(summary)
    });

    if options.cleanup {
        if let Err(e) = fs::remove_dir_all(&scratch) {
            // Surface the export error first; a leftover scratch dir is only logged
            if result.is_ok() {
                return Err(e.into());
            }
            warn!(path = %scratch.display(), error = %e, "Failed to remove scratch directory");
        }
    } else {
        debug!(path = %scratch.display(), "Keeping scratch directory");
    }

    result
}

/// The scratch tree is wiped and packed whole, so it must not hold the zip
/// or any directory above it.
fn check_scratch(zip_path: &Path, scratch: &Path) -> Result<(), ArchiveError> {
    let zip_path = absolute(zip_path)?;
    let scratch = absolute(scratch)?;
    let parent = zip_path.parent().unwrap_or(zip_path.as_path());

    if parent.starts_with(&scratch) {
        return Err(ArchiveError::InvalidTarget(format!(
            "scratch directory {} contains the zip {}",
            scratch.display(),
            zip_path.display()
        )));
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` resolved lexically
fn absolute(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Deflate every file below `root` into a new zip at `dest`.
///
/// Entry names are `/`-separated paths relative to `root`, in sorted order.
/// Directories get no entries of their own. Returns the number of entries.
pub fn compress_dir(root: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let file = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ArchiveError::AlreadyExists(dest.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &files {
        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?;

    Ok(files.len())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}

/// List the entry names of a zip file, in archive order
pub fn list_entries(path: &Path) -> Result<Vec<String>, ArchiveError> {
    if !path.is_file() {
        return Err(ArchiveError::NotFound(path.to_path_buf()));
    }

    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}

/// Relative paths of every file below `root`, `/`-separated and sorted
pub fn list_tree(root: &Path) -> Result<Vec<String>, ArchiveError> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    let mut names: Vec<String> = files.into_iter().map(|(name, _)| name).collect();
    names.sort();
    Ok(names)
}
