//! Archive Export Integration Tests
//!
//! Tests for bundle layout, content-addressed media, record naming and
//! zip/folder equivalence.

use std::fs;
use std::path::Path;

use chrono::{Local, TimeZone};
use swbk::archive::record::record_day;
use swbk::archive::{hasher, list_entries, list_tree, DiaryRecord, VersionManifest};
use swbk::{Archive, ArchiveError, Diary, Media, MediaType, Mood, ZipExport};
use tempfile::TempDir;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image body";

fn read_record(path: &Path) -> DiaryRecord {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Unix time of local noon on the given day
fn local_noon(year: i32, month: u32, day: u32) -> f64 {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap()
        .timestamp() as f64
}

fn image(bytes: &[u8]) -> Media {
    Media::from_bytes(bytes.to_vec(), MediaType::Image, None).unwrap()
}

#[test]
fn test_single_diary_folder_export() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("bundle");

    let mut diary = Diary::new(Some(1_700_000_000.0), None, Some("hello".to_string()));
    diary.mood = Some(Mood::Happy);
    diary.add_media(image(PNG_BYTES));
    let uuid = diary.uuid.clone();

    let mut archive = Archive::new(Some(1_700_000_000.0));
    archive.add_diary(diary);
    let summary = archive.export_as_folder(&out).unwrap();

    // Manifest
    let manifest: VersionManifest =
        serde_json::from_str(&fs::read_to_string(out.join("version.json")).unwrap()).unwrap();
    assert_eq!(manifest.platform, "Android");
    assert_eq!(manifest.version, "0.91.6");
    assert_eq!(manifest.file_suffix, ".json");
    assert_eq!(manifest.date_time, "2023-11-15T06:13:20+08:00");

    // Record named after the local day
    let record_name = format!("{}.json", record_day(1_700_000_000.0).unwrap());
    assert_eq!(summary.records, vec![record_name.clone()]);

    let record = read_record(&out.join(&record_name));
    let filename = format!("{}.unknown", hasher::hash_bytes(PNG_BYTES));
    assert_eq!(record.content, "hello");
    assert_eq!(record.mood, Some(Mood::Happy));
    assert_eq!(record.id, uuid);
    assert_eq!(record.resources.len(), 1);
    assert_eq!(record.resources[0].resource_uri, format!("appdata/Image/{}", filename));
    assert_eq!(record.resources[0].resource_type, 1);
    assert_eq!(record.create_time, record.update_time);
    assert!(record.title.is_none() && record.weather.is_none() && record.location.is_none());
    assert!(!record.top && !record.private && record.tags.is_empty());

    // Media written under its content hash
    assert_eq!(fs::read(out.join("appdata/Image").join(&filename)).unwrap(), PNG_BYTES);
    assert!(out.join("appdata/Audio").is_dir());
    assert!(out.join("appdata/Video").is_dir());
}

#[test]
fn test_record_json_is_raw_nulls_and_flags() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("bundle");

    let mut archive = Archive::new(None);
    archive.add_diary(Diary::new(Some(1_700_000_000.0), Some("fixed-id".into()), Some("日记".into())));
    let summary = archive.export_as_folder(&out).unwrap();

    let raw = fs::read_to_string(out.join(&summary.records[0])).unwrap();
    assert!(raw.starts_with("{\n  \"Title\": null,\n  \"Content\": \"日记\",\n  \"Mood\": null,"));
    assert!(raw.contains("\"Top\": false"));
    assert!(raw.contains("\"Resources\": []"));
    assert!(raw.contains("\"Id\": \"fixed-id\""));
    assert!(raw.ends_with('}'));
}

#[test]
fn test_same_day_records_never_overwrite() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("bundle");

    let mut archive = Archive::new(None);
    for (i, hour_offset) in [0.0, 3600.0, 7200.0].iter().enumerate() {
        archive.add_diary(Diary::new(
            Some(local_noon(2024, 1, 1) + hour_offset),
            Some(format!("diary-{}", i)),
            Some(format!("entry {}", i)),
        ));
    }
    let summary = archive.export_as_folder(&out).unwrap();

    assert_eq!(
        summary.records,
        vec!["2024-01-01.json", "2024-01-01(1).json", "2024-01-01(2).json"]
    );
    for (i, name) in summary.records.iter().enumerate() {
        let record = read_record(&out.join(name));
        assert_eq!(record.id, format!("diary-{}", i));
        assert_eq!(record.content, format!("entry {}", i));
    }
}

#[test]
fn test_identical_media_written_once() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("bundle");

    let mut first = Diary::new(Some(local_noon(2024, 3, 1)), None, None);
    first.add_media(Media::from_bytes(b"shared".to_vec(), MediaType::Image, Some("jpg")).unwrap());
    let mut second = Diary::new(Some(local_noon(2024, 3, 2)), None, None);
    second.add_media(Media::from_bytes(b"shared".to_vec(), MediaType::Image, Some("jpg")).unwrap());

    let mut archive = Archive::new(None);
    archive.add_diary(first);
    archive.add_diary(second);
    let summary = archive.export_as_folder(&out).unwrap();

    assert_eq!(summary.media_written, 1);
    assert_eq!(summary.media_reused, 1);
    assert_eq!(fs::read_dir(out.join("appdata/Image")).unwrap().count(), 1);

    let a = read_record(&out.join("2024-03-01.json"));
    let b = read_record(&out.join("2024-03-02.json"));
    assert_eq!(a.resources, b.resources);
    assert_eq!(
        a.resources[0].resource_uri,
        format!("appdata/Image/{}.jpg", hasher::hash_bytes(b"shared"))
    );
}

#[test]
fn test_unknown_media_is_never_exported() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("bundle");

    let mut diary = Diary::new(Some(1_700_000_000.0), None, None);
    diary.add_media(Media::from_bytes(b"mystery".to_vec(), MediaType::Unknown, None).unwrap());
    diary.add_media(Media::from_bytes(b"song".to_vec(), MediaType::Audio, Some("m4a")).unwrap());

    let mut archive = Archive::new(None);
    archive.add_diary(diary);
    let summary = archive.export_as_folder(&out).unwrap();

    let record = read_record(&out.join(&summary.records[0]));
    assert_eq!(record.resources.len(), 1);
    assert_eq!(record.resources[0].resource_type, 2);
    assert!(record.resources[0].resource_uri.starts_with("appdata/Audio/"));
    assert_eq!(summary.media_skipped, 1);

    let unknown_name = format!("{}.unknown", hasher::hash_bytes(b"mystery"));
    assert!(list_tree(&out).unwrap().iter().all(|p| !p.ends_with(&unknown_name)));
}

#[test]
fn test_missing_source_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("bundle");

    let mut diary = Diary::new(Some(1_700_000_000.0), None, Some("text survives".into()));
    diary.add_media(Media::from_path(temp.path().join("gone.png"), MediaType::Image, None).unwrap());

    let mut archive = Archive::new(None);
    archive.add_diary(diary);
    let summary = archive.export_as_folder(&out).unwrap();

    let record = read_record(&out.join(&summary.records[0]));
    assert_eq!(record.content, "text survives");
    assert!(record.resources.is_empty());
    assert_eq!(summary.media_skipped, 1);
}

#[test]
fn test_path_media_copied_with_suffix_extension() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("clip.MP4");
    fs::write(&source, b"video bytes").unwrap();
    let out = temp.path().join("bundle");

    let mut diary = Diary::new(Some(1_700_000_000.0), None, None);
    diary.add_media(Media::from_path(&source, MediaType::Video, None).unwrap());

    let mut archive = Archive::new(None);
    archive.add_diary(diary);
    archive.export_as_folder(&out).unwrap();

    let target = out
        .join("appdata/Video")
        .join(format!("{}.mp4", hasher::hash_bytes(b"video bytes")));
    assert_eq!(fs::read(target).unwrap(), b"video bytes");
    // Source file is left in place
    assert!(source.exists());
}

fn sample_archive() -> Archive {
    let mut archive = Archive::new(Some(1_700_000_000.5));
    for day in 1..=3 {
        let mut diary = Diary::new(Some(local_noon(2024, 5, day)), Some(format!("d{}", day)), None);
        diary
            .embed_media("Image 1", image(format!("photo {}", day).as_bytes()))
            .unwrap();
        archive.add_diary(diary);
    }
    // Second entry on the first day
    archive.add_diary(Diary::new(Some(local_noon(2024, 5, 1) + 60.0), Some("d1b".into()), None));
    archive
}

#[test]
fn test_zip_and_folder_have_same_layout() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("bundle");
    let zip_path = temp.path().join("bundle.zip");

    let archive = sample_archive();
    archive.clone().export_as_folder(&folder).unwrap();
    let summary = archive
        .export_as_zip(ZipExport::new(&zip_path).with_scratch_dir(temp.path().join("scratch")))
        .unwrap();

    assert_eq!(summary.archive_path.as_deref(), Some(zip_path.as_path()));

    let mut entries = list_entries(&zip_path).unwrap();
    entries.sort();
    assert_eq!(entries, list_tree(&folder).unwrap());
    assert!(entries.contains(&"version.json".to_string()));
    assert!(entries.contains(&"2024-05-01(1).json".to_string()));
}

#[test]
fn test_export_is_byte_stable() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");

    let archive = sample_archive();
    archive.clone().export_as_folder(&a).unwrap();
    archive.export_as_folder(&b).unwrap();

    let files = list_tree(&a).unwrap();
    assert_eq!(files, list_tree(&b).unwrap());
    for file in &files {
        assert_eq!(fs::read(a.join(file)).unwrap(), fs::read(b.join(file)).unwrap(), "{}", file);
    }
}

#[test]
fn test_zip_scratch_lifecycle() {
    let temp = TempDir::new().unwrap();
    let scratch = temp.path().join("scratch");

    // Stale leftovers from a crashed run are removed
    fs::create_dir_all(&scratch).unwrap();
    fs::write(scratch.join("stale.json"), "{}").unwrap();

    let kept = temp.path().join("kept.zip");
    sample_archive()
        .export_as_zip(ZipExport::new(&kept).with_scratch_dir(&scratch))
        .unwrap();
    assert!(scratch.join("version.json").is_file());
    assert!(!scratch.join("stale.json").exists());
    assert!(!list_entries(&kept).unwrap().contains(&"stale.json".to_string()));

    let cleaned = temp.path().join("cleaned.zip");
    sample_archive()
        .export_as_zip(
            ZipExport::new(&cleaned)
                .with_scratch_dir(&scratch)
                .with_cleanup(true),
        )
        .unwrap();
    assert!(!scratch.exists());
    assert!(cleaned.is_file());
}

#[test]
fn test_export_to_existing_targets_fails() {
    let temp = TempDir::new().unwrap();

    let zip_path = temp.path().join("taken.zip");
    fs::write(&zip_path, b"zip").unwrap();
    assert!(matches!(
        sample_archive().export_as_zip(ZipExport::new(&zip_path)),
        Err(ArchiveError::AlreadyExists(_))
    ));

    let folder = temp.path().join("busy");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("note.txt"), "x").unwrap();
    assert!(matches!(
        sample_archive().export_as_folder(&folder),
        Err(ArchiveError::AlreadyExists(_))
    ));
}
