//! MD5 content hashing.
//!
//! In-memory buffers and streamed files hash to the same digest for the same
//! bytes, which is what makes media filenames content-addressed.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::ArchiveError;

/// Read size used when streaming files
const CHUNK_SIZE: usize = 1024 * 1024;

/// MD5 hex digest of an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(md5::compute(bytes).0)
}

/// MD5 hex digest of everything readable from `reader`.
///
/// Reads in fixed-size chunks and rewinds the reader to the start afterwards.
pub fn hash_reader<R: Read + Seek>(reader: &mut R) -> io::Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..read]);
    }

    reader.seek(SeekFrom::Start(0))?;
    Ok(hex::encode(context.compute().0))
}

/// MD5 hex digest of a file's content
pub fn hash_file(path: &Path) -> Result<String, ArchiveError> {
    if !path.is_file() {
        return Err(ArchiveError::NotFound(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    Ok(hash_reader(&mut file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_hash_bytes_known_digest() {
        assert_eq!(hash_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(hash_bytes(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_hash_reader_rewinds() {
        let mut cursor = Cursor::new(b"hello".to_vec());

        let first = hash_reader(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 0);

        // Reusing the handle gives the same digest
        let second = hash_reader(&mut cursor).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, hash_bytes(b"hello"));
    }

    #[test]
    fn test_hash_reader_spans_chunks() {
        let data = vec![7u8; CHUNK_SIZE * 2 + 13];
        let mut cursor = Cursor::new(data.clone());

        assert_eq!(hash_reader(&mut cursor).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn test_hash_file_matches_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.m4a");
        std::fs::write(&path, b"fake audio content").unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"fake audio content"));
    }

    #[test]
    fn test_hash_file_not_found() {
        let temp = TempDir::new().unwrap();
        let result = hash_file(&temp.path().join("missing.jpg"));

        assert!(matches!(result, Err(ArchiveError::NotFound(_))));
    }
}
