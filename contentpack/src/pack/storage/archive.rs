//! Zip archive-backed pack storage.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use parking_lot::Mutex;
use zip::ZipArchive;

use super::{
    capacity_hint, matches_filter, normalize_name, not_open, PackStorage, StorageStream,
};

/// An indexed archive entry.
#[derive(Debug, Clone, Copy)]
struct EntryInfo {
    index: usize,
    size: u64,
    modified: Option<SystemTime>,
}

struct OpenArchive {
    archive: ZipArchive<BufReader<File>>,
    entries: BTreeMap<String, EntryInfo>,
    archive_modified: Option<SystemTime>,
}

impl fmt::Debug for OpenArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenArchive")
            .field("entries", &self.entries.len())
            .field("archive_modified", &self.archive_modified)
            .finish_non_exhaustive()
    }
}

/// Pack files stored in a zip archive.
///
/// The archive is opened once; every read goes through that single handle.
#[derive(Debug)]
pub struct ArchiveStorage {
    path: PathBuf,
    handle: Mutex<Option<OpenArchive>>,
}

impl ArchiveStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry(&self, name: &str) -> io::Result<Option<EntryInfo>> {
        let handle = self.handle.lock();
        let open = handle.as_ref().ok_or_else(not_open)?;
        Ok(open.entries.get(&normalize_name(name)).copied())
    }
}

impl PackStorage for ArchiveStorage {
    fn open(&mut self) -> io::Result<()> {
        let handle = self.handle.get_mut();
        if handle.is_some() {
            return Ok(());
        }

        let file = File::open(&self.path)?;
        let archive_modified = file.metadata().and_then(|m| m.modified()).ok();
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(io::Error::other)?;

        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(io::Error::other)?;
            if entry.is_dir() {
                continue;
            }
            let stamp: Option<zip::DateTime> = entry.last_modified().into();
            entries.insert(
                normalize_name(entry.name()),
                EntryInfo {
                    index,
                    size: entry.size(),
                    modified: stamp.and_then(zip_time_to_system),
                },
            );
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "Opened pack archive"
        );
        *handle = Some(OpenArchive {
            archive,
            entries,
            archive_modified,
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    fn find(&self, prefix: &str, extension: Option<&str>) -> io::Result<Vec<String>> {
        let prefix = normalize_name(prefix);
        let handle = self.handle.lock();
        let open = handle.as_ref().ok_or_else(not_open)?;

        // BTreeMap keys are already sorted
        Ok(open
            .entries
            .keys()
            .filter(|name| matches_filter(name, &prefix, extension))
            .cloned()
            .collect())
    }

    fn open_stream(&self, name: &str) -> io::Result<Option<StorageStream>> {
        let Some(bytes) = self.read(name)? else {
            return Ok(None);
        };
        let len = bytes.len() as u64;
        Ok(Some(StorageStream {
            reader: Box::new(Cursor::new(bytes)),
            len: Some(len),
        }))
    }

    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let mut handle = self.handle.lock();
        let open = handle.as_mut().ok_or_else(not_open)?;
        let Some(info) = open.entries.get(&normalize_name(name)).copied() else {
            return Ok(None);
        };

        let mut entry = open.archive.by_index(info.index).map_err(io::Error::other)?;
        let mut bytes = Vec::with_capacity(capacity_hint(info.size));
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn contains(&self, name: &str) -> bool {
        matches!(self.entry(name), Ok(Some(_)))
    }

    fn len(&self, name: &str) -> io::Result<Option<u64>> {
        Ok(self.entry(name)?.map(|info| info.size))
    }

    fn modified(&self, name: &str) -> io::Result<Option<SystemTime>> {
        let handle = self.handle.lock();
        let open = handle.as_ref().ok_or_else(not_open)?;
        Ok(open
            .entries
            .get(&normalize_name(name))
            .and_then(|info| info.modified.or(open.archive_modified)))
    }

    fn dispose(&mut self) {
        if self.handle.get_mut().take().is_some() {
            tracing::debug!(path = %self.path.display(), "Closed pack archive");
        }
    }
}

/// Convert a zip timestamp (local time without zone, read as UTC).
fn zip_time_to_system(stamp: zip::DateTime) -> Option<SystemTime> {
    let date = NaiveDate::from_ymd_opt(
        i32::from(stamp.year()),
        u32::from(stamp.month()),
        u32::from(stamp.day()),
    )?;
    let time = date.and_hms_opt(
        u32::from(stamp.hour()),
        u32::from(stamp.minute()),
        u32::from(stamp.second()),
    )?;
    Some(time.and_utc().into())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;
    use crate::pack::{Pack, PackContext, PackError, PackKind, MANIFEST_NAME};

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default()
            .last_modified_time(zip::DateTime::from_date_and_time(2021, 6, 15, 12, 30, 0).unwrap());
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn open_storage(files: &[(&str, &str)]) -> (TempDir, ArchiveStorage) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pack.zip");
        write_zip(&path, files);
        let mut storage = ArchiveStorage::new(path);
        storage.open().unwrap();
        (temp, storage)
    }

    #[test]
    fn test_open_rejects_non_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.zip");
        std::fs::write(&path, "not a zip").unwrap();

        let mut storage = ArchiveStorage::new(path);
        assert!(storage.open().is_err());
        assert!(!storage.is_open());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let mut storage = ArchiveStorage::new(temp.path().join("missing.zip"));
        assert!(storage.open().is_err());
    }

    #[test]
    fn test_names_are_normalized() {
        let (_temp, storage) = open_storage(&[("textures/a.png", "png")]);

        assert!(storage.contains("textures/a.png"));
        assert!(storage.contains("\\textures\\a.png"));
        assert!(storage.contains("/textures/a.png"));
        assert_eq!(storage.read("\\textures\\a.png").unwrap().unwrap(), b"png");
    }

    #[test]
    fn test_find_scans_entries() {
        let (_temp, storage) = open_storage(&[
            ("textures/b.png", "b"),
            ("textures/a.png", "a"),
            ("models/c.obj", "c"),
        ]);

        assert_eq!(
            storage.find("textures/", Some("png")).unwrap(),
            vec!["textures/a.png", "textures/b.png"]
        );
        assert!(storage.find("sounds/", None).unwrap().is_empty());
    }

    #[test]
    fn test_stream_and_length() {
        let (_temp, storage) = open_storage(&[("data.txt", "twelve bytes")]);

        let mut stream = storage.open_stream("data.txt").unwrap().unwrap();
        assert_eq!(stream.len, Some(12));
        assert_eq!(storage.len("data.txt").unwrap(), Some(12));

        let mut text = String::new();
        stream.reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "twelve bytes");

        assert!(storage.open_stream("missing.txt").unwrap().is_none());
    }

    #[test]
    fn test_modified_uses_entry_timestamp() {
        let (_temp, storage) = open_storage(&[("a.txt", "a")]);

        let expected: SystemTime = NaiveDate::from_ymd_opt(2021, 6, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
            .and_utc()
            .into();
        assert_eq!(storage.modified("a.txt").unwrap(), Some(expected));
        assert_eq!(storage.modified("b.txt").unwrap(), None);
    }

    #[test]
    fn test_queries_after_dispose_fail() {
        let (_temp, mut storage) = open_storage(&[("a.txt", "a")]);

        storage.dispose();
        storage.dispose();

        assert!(!storage.is_open());
        assert!(!storage.contains("a.txt"));
        assert!(storage.read("a.txt").is_err());
        assert!(storage.find("", None).is_err());
    }

    /// Stored single-entry zip whose central directory claims a zip64
    /// uncompressed size of `u64::MAX`.
    fn write_oversized_zip(path: &Path) {
        let name = MANIFEST_NAME.as_bytes();
        let data = br#"{"Id":"huge"}"#;
        let date: u16 = (1 << 5) | 1;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        bytes.extend_from_slice(&20u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&date.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(data);

        let directory_offset = bytes.len() as u32;
        bytes.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        bytes.extend_from_slice(&45u16.to_le_bytes());
        bytes.extend_from_slice(&45u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&date.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&12u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(name);
        // Zip64 extended information: uncompressed size only
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8u16.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        let directory_size = bytes.len() as u32 - directory_offset;

        bytes.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&directory_size.to_le_bytes());
        bytes.extend_from_slice(&directory_offset.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());

        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_oversized_entry_does_not_panic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("huge.zip");
        write_oversized_zip(&path);

        let mut storage = ArchiveStorage::new(&path);
        if storage.open().is_ok() {
            // The bogus checksum fails the read; it must not abort
            assert!(storage.read(MANIFEST_NAME).is_err());
        }

        let pack = Pack::open(&path, PackKind::Archive, &PackContext::default());
        assert!(!pack.is_valid());
        assert!(matches!(pack.invalid_reason(), Some(PackError::Storage(_))));
    }
}
