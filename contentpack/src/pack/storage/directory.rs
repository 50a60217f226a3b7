//! Directory-backed pack storage.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use super::{matches_filter, normalize_name, PackStorage, StorageStream};

/// Pack files stored as a plain directory tree.
///
/// Holds no handles; [`dispose`](PackStorage::dispose) only marks it closed.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
    open: bool,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a stored name onto the filesystem.
    ///
    /// Names that would escape the root are rejected.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let name = normalize_name(name);
        if name.is_empty() {
            return None;
        }

        let relative = Path::new(&name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            tracing::debug!(name = %name, "Rejecting pack path outside the pack root");
            return None;
        }
        Some(self.root.join(relative))
    }

    fn file_metadata(&self, name: &str) -> io::Result<Option<(PathBuf, fs::Metadata)>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some((path, meta))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn walk(&self, dir: &Path, relative: &str, names: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 name");
                continue;
            };

            let name = if relative.is_empty() {
                file_name.to_string()
            } else {
                format!("{}/{}", relative, file_name)
            };

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.walk(&entry.path(), &name, names)?;
            } else {
                names.push(name);
            }
        }
        Ok(())
    }
}

impl PackStorage for DirectoryStorage {
    fn open(&mut self) -> io::Result<()> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("pack directory not found: {}", self.root.display()),
            ));
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn find(&self, prefix: &str, extension: Option<&str>) -> io::Result<Vec<String>> {
        let prefix = normalize_name(prefix);
        let mut names = Vec::new();
        self.walk(&self.root, "", &mut names)?;
        names.retain(|name| matches_filter(name, &prefix, extension));
        names.sort();
        Ok(names)
    }

    fn open_stream(&self, name: &str) -> io::Result<Option<StorageStream>> {
        let Some((path, meta)) = self.file_metadata(name)? else {
            return Ok(None);
        };
        let file = File::open(path)?;
        Ok(Some(StorageStream {
            reader: Box::new(file),
            len: Some(meta.len()),
        }))
    }

    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if path.is_dir() => {
                tracing::debug!(path = %path.display(), error = %e, "Not a file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn contains(&self, name: &str) -> bool {
        matches!(self.file_metadata(name), Ok(Some(_)))
    }

    fn len(&self, name: &str) -> io::Result<Option<u64>> {
        Ok(self.file_metadata(name)?.map(|(_, meta)| meta.len()))
    }

    fn modified(&self, name: &str) -> io::Result<Option<SystemTime>> {
        match self.file_metadata(name)? {
            Some((_, meta)) => meta.modified().map(Some),
            None => Ok(None),
        }
    }

    fn dispose(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::{Duration, UNIX_EPOCH};

    use filetime::FileTime;
    use tempfile::TempDir;

    use super::*;

    fn storage_with(files: &[(&str, &str)]) -> (TempDir, DirectoryStorage) {
        let temp = TempDir::new().unwrap();
        for (name, content) in files {
            let path = temp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut storage = DirectoryStorage::new(temp.path());
        storage.open().unwrap();
        (temp, storage)
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let mut storage = DirectoryStorage::new(temp.path().join("missing"));
        assert!(storage.open().is_err());
        assert!(!storage.is_open());
    }

    #[test]
    fn test_find_is_recursive_and_filtered() {
        let (_temp, storage) = storage_with(&[
            ("textures/b.png", "b"),
            ("textures/deep/a.png", "a"),
            ("textures/notes.txt", "n"),
            ("models/c.obj", "c"),
        ]);

        assert_eq!(
            storage.find("textures/", Some(".png")).unwrap(),
            vec!["textures/b.png", "textures/deep/a.png"]
        );
        assert_eq!(storage.find("", None).unwrap().len(), 4);
        assert_eq!(storage.find("\\models", None).unwrap(), vec!["models/c.obj"]);
    }

    #[test]
    fn test_missing_files_are_absent() {
        let (_temp, storage) = storage_with(&[("a.txt", "a")]);

        assert!(storage.open_stream("b.txt").unwrap().is_none());
        assert!(storage.read("b.txt").unwrap().is_none());
        assert!(storage.modified("b.txt").unwrap().is_none());
        assert!(!storage.contains("b.txt"));
    }

    #[test]
    fn test_directories_are_not_files() {
        let (_temp, storage) = storage_with(&[("sub/a.txt", "a")]);

        assert!(!storage.contains("sub"));
        assert!(storage.open_stream("sub").unwrap().is_none());
        assert!(storage.read("sub").unwrap().is_none());
    }

    #[test]
    fn test_paths_cannot_escape_root() {
        let (temp, storage) = storage_with(&[("inner/a.txt", "a")]);
        fs::write(temp.path().join("outside.txt"), "x").unwrap();
        let inner = DirectoryStorage::new(temp.path().join("inner"));

        assert!(!inner.contains("../outside.txt"));
        assert!(inner.read("../outside.txt").unwrap().is_none());
        assert!(storage.contains("outside.txt"));
    }

    #[test]
    fn test_stream_reports_length_and_content() {
        let (_temp, storage) = storage_with(&[("data/blob.bin", "hello")]);

        let mut stream = storage.open_stream("\\data\\blob.bin").unwrap().unwrap();
        assert_eq!(stream.len, Some(5));

        let mut text = String::new();
        stream.reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(storage.len("data/blob.bin").unwrap(), Some(5));
    }

    #[test]
    fn test_modified_reads_filesystem_time() {
        let (temp, storage) = storage_with(&[("a.txt", "a")]);
        let stamp = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        filetime::set_file_mtime(
            temp.path().join("a.txt"),
            FileTime::from_system_time(stamp),
        )
        .unwrap();

        assert_eq!(storage.modified("a.txt").unwrap(), Some(stamp));
    }

    #[test]
    fn test_dispose_is_repeatable() {
        let (_temp, mut storage) = storage_with(&[]);
        storage.dispose();
        storage.dispose();
        assert!(!storage.is_open());
    }
}
