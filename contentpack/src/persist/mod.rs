//! Whole-file JSON persistence for configuration-like objects.
//!
//! A [`JsonFile`] pairs a document with the path it was loaded from. Packs are
//! read-only artifacts, so only objects rooted outside of packs are writable:
//! anything loaded with [`JsonFile::load_bundled`] refuses to save.
//!
//! # Save semantics
//!
//! ```text
//! save()
//!  ├── read-only?        → Err(ReadOnly), disk untouched
//!  ├── no path?          → Err(NoPath)
//!  ├── document empty?   → on_deleting() → remove file → Ok(Deleted)
//!  └── otherwise         → write whole file (temp + rename) → on_saved() → Ok(Written)
//! ```

mod error;

pub use error::PersistError;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A document persisted by [`JsonFile`].
///
/// The hooks default to no-ops. Implementors override [`is_empty`] so that a
/// document with nothing worth keeping deletes its backing file instead of
/// writing an empty object.
///
/// [`is_empty`]: JsonDocument::is_empty
pub trait JsonDocument: Serialize + DeserializeOwned {
    /// Whether the document carries no data worth persisting.
    fn is_empty(&self) -> bool {
        false
    }

    /// Called after a successful load, before the document is handed out.
    fn on_loaded(&mut self) {}

    /// Called before the backing file of an empty document is deleted.
    ///
    /// Returning `false` cancels the deletion.
    fn on_deleting(&mut self) -> bool {
        true
    }

    /// Called after the document was written to disk.
    fn on_saved(&mut self) {}
}

/// Result of a successful [`JsonFile::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The whole document was written.
    Written,

    /// The document was empty; its backing file was removed (or never existed).
    Deleted,

    /// The document was empty but [`JsonDocument::on_deleting`] vetoed removal.
    DeleteCancelled,
}

/// A JSON document bound to its backing file.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: Option<PathBuf>,
    read_only: bool,
    value: T,
}

impl<T: JsonDocument> JsonFile<T> {
    /// Create a writable document for `path` without touching the disk.
    pub fn new(path: impl Into<PathBuf>, value: T) -> Self {
        Self {
            path: Some(path.into()),
            read_only: false,
            value,
        }
    }

    /// Create a writable document with no path yet.
    ///
    /// Saving fails until [`set_path`](Self::set_path) is called.
    pub fn detached(value: T) -> Self {
        Self {
            path: None,
            read_only: false,
            value,
        }
    }

    /// Load a document from `path`.
    ///
    /// Returns `None` if the file does not exist or cannot be parsed. Parse
    /// failures are logged, never propagated.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read JSON file");
                return None;
            }
        };

        let mut value: T = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to parse JSON file");
                return None;
            }
        };
        value.on_loaded();

        Some(Self {
            path: Some(path.to_path_buf()),
            read_only: false,
            value,
        })
    }

    /// Load a read-only document from an embedded resource.
    ///
    /// `name` only identifies the resource in log messages; no path is kept.
    pub fn load_bundled(name: &str, text: &str) -> Option<Self> {
        let mut value: T = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(resource = name, error = %e, "Failed to parse bundled JSON");
                return None;
            }
        };
        value.on_loaded();

        Some(Self {
            path: None,
            read_only: true,
            value,
        })
    }

    /// Load `path`, or start from `T::default()` bound to `path` if it is
    /// missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self
    where
        T: Default,
    {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|| Self::new(path, T::default()))
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rebind to a new backing file. Clears read-only mode.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
        self.read_only = false;
    }

    /// Whether this document was loaded from an embedded resource.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Borrow the document.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutably borrow the document.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Consume the wrapper, returning the document.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Persist the whole document, or delete the file if the document is empty.
    pub fn save(&mut self) -> Result<SaveOutcome, PersistError> {
        if self.read_only {
            return Err(PersistError::ReadOnly);
        }

        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                tracing::error!("Cannot save JSON document without a file path");
                return Err(PersistError::NoPath);
            }
        };

        if self.value.is_empty() {
            return self.delete_backing_file(&path);
        }

        if let Err(e) = write_json(&path, &self.value) {
            tracing::error!(path = %path.display(), error = %e, "Failed to save JSON file");
            return Err(e);
        }
        self.value.on_saved();

        Ok(SaveOutcome::Written)
    }

    fn delete_backing_file(&mut self, path: &Path) -> Result<SaveOutcome, PersistError> {
        if !self.value.on_deleting() {
            return Ok(SaveOutcome::DeleteCancelled);
        }

        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted empty JSON file");
                Ok(SaveOutcome::Deleted)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SaveOutcome::Deleted),
            Err(e) => Err(PersistError::Delete {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

/// Serialize `value` to `path`, creating parent directories as needed.
///
/// Writes to a sibling temp file first, then renames over the target.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    let write = |temp: &Path| -> io::Result<()> {
        let mut writer = BufWriter::new(fs::File::create(temp)?);
        serde_json::to_writer_pretty(&mut writer, value).map_err(io::Error::from)?;
        writer.write_all(b"\n")?;
        writer.flush()
    };

    write(&temp_path)
        .and_then(|()| fs::rename(&temp_path, path))
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            PersistError::Write {
                path: path.to_path_buf(),
                source: e,
            }
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Notes {
        #[serde(default)]
        entries: BTreeMap<String, String>,

        #[serde(skip)]
        loaded: bool,

        #[serde(skip)]
        saves: usize,

        #[serde(skip)]
        keep_file: bool,
    }

    impl JsonDocument for Notes {
        fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }

        fn on_loaded(&mut self) {
            self.loaded = true;
        }

        fn on_deleting(&mut self) -> bool {
            !self.keep_file
        }

        fn on_saved(&mut self) {
            self.saves += 1;
        }
    }

    fn notes(pairs: &[(&str, &str)]) -> Notes {
        Notes {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let temp = TempDir::new().unwrap();
        assert!(JsonFile::<Notes>::load(temp.path().join("missing.json")).is_none());
    }

    #[test]
    fn test_load_malformed_file_returns_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonFile::<Notes>::load(&path).is_none());
    }

    #[test]
    fn test_save_then_load_invokes_hooks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("notes.json");

        let mut file = JsonFile::new(&path, notes(&[("a", "1")]));
        assert_eq!(file.save().unwrap(), SaveOutcome::Written);
        assert_eq!(file.value().saves, 1);
        assert!(path.exists());

        let loaded = JsonFile::<Notes>::load(&path).unwrap();
        assert!(loaded.value().loaded);
        assert_eq!(loaded.value().entries["a"], "1");
        assert_eq!(loaded.path(), Some(path.as_path()));
        assert!(!loaded.is_read_only());
    }

    #[test]
    fn test_save_overwrites_whole_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.json");

        JsonFile::new(&path, notes(&[("a", "1"), ("b", "2")]))
            .save()
            .unwrap();
        JsonFile::new(&path, notes(&[("c", "3")])).save().unwrap();

        let loaded = JsonFile::<Notes>::load(&path).unwrap();
        assert_eq!(loaded.value().entries.len(), 1);
        assert!(loaded.value().entries.contains_key("c"));
        assert!(!temp.path().join("notes.json.tmp").exists());
    }

    #[test]
    fn test_save_empty_deletes_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.json");
        JsonFile::new(&path, notes(&[("a", "1")])).save().unwrap();
        assert!(path.exists());

        let mut file = JsonFile::new(&path, Notes::default());
        assert_eq!(file.save().unwrap(), SaveOutcome::Deleted);
        assert!(!path.exists());

        // Saving again must not recreate it
        assert_eq!(file.save().unwrap(), SaveOutcome::Deleted);
        assert!(!path.exists());
        assert_eq!(file.value().saves, 0);
    }

    #[test]
    fn test_delete_can_be_cancelled() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.json");
        JsonFile::new(&path, notes(&[("a", "1")])).save().unwrap();

        let mut file = JsonFile::new(
            &path,
            Notes {
                keep_file: true,
                ..Default::default()
            },
        );
        assert_eq!(file.save().unwrap(), SaveOutcome::DeleteCancelled);
        assert!(path.exists());
    }

    #[test]
    fn test_bundled_is_read_only() {
        let mut file = JsonFile::<Notes>::load_bundled("defaults", r#"{"entries":{"k":"v"}}"#)
            .unwrap();

        assert!(file.is_read_only());
        assert!(file.path().is_none());
        assert!(file.value().loaded);
        assert!(matches!(file.save(), Err(PersistError::ReadOnly)));
        assert_eq!(file.value().saves, 0);
    }

    #[test]
    fn test_set_path_makes_bundled_writable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("copy.json");
        let mut file =
            JsonFile::<Notes>::load_bundled("defaults", r#"{"entries":{"k":"v"}}"#).unwrap();

        file.set_path(&path);
        assert_eq!(file.save().unwrap(), SaveOutcome::Written);
        assert!(path.exists());
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut file = JsonFile::detached(notes(&[("a", "1")]));
        assert!(matches!(file.save(), Err(PersistError::NoPath)));
    }

    #[test]
    fn test_load_or_default_binds_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fresh.json");

        let mut file = JsonFile::<Notes>::load_or_default(&path);
        assert!(file.value().entries.is_empty());

        file.value_mut().entries.insert("x".into(), "y".into());
        file.save().unwrap();
        assert!(path.exists());
    }
}
