//! Views over files opened from a pack.
//!
//! Each wrapper borrows the [`Pack`] it came from and carries the resource
//! name and modification time alongside the content.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::kvtext::{KvStore, KvValue};
use crate::pack::storage::{capacity_hint, ReadSeek, StorageStream};
use crate::pack::Pack;

/// Errors reading resource content.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The backend did not report a length, so the content cannot be sized.
    #[error("length of '{name}' is unknown")]
    UnknownLength { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A readable stream over one pack file.
pub struct ResourceStream<'p> {
    pack: &'p Pack,
    name: String,
    modified: Option<SystemTime>,
    stream: Box<dyn ReadSeek>,
    len: Option<u64>,
    bytes: Option<Vec<u8>>,
}

impl<'p> ResourceStream<'p> {
    pub(crate) fn new(
        pack: &'p Pack,
        name: String,
        modified: Option<SystemTime>,
        stream: StorageStream,
    ) -> Self {
        Self {
            pack,
            name,
            modified,
            stream: stream.reader,
            len: stream.len,
            bytes: None,
        }
    }

    pub fn pack(&self) -> &'p Pack {
        self.pack
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Length in bytes, if known.
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// Full content of the resource.
    ///
    /// Read once and cached. The stream position is left where it was.
    pub fn bytes(&mut self) -> Result<&[u8], ResourceError> {
        if self.bytes.is_none() {
            let len = self.len.ok_or_else(|| ResourceError::UnknownLength {
                name: self.name.clone(),
            })?;

            let position = self.stream.stream_position()?;
            self.stream.seek(SeekFrom::Start(0))?;
            let mut bytes = Vec::with_capacity(capacity_hint(len));
            let read = (&mut self.stream).take(len).read_to_end(&mut bytes);
            self.stream.seek(SeekFrom::Start(position))?;
            read?;

            self.bytes = Some(bytes);
        }
        Ok(self.bytes.as_deref().unwrap_or_default())
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    pub fn text(&mut self) -> Result<String, ResourceError> {
        Ok(String::from_utf8_lossy(self.bytes()?).into_owned())
    }

    /// Take the underlying stream.
    pub fn into_reader(self) -> Box<dyn ReadSeek> {
        self.stream
    }
}

impl Read for ResourceStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Seek for ResourceStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.stream.seek(pos)
    }
}

impl fmt::Debug for ResourceStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStream")
            .field("pack", &self.pack.id())
            .field("name", &self.name)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// A pack file parsed as JSON.
#[derive(Debug)]
pub struct ResourceJson<'p> {
    pack: &'p Pack,
    name: String,
    modified: Option<SystemTime>,
    value: Value,
}

impl<'p> ResourceJson<'p> {
    pub(crate) fn new(
        pack: &'p Pack,
        name: String,
        modified: Option<SystemTime>,
        value: Value,
    ) -> Self {
        Self {
            pack,
            name,
            modified,
            value,
        }
    }

    pub fn pack(&self) -> &'p Pack {
        self.pack
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Deserialize the document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ResourceError> {
        Ok(T::deserialize(&self.value)?)
    }
}

/// A pack file parsed as a `key: value` descriptor.
#[derive(Debug)]
pub struct ResourceMeta<'p> {
    pack: &'p Pack,
    name: String,
    modified: Option<SystemTime>,
    store: KvStore,
}

impl<'p> ResourceMeta<'p> {
    pub(crate) fn new(
        pack: &'p Pack,
        name: String,
        modified: Option<SystemTime>,
        store: KvStore,
    ) -> Self {
        Self {
            pack,
            name,
            modified,
            store,
        }
    }

    pub fn pack(&self) -> &'p Pack {
        self.pack
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn get(&self, key: &str) -> KvValue<'_> {
        self.store.get(key)
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn into_store(self) -> KvStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;

    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;
    use crate::pack::{PackContext, PackKind, MANIFEST_NAME};

    fn pack_with(root: &Path, files: &[(&str, &str)]) -> Pack {
        fs::write(root.join(MANIFEST_NAME), r#"{"Id":"res"}"#).unwrap();
        for (name, content) in files {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Pack::open(root, PackKind::Directory, &PackContext::default())
    }

    #[test]
    fn test_stream_metadata() {
        let temp = TempDir::new().unwrap();
        let pack = pack_with(temp.path(), &[("a/b.txt", "hello")]);

        let stream = pack.open_stream("a\\b.txt").unwrap();
        assert_eq!(stream.pack().id(), "res");
        assert_eq!(stream.name(), "a/b.txt");
        assert_eq!(stream.len(), Some(5));
        assert!(stream.modified().is_some());
    }

    #[test]
    fn test_bytes_restores_position_and_caches() {
        let temp = TempDir::new().unwrap();
        let pack = pack_with(temp.path(), &[("data.txt", "0123456789")]);
        let mut stream = pack.open_stream("data.txt").unwrap();

        let mut head = [0u8; 3];
        stream.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"012");

        assert_eq!(ResourceStream::bytes(&mut stream).unwrap(), b"0123456789");
        assert_eq!(stream.stream_position().unwrap(), 3);

        // Cached: further reads do not disturb it
        let mut rest = String::new();
        stream.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "3456789");
        assert_eq!(stream.text().unwrap(), "0123456789");
    }

    #[test]
    fn test_bytes_requires_known_length() {
        let temp = TempDir::new().unwrap();
        let pack = pack_with(temp.path(), &[]);
        let mut stream = ResourceStream::new(
            &pack,
            "generated".to_string(),
            None,
            StorageStream {
                reader: Box::new(Cursor::new(b"abc".to_vec())),
                len: None,
            },
        );

        assert!(matches!(
            ResourceStream::bytes(&mut stream),
            Err(ResourceError::UnknownLength { name }) if name == "generated"
        ));

        let mut all = Vec::new();
        stream.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"abc");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        speed: u32,
        label: String,
    }

    #[test]
    fn test_json_deserializes() {
        let temp = TempDir::new().unwrap();
        let pack = pack_with(temp.path(), &[("s.json", r#"{"speed":4,"label":"fast"}"#)]);

        let json = pack.open_json("s.json").unwrap();
        assert_eq!(json.name(), "s.json");
        assert_eq!(
            json.deserialize::<Settings>().unwrap(),
            Settings {
                speed: 4,
                label: "fast".to_string()
            }
        );

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            missing: bool,
        }
        assert!(matches!(json.deserialize::<Wrong>(), Err(ResourceError::Json(_))));
    }

    #[test]
    fn test_meta_descriptor() {
        let temp = TempDir::new().unwrap();
        let pack = pack_with(temp.path(), &[("about.txt", "# about\ntitle: Demo\nsize: 12\n")]);

        let meta = pack.open_meta("about.txt").unwrap();
        assert_eq!(meta.get("title").as_str(), Some("Demo"));
        assert_eq!(meta.get("size").as_int_or(0), 12);
        assert!(!meta.store().is_mutable());
        assert_eq!(meta.into_store().len(), 2);
    }
}
