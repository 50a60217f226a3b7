//! Storage backends behind a [`Pack`](super::Pack).
//!
//! A pack's files live either in a zip archive ([`ArchiveStorage`]) or in a
//! plain directory ([`DirectoryStorage`]). Both are addressed with relative,
//! `/`-separated names; see [`normalize_name`].
//!
//! Backends report I/O failures as `io::Result`. The pack facade is what
//! turns them into absence.

mod archive;
mod directory;

pub use archive::ArchiveStorage;
pub use directory::DirectoryStorage;

use std::fmt;
use std::io::{self, Read, Seek};
use std::time::SystemTime;

/// A readable, seekable byte source.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// An open stream over one stored file.
pub struct StorageStream {
    pub reader: Box<dyn ReadSeek>,

    /// Length in bytes, when the backend knows it.
    pub len: Option<u64>,
}

impl fmt::Debug for StorageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageStream")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Uniform access to a pack's stored files.
pub trait PackStorage: Send + Sync + fmt::Debug {
    /// Acquire backend resources. Called once before any query.
    fn open(&mut self) -> io::Result<()>;

    /// Whether the backend is open and not disposed.
    fn is_open(&self) -> bool;

    /// Names starting with `prefix` and, if given, ending with `extension`.
    ///
    /// Results are sorted.
    fn find(&self, prefix: &str, extension: Option<&str>) -> io::Result<Vec<String>>;

    /// Open a stream over `name`, or `None` if there is no such file.
    fn open_stream(&self, name: &str) -> io::Result<Option<StorageStream>>;

    /// Read `name` fully.
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(mut stream) = self.open_stream(name)? else {
            return Ok(None);
        };
        let mut bytes = Vec::with_capacity(capacity_hint(stream.len.unwrap_or(0)));
        stream.reader.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Whether `name` exists.
    fn contains(&self, name: &str) -> bool;

    /// Size of `name` in bytes.
    fn len(&self, name: &str) -> io::Result<Option<u64>>;

    /// Last modification time of `name`.
    fn modified(&self, name: &str) -> io::Result<Option<SystemTime>>;

    /// Release backend resources. Calling it again is a no-op.
    fn dispose(&mut self);
}

/// Normalize a stored name: `\` becomes `/` and leading slashes are dropped.
///
/// ```
/// use contentpack::pack::storage::normalize_name;
///
/// assert_eq!(normalize_name("\\textures\\a.png"), "textures/a.png");
/// assert_eq!(normalize_name("//models/c.obj"), "models/c.obj");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Whether `name` passes a `find` filter.
///
/// Extensions compare ASCII case-insensitively and may be given with or
/// without the leading dot.
pub(crate) fn matches_filter(name: &str, prefix: &str, extension: Option<&str>) -> bool {
    if !name.starts_with(prefix) {
        return false;
    }
    let Some(extension) = extension.filter(|e| !e.is_empty()) else {
        return true;
    };

    let dotted = if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    };
    name.len() >= dotted.len()
        && name.is_char_boundary(name.len() - dotted.len())
        && name[name.len() - dotted.len()..].eq_ignore_ascii_case(&dotted)
}

/// Largest buffer reserved up front from a declared size.
const PREALLOCATE_LIMIT: u64 = 1 << 20;

/// Initial capacity for reading `len` bytes. Declared sizes come from
/// untrusted metadata, so the reservation is capped.
pub(crate) fn capacity_hint(len: u64) -> usize {
    len.min(PREALLOCATE_LIMIT) as usize
}

pub(crate) fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "pack storage is not open")
}
