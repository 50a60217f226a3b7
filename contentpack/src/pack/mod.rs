//! Content packs.
//!
//! A [`Pack`] is a read-only bundle of files with an `Info.json` manifest
//! declaring its identity and version. Packs are stored either as zip
//! archives or as directories; see [`storage`].
//!
//! Construction validates the pack:
//!
//! ```text
//! open storage ──fail──▶ Invalid
//!      │
//! read Info.json ──missing / malformed──▶ Invalid
//!      │
//! check TargetBuild ──mismatch && !force_load──▶ Invalid
//!      │
//!    Valid ─▶ bind metadata entry, record version
//! ```
//!
//! Queries never fail: I/O errors are logged at debug level and reported as
//! absence.

mod manifest;
pub mod storage;
mod version;

pub use manifest::{PackManifest, MANIFEST_NAME};
pub use version::{PackVersion, VersionError};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;
use thiserror::Error;

use crate::kvtext::KvStore;
use crate::meta::{MetaEntry, PackMetaStore};
use crate::resource::{ResourceJson, ResourceMeta, ResourceStream};
use storage::{ArchiveStorage, DirectoryStorage, PackStorage};

/// Metadata flag holding the enabled state.
pub const ENABLED_FLAG: &str = "enabled";

/// Metadata string recording the last seen manifest version.
pub const VERSION_KEY: &str = "version";

/// How a pack is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackKind {
    Archive,
    Directory,
}

impl fmt::Display for PackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackKind::Archive => write!(f, "archive"),
            PackKind::Directory => write!(f, "directory"),
        }
    }
}

/// Why a pack failed validation.
#[derive(Debug, Error)]
pub enum PackError {
    /// The backing archive or directory could not be opened or read.
    #[error("cannot open pack storage: {0}")]
    Storage(#[source] io::Error),

    /// No `Info.json` at the pack root.
    #[error("pack has no Info.json")]
    MissingManifest,

    /// `Info.json` is not a JSON object.
    #[error("malformed Info.json: {0}")]
    MalformedManifest(String),

    /// The pack targets another host build and force loading is off.
    #[error("pack targets build {target}, host is build {host}")]
    IncompatibleBuild { target: i64, host: i64 },
}

/// Host-provided context for opening packs.
#[derive(Debug, Clone)]
pub struct PackContext {
    /// Store valid packs bind their metadata entry to.
    pub meta: Option<Arc<PackMetaStore>>,

    /// Build number of the running host.
    pub host_build: Option<i64>,

    /// Keep packs whose `TargetBuild` differs from `host_build`.
    pub force_load: bool,
}

impl Default for PackContext {
    fn default() -> Self {
        Self {
            meta: None,
            host_build: None,
            force_load: true,
        }
    }
}

impl PackContext {
    pub fn with_meta(mut self, meta: Arc<PackMetaStore>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_host_build(mut self, build: i64) -> Self {
        self.host_build = Some(build);
        self
    }

    pub fn with_force_load(mut self, force_load: bool) -> Self {
        self.force_load = force_load;
        self
    }
}

type EnabledListener = Box<dyn Fn(&Pack, bool) + Send + Sync>;

/// A content pack.
///
/// Equality and hashing use the pack identity only.
pub struct Pack {
    path: PathBuf,
    kind: PackKind,
    storage: Box<dyn PackStorage>,
    manifest: PackManifest,
    version: PackVersion,
    invalid: Option<PackError>,
    meta: Option<MetaEntry>,
    listeners: Vec<EnabledListener>,
    disposed: bool,
}

impl Pack {
    /// Open and validate the pack at `path`.
    pub fn open(path: impl Into<PathBuf>, kind: PackKind, ctx: &PackContext) -> Self {
        let path = path.into();
        let storage: Box<dyn PackStorage> = match kind {
            PackKind::Archive => Box::new(ArchiveStorage::new(&path)),
            PackKind::Directory => Box::new(DirectoryStorage::new(&path)),
        };
        Self::open_with_storage(path, kind, storage, ctx)
    }

    /// Open and validate a pack over a caller-supplied backend.
    pub fn open_with_storage(
        path: impl Into<PathBuf>,
        kind: PackKind,
        storage: Box<dyn PackStorage>,
        ctx: &PackContext,
    ) -> Self {
        let path = path.into();
        let mut pack = Self {
            manifest: PackManifest::with_name(default_name(&path, kind)),
            path,
            kind,
            storage,
            version: PackVersion::ZERO,
            invalid: None,
            meta: None,
            listeners: Vec::new(),
            disposed: false,
        };

        if let Err(e) = pack.validate(ctx) {
            match &e {
                PackError::MissingManifest => {
                    tracing::debug!(path = %pack.path.display(), "Skipping folder without manifest")
                }
                PackError::MalformedManifest(_) => {
                    tracing::error!(path = %pack.path.display(), error = %e, "Invalid pack")
                }
                _ => tracing::warn!(path = %pack.path.display(), error = %e, "Invalid pack"),
            }
            pack.invalid = Some(e);
            return pack;
        }

        if let Some(store) = &ctx.meta {
            pack.meta = Some(store.entry(pack.manifest.id.clone()));
            pack.record_version();
        }

        tracing::debug!(
            id = %pack.manifest.id,
            version = %pack.version,
            kind = %pack.kind,
            path = %pack.path.display(),
            "Opened pack"
        );
        pack
    }

    fn validate(&mut self, ctx: &PackContext) -> Result<(), PackError> {
        self.storage.open().map_err(PackError::Storage)?;

        let bytes = self
            .storage
            .read(MANIFEST_NAME)
            .map_err(PackError::Storage)?
            .ok_or(PackError::MissingManifest)?;

        let object = match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                return Err(PackError::MalformedManifest(
                    "expected a JSON object".to_string(),
                ))
            }
            Err(e) => return Err(PackError::MalformedManifest(e.to_string())),
        };

        let ignored = self.manifest.apply(&object);
        if !ignored.is_empty() {
            tracing::debug!(
                path = %self.path.display(),
                fields = ?ignored,
                "Ignoring manifest fields with unexpected types"
            );
        }

        let decoded = PackVersion::parse_lenient(&self.manifest.version);
        if let Some(e) = &decoded.fallback {
            tracing::debug!(id = %self.manifest.id, error = %e, "Treating pack version as 0.0.0.0");
        }
        self.version = decoded.value;

        if let (Some(target), Some(host)) = (self.manifest.target_build, ctx.host_build) {
            if target != host {
                tracing::warn!(
                    id = %self.manifest.id,
                    target,
                    host,
                    "Pack was built for a different host build"
                );
                if !ctx.force_load {
                    return Err(PackError::IncompatibleBuild { target, host });
                }
            }
        }

        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn display_name(&self) -> &str {
        &self.manifest.display_name
    }

    pub fn author(&self) -> &str {
        &self.manifest.author
    }

    pub fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    /// Parsed manifest version; `0.0.0.0` when missing or unparseable.
    pub fn version(&self) -> PackVersion {
        self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> PackKind {
        self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }

    /// Why validation failed, if it did.
    pub fn invalid_reason(&self) -> Option<&PackError> {
        self.invalid.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Metadata entry, bound once the pack is valid and a store was given.
    pub fn meta(&self) -> Option<&MetaEntry> {
        self.meta.as_ref()
    }

    // Metadata facade

    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.meta
            .as_ref()
            .map_or(default, |entry| entry.flag(key, default))
    }

    pub fn set_flag(&self, key: &str, value: bool) -> bool {
        self.meta
            .as_ref()
            .is_some_and(|entry| entry.set_flag(key, value))
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.meta
            .as_ref()
            .map_or_else(|| default.to_string(), |entry| entry.string(key, default))
    }

    pub fn set_string(&self, key: &str, value: &str) -> bool {
        self.meta
            .as_ref()
            .is_some_and(|entry| entry.set_string(key, value))
    }

    pub fn number(&self, key: &str, default: i64) -> i64 {
        self.meta
            .as_ref()
            .map_or(default, |entry| entry.number(key, default))
    }

    pub fn set_number(&self, key: &str, value: i64) -> bool {
        self.meta
            .as_ref()
            .is_some_and(|entry| entry.set_number(key, value))
    }

    /// Whether the pack is enabled. Defaults to true.
    pub fn enabled(&self) -> bool {
        self.flag(ENABLED_FLAG, true)
    }

    /// Set the enabled state.
    ///
    /// Listeners run only when the effective state actually changes; the
    /// return value says whether it did.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let was = self.enabled();
        self.set_flag(ENABLED_FLAG, enabled);
        let now = self.enabled();
        if now == was {
            return false;
        }

        tracing::info!(id = %self.id(), enabled = now, "Pack enabled state changed");
        for listener in &self.listeners {
            listener(self, now);
        }
        true
    }

    /// Register a listener for enabled state transitions.
    pub fn on_enabled_changed(&mut self, listener: impl Fn(&Pack, bool) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Store the manifest version string in the metadata entry.
    pub fn record_version(&self) -> bool {
        self.set_string(VERSION_KEY, &self.manifest.version)
    }

    // Resource queries

    /// Stored names under `prefix`, optionally filtered by extension.
    pub fn find(&self, prefix: &str, extension: Option<&str>) -> Vec<String> {
        if !self.is_queryable() {
            return Vec::new();
        }
        self.storage
            .find(prefix, extension)
            .unwrap_or_else(|e| self.absent("find", prefix, e))
    }

    /// Open a stream over `name`.
    pub fn open_stream(&self, name: &str) -> Option<ResourceStream<'_>> {
        if !self.is_queryable() {
            return None;
        }
        let stream = self
            .storage
            .open_stream(name)
            .unwrap_or_else(|e| self.absent("open", name, e))?;
        Some(ResourceStream::new(
            self,
            storage::normalize_name(name),
            self.last_write_time(name),
            stream,
        ))
    }

    /// Read `name` fully.
    pub fn open_resource(&self, name: &str) -> Option<Vec<u8>> {
        if !self.is_queryable() {
            return None;
        }
        self.storage
            .read(name)
            .unwrap_or_else(|e| self.absent("read", name, e))
    }

    /// Parse `name` as JSON.
    pub fn open_json(&self, name: &str) -> Option<ResourceJson<'_>> {
        let bytes = self.open_resource(name)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(ResourceJson::new(
                self,
                storage::normalize_name(name),
                self.last_write_time(name),
                value,
            )),
            Err(e) => {
                tracing::warn!(pack = %self.id(), name, error = %e, "Malformed JSON resource");
                None
            }
        }
    }

    /// Parse `name` as a `key: value` descriptor.
    pub fn open_meta(&self, name: &str) -> Option<ResourceMeta<'_>> {
        let bytes = self.open_resource(name)?;
        let text = String::from_utf8_lossy(&bytes);
        Some(ResourceMeta::new(
            self,
            storage::normalize_name(name),
            self.last_write_time(name),
            KvStore::parse(&text),
        ))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_queryable() && self.storage.contains(name)
    }

    /// Last modification time of `name`.
    pub fn last_write_time(&self, name: &str) -> Option<SystemTime> {
        if !self.is_queryable() {
            return None;
        }
        self.storage
            .modified(name)
            .unwrap_or_else(|e| self.absent("stat", name, e))
    }

    fn is_queryable(&self) -> bool {
        !self.disposed && self.invalid.is_none()
    }

    fn absent<T: Default>(&self, op: &str, name: &str, error: io::Error) -> T {
        tracing::debug!(pack = %self.id(), op, name, error = %error, "Pack I/O failed");
        T::default()
    }

    /// Release the storage backend. Later calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.storage.dispose();
        tracing::trace!(id = %self.manifest.id, "Disposed pack");
    }
}

impl Drop for Pack {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl PartialEq for Pack {
    fn eq(&self, other: &Self) -> bool {
        self.manifest.id == other.manifest.id
    }
}

impl Eq for Pack {}

impl Hash for Pack {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.manifest.id.hash(state);
    }
}

impl fmt::Debug for Pack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pack")
            .field("id", &self.manifest.id)
            .field("version", &self.version)
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("valid", &self.is_valid())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Pack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.manifest.id, self.version)
    }
}

/// Identity a pack has before its manifest is read.
fn default_name(path: &Path, kind: PackKind) -> String {
    let name = match kind {
        PackKind::Archive => path.file_stem(),
        PackKind::Directory => path.file_name(),
    };
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
