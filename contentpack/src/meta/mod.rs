//! Out-of-band pack metadata.
//!
//! Packs are read-only, so anything the host wants to remember about a pack
//! (enabled state, last seen version, user annotations) lives in a single
//! JSON file next to the packs, keyed by pack identity:
//!
//! ```json
//! {
//!   "meta": {
//!     "author.my-pack": {
//!       "flags":   { "enabled": false },
//!       "strings": { "version": "1.2.0" },
//!       "numbers": {}
//!     }
//!   }
//! }
//! ```
//!
//! Entries are addressed through [`MetaEntry`] handles. Every setter that
//! actually changes a value saves the store synchronously, exactly once.

mod entry;

pub use entry::MetaEntry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::persist::{JsonDocument, JsonFile, PersistError, SaveOutcome};

/// Metadata file name inside the pack root.
pub const METADATA_FILENAME: &str = "packs.meta.json";

/// Metadata stored for one pack identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackMeta {
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,

    #[serde(default)]
    pub strings: BTreeMap<String, String>,

    #[serde(default)]
    pub numbers: BTreeMap<String, i64>,
}

impl PackMeta {
    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.strings.is_empty() && self.numbers.is_empty()
    }
}

/// On-disk shape of the metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDocument {
    #[serde(default)]
    pub meta: BTreeMap<String, PackMeta>,
}

impl JsonDocument for MetaDocument {
    fn is_empty(&self) -> bool {
        self.meta.values().all(PackMeta::is_empty)
    }

    fn on_loaded(&mut self) {
        self.meta.retain(|_, meta| !meta.is_empty());
    }
}

/// The persisted identity → [`PackMeta`] map.
///
/// Shared between all packs of a loader through an `Arc`.
#[derive(Debug)]
pub struct PackMetaStore {
    file: Mutex<JsonFile<MetaDocument>>,
    saves: AtomicUsize,
}

impl PackMetaStore {
    /// Load the store from `path`, starting empty if the file is missing or
    /// unreadable.
    pub fn open(path: impl AsRef<Path>) -> Arc<Self> {
        let path = path.as_ref();
        let file: JsonFile<MetaDocument> = JsonFile::load_or_default(path);
        tracing::debug!(
            path = %path.display(),
            packs = file.value().meta.len(),
            "Loaded pack metadata"
        );
        Arc::new(Self::from_file(file))
    }

    /// Create a store with no backing file.
    ///
    /// Changes are kept in memory; autosaves fail and are logged.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::from_file(JsonFile::detached(MetaDocument::default())))
    }

    fn from_file(file: JsonFile<MetaDocument>) -> Self {
        Self {
            file: Mutex::new(file),
            saves: AtomicUsize::new(0),
        }
    }

    /// Bind a handle to `identity`. Does not create stored data.
    pub fn entry(self: &Arc<Self>, identity: impl Into<String>) -> MetaEntry {
        MetaEntry::new(identity.into(), Arc::clone(self))
    }

    /// Path of the backing file.
    pub fn path(&self) -> Option<PathBuf> {
        self.file.lock().path().map(Path::to_path_buf)
    }

    /// Identities that have stored metadata.
    pub fn identities(&self) -> Vec<String> {
        self.file.lock().value().meta.keys().cloned().collect()
    }

    /// Copy of the metadata stored for `identity`.
    pub fn snapshot(&self, identity: &str) -> Option<PackMeta> {
        self.file.lock().value().meta.get(identity).cloned()
    }

    /// Forget everything stored for `identity`. Saves if anything was removed.
    pub fn remove(&self, identity: &str) -> bool {
        let mut file = self.file.lock();
        let removed = file.value_mut().meta.remove(identity).is_some();
        if removed {
            self.save_locked(&mut file);
        }
        removed
    }

    /// Save explicitly.
    pub fn save(&self) -> Result<SaveOutcome, PersistError> {
        self.file.lock().save()
    }

    /// Number of autosaves triggered by changes so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Read a value for `identity` without creating anything.
    pub(crate) fn read<R>(
        &self,
        identity: &str,
        lookup: impl FnOnce(&PackMeta) -> Option<R>,
    ) -> Option<R> {
        let file = self.file.lock();
        file.value().meta.get(identity).and_then(lookup)
    }

    /// Apply a change to `identity`'s metadata and save if it reports a change.
    ///
    /// `apply` returns whether it modified anything. An entry created only to
    /// run `apply` is dropped again when nothing changed.
    pub(crate) fn modify(
        &self,
        identity: &str,
        apply: impl FnOnce(&mut PackMeta) -> bool,
    ) -> bool {
        let mut file = self.file.lock();
        let doc = file.value_mut();
        let meta = doc.meta.entry(identity.to_string()).or_default();
        let changed = apply(meta);
        if meta.is_empty() {
            doc.meta.remove(identity);
        }

        if changed {
            self.save_locked(&mut file);
        }
        changed
    }

    fn save_locked(&self, file: &mut JsonFile<MetaDocument>) {
        self.saves.fetch_add(1, Ordering::Relaxed);
        match file.save() {
            Ok(outcome) => tracing::debug!(?outcome, "Saved pack metadata"),
            Err(e) => tracing::warn!(error = %e, "Failed to save pack metadata"),
        }
    }
}
