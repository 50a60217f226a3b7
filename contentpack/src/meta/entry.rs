//! Identity-bound metadata handle.

use std::fmt;
use std::sync::Arc;

use super::{PackMeta, PackMetaStore};

/// Handle to one pack's metadata.
///
/// Getters never create stored data: an absent key yields the caller's
/// default. Setters write through to the shared store, which saves itself
/// once per actual change; writing the value already stored is a no-op.
#[derive(Clone)]
pub struct MetaEntry {
    identity: String,
    store: Arc<PackMetaStore>,
}

impl MetaEntry {
    pub(super) fn new(identity: String, store: Arc<PackMetaStore>) -> Self {
        Self { identity, store }
    }

    /// Identity this handle is bound to.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The owning store.
    pub fn store(&self) -> &Arc<PackMetaStore> {
        &self.store
    }

    /// Copy of everything stored for this identity.
    pub fn snapshot(&self) -> PackMeta {
        self.store.snapshot(&self.identity).unwrap_or_default()
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.store
            .read(&self.identity, |meta| meta.flags.get(key).copied())
            .unwrap_or(default)
    }

    /// Returns whether the stored value changed.
    pub fn set_flag(&self, key: &str, value: bool) -> bool {
        self.store.modify(&self.identity, |meta| {
            meta.flags.insert(key.to_string(), value) != Some(value)
        })
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.store
            .read(&self.identity, |meta| meta.strings.get(key).cloned())
            .unwrap_or_else(|| default.to_string())
    }

    /// Returns whether the stored value changed.
    pub fn set_string(&self, key: &str, value: &str) -> bool {
        self.store.modify(&self.identity, |meta| {
            match meta.strings.get(key) {
                Some(current) if current == value => false,
                _ => {
                    meta.strings.insert(key.to_string(), value.to_string());
                    true
                }
            }
        })
    }

    pub fn number(&self, key: &str, default: i64) -> i64 {
        self.store
            .read(&self.identity, |meta| meta.numbers.get(key).copied())
            .unwrap_or(default)
    }

    /// Returns whether the stored value changed.
    pub fn set_number(&self, key: &str, value: i64) -> bool {
        self.store.modify(&self.identity, |meta| {
            meta.numbers.insert(key.to_string(), value) != Some(value)
        })
    }
}

impl fmt::Debug for MetaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaEntry")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
