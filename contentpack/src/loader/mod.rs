//! Pack discovery, resolution and cross-pack queries.
//!
//! A [`PackLoader`] owns the resolved pack set for one pack root. The set is
//! discovered lazily on first access and cached until [`PackLoader::refresh`]
//! or [`PackLoader::dispose`].
//!
//! # Example
//!
//! ```no_run
//! use contentpack::loader::{LoaderConfig, PackLoader};
//!
//! let loader = PackLoader::new(LoaderConfig::new("/srv/packs"));
//! for pack in loader.packs() {
//!     println!("{} {}", pack.id(), pack.version());
//! }
//! let textures = loader.find("textures/", Some(".png"));
//! ```
//!
//! Queries consult packs in resolved order; enabled state is not taken into
//! account here.

mod config;
mod discovery;
mod error;
mod resolve;

pub use config::{builtin_packs, BundledPack, LoaderConfig};
pub use discovery::{find_candidates, Candidate};
pub use error::{LoaderError, LoaderResult};
pub use resolve::{Resolution, ResolvedPacks};

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use crate::meta::PackMetaStore;
use crate::pack::{Pack, PackContext, PackKind};
use crate::resource::{ResourceJson, ResourceMeta, ResourceStream};

/// Discovers and resolves packs under a root directory.
#[derive(Debug)]
pub struct PackLoader {
    config: LoaderConfig,
    meta: Arc<PackMetaStore>,
    packs: OnceLock<ResolvedPacks>,
}

impl PackLoader {
    /// Create a loader using the metadata file named by `config`.
    pub fn new(config: LoaderConfig) -> Self {
        let meta = PackMetaStore::open(config.meta_path());
        Self::with_meta_store(config, meta)
    }

    /// Create a loader sharing an existing metadata store.
    pub fn with_meta_store(config: LoaderConfig, meta: Arc<PackMetaStore>) -> Self {
        Self {
            config,
            meta,
            packs: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn meta_store(&self) -> &Arc<PackMetaStore> {
        &self.meta
    }

    /// Context packs are opened with.
    pub fn context(&self) -> PackContext {
        PackContext {
            meta: Some(Arc::clone(&self.meta)),
            host_build: self.config.host_build,
            force_load: self.config.force_load,
        }
    }

    /// The resolved pack set, discovering it on first use.
    pub fn packs(&self) -> &ResolvedPacks {
        self.packs.get_or_init(|| self.discover())
    }

    /// Whether discovery has run since creation or the last refresh.
    pub fn is_discovered(&self) -> bool {
        self.packs.get().is_some()
    }

    fn discover(&self) -> ResolvedPacks {
        let candidates = match find_candidates(&self.config) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    root = %self.config.root.display(),
                    error = %e,
                    "Failed to scan pack root"
                );
                Vec::new()
            }
        };

        let ctx = self.context();
        let resolved = ResolvedPacks::resolve(
            candidates
                .into_iter()
                .map(|c| Pack::open(c.path, c.kind, &ctx)),
        );

        // Losing duplicates recorded their version under the same identity
        for pack in &resolved {
            pack.record_version();
        }

        tracing::info!(
            root = %self.config.root.display(),
            packs = resolved.len(),
            "Resolved packs"
        );
        resolved
    }

    /// Drop the cached set so the next access rediscovers.
    pub fn refresh(&mut self) {
        if let Some(mut packs) = self.packs.take() {
            tracing::debug!(packs = packs.len(), "Discarding resolved packs");
            packs.dispose_all();
        }
    }

    /// Release every pack handle.
    ///
    /// A later query rediscovers, so call this on shutdown only.
    pub fn dispose(&mut self) {
        if let Some(mut packs) = self.packs.take() {
            tracing::info!(packs = packs.len(), "Disposing packs");
            packs.dispose_all();
        }
    }

    /// Pack with the given identity.
    pub fn get(&self, id: &str) -> Option<&Pack> {
        self.packs().get(id)
    }

    /// Mutable access to a pack, for registering listeners.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Pack> {
        if !self.is_discovered() {
            self.packs = OnceLock::from(self.discover());
        }
        self.packs.get_mut()?.get_mut(id)
    }

    /// Packs whose enabled flag is set, in resolved order.
    pub fn enabled_packs(&self) -> impl Iterator<Item = &Pack> {
        self.packs().iter().filter(|pack| pack.enabled())
    }

    /// Set a pack's enabled state.
    ///
    /// Returns `None` for an unknown identity, otherwise whether the state
    /// changed.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Option<bool> {
        self.get(id).map(|pack| pack.set_enabled(enabled))
    }

    /// Union of matching names across all packs, first-seen order.
    pub fn find(&self, prefix: &str, extension: Option<&str>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for pack in self.packs() {
            for name in pack.find(prefix, extension) {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packs().iter().any(|pack| pack.contains(name))
    }

    /// Modification time from the first pack that has `name`.
    pub fn last_write_time(&self, name: &str) -> Option<SystemTime> {
        self.packs()
            .iter()
            .find_map(|pack| pack.last_write_time(name))
    }

    pub fn open_stream(&self, name: &str) -> Option<ResourceStream<'_>> {
        self.packs().iter().find_map(|pack| pack.open_stream(name))
    }

    pub fn open_resource(&self, name: &str) -> Option<Vec<u8>> {
        self.packs().iter().find_map(|pack| pack.open_resource(name))
    }

    pub fn open_json(&self, name: &str) -> Option<ResourceJson<'_>> {
        self.packs().iter().find_map(|pack| pack.open_json(name))
    }

    pub fn open_meta(&self, name: &str) -> Option<ResourceMeta<'_>> {
        self.packs().iter().find_map(|pack| pack.open_meta(name))
    }

    /// Write a bundled pack into the root and add it to the resolved set.
    ///
    /// Returns `Ok(None)` when a file with the bundle's name already exists.
    /// Otherwise returns the resolved pack for the bundle's identity, which
    /// is an incumbent if that one has an equal or higher version.
    pub fn provision(&mut self, name: &str) -> LoaderResult<Option<&Pack>> {
        let bundle = self
            .config
            .bundle(name)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownBundle(name.to_string()))?;

        let mut resolved = self.packs.take().unwrap_or_else(|| self.discover());

        let target = self.config.root.join(&bundle.file_name);
        if target.exists() {
            tracing::info!(path = %target.display(), "Bundled pack already present");
            self.packs = OnceLock::from(resolved);
            return Ok(None);
        }

        if let Err(e) = write_bundle(&self.config.root, &target, &bundle.bytes) {
            self.packs = OnceLock::from(resolved);
            return Err(e);
        }

        let pack = Pack::open(&target, PackKind::Archive, &self.context());
        if !pack.is_valid() {
            drop(pack);
            if let Err(e) = fs::remove_file(&target) {
                tracing::debug!(path = %target.display(), error = %e, "Failed to remove invalid bundle");
            }
            self.packs = OnceLock::from(resolved);
            return Err(LoaderError::InvalidBundle {
                name: bundle.name,
                path: target,
            });
        }

        let id = pack.id().to_string();
        let outcome = resolved.offer(pack);
        if let Some(pack) = resolved.get(&id) {
            pack.record_version();
        }
        tracing::info!(id = %id, ?outcome, path = %target.display(), "Provisioned bundled pack");

        self.packs = OnceLock::from(resolved);
        Ok(self.packs().get(&id))
    }
}

/// Write bundle bytes to a temporary file, then rename it into place.
fn write_bundle(root: &Path, target: &Path, bytes: &[u8]) -> LoaderResult<()> {
    fs::create_dir_all(root).map_err(|source| LoaderError::CreateDirFailed {
        path: root.to_path_buf(),
        source,
    })?;

    let temp = target.with_extension("partial");
    let write = fs::write(&temp, bytes).and_then(|()| fs::rename(&temp, target));
    write.map_err(|source| {
        let _ = fs::remove_file(&temp);
        LoaderError::WriteFailed {
            path: target.to_path_buf(),
            source,
        }
    })
}
