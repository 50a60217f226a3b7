//! Configuration for the pack loader.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::meta::METADATA_FILENAME;

/// Packs shipped inside the library.
static STARTER_PACK: &[u8] = include_bytes!("../../assets/starter.zip");

/// A pack embedded in the binary that can be written to the pack root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledPack {
    /// Name used to request the pack.
    pub name: String,

    /// File name it is written under.
    pub file_name: String,

    /// Archive bytes.
    pub bytes: Cow<'static, [u8]>,
}

impl BundledPack {
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Cow<'static, [u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// The packs built into this library.
pub fn builtin_packs() -> Vec<BundledPack> {
    vec![BundledPack::new("starter", "starter.zip", STARTER_PACK)]
}

/// Configuration for the pack loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory scanned for packs.
    pub root: PathBuf,

    /// Metadata file. Defaults to `packs.meta.json` in `root`.
    pub meta_path: Option<PathBuf>,

    /// File extensions treated as pack archives, without the dot.
    pub archive_extensions: Vec<String>,

    /// Build number of the running host, checked against `TargetBuild`.
    pub host_build: Option<i64>,

    /// Keep packs built for another host build.
    pub force_load: bool,

    /// Packs available to [`provision`](super::PackLoader::provision).
    pub bundled: Vec<BundledPack>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            meta_path: None,
            archive_extensions: vec!["zip".to_string()],
            host_build: None,
            force_load: true,
            bundled: builtin_packs(),
        }
    }
}

impl LoaderConfig {
    /// Create a new configuration scanning `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Set the metadata file path.
    pub fn with_meta_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.meta_path = Some(path.into());
        self
    }

    /// Replace the archive extensions.
    pub fn with_archive_extensions<S: Into<String>>(
        mut self,
        extensions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.archive_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Set the host build number.
    pub fn with_host_build(mut self, build: i64) -> Self {
        self.host_build = Some(build);
        self
    }

    /// Set whether packs built for another host build are kept.
    pub fn with_force_load(mut self, force_load: bool) -> Self {
        self.force_load = force_load;
        self
    }

    /// Add a bundled pack.
    pub fn with_bundled(mut self, bundle: BundledPack) -> Self {
        self.bundled.push(bundle);
        self
    }

    /// Effective metadata file path.
    pub fn meta_path(&self) -> PathBuf {
        self.meta_path
            .clone()
            .unwrap_or_else(|| self.root.join(METADATA_FILENAME))
    }

    /// Whether `path` has one of the archive extensions.
    pub fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.archive_extensions
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(ext))
            })
    }

    /// Find a bundled pack by name or file name.
    pub fn bundle(&self, name: &str) -> Option<&BundledPack> {
        self.bundled
            .iter()
            .find(|b| b.name == name || b.file_name == name)
    }
}
