//! Host settings.
//!
//! Settings are a [`JsonDocument`] stored in the user's config directory.
//! Defaults ship embedded in the library as a read-only document; they
//! become writable once bound to a user path.
//!
//! Saving settings equal to the defaults removes the user file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{serde_color, serde_quat, serde_vec3, Color, Quat, Vec3};
use crate::loader::LoaderConfig;
use crate::persist::{JsonDocument, JsonFile};

/// Embedded default settings.
const DEFAULT_SETTINGS: &str = include_str!("../../assets/default_settings.json");

/// Settings file name inside the config directory.
pub const SETTINGS_FILENAME: &str = "settings.json";

/// User-tunable host settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Pack root; [`default_pack_root`] when unset.
    pub pack_root: Option<PathBuf>,

    /// Host build number packs are checked against.
    pub host_build: Option<i64>,

    /// Keep packs that target another host build.
    pub force_load: bool,

    /// Log filter used when no `-v` flags are given.
    pub log_level: String,

    /// Archive extensions recognized as packs.
    pub archive_extensions: Vec<String>,

    #[serde(with = "serde_color")]
    pub accent_color: Color,

    #[serde(with = "serde_vec3")]
    pub placement_offset: Vec3,

    #[serde(with = "serde_quat")]
    pub placement_rotation: Quat,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            pack_root: None,
            host_build: None,
            force_load: true,
            log_level: "info".to_string(),
            archive_extensions: vec!["zip".to_string()],
            accent_color: Color::WHITE,
            placement_offset: Vec3::ZERO,
            placement_rotation: Quat::IDENTITY,
        }
    }
}

impl JsonDocument for HostSettings {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl HostSettings {
    /// The embedded defaults as a read-only document.
    pub fn defaults() -> JsonFile<HostSettings> {
        JsonFile::load_bundled("default_settings.json", DEFAULT_SETTINGS)
            .unwrap_or_else(|| JsonFile::detached(HostSettings::default()))
    }

    /// Load user settings from `path`, or the defaults bound to `path`.
    pub fn load_or_defaults(path: impl AsRef<Path>) -> JsonFile<HostSettings> {
        let path = path.as_ref();
        JsonFile::load(path).unwrap_or_else(|| {
            tracing::debug!(path = %path.display(), "Using default settings");
            let mut settings = Self::defaults();
            settings.set_path(path);
            settings
        })
    }

    /// Effective pack root.
    pub fn pack_root(&self) -> PathBuf {
        self.pack_root
            .clone()
            .or_else(default_pack_root)
            .unwrap_or_else(|| PathBuf::from("packs"))
    }

    /// Loader configuration for these settings.
    pub fn to_loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::new(self.pack_root())
            .with_force_load(self.force_load)
            .with_archive_extensions(self.archive_extensions.iter().map(String::as_str));
        if let Some(build) = self.host_build {
            config = config.with_host_build(build);
        }
        config
    }
}

/// Default user settings file (`<config dir>/contentpack/settings.json`).
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("contentpack").join(SETTINGS_FILENAME))
}

/// Default pack root (`<data dir>/contentpack/packs`).
pub fn default_pack_root() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("contentpack").join("packs"))
}
