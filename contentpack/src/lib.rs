//! contentpack - discovery and access for read-only content packs
//!
//! A content pack is a zip archive or a directory carrying an `Info.json`
//! manifest. This library discovers packs under a root directory, resolves
//! identity collisions by version, and answers file queries across the
//! resolved set. Anything the host wants to remember about a pack is stored
//! out of band in a JSON metadata file keyed by pack identity.
//!
//! # Modules
//!
//! - [`codec`]: compact text encodings for colors, vectors and quaternions
//! - [`persist`]: JSON documents bound to a backing file
//! - [`kvtext`]: flat `key: value` descriptor files
//! - [`meta`]: the persisted per-pack metadata store
//! - [`pack`]: a single pack and its storage backends
//! - [`resource`]: views over files opened from a pack
//! - [`loader`]: discovery, resolution and cross-pack queries
//! - [`settings`]: host settings with embedded defaults

pub mod codec;
pub mod kvtext;
pub mod loader;
pub mod meta;
pub mod pack;
pub mod persist;
pub mod resource;
pub mod settings;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
