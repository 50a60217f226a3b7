//! Pack candidate discovery.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::config::LoaderConfig;
use crate::pack::PackKind;

/// A file or folder in the pack root that may hold a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: PackKind,
}

/// List pack candidates directly under the configured root.
///
/// Archives come first, then directories; each group is sorted by file
/// name. Hidden entries (leading `.`) are skipped. A missing root yields no
/// candidates.
pub fn find_candidates(config: &LoaderConfig) -> io::Result<Vec<Candidate>> {
    let root = &config.root;
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "Pack root does not exist");
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    let mut directories = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        // Skip hidden entries
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            directories.push((name, path));
        } else if path.is_file() && config.is_archive(&path) {
            archives.push((name, path));
        }
    }

    archives.sort_by(|a, b| a.0.cmp(&b.0));
    directories.sort_by(|a, b| a.0.cmp(&b.0));

    let candidates = archives
        .into_iter()
        .map(|(_, path)| Candidate {
            path,
            kind: PackKind::Archive,
        })
        .chain(directories.into_iter().map(|(_, path)| Candidate {
            path,
            kind: PackKind::Directory,
        }))
        .collect::<Vec<_>>();

    tracing::debug!(
        root = %root.display(),
        candidates = candidates.len(),
        "Found pack candidates"
    );
    Ok(candidates)
}
