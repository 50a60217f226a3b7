//! Identity collision resolution.
//!
//! Candidates are offered in discovery order. For each identity one pack
//! survives:
//!
//! - a new identity is inserted;
//! - a strictly higher version replaces the incumbent, which is disposed;
//! - anything else (equal or lower version) is disposed.
//!
//! Equal versions therefore keep the first-discovered pack.

use std::collections::HashMap;

use crate::pack::Pack;

/// What happened to an offered candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Failed validation and was disposed.
    Invalid,

    /// First pack with its identity.
    Inserted,

    /// Replaced a lower-versioned incumbent.
    Replaced,

    /// Lost to an incumbent with an equal or higher version.
    Rejected,
}

/// The surviving packs in discovery order, one per identity.
#[derive(Debug, Default)]
pub struct ResolvedPacks {
    packs: Vec<Pack>,
    index: HashMap<String, usize>,
}

impl ResolvedPacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a sequence of candidates in order.
    pub fn resolve(candidates: impl IntoIterator<Item = Pack>) -> Self {
        let mut resolved = Self::new();
        for candidate in candidates {
            resolved.offer(candidate);
        }
        resolved
    }

    /// Offer one candidate. Losers are disposed before this returns.
    pub fn offer(&mut self, mut candidate: Pack) -> Resolution {
        if !candidate.is_valid() {
            candidate.dispose();
            return Resolution::Invalid;
        }

        let Some(&slot) = self.index.get(candidate.id()) else {
            self.index.insert(candidate.id().to_string(), self.packs.len());
            self.packs.push(candidate);
            return Resolution::Inserted;
        };

        let incumbent = &mut self.packs[slot];
        if candidate.version() > incumbent.version() {
            tracing::info!(
                id = %candidate.id(),
                kept = %candidate.version(),
                replaced = %incumbent.version(),
                path = %candidate.path().display(),
                "Newer pack replaces incumbent"
            );
            let mut replaced = std::mem::replace(incumbent, candidate);
            replaced.dispose();
            Resolution::Replaced
        } else {
            tracing::info!(
                id = %candidate.id(),
                kept = %incumbent.version(),
                skipped = %candidate.version(),
                path = %candidate.path().display(),
                "Skipping duplicate pack"
            );
            candidate.dispose();
            Resolution::Rejected
        }
    }

    pub fn get(&self, id: &str) -> Option<&Pack> {
        self.index.get(id).map(|&slot| &self.packs[slot])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Pack> {
        let slot = *self.index.get(id)?;
        self.packs.get_mut(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pack> {
        self.packs.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.packs.iter().map(Pack::id)
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Dispose every pack and empty the set.
    pub fn dispose_all(&mut self) {
        for pack in &mut self.packs {
            pack.dispose();
        }
        self.packs.clear();
        self.index.clear();
    }
}

impl<'a> IntoIterator for &'a ResolvedPacks {
    type Item = &'a Pack;
    type IntoIter = std::slice::Iter<'a, Pack>;

    fn into_iter(self) -> Self::IntoIter {
        self.packs.iter()
    }
}
