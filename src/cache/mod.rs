//! Name-resolution cache
//!
//! Maps user-supplied needles (full identifiers, identifier prefixes, or
//! name fragments) to provider-assigned identifiers without a round-trip to
//! the API.
//!
//! # Module Structure
//!
//! - [`Cache`] - One [`ResourceIndex`] per [`ResourceKind`], tagged with the
//!   endpoint it was built against
//! - [`store`] - Fail-soft loading and atomic saving of the cache file
//!
//! The cache is never authoritative. Anything it cannot load is discarded and
//! rebuilt from the API on the next miss.

pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub use store::CacheStore;

/// Current on-disk schema version
pub const CACHE_VERSION: u32 = 1;

/// A resource type managed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Server,
    Image,
    Snapshot,
    Bootscript,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Server,
        ResourceKind::Image,
        ResourceKind::Snapshot,
        ResourceKind::Bootscript,
    ];

    /// REST collection path, also the key of a listing envelope
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Server => "servers",
            ResourceKind::Image => "images",
            ResourceKind::Snapshot => "snapshots",
            ResourceKind::Bootscript => "bootscripts",
        }
    }

    /// Key of a single-resource envelope (`{"server": {...}}`)
    pub fn singular(self) -> &'static str {
        match self {
            ResourceKind::Server => "server",
            ResourceKind::Image => "image",
            ResourceKind::Snapshot => "snapshot",
            ResourceKind::Bootscript => "bootscript",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| lower == kind.singular() || lower == kind.collection())
            .ok_or_else(|| {
                format!(
                    "unknown resource kind '{}' (expected server, image, snapshot or bootscript)",
                    s
                )
            })
    }
}

/// One identifier/name pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl CacheEntry {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    /// Prefix in either direction covers the exact-identifier case.
    /// Name matching is a case-sensitive substring test.
    fn matches(&self, needle: &str) -> bool {
        self.id.starts_with(needle)
            || needle.starts_with(self.id.as_str())
            || self.name.contains(needle)
    }
}

/// Entries of a single resource kind, in insertion order, unique by identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<CacheEntry>>", into = "Vec<CacheEntry>")]
pub struct ResourceIndex {
    entries: Vec<CacheEntry>,
    by_id: HashMap<String, usize>,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an entry. Returns true if the index changed.
    pub fn insert(&mut self, id: &str, name: &str) -> bool {
        if id.is_empty() {
            return false;
        }

        if let Some(&pos) = self.by_id.get(id) {
            let entry = &mut self.entries[pos];
            if entry.name == name {
                return false;
            }
            entry.name = name.to_string();
            return true;
        }

        self.by_id.insert(id.to_string(), self.entries.len());
        self.entries.push(CacheEntry::new(id, name));
        true
    }

    /// Every identifier matched by `needle`. An empty needle matches all.
    pub fn lookup(&self, needle: &str) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|entry| entry.matches(needle))
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id
            .get(id)
            .map(|&pos| self.entries[pos].name.as_str())
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<CacheEntry>> for ResourceIndex {
    fn from(entries: Vec<CacheEntry>) -> Self {
        let mut index = ResourceIndex::new();
        for entry in entries {
            index.insert(&entry.id, &entry.name);
        }
        index
    }
}

/// `null` in the cache file is an empty index
impl From<Option<Vec<CacheEntry>>> for ResourceIndex {
    fn from(entries: Option<Vec<CacheEntry>>) -> Self {
        entries.map(ResourceIndex::from).unwrap_or_default()
    }
}

impl From<ResourceIndex> for Vec<CacheEntry> {
    fn from(index: ResourceIndex) -> Self {
        index.entries
    }
}

/// The whole persisted cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cache {
    version: u32,
    endpoint: String,
    saved_at: Option<String>,
    servers: ResourceIndex,
    images: ResourceIndex,
    snapshots: ResourceIndex,
    bootscripts: ResourceIndex,
    #[serde(skip)]
    dirty: bool,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            endpoint: String::new(),
            saved_at: None,
            servers: ResourceIndex::new(),
            images: ResourceIndex::new(),
            snapshots: ResourceIndex::new(),
            bootscripts: ResourceIndex::new(),
            dirty: false,
        }
    }
}

impl Cache {
    /// Empty cache bound to `endpoint`
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint_identity(endpoint),
            ..Self::default()
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn index(&self, kind: ResourceKind) -> &ResourceIndex {
        match kind {
            ResourceKind::Server => &self.servers,
            ResourceKind::Image => &self.images,
            ResourceKind::Snapshot => &self.snapshots,
            ResourceKind::Bootscript => &self.bootscripts,
        }
    }

    fn index_mut(&mut self, kind: ResourceKind) -> &mut ResourceIndex {
        match kind {
            ResourceKind::Server => &mut self.servers,
            ResourceKind::Image => &mut self.images,
            ResourceKind::Snapshot => &mut self.snapshots,
            ResourceKind::Bootscript => &mut self.bootscripts,
        }
    }

    pub fn insert(&mut self, kind: ResourceKind, id: &str, name: &str) {
        if self.index_mut(kind).insert(id, name) {
            tracing::trace!("cache insert {} {} ({})", kind, id, name);
            self.dirty = true;
        }
    }

    pub fn lookup(&self, kind: ResourceKind, needle: &str) -> BTreeSet<String> {
        self.index(kind).lookup(needle)
    }

    /// True if the cache changed since it was loaded or last saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        ResourceKind::ALL
            .into_iter()
            .all(|kind| self.index(kind).is_empty())
    }
}

/// Normalized form of an API endpoint used to tag the cache
pub fn endpoint_identity(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

/// Errors raised while loading or saving the cache file
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse cache file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported cache version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("cache was built for {found}, current endpoint is {expected}")]
    Endpoint { found: String, expected: String },

    #[error("failed to encode cache: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write cache file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
