//! Cache persistence
//!
//! Loading never fails: a missing, unreadable, corrupt, outdated or foreign
//! cache file yields an empty cache. Saving replaces the file atomically.

use super::{endpoint_identity, Cache, CacheError, CACHE_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Location of the persisted cache
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default cache file location
    pub fn default_path() -> PathBuf {
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("scw").join("cache.json");
        }
        if let Some(home) = dirs::home_dir() {
            return home.join(".scw-cache.json");
        }
        PathBuf::from(".scw-cache.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache for `endpoint`, falling back to an empty one
    pub fn load(&self, endpoint: &str) -> Cache {
        match self.try_load(endpoint) {
            Ok(Some(cache)) => {
                tracing::debug!("Loaded cache from {:?}", self.path);
                cache
            }
            Ok(None) => Cache::new(endpoint),
            Err(e) => {
                tracing::warn!("Discarding cache: {}", e);
                Cache::new(endpoint)
            }
        }
    }

    fn try_load(&self, endpoint: &str) -> Result<Option<Cache>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| CacheError::Read {
            path: self.path.clone(),
            source,
        })?;

        let mut cache: Cache = serde_json::from_str(&content).map_err(|source| CacheError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if cache.version != CACHE_VERSION {
            return Err(CacheError::Version {
                found: cache.version,
                expected: CACHE_VERSION,
            });
        }

        let expected = endpoint_identity(endpoint);
        if endpoint_identity(&cache.endpoint) != expected {
            return Err(CacheError::Endpoint {
                found: cache.endpoint,
                expected,
            });
        }

        cache.endpoint = expected;
        Ok(Some(cache))
    }

    /// Write the whole cache, replacing the previous file atomically
    pub fn save(&self, cache: &mut Cache) -> Result<(), CacheError> {
        cache.version = CACHE_VERSION;
        cache.saved_at = Some(chrono::Utc::now().to_rfc3339());

        let content = serde_json::to_vec_pretty(cache).map_err(CacheError::Encode)?;
        write_atomic(&self.path, &content).map_err(|source| CacheError::Write {
            path: self.path.clone(),
            source,
        })?;

        cache.dirty = false;
        tracing::debug!("Saved cache to {:?}", self.path);
        Ok(())
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

/// Write to a sibling temp file, then rename it over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("cache");
    let tmp = parent.join(format!(".{}.tmp.{}", file_name, uuid::Uuid::new_v4()));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
        return result;
    }

    // Persist the rename itself
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}
