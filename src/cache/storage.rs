//! File-based TTL cache storage
//!
//! One blob file per cache name. Freshness is checked lazily on load from
//! the file's modification time; `store` overwrites the blob wholesale and
//! resets the age clock. Writes are best-effort: a persistence failure never
//! fails the surrounding fetch, the data stays usable in memory.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

/// File-blob cache storage, one entry per name
pub struct CacheStorage {
    dir: PathBuf,
}

/// Statistics about a cache clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// One cache entry as seen on disk
#[derive(Debug)]
pub struct CacheEntryInfo {
    pub name: String,
    pub size_bytes: u64,
    pub age: Option<Duration>,
}

/// Statistics about cache state
#[derive(Debug)]
pub struct CacheStats {
    pub entries: Vec<CacheEntryInfo>,
    pub total_size_bytes: u64,
}

impl CacheStorage {
    /// Open or create cache storage at the default location
    pub fn open() -> Result<Self> {
        let cache_dir = Self::cache_dir()?;
        Self::open_at(&cache_dir)
    }

    /// Get the cache directory path.
    ///
    /// `SPOTOP_CACHE_DIR` overrides the platform default
    /// (~/.cache/spotop/data on Linux).
    pub fn cache_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("SPOTOP_CACHE_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("spotop").join("data"))
    }

    /// Open cache storage at a specific directory (for testing)
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        Ok(Self {
            dir: cache_dir.to_path_buf(),
        })
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load cached bytes for `name` if the entry exists and is younger than
    /// `ttl`. A missing, empty, expired, or unreadable entry reads as absent.
    pub fn load(&self, name: &str, ttl: Duration) -> Option<Vec<u8>> {
        let path = self.entry_path(name);
        let meta = std::fs::metadata(&path).ok()?;
        if meta.len() == 0 {
            return None;
        }

        let age = meta.modified().ok()?.elapsed().ok()?;
        if age >= ttl {
            log::debug!("cache entry {} expired ({}s old)", name, age.as_secs());
            return None;
        }

        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("cache hit for {} ({} bytes)", name, bytes.len());
                Some(bytes)
            }
            Err(e) => {
                log::warn!("Failed to read cache entry {}: {}", name, e);
                None
            }
        }
    }

    /// Store bytes under `name`, overwriting any prior entry
    pub fn store(&self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::write(self.entry_path(name), bytes)
            .map_err(|e| CacheError::Io(format!("Failed to write cache entry {}: {}", name, e)))
    }

    /// Load and deserialize a cached dataset. A corrupt or partial blob
    /// reads as absent, not as an error.
    pub fn get_json<T: DeserializeOwned>(&self, name: &str, ttl: Duration) -> Option<T> {
        let bytes = self.load(name, ttl)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Discarding corrupt cache entry {}: {}", name, e);
                None
            }
        }
    }

    /// Serialize and store a dataset, best-effort
    pub fn put_json<T: Serialize>(&self, name: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                if let Err(e) = self.store(name, &bytes) {
                    log::warn!("{}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize cache entry {}: {}", name, e),
        }
    }

    /// Remove all cache entries
    pub fn clear_all(&self) -> Result<ClearStats> {
        let mut removed = 0;
        for entry in self.read_entries()? {
            let path = self.dir.join(&entry);
            std::fs::remove_file(&path)
                .map_err(|e| CacheError::Io(format!("Failed to remove {}: {}", entry, e)))?;
            removed += 1;
        }

        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let mut entries = Vec::new();
        let mut total_size = 0;

        for file_name in self.read_entries()? {
            let path = self.dir.join(&file_name);
            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(_) => continue,
            };

            let name = file_name.trim_end_matches(".json").to_string();
            let age = meta.modified().ok().and_then(|m| m.elapsed().ok());
            total_size += meta.len();
            entries.push(CacheEntryInfo {
                name,
                size_bytes: meta.len(),
                age,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(CacheStats {
            entries,
            total_size_bytes: total_size,
        })
    }

    fn read_entries(&self) -> Result<Vec<String>> {
        let dir = std::fs::read_dir(&self.dir)
            .map_err(|e| CacheError::Io(format!("Failed to read cache dir: {}", e)))?;

        let mut names = Vec::new();
        for entry in dir.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        Ok(names)
    }
}
