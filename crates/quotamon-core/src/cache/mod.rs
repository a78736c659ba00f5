//! TTL-gated cache for the last fetched usage snapshot.
//!
//! Writes go to a sibling temp file and are renamed over the canonical
//! path, so a concurrent reader sees either the old entry or the new one,
//! never a partial write.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::UsageSnapshot;
use crate::error::CacheError;

/// How long a cached snapshot stays fresh, in seconds.
pub const CACHE_TTL_SECS: i64 = 60;

/// A cached snapshot with its fetch time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The snapshot as fetched
    pub usage: UsageSnapshot,
    /// When the fetch happened
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry is still fresh.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Freshness against a caller-supplied clock (tests pin this).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < Duration::seconds(CACHE_TTL_SECS)
    }
}

/// The on-disk usage cache.
#[derive(Debug, Clone)]
pub struct UsageCache {
    path: PathBuf,
}

impl UsageCache {
    /// Cache at the default per-user location.
    pub fn new() -> Result<Self, CacheError> {
        let dir = dirs::cache_dir().ok_or_else(|| {
            CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no user cache directory",
            ))
        })?;
        Ok(Self {
            path: dir.join("quotamon").join("usage.json"),
        })
    }

    /// Cache at an explicit path (tests).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached entry. Missing files are `NotFound`, unparseable
    /// files `Corrupt`; callers treat both as a miss.
    pub fn read(&self) -> Result<CacheEntry, CacheError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound)
            }
            Err(e) => return Err(CacheError::Io(e)),
        };

        serde_json::from_str(&data).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    /// Write a fresh entry atomically. The cache directory is created on
    /// demand; creation failures propagate.
    pub fn write(&self, usage: &UsageSnapshot) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let entry = CacheEntry {
            usage: usage.clone(),
            fetched_at: Utc::now(),
        };
        let data =
            serde_json::to_vec(&entry).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
