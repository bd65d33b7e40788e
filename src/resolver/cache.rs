//! Cache of previous oracle answers, keyed by object file identity.
//!
//! An object is rebuilt whenever any file it depends on changes, so its size
//! and modification time are a sound fingerprint for the dependency list the
//! oracle would return. Objects that don't exist on disk are never cached.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::fs::write_atomic;
use crate::util::hash::file_stamp;

/// On-disk format version; bump when the layout changes.
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct CacheEntry {
    stamp: String,
    files: BTreeSet<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    objects: BTreeMap<String, CacheEntry>,
}

/// Resolution cache stored under the build directory.
#[derive(Debug)]
pub struct ResolutionCache {
    path: PathBuf,
    build_dir: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    dirty: bool,
}

impl ResolutionCache {
    /// Default cache location for a build directory.
    pub fn default_path(build_dir: &Path) -> PathBuf {
        build_dir.join(".depmap").join("resolve-cache.json")
    }

    /// Load the cache, starting empty if it is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<CacheFile>(&contents) {
                Ok(file) if file.version == CACHE_VERSION => file.objects,
                Ok(_) => {
                    tracing::debug!("Ignoring resolution cache with old format");
                    BTreeMap::new()
                }
                Err(e) => {
                    tracing::warn!("Ignoring corrupt resolution cache {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        ResolutionCache {
            path,
            build_dir: build_dir.into(),
            entries,
            dirty: false,
        }
    }

    fn stamp(&self, object: &str) -> Option<String> {
        file_stamp(&self.build_dir.join(object))
    }

    /// Cached files for `object`, if the object is unchanged since they were stored.
    pub fn get(&self, object: &str) -> Option<&BTreeSet<PathBuf>> {
        let entry = self.entries.get(object)?;
        let stamp = self.stamp(object)?;
        (entry.stamp == stamp).then_some(&entry.files)
    }

    /// Store a successful resolution.
    pub fn insert(&mut self, object: &str, files: &BTreeSet<PathBuf>) {
        let Some(stamp) = self.stamp(object) else {
            return;
        };
        let entry = CacheEntry {
            stamp,
            files: files.clone(),
        };
        if self.entries.get(object) != Some(&entry) {
            self.entries.insert(object.to_string(), entry);
            self.dirty = true;
        }
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the cache back if anything changed.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let file = CacheFile {
            version: CACHE_VERSION,
            objects: std::mem::take(&mut self.entries),
        };
        let json = serde_json::to_string(&file).context("failed to serialize resolution cache")?;
        self.entries = file.objects;
        write_atomic(&self.path, &json)?;
        self.dirty = false;
        tracing::debug!("Saved {} cached resolutions to {}", self.len(), self.path.display());
        Ok(())
    }
}
