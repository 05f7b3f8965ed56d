//! JSON-backed signature store.
//!
//! The store maps absolute file paths to their last known [`CacheEntry`].
//! It is loaded once at the start of a run, mutated while scanning and
//! deleting, pruned, then written back in a single atomic save.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

use super::entry::CacheEntry;
use crate::scanner::{FileEntry, SignatureAlgorithm};

/// File name of the signature cache inside the per-user cache directory.
pub const CACHE_FILE_NAME: &str = "dedup_cache.json";

/// Errors from loading or saving the signature store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but could not be read.
    #[error("failed to read cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache file (or its directory) could not be written.
    #[error("failed to write cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store could not be serialized.
    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Mapping from absolute path to cached signature state.
///
/// Backed by a `BTreeMap` so iteration (pruning, saving) is always in
/// sorted path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureStore {
    entries: BTreeMap<PathBuf, CacheEntry>,
}

impl SignatureStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default per-user location of the cache file.
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "muxic", "muxic").map(|dirs| dirs.cache_dir().join(CACHE_FILE_NAME))
    }

    /// Load a store from `path`.
    ///
    /// A missing file yields an empty store. A file that exists but does not
    /// parse is treated as empty as well (logged at warn). Only a failure to
    /// read an existing file is reported as an error.
    pub fn load(path: &Path) -> CacheResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No cache at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match serde_json::from_str::<BTreeMap<PathBuf, CacheEntry>>(&content) {
            Ok(entries) => {
                log::debug!("Loaded {} cache entries from {}", entries.len(), path.display());
                Ok(Self { entries })
            }
            Err(e) => {
                log::warn!("Ignoring corrupt cache {}: {}", path.display(), e);
                Ok(Self::new())
            }
        }
    }

    /// Persist the store to `path`, creating parent directories as needed.
    ///
    /// The JSON is written to a sibling temporary file and renamed into place,
    /// so an interrupted save never leaves a truncated cache behind. Paths that
    /// are not valid UTF-8 cannot be JSON keys and are left out.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let write_err = |source: io::Error| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let serializable: BTreeMap<&str, &CacheEntry> = self
            .entries
            .iter()
            .filter_map(|(p, entry)| match p.to_str() {
                Some(key) => Some((key, entry)),
                None => {
                    log::debug!("Not caching non UTF-8 path: {}", p.display());
                    None
                }
            })
            .collect();
        let json = serde_json::to_vec_pretty(&serializable)?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json).map_err(write_err)?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            write_err(e)
        })?;

        log::debug!("Saved {} cache entries to {}", serializable.len(), path.display());
        Ok(())
    }

    /// Look up the entry for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    /// Signature recorded for `file`, if the entry is still trustworthy.
    #[must_use]
    pub fn fresh_signature(&self, file: &FileEntry, algorithm: SignatureAlgorithm) -> Option<&str> {
        self.entries
            .get(&file.path)
            .filter(|entry| entry.is_fresh_for(file, algorithm))
            .map(|entry| entry.signature.as_str())
    }

    /// Insert or overwrite the entry for `path`.
    pub fn insert(&mut self, path: PathBuf, entry: CacheEntry) {
        self.entries.insert(path, entry);
    }

    /// Remove the entry for `path`, returning it if present.
    pub fn remove(&mut self, path: &Path) -> Option<CacheEntry> {
        self.entries.remove(path)
    }

    /// Check whether an entry exists for `path`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &CacheEntry)> {
        self.entries.iter()
    }

    /// Drop every entry whose path no longer exists on disk.
    ///
    /// Only a definite "not found" removes an entry; paths that cannot be
    /// checked for other reasons (e.g. permissions) are kept. Returns the
    /// pruned paths in sorted order.
    pub fn prune_missing(&mut self) -> Vec<PathBuf> {
        let missing: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|p| {
                matches!(fs::symlink_metadata(p), Err(e) if e.kind() == io::ErrorKind::NotFound)
            })
            .cloned()
            .collect();

        for path in &missing {
            log::trace!("Pruning cache entry for missing file: {}", path.display());
            self.entries.remove(path);
        }

        missing
    }
}
