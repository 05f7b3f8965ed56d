//! Removal of non-surviving duplicates.
//!
//! # Overview
//!
//! Given a [`DuplicateSet`] and the index of its survivor, every other file
//! is removed from disk and from the [`SignatureStore`]. A failure on one
//! file is recorded and the remaining files are still processed. Deletion is
//! immediate and final; there is no trash and no rollback.
//!
//! Before a file is removed its live size and modification time are checked
//! against the values recorded during the scan. A file that changed in the
//! meantime may no longer be a duplicate and is left in place. The survivor
//! gets the same check first; if it changed, nothing in the set is deleted.
//!
//! A non-survivor that is a hard link to the survivor's inode is removed
//! like any other copy but frees no space.
//!
//! # Example
//!
//! ```no_run
//! use muxic::actions::delete::{delete_duplicates, DeleteConfig};
//! use muxic::cache::SignatureStore;
//! # use muxic::duplicates::DuplicateSet;
//! # let set = DuplicateSet::new(String::new(), Vec::new());
//!
//! let mut store = SignatureStore::new();
//! let result = delete_duplicates(&set, 0, &mut store, &DeleteConfig::default(), None)?;
//! println!("{}", result.summary());
//! # Ok::<(), muxic::actions::DeleteError>(())
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::SignatureStore;
use crate::duplicates::DuplicateSet;
use crate::scanner::{unix_seconds, FileEntry};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File size or modification time changed since the scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The survivor is gone or changed since the scan.
    #[error("survivor changed since scan, set left untouched: {0}")]
    SurvivorChanged(PathBuf),

    /// The survivor index does not name a file of the set.
    #[error("survivor index {index} out of range for a set of {len} files")]
    InvalidSurvivor { index: usize, len: usize },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::SurvivorChanged(p)
            | Self::Io { path: p, .. } => Some(p),
            Self::InvalidSurvivor { .. } => None,
        }
    }
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Bytes freed by the deletion (zero for a hard link to the survivor).
    pub size: u64,
}

/// Results of deleting the non-survivors of one set.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted files (or, in a dry run, files that would be).
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their error messages.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "Would delete" } else { "Deleted" };
        if self.all_succeeded() {
            format!(
                "{verb} {} file(s), freed {} bytes",
                self.success_count(),
                self.bytes_freed
            )
        } else {
            format!(
                "{verb} {} file(s), {} failed, freed {} bytes",
                self.success_count(),
                self.failure_count(),
                self.bytes_freed
            )
        }
    }
}

/// Configuration for deletion operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteConfig {
    /// Report what would be deleted without touching disk or cache.
    pub dry_run: bool,
}

impl DeleteConfig {
    /// Enable/disable dry run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Callback for per-file deletion progress.
pub trait DeleteProgressCallback {
    /// Called before each file deletion.
    fn on_before_delete(&mut self, path: &Path);

    /// Called after a successful deletion.
    fn on_delete_success(&mut self, path: &Path, size: u64);

    /// Called after a failed deletion.
    fn on_delete_failure(&mut self, path: &Path, error: &DeleteError);

    /// Called instead of the above in a dry run.
    fn on_would_delete(&mut self, path: &Path, size: u64);
}

/// Check that `file` still has the size and mtime recorded by the scan.
///
/// # Errors
///
/// Returns `Modified` if either changed, or the stat error.
pub fn verify_unchanged(file: &FileEntry) -> Result<(), DeleteError> {
    let metadata = fs::metadata(&file.path).map_err(|e| DeleteError::from_io(&file.path, e))?;
    let mod_time = metadata
        .modified()
        .map(unix_seconds)
        .map_err(|e| DeleteError::from_io(&file.path, e))?;

    if metadata.len() != file.size || mod_time != file.mod_time {
        log::warn!(
            "File modified since scan: {} (size {} -> {}, mtime {} -> {})",
            file.path.display(),
            file.size,
            metadata.len(),
            file.mod_time,
            mod_time
        );
        return Err(DeleteError::Modified(file.path.clone()));
    }
    Ok(())
}

/// Check that `survivor` names a file of `set`.
///
/// # Errors
///
/// Returns `InvalidSurvivor` otherwise.
pub fn validate_survivor(set: &DuplicateSet, survivor: usize) -> Result<(), DeleteError> {
    if survivor < set.len() {
        Ok(())
    } else {
        log::error!(
            "Refusing to delete: survivor {} outside set of {}",
            survivor,
            set.len()
        );
        Err(DeleteError::InvalidSurvivor {
            index: survivor,
            len: set.len(),
        })
    }
}

fn remove(file: &FileEntry) -> Result<(), DeleteError> {
    verify_unchanged(file)?;
    fs::remove_file(&file.path).map_err(|e| DeleteError::from_io(&file.path, e))
}

/// Device and inode of `path`, used to spot hard links.
#[cfg(unix)]
fn file_id(path: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;

    fs::metadata(path).ok().map(|m| (m.dev(), m.ino()))
}

#[cfg(not(unix))]
fn file_id(_path: &Path) -> Option<(u64, u64)> {
    None
}

/// Delete every file of `set` except the one at `survivor`.
///
/// Each deleted path is also dropped from `store`; its recorded size counts
/// toward `bytes_freed` unless it shares the survivor's inode. Failures are
/// collected, never fatal.
///
/// # Errors
///
/// Returns `InvalidSurvivor` if `survivor` is out of range, or
/// `SurvivorChanged` if the survivor no longer matches the scan. Nothing is
/// deleted in either case.
pub fn delete_duplicates(
    set: &DuplicateSet,
    survivor: usize,
    store: &mut SignatureStore,
    config: &DeleteConfig,
    mut callback: Option<&mut dyn DeleteProgressCallback>,
) -> Result<BatchDeleteResult, DeleteError> {
    validate_survivor(set, survivor)?;

    let kept = &set.files[survivor];
    if let Err(e) = verify_unchanged(kept) {
        log::error!("Refusing to delete: survivor {} unusable: {}", kept.path.display(), e);
        return Err(DeleteError::SurvivorChanged(kept.path.clone()));
    }
    let kept_id = file_id(&kept.path);

    let mut result = BatchDeleteResult {
        dry_run: config.dry_run,
        ..Default::default()
    };

    for (index, file) in set.files.iter().enumerate() {
        if index == survivor {
            continue;
        }

        let recorded = store.get(&file.path).map_or(file.size, |entry| entry.size);
        let freed = if kept_id.is_some() && file_id(&file.path) == kept_id {
            log::debug!("{} is a hard link to the survivor", file.path.display());
            0
        } else {
            recorded
        };

        if config.dry_run {
            if let Some(cb) = callback.as_deref_mut() {
                cb.on_would_delete(&file.path, freed);
            }
            result.bytes_freed += freed;
            result.successes.push(DeleteResult {
                path: file.path.clone(),
                size: freed,
            });
            continue;
        }

        if let Some(cb) = callback.as_deref_mut() {
            cb.on_before_delete(&file.path);
        }

        match remove(file) {
            Ok(()) => {
                store.remove(&file.path);
                log::info!("Deleted: {} ({} bytes)", file.path.display(), freed);
                if let Some(cb) = callback.as_deref_mut() {
                    cb.on_delete_success(&file.path, freed);
                }
                result.bytes_freed += freed;
                result.successes.push(DeleteResult {
                    path: file.path.clone(),
                    size: freed,
                });
            }
            Err(e) => {
                log::warn!("Failed to delete {}: {}", file.path.display(), e);
                if let Some(cb) = callback.as_deref_mut() {
                    cb.on_delete_failure(&file.path, &e);
                }
                result.failures.push((file.path.clone(), e.to_string()));
            }
        }
    }

    log::debug!("{}", result.summary());
    Ok(result)
}
