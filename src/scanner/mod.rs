//! Scanner module for directory traversal and content signing.
//!
//! This module provides functionality for:
//! - Deterministic directory walking using walkdir
//! - Media extension filtering
//! - Streaming content signatures (SHA-256 or BLAKE3)
//! - Cache-aware tree scanning that builds a signature index
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and media file discovery
//! - [`signer`]: Content signers
//! - [`tree`]: Full scan of a tree against the signature store
//!
//! # Example
//!
//! ```no_run
//! use muxic::cache::SignatureStore;
//! use muxic::scanner::{Sha256Signer, TreeScanner, WalkerConfig};
//! use std::path::Path;
//!
//! let mut store = SignatureStore::new();
//! let scanner = TreeScanner::new(WalkerConfig::default());
//! let outcome = scanner.scan(Path::new("/music"), &mut store, &Sha256Signer)?;
//! println!("{} files, {} signed", outcome.files_scanned, outcome.signatures_computed);
//! # Ok::<(), muxic::scanner::ScanError>(())
//! ```

pub mod signer;
pub mod tree;
pub mod walker;

use std::collections::BTreeSet;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use signer::{Blake3Signer, ContentSigner, Sha256Signer, SignatureAlgorithm};
pub use tree::{ScanOutcome, TreeScanner};
pub use walker::Walker;

/// Extensions recognized as media files (lowercase, without the dot).
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "m4a", "wav", "aac", "ogg", "oga", "opus", "wma", "aif", "aiff", "alac", "ape",
    "wv",
];

/// Live metadata of a discovered media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time in whole seconds since the Unix epoch
    pub mod_time: i64,
}

impl FileEntry {
    /// Build an entry from already fetched metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        Self {
            path,
            size: metadata.len(),
            mod_time: unix_seconds(modified),
        }
    }

    /// Stat `path` and build an entry for it.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the metadata cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }
}

/// Whole seconds between the Unix epoch and `time`; negative before 1970.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => {
            let before = e.duration();
            let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
            // Round toward negative infinity like a floor on the signed value.
            if before.subsec_nanos() > 0 {
                -secs - 1
            } else {
                -secs
            }
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Lowercase extensions (without the dot) that are scanned.
    pub extensions: BTreeSet<String>,

    /// Number of threads used for signing. `1` keeps the scan sequential.
    pub io_threads: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            io_threads: 1,
        }
    }
}

impl WalkerConfig {
    /// Add extra extensions to the recognized set.
    ///
    /// Leading dots are stripped and matching is case-insensitive.
    #[must_use]
    pub fn with_extra_extensions<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extra {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !ext.is_empty() {
                self.extensions.insert(ext);
            }
        }
        self
    }

    /// Set the number of signing threads (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Check whether `path` has a recognized media extension.
    #[must_use]
    pub fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission was denied when accessing a file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The directory tree could not be enumerated. Aborts the scan.
    #[error("Cannot walk {path}: {message}")]
    Walk {
        /// Directory where traversal failed
        path: PathBuf,
        /// Description of the walk failure
        message: String,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
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

    /// Whether this error stops the whole scan rather than a single file.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Walk { .. } | Self::NotADirectory(_))
    }
}

/// Errors that can occur while signing a file.
#[derive(thiserror::Error, Debug)]
pub enum SignError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl SignError {
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
}
