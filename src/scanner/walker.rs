//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! The [`Walker`] visits a tree recursively in sorted file-name order and
//! yields one [`FileEntry`] per regular file with a recognized media
//! extension. Directories, symlinks and other extensions are skipped
//! silently.
//!
//! Errors come in two kinds. A failure to enumerate a directory is yielded
//! as [`ScanError::Walk`] and is fatal to the scan; a failure to stat a
//! single file only concerns that file.
//!
//! # Example
//!
//! ```no_run
//! use muxic::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/music"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for media file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Walk the directory tree, yielding media file entries.
    ///
    /// Per-file errors are yielded and iteration continues. Callers should
    /// stop at the first error for which [`ScanError::is_fatal`] is true.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry_result| {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(self.handle_walk_error(e))),
                };

                if !entry.file_type().is_file() {
                    return None;
                }

                let path = entry.path();
                if !self.config.is_media(path) {
                    log::trace!("Skipping non-media file: {}", path.display());
                    return None;
                }

                match entry.metadata() {
                    Ok(metadata) => Some(Ok(FileEntry::from_metadata(
                        entry.into_path(),
                        &metadata,
                    ))),
                    Err(e) => {
                        let path = entry.path().to_path_buf();
                        log::warn!("Cannot stat {}: {}", path.display(), e);
                        let source = e
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("metadata unavailable"));
                        Some(Err(ScanError::from_io(&path, source)))
                    }
                }
            })
    }

    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        log::error!("Walker error for {}: {}", path.display(), error);
        ScanError::Walk {
            path,
            message: error.to_string(),
        }
    }
}
