//! Duplicate grouping and deterministic ordering.
//!
//! # Overview
//!
//! After a scan every signature maps to the files that produced it. A
//! signature with two or more files is a [`DuplicateSet`]. Sets are ordered
//! by signature so output and deletion order are stable across runs, and
//! the files inside a set are ordered by [`compare_paths`].
//!
//! # Path Ordering Policy
//!
//! Within a set, shorter path strings come first and equal lengths are
//! ordered lexicographically by their bytes. A shorter path is taken to be
//! closer to the library root and therefore the more canonical copy, so the
//! first entry is the default survivor. This is a policy, not an accident
//! of iteration order; other survivor rules live in
//! [`crate::resolve::KeepStrategy`].
//!
//! # Example
//!
//! ```
//! use muxic::duplicates::group_duplicates;
//! use muxic::scanner::FileEntry;
//! use std::collections::HashMap;
//! use std::path::PathBuf;
//!
//! let file = |p: &str| FileEntry { path: PathBuf::from(p), size: 3, mod_time: 0 };
//! let mut index = HashMap::new();
//! index.insert("aa".to_string(), vec![file("/m/bb.mp3"), file("/m/b.mp3")]);
//! index.insert("bb".to_string(), vec![file("/m/solo.mp3")]);
//!
//! let sets = group_duplicates(index);
//! assert_eq!(sets.len(), 1);
//! assert_eq!(sets[0].files[0].path, PathBuf::from("/m/b.mp3"));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use crate::scanner::FileEntry;

/// Files sharing one content signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    /// Hex-encoded content signature
    pub signature: String,
    /// At least two files, ordered by [`compare_paths`]
    pub files: Vec<FileEntry>,
}

impl DuplicateSet {
    /// Create a set, sorting `files` into presentation order.
    #[must_use]
    pub fn new(signature: String, mut files: Vec<FileEntry>) -> Self {
        sort_files(&mut files);
        Self { signature, files }
    }

    /// Number of files in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Space held by every copy but one.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.files
            .iter()
            .skip(1)
            .map(|f| f.size)
            .sum()
    }

    /// First eight characters of the signature, for display.
    #[must_use]
    pub fn short_signature(&self) -> &str {
        self.signature
            .char_indices()
            .nth(8)
            .map_or(self.signature.as_str(), |(i, _)| &self.signature[..i])
    }
}

/// Presentation order of paths: shorter first, then lexicographic.
#[must_use]
pub fn compare_paths(a: &Path, b: &Path) -> Ordering {
    let (a, b) = (a.as_os_str(), b.as_os_str());
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Sort files into presentation order.
pub fn sort_files(files: &mut [FileEntry]) {
    files.sort_by(|a, b| compare_paths(&a.path, &b.path));
}

/// Extract duplicate sets from a signature index.
///
/// Only signatures with two or more files are kept. Sets are ordered by
/// signature.
#[must_use]
pub fn group_duplicates(by_signature: HashMap<String, Vec<FileEntry>>) -> Vec<DuplicateSet> {
    let mut sets: Vec<DuplicateSet> = by_signature
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(signature, files)| DuplicateSet::new(signature, files))
        .collect();
    sets.sort_by(|a, b| a.signature.cmp(&b.signature));

    log::debug!("Found {} duplicate sets", sets.len());
    sets
}
