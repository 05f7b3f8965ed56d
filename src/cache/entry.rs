//! Cache entry definitions.

use serde::{Deserialize, Serialize};

use crate::scanner::{FileEntry, SignatureAlgorithm};

/// Last observed state of one file in the signature cache.
///
/// An entry is trustworthy only while the file's live modification time
/// and size equal the recorded values, and it was produced by the
/// algorithm the current run signs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hex-encoded content digest.
    pub signature: String,
    /// Modification time in whole seconds since the Unix epoch.
    pub mod_time: i64,
    /// File size in bytes.
    pub size: u64,
    /// Algorithm that produced `signature`. Omitted on disk for SHA-256.
    #[serde(default, skip_serializing_if = "SignatureAlgorithm::is_default")]
    pub algorithm: SignatureAlgorithm,
}

impl CacheEntry {
    /// Create an entry recording `file`'s current state under `signature`.
    #[must_use]
    pub fn new(signature: String, file: &FileEntry, algorithm: SignatureAlgorithm) -> Self {
        Self {
            signature,
            mod_time: file.mod_time,
            size: file.size,
            algorithm,
        }
    }

    /// Check whether this entry still describes `file`.
    #[must_use]
    pub fn is_fresh_for(&self, file: &FileEntry, algorithm: SignatureAlgorithm) -> bool {
        self.mod_time == file.mod_time && self.size == file.size && self.algorithm == algorithm
    }
}
