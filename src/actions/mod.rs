//! File actions module.
//!
//! # Deletion
//!
//! The delete module removes the non-surviving files of a resolved
//! duplicate set:
//! - Permanent removal (no trash, no undo)
//! - Signature store kept in sync with what was removed
//! - Per-file failures collected without stopping the batch
//! - Unchanged-since-scan verification of the survivor and each removal
//! - Hard links to the survivor removed without counting as reclaimed space
//! - Dry run reporting

pub mod delete;

// Re-export commonly used types
pub use delete::{
    delete_duplicates, validate_survivor, verify_unchanged, BatchDeleteResult, DeleteConfig,
    DeleteError, DeleteProgressCallback, DeleteResult,
};
