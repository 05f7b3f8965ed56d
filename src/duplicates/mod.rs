//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Extracting duplicate sets from a signature index
//! - Deterministic ordering of sets and of the files inside each set

pub mod groups;

pub use groups::{compare_paths, group_duplicates, sort_files, DuplicateSet};
