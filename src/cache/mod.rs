//! Signature cache for muxic.
//!
//! This module provides persistent storage for content signatures so that
//! subsequent scans only re-sign files that changed since the last run.
//!
//! # Architecture
//!
//! * [`store`]: JSON persistence, lookup, pruning of vanished paths.
//! * [`entry`]: The per-file record and its validity rule.
//! * [`freshness`]: Reuse-or-recompute decision made for every scanned file.
//!
//! # Cache Invalidation
//!
//! Entries are validated using:
//! * File path (key)
//! * File size
//! * Modification time (whole seconds)
//! * Signature algorithm
//!
//! If any of these differ from the live file, the entry is stale and the
//! file is signed again.

pub mod entry;
pub mod freshness;
pub mod store;

pub use entry::CacheEntry;
pub use freshness::{resolve_signature, resolve_signature_shared, Resolved};
pub use store::{CacheError, CacheResult, SignatureStore, CACHE_FILE_NAME};
