//! Staleness-aware signature resolution.
//!
//! Decides per file whether the cached signature can be reused or the file
//! must be signed again. A cached value is reused only when the stored
//! modification time and size equal the live ones.

use std::sync::{Mutex, MutexGuard};

use super::{CacheEntry, SignatureStore};
use crate::scanner::{ContentSigner, FileEntry, SignError};

/// Signature for one file and whether it had to be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Hex-encoded content signature.
    pub signature: String,
    /// `true` if the signer ran, `false` on a cache hit.
    pub fresh: bool,
}

/// Resolve the signature for `file`, consulting and updating `store`.
///
/// On a miss the file is signed and a new entry overwrites any previous one.
/// When signing fails nothing is recorded.
pub fn resolve_signature(
    file: &FileEntry,
    store: &mut SignatureStore,
    signer: &dyn ContentSigner,
) -> Result<Resolved, SignError> {
    let algorithm = signer.algorithm();
    if let Some(signature) = store.fresh_signature(file, algorithm) {
        log::trace!("Cache hit: {}", file.path.display());
        return Ok(Resolved {
            signature: signature.to_string(),
            fresh: false,
        });
    }

    log::trace!("Cache miss: {}", file.path.display());
    let signature = signer.sign(&file.path)?;
    store.insert(
        file.path.clone(),
        CacheEntry::new(signature.clone(), file, algorithm),
    );
    Ok(Resolved {
        signature,
        fresh: true,
    })
}

/// Same as [`resolve_signature`] for a store shared between signing threads.
///
/// The lookup and the insert each hold the lock; signing runs unlocked.
/// Callers must not resolve the same path from two threads at once. The
/// parallel scan upholds this by handing every walked path to exactly one
/// worker (see `TreeScanner::scan_parallel`).
pub fn resolve_signature_shared(
    file: &FileEntry,
    store: &Mutex<SignatureStore>,
    signer: &dyn ContentSigner,
) -> Result<Resolved, SignError> {
    let algorithm = signer.algorithm();
    let cached = lock(store)
        .fresh_signature(file, algorithm)
        .map(str::to_string);
    if let Some(signature) = cached {
        log::trace!("Cache hit: {}", file.path.display());
        return Ok(Resolved {
            signature,
            fresh: false,
        });
    }

    log::trace!("Cache miss: {}", file.path.display());
    let signature = signer.sign(&file.path)?;
    lock(store).insert(
        file.path.clone(),
        CacheEntry::new(signature.clone(), file, algorithm),
    );
    Ok(Resolved {
        signature,
        fresh: true,
    })
}

/// A panic in another signing thread cannot leave the map half-updated,
/// so a poisoned lock is still usable.
fn lock(store: &Mutex<SignatureStore>) -> MutexGuard<'_, SignatureStore> {
    store.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
