//! Cache-aware scan of a directory tree.
//!
//! Every media file found by the [`Walker`] gets a signature through the
//! freshness check, and its entry is appended to the list kept under that
//! signature. Per-file failures are collected and the file is left out of
//! the index; a walk failure aborts the scan.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;

use super::{ContentSigner, FileEntry, ScanError, SignError, Walker, WalkerConfig};
use crate::cache::{resolve_signature, resolve_signature_shared, Resolved, SignatureStore};
use crate::progress::ProgressCallback;

/// Name reported to [`ProgressCallback`] for the scan phase.
pub const SCAN_PHASE: &str = "scanning";

/// Result of scanning one tree.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Files keyed by content signature, in walk order within each list.
    pub by_signature: HashMap<String, Vec<FileEntry>>,
    /// Media files successfully signed or served from the cache.
    pub files_scanned: usize,
    /// Files whose signature had to be computed.
    pub signatures_computed: usize,
    /// Files whose cached signature was reused.
    pub cache_hits: usize,
    /// Per-file errors. Those files are absent from `by_signature`.
    pub errors: Vec<ScanError>,
}

impl ScanOutcome {
    fn record(&mut self, file: FileEntry, resolved: Resolved) {
        self.files_scanned += 1;
        if resolved.fresh {
            self.signatures_computed += 1;
        } else {
            self.cache_hits += 1;
        }
        self.by_signature
            .entry(resolved.signature)
            .or_default()
            .push(file);
    }

    fn record_error(&mut self, file: &FileEntry, error: SignError) {
        log::warn!("Error processing {}: {}", file.path.display(), error);
        self.errors.push(ScanError::from(error));
    }
}

impl From<SignError> for ScanError {
    fn from(error: SignError) -> Self {
        match error {
            SignError::NotFound(path) => Self::NotFound(path),
            SignError::PermissionDenied(path) => Self::PermissionDenied(path),
            SignError::Io { path, source } => Self::Io { path, source },
        }
    }
}

/// Scans a tree and resolves a signature for every media file.
pub struct TreeScanner {
    config: WalkerConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for TreeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeScanner")
            .field("config", &self.config)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl TreeScanner {
    /// Create a scanner with the given walker configuration.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Scan `root`, reading and updating `store`.
    ///
    /// The root is canonicalized first so every path in the index and the
    /// store is absolute.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the root does not exist, is not a directory,
    /// or any directory in the tree cannot be enumerated.
    pub fn scan(
        &self,
        root: &Path,
        store: &mut SignatureStore,
        signer: &dyn ContentSigner,
    ) -> Result<ScanOutcome, ScanError> {
        let root = fs::canonicalize(root).map_err(|e| ScanError::from_io(root, e))?;
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_start(SCAN_PHASE, 0);
        }

        let result = if self.config.io_threads > 1 {
            self.scan_parallel(&root, store, signer)
        } else {
            self.scan_sequential(&root, store, signer)
        };

        if let Some(cb) = &self.progress {
            cb.on_phase_end(SCAN_PHASE);
        }

        if let Ok(outcome) = &result {
            log::info!(
                "Scanned {} media files ({} signed, {} cached, {} errors)",
                outcome.files_scanned,
                outcome.signatures_computed,
                outcome.cache_hits,
                outcome.errors.len()
            );
        }
        result
    }

    fn scan_sequential(
        &self,
        root: &Path,
        store: &mut SignatureStore,
        signer: &dyn ContentSigner,
    ) -> Result<ScanOutcome, ScanError> {
        let mut outcome = ScanOutcome::default();
        let walker = Walker::new(root, self.config.clone());

        for (index, item) in walker.walk().enumerate() {
            let file = match item {
                Ok(file) => file,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    outcome.errors.push(e);
                    continue;
                }
            };

            self.report_progress(index + 1, &file);
            match resolve_signature(&file, store, signer) {
                Ok(resolved) => outcome.record(file, resolved),
                Err(e) => outcome.record_error(&file, e),
            }
        }

        Ok(outcome)
    }

    /// Walk sequentially, then sign on a rayon pool with the store behind a
    /// mutex. Results are folded back in walk order.
    /// Walks first, then signs on a pool of `io_threads` workers.
    ///
    /// Each walked path is resolved by exactly one worker. The shared store
    /// relies on this: a lookup and its insert for one path never race with
    /// another worker on the same key.
    fn scan_parallel(
        &self,
        root: &Path,
        store: &mut SignatureStore,
        signer: &dyn ContentSigner,
    ) -> Result<ScanOutcome, ScanError> {
        let mut outcome = ScanOutcome::default();
        let mut files = Vec::new();
        for item in Walker::new(root, self.config.clone()).walk() {
            match item {
                Ok(file) => files.push(file),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => outcome.errors.push(e),
            }
        }
        debug_assert_eq!(
            files.iter().map(|f| &f.path).collect::<HashSet<_>>().len(),
            files.len(),
            "walk yielded a path twice"
        );

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                log::warn!("Falling back to sequential signing: {}", e);
                return self.scan_sequential(root, store, signer);
            }
        };

        let shared = Mutex::new(std::mem::take(store));
        let resolved: Vec<Result<Resolved, SignError>> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .map(|(index, file)| {
                    self.report_progress(index + 1, file);
                    resolve_signature_shared(file, &shared, signer)
                })
                .collect()
        });
        *store = shared.into_inner().unwrap_or_else(PoisonError::into_inner);

        for (file, result) in files.into_iter().zip(resolved) {
            match result {
                Ok(resolved) => outcome.record(file, resolved),
                Err(e) => outcome.record_error(&file, e),
            }
        }

        Ok(outcome)
    }

    fn report_progress(&self, current: usize, file: &FileEntry) {
        if let Some(cb) = &self.progress {
            cb.on_progress(current, &file.path.to_string_lossy());
        }
    }
}
