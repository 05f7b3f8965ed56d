//! End-to-end deduplication run.
//!
//! # Pipeline
//!
//! A run goes through these steps in order:
//!
//! 1. Validate the target directory (fatal if missing or not a directory)
//! 2. Load the [`SignatureStore`] (a load failure starts from an empty store)
//! 3. Scan the tree, reusing fresh cached signatures
//! 4. Group files into [`DuplicateSet`]s in signature order
//! 5. Resolve each set through a [`ResolutionPolicy`] and delete the
//!    non-survivors
//! 6. Prune store entries whose file no longer exists
//! 7. Save the store (a save failure is reported, not fatal)
//!
//! Progress and results are written to an injected report stream, so the
//! whole run can be driven from tests with in-memory buffers.
//!
//! # Example
//!
//! ```no_run
//! use muxic::dedup::{DedupOptions, Deduplicator};
//! use std::io;
//!
//! let options = DedupOptions::new("/music").with_automatic(true);
//! let report = Deduplicator::new(options).run(io::stdin().lock(), &mut io::stdout())?;
//! println!("{} sets", report.duplicate_sets);
//! # Ok::<(), muxic::dedup::DedupError>(())
//! ```

use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytesize::ByteSize;
use serde::Serialize;
use thiserror::Error;

use crate::actions::{delete_duplicates, DeleteConfig, DeleteError, DeleteProgressCallback};
use crate::cache::SignatureStore;
use crate::duplicates::{group_duplicates, DuplicateSet};
use crate::progress::ProgressCallback;
use crate::resolve::{
    write_set_listing, AutomaticPolicy, InteractivePolicy, ResolutionOutcome, ResolutionPolicy,
    ResolveError, SurvivorRule,
};
use crate::scanner::{ContentSigner, ScanError, SignatureAlgorithm, TreeScanner, WalkerConfig};

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum DedupError {
    /// The target directory does not exist.
    #[error("Target directory not found: {0}")]
    PathNotFound(PathBuf),

    /// The target exists but is not a directory.
    #[error("Target is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The tree could not be enumerated. Nothing was deleted or saved.
    #[error("Scan aborted: {0}")]
    Scan(#[from] ScanError),

    /// An interactive answer could not be read.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Writing to the report stream failed.
    #[error("Failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Where the signature store lives for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    /// Load from and save to this file.
    Persistent(PathBuf),
    /// Start empty, then save to this file.
    Cleared(PathBuf),
    /// Keep the store in memory only.
    Disabled,
}

impl CacheMode {
    fn path(&self) -> Option<&Path> {
        match self {
            Self::Persistent(path) | Self::Cleared(path) => Some(path),
            Self::Disabled => None,
        }
    }
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct DedupOptions {
    /// Directory to scan.
    pub target: PathBuf,
    /// Resolve without asking ("scorched earth").
    pub automatic: bool,
    /// Survivor rule used in automatic mode.
    pub survivor_rule: SurvivorRule,
    /// Report deletions without performing them.
    pub dry_run: bool,
    /// Signature store location.
    pub cache: CacheMode,
    /// Extensions and thread count for the scan.
    pub walker: WalkerConfig,
    /// Signature algorithm.
    pub algorithm: SignatureAlgorithm,
}

impl DedupOptions {
    /// Interactive run over `target` with default settings.
    ///
    /// The signature store stays in memory unless a location is set with
    /// [`with_cache`](Self::with_cache).
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            automatic: false,
            survivor_rule: SurvivorRule::default(),
            dry_run: false,
            cache: CacheMode::Disabled,
            walker: WalkerConfig::default(),
            algorithm: SignatureAlgorithm::default(),
        }
    }

    #[must_use]
    pub fn with_automatic(mut self, automatic: bool) -> Self {
        self.automatic = automatic;
        self
    }

    #[must_use]
    pub fn with_survivor_rule(mut self, rule: SurvivorRule) -> Self {
        self.survivor_rule = rule;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_walker(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// A deletion that did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Totals of a completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    /// Media files successfully signed or served from the cache.
    pub files_scanned: usize,
    /// Files whose signature had to be computed.
    pub signatures_computed: usize,
    /// Files whose cached signature was reused.
    pub cache_hits: usize,
    /// Files left out of grouping because they could not be read.
    pub scan_errors: Vec<String>,
    /// Duplicate sets found.
    pub duplicate_sets: usize,
    /// Space held by every copy but one, summed over all sets.
    pub wasted_bytes: u64,
    /// Sets left untouched (skip, keep all, quit).
    pub sets_skipped: usize,
    /// Files removed (or, in a dry run, that would have been).
    pub deleted: Vec<PathBuf>,
    /// Non-survivors that could not be removed.
    pub deletion_failures: Vec<DeletionFailure>,
    /// Recorded size of every file in `deleted`.
    pub bytes_reclaimed: u64,
    /// Store entries dropped because their file is gone.
    pub pruned_entries: usize,
    /// Whether deletions were only reported.
    pub dry_run: bool,
    /// Message of a failed store save.
    pub cache_save_error: Option<String>,
}

impl DedupReport {
    /// Number of files deleted.
    #[must_use]
    pub fn files_deleted(&self) -> usize {
        self.deleted.len()
    }

    /// Whether any recoverable error occurred.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.scan_errors.is_empty()
            || !self.deletion_failures.is_empty()
            || self.cache_save_error.is_some()
    }
}

impl fmt::Display for DedupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "Found {} duplicate set(s); would delete {} file(s), reclaiming approx {}.",
                self.duplicate_sets,
                self.files_deleted(),
                ByteSize(self.bytes_reclaimed)
            )
        } else {
            write!(
                f,
                "Found {} duplicate set(s); deleted {} file(s), reclaimed approx {}.",
                self.duplicate_sets,
                self.files_deleted(),
                ByteSize(self.bytes_reclaimed)
            )
        }
    }
}

/// Echoes deletions to the report stream.
struct ReportWriter<'a> {
    out: &'a mut dyn Write,
    error: Option<io::Error>,
}

impl<'a> ReportWriter<'a> {
    fn new(out: &'a mut dyn Write) -> Self {
        Self { out, error: None }
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if self.error.is_none() {
            if let Err(e) = self.out.write_fmt(args).and_then(|()| self.out.flush()) {
                self.error = Some(e);
            }
        }
    }

    fn finish(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }
}

impl DeleteProgressCallback for ReportWriter<'_> {
    fn on_before_delete(&mut self, path: &Path) {
        self.emit(format_args!("Deleting {}... ", path.display()));
    }

    fn on_delete_success(&mut self, _path: &Path, _size: u64) {
        self.emit(format_args!("Done.\n"));
    }

    fn on_delete_failure(&mut self, _path: &Path, error: &DeleteError) {
        self.emit(format_args!("Error: {error}\n"));
    }

    fn on_would_delete(&mut self, path: &Path, _size: u64) {
        self.emit(format_args!("Would delete {}\n", path.display()));
    }
}

/// Runs the full pipeline for one target.
pub struct Deduplicator {
    options: DedupOptions,
    signer: Box<dyn ContentSigner>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deduplicator")
            .field("options", &self.options)
            .field("signer", &self.signer.algorithm())
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Deduplicator {
    /// Create a run using the signer for `options.algorithm`.
    #[must_use]
    pub fn new(options: DedupOptions) -> Self {
        let signer = options.algorithm.signer();
        Self {
            options,
            signer,
            progress: None,
        }
    }

    /// Replace the content signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Box<dyn ContentSigner>) -> Self {
        self.options.algorithm = signer.algorithm();
        self.signer = signer;
        self
    }

    /// Set the scan progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Run with the policy chosen by the options: automatic, or interactive
    /// answers read from `input`.
    ///
    /// # Errors
    ///
    /// See [`Deduplicator::run_with_policy`].
    pub fn run<R: BufRead>(&self, input: R, out: &mut dyn Write) -> Result<DedupReport, DedupError> {
        if self.options.automatic {
            let mut policy = AutomaticPolicy::new(self.options.survivor_rule.clone());
            self.run_with_policy(&mut policy, out)
        } else {
            let mut policy = InteractivePolicy::new(input);
            self.run_with_policy(&mut policy, out)
        }
    }

    /// Run the pipeline, resolving every set through `policy`.
    ///
    /// # Errors
    ///
    /// Fails before touching anything if the target is missing, is not a
    /// directory, or cannot be walked. Also fails if the report stream or
    /// the interactive input breaks mid-run; deletions already made stay
    /// made and the store is not saved.
    pub fn run_with_policy(
        &self,
        policy: &mut dyn ResolutionPolicy,
        out: &mut dyn Write,
    ) -> Result<DedupReport, DedupError> {
        let target = &self.options.target;
        self.validate_target()?;

        let mut store = self.load_store(out)?;
        let mut report = DedupReport {
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        writeln!(out, "Scanning {}...", target.display())?;
        let mut scanner = TreeScanner::new(self.options.walker.clone());
        if let Some(cb) = &self.progress {
            scanner = scanner.with_progress_callback(Arc::clone(cb));
        }
        let outcome = scanner.scan(target, &mut store, self.signer.as_ref())?;

        for error in &outcome.errors {
            writeln!(out, "Error processing file: {error}")?;
            report.scan_errors.push(error.to_string());
        }
        writeln!(out, "Scan complete.")?;

        report.files_scanned = outcome.files_scanned;
        report.signatures_computed = outcome.signatures_computed;
        report.cache_hits = outcome.cache_hits;

        let sets = group_duplicates(outcome.by_signature);
        report.duplicate_sets = sets.len();
        report.wasted_bytes = sets.iter().map(DuplicateSet::wasted_space).sum();
        log::info!("Found {} duplicate sets", sets.len());

        self.resolve_sets(&sets, policy, &mut store, &mut report, out)?;

        writeln!(out, "Pruning cache...")?;
        report.pruned_entries = store.prune_missing().len();

        self.save_store(&store, &mut report, out)?;

        if sets.is_empty() {
            writeln!(out, "No duplicates found.")?;
        }
        writeln!(out, "{report}")?;
        out.flush()?;

        Ok(report)
    }

    fn validate_target(&self) -> Result<(), DedupError> {
        let target = &self.options.target;
        match fs::metadata(target) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(DedupError::NotADirectory(target.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DedupError::PathNotFound(target.clone()))
            }
            Err(e) => Err(DedupError::Scan(ScanError::Walk {
                path: target.clone(),
                message: e.to_string(),
            })),
        }
    }

    fn load_store(&self, out: &mut dyn Write) -> Result<SignatureStore, DedupError> {
        match &self.options.cache {
            CacheMode::Disabled => {
                log::debug!("Signature cache disabled");
                Ok(SignatureStore::new())
            }
            CacheMode::Cleared(path) => {
                writeln!(out, "Starting with an empty cache ({})", path.display())?;
                Ok(SignatureStore::new())
            }
            CacheMode::Persistent(path) => {
                writeln!(out, "Loading cache from {}", path.display())?;
                match SignatureStore::load(path) {
                    Ok(store) => Ok(store),
                    Err(e) => {
                        log::warn!("Could not load cache {}: {}", path.display(), e);
                        writeln!(out, "Warning: Could not load cache: {e}. Starting fresh.")?;
                        Ok(SignatureStore::new())
                    }
                }
            }
        }
    }

    fn resolve_sets(
        &self,
        sets: &[DuplicateSet],
        policy: &mut dyn ResolutionPolicy,
        store: &mut SignatureStore,
        report: &mut DedupReport,
        out: &mut dyn Write,
    ) -> Result<(), DedupError> {
        let config = DeleteConfig::default().with_dry_run(self.options.dry_run);

        for (index, set) in sets.iter().enumerate() {
            write_set_listing(out, set)?;

            let survivor = match policy.resolve(set, out)? {
                ResolutionOutcome::Keep(survivor) => survivor,
                ResolutionOutcome::Skip => {
                    writeln!(out, "Skipping.")?;
                    report.sets_skipped += 1;
                    continue;
                }
                ResolutionOutcome::Quit => {
                    let remaining = sets.len() - index;
                    writeln!(out, "Quitting; {remaining} set(s) left untouched.")?;
                    report.sets_skipped += remaining;
                    break;
                }
            };

            let mut writer = ReportWriter::new(out);
            let result = delete_duplicates(set, survivor, store, &config, Some(&mut writer));
            writer.finish()?;

            match result {
                Ok(batch) => {
                    report.bytes_reclaimed += batch.bytes_freed;
                    report
                        .deleted
                        .extend(batch.successes.into_iter().map(|s| s.path));
                    report.deletion_failures.extend(
                        batch
                            .failures
                            .into_iter()
                            .map(|(path, error)| DeletionFailure { path, error }),
                    );
                }
                Err(e) => {
                    writeln!(out, "Error: {e}")?;
                    report.sets_skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn save_store(
        &self,
        store: &SignatureStore,
        report: &mut DedupReport,
        out: &mut dyn Write,
    ) -> Result<(), DedupError> {
        let Some(path) = self.options.cache.path() else {
            return Ok(());
        };

        match store.save(path) {
            Ok(()) => writeln!(out, "Cache saved.")?,
            Err(e) => {
                log::warn!("Could not save cache {}: {}", path.display(), e);
                writeln!(out, "Error saving cache: {e}")?;
                report.cache_save_error = Some(e.to_string());
            }
        }
        Ok(())
    }
}
