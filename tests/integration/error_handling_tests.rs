use muxic::dedup::{CacheMode, DedupError, DedupOptions, Deduplicator};
use muxic::duplicates::DuplicateSet;
use muxic::resolve::{ResolutionOutcome, ResolutionPolicy, ResolveError};
use muxic::scanner::{ContentSigner, ScanError, Sha256Signer, SignError, SignatureAlgorithm};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Refuses to read files whose name contains "broken".
struct FlakySigner;

impl ContentSigner for FlakySigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Sha256
    }

    fn sign(&self, path: &Path) -> Result<String, SignError> {
        if path.to_string_lossy().contains("broken") {
            return Err(SignError::PermissionDenied(path.to_path_buf()));
        }
        Sha256Signer.sign(path)
    }
}

/// Keeps the first file, but tampers with the others before answering.
struct TamperingPolicy {
    tamper: fn(&Path),
}

impl ResolutionPolicy for TamperingPolicy {
    fn resolve(
        &mut self,
        set: &DuplicateSet,
        _out: &mut dyn Write,
    ) -> Result<ResolutionOutcome, ResolveError> {
        for file in &set.files[1..] {
            (self.tamper)(&file.path);
        }
        Ok(ResolutionOutcome::Keep(0))
    }
}

/// Removes the first file, then picks it as the survivor.
struct VanishingSurvivorPolicy;

impl ResolutionPolicy for VanishingSurvivorPolicy {
    fn resolve(
        &mut self,
        set: &DuplicateSet,
        _out: &mut dyn Write,
    ) -> Result<ResolutionOutcome, ResolveError> {
        fs::remove_file(&set.files[0].path).unwrap();
        Ok(ResolutionOutcome::Keep(0))
    }
}

/// Answers with an index past the end of the set.
struct OutOfRangePolicy;

impl ResolutionPolicy for OutOfRangePolicy {
    fn resolve(
        &mut self,
        set: &DuplicateSet,
        _out: &mut dyn Write,
    ) -> Result<ResolutionOutcome, ResolveError> {
        Ok(ResolutionOutcome::Keep(set.len()))
    }
}

fn library() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"same").unwrap();
    fs::write(dir.path().join("bb.mp3"), b"same").unwrap();
    fs::write(dir.path().join("ccc.mp3"), b"same").unwrap();
    dir
}

fn options(target: &Path) -> DedupOptions {
    DedupOptions::new(target)
        .with_automatic(true)
        .with_cache(CacheMode::Disabled)
}

#[test]
fn test_missing_target_is_fatal_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let cache = dir.path().join("cache.json");
    let options = DedupOptions::new(dir.path().join("missing"))
        .with_cache(CacheMode::Persistent(cache.clone()));

    let mut out = Vec::new();
    let err = Deduplicator::new(options)
        .run(Cursor::new(Vec::new()), &mut out)
        .unwrap_err();

    assert!(matches!(err, DedupError::PathNotFound(_)));
    assert!(err.to_string().contains("missing"));
    assert!(out.is_empty());
    assert!(!cache.exists());
}

#[test]
fn test_file_target_is_fatal() {
    let dir = library();
    let err = Deduplicator::new(options(&dir.path().join("a.mp3")))
        .run(Cursor::new(Vec::new()), &mut Vec::new())
        .unwrap_err();

    assert!(matches!(err, DedupError::NotADirectory(_)));
    assert!(dir.path().join("bb.mp3").exists());
}

#[test]
fn test_unreadable_file_is_excluded_and_run_continues() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("good.mp3"), b"same").unwrap();
    fs::write(dir.path().join("good_copy.mp3"), b"same").unwrap();
    fs::write(dir.path().join("broken.mp3"), b"same").unwrap();

    let mut out = Vec::new();
    let report = Deduplicator::new(options(dir.path()))
        .with_signer(Box::new(FlakySigner))
        .run(Cursor::new(Vec::new()), &mut out)
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(report.scan_errors.len(), 1);
    assert!(report.scan_errors[0].contains("broken.mp3"));
    assert!(report.has_errors());
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.duplicate_sets, 1);
    assert!(dir.path().join("broken.mp3").exists());
    assert!(!dir.path().join("good_copy.mp3").exists());
    assert!(out.contains("Error processing file:"));
}

#[test]
fn test_vanished_file_does_not_block_the_rest() {
    let dir = library();
    let mut policy = TamperingPolicy {
        tamper: |path| {
            if path.ends_with("bb.mp3") {
                fs::remove_file(path).unwrap();
            }
        },
    };

    let mut out = Vec::new();
    let report = Deduplicator::new(options(dir.path()))
        .run_with_policy(&mut policy, &mut out)
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(report.deletion_failures.len(), 1);
    assert!(report.deletion_failures[0].path.ends_with("bb.mp3"));
    assert_eq!(report.files_deleted(), 1);
    assert_eq!(report.bytes_reclaimed, 4);
    assert!(dir.path().join("a.mp3").exists());
    assert!(!dir.path().join("ccc.mp3").exists());
    assert!(out.contains("Error: "));
}

#[test]
fn test_file_modified_after_scan_is_kept() {
    let dir = library();
    let mut policy = TamperingPolicy {
        tamper: |path| {
            if path.ends_with("ccc.mp3") {
                fs::write(path, b"new recording").unwrap();
            }
        },
    };

    let report = Deduplicator::new(options(dir.path()))
        .run_with_policy(&mut policy, &mut Vec::new())
        .unwrap();

    assert_eq!(report.deletion_failures.len(), 1);
    assert!(report.deletion_failures[0].error.contains("modified"));
    assert_eq!(fs::read(dir.path().join("ccc.mp3")).unwrap(), b"new recording");
    assert!(!dir.path().join("bb.mp3").exists());
}

#[test]
fn test_out_of_range_survivor_deletes_nothing() {
    let dir = library();
    let mut out = Vec::new();
    let report = Deduplicator::new(options(dir.path()))
        .run_with_policy(&mut OutOfRangePolicy, &mut out)
        .unwrap();

    assert_eq!(report.files_deleted(), 0);
    assert_eq!(report.sets_skipped, 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    assert!(String::from_utf8(out).unwrap().contains("out of range"));
}

#[test]
fn test_vanished_survivor_keeps_every_other_copy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"same").unwrap();
    fs::write(dir.path().join("bb.mp3"), b"same").unwrap();

    let mut out = Vec::new();
    let report = Deduplicator::new(options(dir.path()))
        .run_with_policy(&mut VanishingSurvivorPolicy, &mut out)
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(report.files_deleted(), 0);
    assert_eq!(report.bytes_reclaimed, 0);
    assert_eq!(report.sets_skipped, 1);
    assert!(!dir.path().join("a.mp3").exists());
    assert_eq!(fs::read(dir.path().join("bb.mp3")).unwrap(), b"same");
    assert!(out.contains("survivor changed since scan"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_aborts_the_run() {
    use std::os::unix::fs::PermissionsExt;

    let dir = library();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("d.mp3"), b"same").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not stop a privileged user.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    let result = Deduplicator::new(options(dir.path()).with_cache(CacheMode::Persistent(cache.clone())))
        .run(Cursor::new(Vec::new()), &mut Vec::new());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, DedupError::Scan(ScanError::Walk { .. })));
    assert!(dir.path().join("a.mp3").exists());
    assert!(dir.path().join("bb.mp3").exists());
    assert!(dir.path().join("ccc.mp3").exists());
    assert!(locked.join("d.mp3").exists());
    assert!(!cache.exists());
}

#[test]
fn test_corrupt_cache_is_replaced() {
    let dir = library();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::write(&cache, b"\x00\x01 definitely not json").unwrap();

    let report = Deduplicator::new(options(dir.path()).with_cache(CacheMode::Persistent(cache.clone())))
        .run(Cursor::new(Vec::new()), &mut Vec::new())
        .unwrap();

    assert_eq!(report.signatures_computed, 3);
    assert!(report.cache_save_error.is_none());
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_cache_warns_and_starts_fresh() {
    let dir = library();
    let cache_dir = tempdir().unwrap();
    // A directory where the cache file should be: reading it fails.
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::create_dir(&cache).unwrap();

    let mut out = Vec::new();
    let report = Deduplicator::new(options(dir.path()).with_cache(CacheMode::Persistent(cache)))
        .run(Cursor::new(Vec::new()), &mut out)
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("Warning: Could not load cache:"));
    assert!(out.contains("Starting fresh."));
    assert_eq!(report.duplicate_sets, 1);
    assert!(report.cache_save_error.is_some());
    assert!(out.contains("Error saving cache:"));
}

#[test]
fn test_save_failure_keeps_run_results() {
    let dir = library();
    let blocker = tempdir().unwrap();
    let file = blocker.path().join("plain-file");
    fs::write(&file, b"").unwrap();
    let cache: PathBuf = file.join("dedup_cache.json");

    let report = Deduplicator::new(options(dir.path()).with_cache(CacheMode::Persistent(cache)))
        .run(Cursor::new(Vec::new()), &mut Vec::new())
        .unwrap();

    assert!(report.cache_save_error.is_some());
    assert_eq!(report.files_deleted(), 2);
}
