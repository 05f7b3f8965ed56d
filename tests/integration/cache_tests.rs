use filetime::{set_file_mtime, FileTime};
use muxic::cache::SignatureStore;
use muxic::dedup::{CacheMode, DedupOptions, Deduplicator};
use muxic::scanner::{
    ContentSigner, Sha256Signer, SignError, SignatureAlgorithm, TreeScanner, WalkerConfig,
};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Counts how often the real signer runs.
#[derive(Default)]
struct CountingSigner {
    calls: Arc<AtomicUsize>,
}

impl ContentSigner for CountingSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Sha256
    }

    fn sign(&self, path: &Path) -> Result<String, SignError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Sha256Signer.sign(path)
    }
}

fn signature_of(store: &SignatureStore, path: &Path) -> String {
    let path = fs::canonicalize(path).unwrap();
    store.get(&path).unwrap().signature.clone()
}

fn run_automatic(target: &Path, cache: &Path) -> muxic::dedup::DedupReport {
    let options = DedupOptions::new(target)
        .with_automatic(true)
        .with_cache(CacheMode::Persistent(cache.to_path_buf()));
    Deduplicator::new(options)
        .run(Cursor::new(Vec::new()), &mut Vec::new())
        .unwrap()
}

#[test]
fn test_cache_hit_does_not_sign_again() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"first").unwrap();
    fs::write(dir.path().join("b.flac"), b"second").unwrap();

    let signer = CountingSigner::default();
    let calls = Arc::clone(&signer.calls);
    let scanner = TreeScanner::new(WalkerConfig::default());
    let mut store = SignatureStore::new();

    scanner.scan(dir.path(), &mut store, &signer).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let second = scanner.scan(dir.path(), &mut store, &signer).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.signatures_computed, 0);
}

#[test]
fn test_unchanged_metadata_trusts_cache_over_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.mp3");
    let pinned = FileTime::from_unix_time(1_600_000_000, 0);

    fs::write(&path, b"duplicate_content").unwrap();
    set_file_mtime(&path, pinned).unwrap();

    let scanner = TreeScanner::new(WalkerConfig::default());
    let mut store = SignatureStore::new();
    scanner.scan(dir.path(), &mut store, &Sha256Signer).unwrap();
    let original = signature_of(&store, &path);

    // Same length, different bytes, same mtime: indistinguishable by metadata.
    fs::write(&path, b"DUPLICATE_CONTENT").unwrap();
    set_file_mtime(&path, pinned).unwrap();

    let outcome = scanner.scan(dir.path(), &mut store, &Sha256Signer).unwrap();
    assert_eq!(outcome.cache_hits, 1);
    assert!(outcome.by_signature.contains_key(&original));
    assert_eq!(signature_of(&store, &path), original);
}

#[test]
fn test_content_change_invalidates_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.mp3");
    fs::write(&path, b"before").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let scanner = TreeScanner::new(WalkerConfig::default());
    let mut store = SignatureStore::new();
    scanner.scan(dir.path(), &mut store, &Sha256Signer).unwrap();
    let stale = signature_of(&store, &path);

    fs::write(&path, b"after the edit").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_600_000_100, 0)).unwrap();

    let outcome = scanner.scan(dir.path(), &mut store, &Sha256Signer).unwrap();
    assert_eq!(outcome.signatures_computed, 1);
    assert_ne!(signature_of(&store, &path), stale);
    assert_eq!(store.get(&fs::canonicalize(&path).unwrap()).unwrap().size, 14);
}

#[test]
fn test_mtime_change_alone_forces_resign() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("song.mp3");
    fs::write(&path, b"content").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let signer = CountingSigner::default();
    let calls = Arc::clone(&signer.calls);
    let scanner = TreeScanner::new(WalkerConfig::default());
    let mut store = SignatureStore::new();
    scanner.scan(dir.path(), &mut store, &signer).unwrap();

    set_file_mtime(&path, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
    scanner.scan(dir.path(), &mut store, &signer).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cache_persists_between_runs() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::write(dir.path().join("a.mp3"), b"one").unwrap();
    fs::write(dir.path().join("b.mp3"), b"two").unwrap();

    let first = run_automatic(dir.path(), &cache);
    assert_eq!(first.signatures_computed, 2);
    assert!(cache.exists());

    let second = run_automatic(dir.path(), &cache);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.signatures_computed, 0);
}

#[test]
fn test_cache_file_shape() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::write(dir.path().join("a.mp3"), b"one").unwrap();

    run_automatic(dir.path(), &cache);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    let entries = json.as_object().unwrap();
    assert_eq!(entries.len(), 1);

    let (key, entry) = entries.iter().next().unwrap();
    assert!(PathBuf::from(key).is_absolute());
    assert!(key.ends_with("a.mp3"));
    assert_eq!(entry["signature"].as_str().unwrap().len(), 64);
    assert_eq!(entry["size"], 3);
    assert!(entry["mod_time"].is_i64());
    assert!(entry.get("algorithm").is_none());
}

#[test]
fn test_prune_after_external_delete() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    let gone = dir.path().join("gone.mp3");
    fs::write(dir.path().join("kept.mp3"), b"kept").unwrap();
    fs::write(&gone, b"gone").unwrap();

    run_automatic(dir.path(), &cache);
    let canonical_gone = fs::canonicalize(&gone).unwrap();
    assert!(SignatureStore::load(&cache).unwrap().contains(&canonical_gone));

    fs::remove_file(&gone).unwrap();
    let report = run_automatic(dir.path(), &cache);

    assert_eq!(report.duplicate_sets, 0);
    assert_eq!(report.pruned_entries, 1);
    let store = SignatureStore::load(&cache).unwrap();
    assert!(!store.contains(&canonical_gone));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_prune_covers_paths_outside_target() {
    let library = tempdir().unwrap();
    let other = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::write(library.path().join("a.mp3"), b"a").unwrap();
    let elsewhere = other.path().join("b.mp3");
    fs::write(&elsewhere, b"b").unwrap();

    run_automatic(other.path(), &cache);
    let canonical = fs::canonicalize(&elsewhere).unwrap();
    fs::remove_file(&elsewhere).unwrap();

    run_automatic(library.path(), &cache);
    assert!(!SignatureStore::load(&cache).unwrap().contains(&canonical));
}

#[test]
fn test_clear_cache_resigns_everything() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::write(dir.path().join("a.mp3"), b"one").unwrap();

    run_automatic(dir.path(), &cache);

    let options = DedupOptions::new(dir.path())
        .with_automatic(true)
        .with_cache(CacheMode::Cleared(cache.clone()));
    let report = Deduplicator::new(options)
        .run(Cursor::new(Vec::new()), &mut Vec::new())
        .unwrap();

    assert_eq!(report.signatures_computed, 1);
    assert_eq!(report.cache_hits, 0);
    assert_eq!(SignatureStore::load(&cache).unwrap().len(), 1);
}

#[test]
fn test_algorithm_switch_invalidates_entries() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("dedup_cache.json");
    fs::write(dir.path().join("a.mp3"), b"one").unwrap();

    run_automatic(dir.path(), &cache);

    let options = DedupOptions::new(dir.path())
        .with_automatic(true)
        .with_algorithm(SignatureAlgorithm::Blake3)
        .with_cache(CacheMode::Persistent(cache.clone()));
    let report = Deduplicator::new(options)
        .run(Cursor::new(Vec::new()), &mut Vec::new())
        .unwrap();
    assert_eq!(report.signatures_computed, 1);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    let entry = json.as_object().unwrap().values().next().unwrap();
    assert_eq!(entry["algorithm"], "blake3");
}
