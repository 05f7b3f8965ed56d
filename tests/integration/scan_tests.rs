use muxic::cache::SignatureStore;
use muxic::duplicates::group_duplicates;
use muxic::scanner::{
    Blake3Signer, ContentSigner, ScanError, Sha256Signer, TreeScanner, WalkerConfig,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_identical_content_grouped_distinct_content_apart() {
    let dir = tempdir().unwrap();
    let groups = [
        ("red", vec!["r1.mp3", "r2.flac", "r3.ogg"]),
        ("green", vec!["g1.mp3", "g2.mp3"]),
        ("blue", vec!["b1.wav"]),
    ];
    for (content, names) in &groups {
        for name in names {
            fs::write(dir.path().join(name), content).unwrap();
        }
    }

    let mut store = SignatureStore::new();
    let outcome = TreeScanner::new(WalkerConfig::default())
        .scan(dir.path(), &mut store, &Sha256Signer)
        .unwrap();
    let sets = group_duplicates(outcome.by_signature);

    assert_eq!(sets.len(), 2);
    let mut sizes: Vec<usize> = sets.iter().map(|s| s.len()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![2, 3]);
    for set in &sets {
        let contents: Vec<Vec<u8>> = set.files.iter().map(|f| fs::read(&f.path).unwrap()).collect();
        assert!(contents.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn test_extension_matching_is_case_insensitive() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("LOUD.MP3"), b"x").unwrap();
    fs::write(dir.path().join("Mixed.FlAc"), b"y").unwrap();
    fs::write(dir.path().join("readme.txt"), b"z").unwrap();

    let mut store = SignatureStore::new();
    let outcome = TreeScanner::new(WalkerConfig::default())
        .scan(dir.path(), &mut store, &Sha256Signer)
        .unwrap();

    assert_eq!(outcome.files_scanned, 2);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_extra_extensions() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.dsf"), b"same").unwrap();
    fs::write(dir.path().join("b.dsf"), b"same").unwrap();

    let mut store = SignatureStore::new();
    let default = TreeScanner::new(WalkerConfig::default())
        .scan(dir.path(), &mut store, &Sha256Signer)
        .unwrap();
    assert_eq!(default.files_scanned, 0);

    let extended = TreeScanner::new(WalkerConfig::default().with_extra_extensions(["dsf"]))
        .scan(dir.path(), &mut store, &Sha256Signer)
        .unwrap();
    assert_eq!(extended.files_scanned, 2);
    assert_eq!(group_duplicates(extended.by_signature).len(), 1);
}

#[test]
fn test_empty_files_are_duplicates_of_each_other() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("silence1.wav"), b"").unwrap();
    fs::write(dir.path().join("silence2.wav"), b"").unwrap();

    let mut store = SignatureStore::new();
    let outcome = TreeScanner::new(WalkerConfig::default())
        .scan(dir.path(), &mut store, &Sha256Signer)
        .unwrap();

    assert_eq!(group_duplicates(outcome.by_signature).len(), 1);
}

#[test]
fn test_signers_disagree_but_group_the_same() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"content").unwrap();
    fs::write(dir.path().join("b.mp3"), b"content").unwrap();
    let path = dir.path().join("a.mp3");

    assert_ne!(Sha256Signer.sign(&path).unwrap(), Blake3Signer.sign(&path).unwrap());

    let mut store = SignatureStore::new();
    let outcome = TreeScanner::new(WalkerConfig::default())
        .scan(dir.path(), &mut store, &Blake3Signer)
        .unwrap();
    assert_eq!(group_duplicates(outcome.by_signature).len(), 1);
}

#[test]
fn test_root_errors() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.mp3");
    fs::write(&file, b"x").unwrap();
    let scanner = TreeScanner::new(WalkerConfig::default());
    let mut store = SignatureStore::new();

    let missing = scanner.scan(&dir.path().join("nope"), &mut store, &Sha256Signer);
    assert!(matches!(missing, Err(ScanError::NotFound(_))));

    let not_dir = scanner.scan(&file, &mut store, &Sha256Signer);
    assert!(matches!(not_dir, Err(ScanError::NotADirectory(_))));
    assert!(store.is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("real.mp3"), b"x").unwrap();
    std::os::unix::fs::symlink(dir.path().join("real.mp3"), dir.path().join("alias.mp3")).unwrap();

    let mut store = SignatureStore::new();
    let outcome = TreeScanner::new(WalkerConfig::default())
        .scan(dir.path(), &mut store, &Sha256Signer)
        .unwrap();

    assert_eq!(outcome.files_scanned, 1);
    assert!(group_duplicates(outcome.by_signature).is_empty());
}
