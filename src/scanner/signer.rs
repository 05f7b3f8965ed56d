//! Streaming content signers.
//!
//! # Overview
//! A signer reads a file's full byte stream through a fixed-size buffer and
//! returns a hex-encoded 256-bit digest. Signing is the expensive step the
//! signature cache exists to avoid.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::SignError;

/// Read buffer size used while streaming file content.
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Digest used to sign file content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// SHA-256, the cache's historical format.
    #[default]
    Sha256,
    /// BLAKE3, faster on large files.
    Blake3,
}

impl SignatureAlgorithm {
    /// Used by serde to omit the default from cache entries.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Build the signer for this algorithm.
    #[must_use]
    pub fn signer(self) -> Box<dyn ContentSigner> {
        match self {
            Self::Sha256 => Box::new(Sha256Signer),
            Self::Blake3 => Box::new(Blake3Signer),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Computes a content signature for a file.
///
/// Implementations must be deterministic in the file's bytes and must not
/// load the whole file into memory.
pub trait ContentSigner: Send + Sync {
    /// Algorithm recorded alongside signatures from this signer.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Sign the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] if the file cannot be opened or a read fails
    /// part way through.
    fn sign(&self, path: &Path) -> Result<String, SignError>;
}

/// SHA-256 content signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Signer;

impl ContentSigner for Sha256Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Sha256
    }

    fn sign(&self, path: &Path) -> Result<String, SignError> {
        let mut hasher = Sha256::new();
        stream_into(path, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// BLAKE3 content signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Signer;

impl ContentSigner for Blake3Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Blake3
    }

    fn sign(&self, path: &Path) -> Result<String, SignError> {
        let mut hasher = blake3::Hasher::new();
        stream_into(path, &mut hasher)?;
        Ok(hasher.finalize().to_hex().to_string())
    }
}

fn stream_into<W: Write>(path: &Path, sink: &mut W) -> Result<(), SignError> {
    let file = File::open(path).map_err(|e| SignError::from_io(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    io::copy(&mut reader, sink).map_err(|e| SignError::from_io(path, e))?;
    Ok(())
}
