//! Survivor selection for duplicate sets.
//!
//! Each [`DuplicateSet`] is resolved to a [`ResolutionOutcome`]: keep one
//! file and delete the rest, or leave the set alone. Two policies are
//! provided:
//!
//! - [`AutomaticPolicy`] ("scorched earth"): picks a survivor without
//!   asking, suitable for unattended runs.
//! - [`InteractivePolicy`]: prompts on an injected text stream.
//!
//! The decision rules are plain functions ([`choose_survivor`],
//! [`parse_choice`]) so they can be tested without any I/O.

pub mod automatic;
pub mod interactive;

use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DuplicateSet;

pub use automatic::{choose_survivor, AutomaticPolicy};
pub use interactive::{parse_choice, InteractivePolicy};

/// Decision for one duplicate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Keep the file at this index, delete every other one.
    Keep(usize),
    /// Delete nothing in this set.
    Skip,
    /// Delete nothing in this set or any remaining set.
    Quit,
}

/// Rule used to pick the survivor without asking.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum KeepStrategy {
    /// First file in presentation order (shortest path).
    #[default]
    ShortestPath,
    /// File with the earliest recorded modification time.
    Oldest,
    /// File with the latest recorded modification time.
    Newest,
}

impl std::fmt::Display for KeepStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortestPath => write!(f, "shortest-path"),
            Self::Oldest => write!(f, "oldest"),
            Self::Newest => write!(f, "newest"),
        }
    }
}

/// Survivor rule plus directories whose copies are preferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurvivorRule {
    /// Strategy applied when no preferred root matches.
    pub strategy: KeepStrategy,
    /// A file under one of these roots wins over files elsewhere.
    pub preferred_roots: Vec<PathBuf>,
}

/// Errors raised while gathering a decision.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Reading the answer or writing the prompt failed.
    #[error("interactive I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Turns a duplicate set into a decision.
pub trait ResolutionPolicy {
    /// Resolve `set`, writing any prompt or notice to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the decision cannot be gathered.
    fn resolve(
        &mut self,
        set: &DuplicateSet,
        out: &mut dyn Write,
    ) -> Result<ResolutionOutcome, ResolveError>;
}

/// Write the header and numbered candidate list for `set`.
///
/// ```text
/// Duplicate set found (Signature: 3a7bd3e2...):
/// 1) /music/song1.mp3
/// 2) /music/song1_copy.mp3
/// ```
pub fn write_set_listing(out: &mut dyn Write, set: &DuplicateSet) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Duplicate set found (Signature: {}...):",
        set.short_signature()
    )?;
    for (i, file) in set.files.iter().enumerate() {
        writeln!(out, "{}) {}", i + 1, file.path.display())?;
    }
    Ok(())
}
