//! Interactive resolution over an injected text stream.
//!
//! # Prompt Protocol
//!
//! After the candidate listing, one prompt line is written and one line is
//! read back. Answers are matched case-sensitively after trimming:
//!
//! | Answer | Effect |
//! |--------|--------|
//! | `1`..`n` | keep that file, delete the others |
//! | `s` | skip this set |
//! | `a` | keep all files in this set (same as skip) |
//! | `q` | skip this set and every remaining one |
//!
//! Anything else prints `Invalid input.` and prompts again. When the input
//! stream is closed the set is skipped.

use std::io::{self, BufRead, Write};

use super::{ResolutionOutcome, ResolutionPolicy, ResolveError};
use crate::duplicates::DuplicateSet;

/// Prompt shown for every set.
pub const PROMPT: &str = "Enter number to keep (or 's' to skip, 'a' to keep all, 'q' to quit): ";

/// Answer that skips the current set.
pub const SKIP_TOKEN: &str = "s";
/// Answer that keeps every file of the current set.
pub const KEEP_ALL_TOKEN: &str = "a";
/// Answer that stops resolving.
pub const QUIT_TOKEN: &str = "q";

/// Interpret one line of input for a set with `count` files.
///
/// Returns `None` for anything that is not a valid answer.
///
/// # Example
///
/// ```
/// use muxic::resolve::{parse_choice, ResolutionOutcome};
///
/// assert_eq!(parse_choice("2\n", 3), Some(ResolutionOutcome::Keep(1)));
/// assert_eq!(parse_choice("s", 3), Some(ResolutionOutcome::Skip));
/// assert_eq!(parse_choice("4", 3), None);
/// ```
#[must_use]
pub fn parse_choice(input: &str, count: usize) -> Option<ResolutionOutcome> {
    match input.trim() {
        SKIP_TOKEN | KEEP_ALL_TOKEN => Some(ResolutionOutcome::Skip),
        QUIT_TOKEN => Some(ResolutionOutcome::Quit),
        answer => match answer.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Some(ResolutionOutcome::Keep(n - 1)),
            _ => None,
        },
    }
}

/// Asks the operator which file of each set to keep.
#[derive(Debug)]
pub struct InteractivePolicy<R> {
    input: R,
}

impl<R: BufRead> InteractivePolicy<R> {
    /// Create a policy reading answers from `input`.
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Read one line; `None` once the stream is closed.
    fn read_answer(&mut self) -> Result<Option<String>, ResolveError> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            // Not UTF-8: treat like any other unrecognized answer.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(ResolveError::Io(e)),
        }
    }
}

impl<R: BufRead> ResolutionPolicy for InteractivePolicy<R> {
    fn resolve(
        &mut self,
        set: &DuplicateSet,
        out: &mut dyn Write,
    ) -> Result<ResolutionOutcome, ResolveError> {
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            let Some(answer) = self.read_answer()? else {
                writeln!(out)?;
                log::warn!("Input closed, skipping set {}", set.short_signature());
                return Ok(ResolutionOutcome::Skip);
            };

            if let Some(outcome) = parse_choice(&answer, set.len()) {
                return Ok(outcome);
            }
            writeln!(out, "Invalid input.")?;
        }
    }
}
