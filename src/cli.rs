//! Command-line interface definitions for muxic.
//!
//! Global options (verbosity, structured errors) plus the `dedup`
//! subcommand, using the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Review each duplicate set interactively
//! muxic dedup --target ~/Music
//!
//! # Unattended: keep one copy of every set, oldest file wins
//! muxic dedup --target ~/Music --scorched-earth --keep oldest
//!
//! # See what would be removed, as JSON
//! muxic dedup --target ~/Music --scorched-earth --dry-run --json
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::resolve::KeepStrategy;
use crate::scanner::SignatureAlgorithm;

/// Content-based duplicate finder for music libraries.
///
/// Files are compared by a digest of their bytes, never by name or tags. A
/// persistent signature cache makes repeated runs over an unchanged library
/// cheap.
#[derive(Debug, Parser)]
#[command(name = "muxic")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress and log output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate media files by content and remove redundant copies
    #[command(visible_alias = "scan")]
    Dedup(DedupArgs),
}

/// Arguments for the dedup subcommand.
#[derive(Debug, Args)]
pub struct DedupArgs {
    /// Directory to scan for duplicates
    #[arg(short, long, value_name = "DIR")]
    pub target: PathBuf,

    /// Keep one file per set automatically, without prompting
    ///
    /// Warning: deletions are permanent.
    #[arg(long, alias = "scorchedearth")]
    pub scorched_earth: bool,

    /// Report what would be deleted without deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Which file survives in automatic mode [default: shortest-path]
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub keep: Option<KeepStrategy>,

    /// Prefer keeping copies under this directory (repeatable)
    #[arg(long = "prefer", value_name = "DIR")]
    pub preferred_roots: Vec<PathBuf>,

    /// Also scan files with this extension (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Signature algorithm [default: sha256]
    #[arg(long, value_enum)]
    pub algorithm: Option<SignatureAlgorithm>,

    /// Number of signing threads [default: 1]
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Path to the signature cache file
    ///
    /// If not specified, a default platform-specific path is used.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Neither load nor save the signature cache
    #[arg(long, conflicts_with_all = ["cache", "clear_cache"])]
    pub no_cache: bool,

    /// Start from an empty signature cache (saved at the end)
    #[arg(long)]
    pub clear_cache: bool,

    /// Print the run report as JSON on stdout
    ///
    /// Progress lines and prompts move to stderr.
    #[arg(long)]
    pub json: bool,
}
