//! muxic - content-based duplicate finder for music libraries
//!
//! Media files under a directory are signed by content, grouped by
//! signature, and each group of duplicates is reduced to a single survivor,
//! either interactively or automatically. A persistent signature cache keeps
//! unchanged files from being read again on later runs.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod resolve;
pub mod scanner;

use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::SignatureStore;
use crate::cli::{Cli, Commands, DedupArgs};
use crate::config::Config;
use crate::dedup::{CacheMode, DedupOptions, Deduplicator};
use crate::error::ExitCode;
use crate::progress::Progress;
use crate::resolve::SurvivorRule;
use crate::scanner::WalkerConfig;

/// Run the command described by `cli`.
///
/// Logging must already be initialized.
///
/// # Errors
///
/// Returns an error when the run is aborted: bad target, unreadable tree,
/// or a broken input/output stream.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Dedup(args) => run_dedup(&args, &Config::load(), cli.quiet),
    }
}

/// Merge CLI arguments over the configuration file into run options.
///
/// # Errors
///
/// Fails if a preferred directory does not exist.
pub fn build_options(args: &DedupArgs, config: &Config) -> Result<DedupOptions> {
    let preferred_roots = args
        .preferred_roots
        .iter()
        .map(|root| {
            fs::canonicalize(root)
                .with_context(|| format!("Preferred directory not found: {}", root.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let walker = WalkerConfig::default()
        .with_extra_extensions(config.extra_extensions.iter().chain(&args.extensions))
        .with_io_threads(args.io_threads.unwrap_or(config.io_threads));

    let cache = if args.no_cache {
        CacheMode::Disabled
    } else {
        match args
            .cache
            .clone()
            .or_else(|| config.cache_path.clone())
            .or_else(SignatureStore::default_path)
        {
            Some(path) if args.clear_cache => CacheMode::Cleared(path),
            Some(path) => CacheMode::Persistent(path),
            None => {
                log::warn!("No cache location available, signatures will not be persisted");
                CacheMode::Disabled
            }
        }
    };

    Ok(DedupOptions::new(&args.target)
        .with_automatic(args.scorched_earth)
        .with_survivor_rule(SurvivorRule {
            strategy: args.keep.unwrap_or(config.keep),
            preferred_roots,
        })
        .with_dry_run(args.dry_run)
        .with_cache(cache)
        .with_walker(walker)
        .with_algorithm(args.algorithm.unwrap_or(config.algorithm)))
}

fn run_dedup(args: &DedupArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let options = build_options(args, config)?;
    log::debug!("Run options: {:?}", options);

    let progress = Arc::new(Progress::new(quiet || args.json));
    let deduplicator = Deduplicator::new(options).with_progress_callback(progress);

    let stdin = io::stdin();
    let report = if args.json {
        let mut stderr = io::stderr();
        deduplicator.run(stdin.lock(), &mut stderr)
    } else {
        let mut stdout = io::stdout().lock();
        deduplicator.run(stdin.lock(), &mut stdout)
    }
    .context("Deduplication failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{json}")?;
    }

    if report.has_errors() {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}
