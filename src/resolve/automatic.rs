//! Unattended ("scorched earth") resolution.

use std::io::Write;

use super::{KeepStrategy, ResolutionOutcome, ResolutionPolicy, ResolveError, SurvivorRule};
use crate::duplicates::DuplicateSet;

/// Pick the survivor index for `set` under `rule`.
///
/// A file under a preferred root wins, the first such file in presentation
/// order if several qualify. Otherwise the strategy decides; ties on
/// modification time go to the earlier file in presentation order. With the
/// default rule this is always index `0`.
///
/// `set` must not be empty.
#[must_use]
pub fn choose_survivor(set: &DuplicateSet, rule: &SurvivorRule) -> usize {
    if let Some(index) = set.files.iter().position(|file| {
        rule.preferred_roots
            .iter()
            .any(|root| file.path.starts_with(root))
    }) {
        return index;
    }

    let mut best = 0;
    for (index, file) in set.files.iter().enumerate().skip(1) {
        let current = set.files[best].mod_time;
        let better = match rule.strategy {
            KeepStrategy::ShortestPath => false,
            KeepStrategy::Oldest => file.mod_time < current,
            KeepStrategy::Newest => file.mod_time > current,
        };
        if better {
            best = index;
        }
    }
    best
}

/// Resolves every set without interaction.
#[derive(Debug, Clone, Default)]
pub struct AutomaticPolicy {
    rule: SurvivorRule,
}

impl AutomaticPolicy {
    /// Create a policy applying `rule` to every set.
    #[must_use]
    pub fn new(rule: SurvivorRule) -> Self {
        Self { rule }
    }
}

impl ResolutionPolicy for AutomaticPolicy {
    fn resolve(
        &mut self,
        set: &DuplicateSet,
        out: &mut dyn Write,
    ) -> Result<ResolutionOutcome, ResolveError> {
        if set.is_empty() {
            return Ok(ResolutionOutcome::Skip);
        }

        let keep = choose_survivor(set, &self.rule);
        writeln!(
            out,
            "Scorched earth: keeping {}",
            set.files[keep].path.display()
        )?;
        Ok(ResolutionOutcome::Keep(keep))
    }
}
