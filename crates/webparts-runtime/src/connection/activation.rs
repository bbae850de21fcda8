//! Conflict resolution before connections are activated.
//!
//! Candidates are resolved in three passes. A connection saved by the
//! current user beats a shared one on the same point, and a shared dynamic
//! connection beats a static one. Every candidate still conflicting with
//! another survivor afterwards is left in place but not activated.

#![allow(missing_docs)]

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

/// One live connection as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActivationCandidate {
    pub(crate) id: SmolStr,
    pub(crate) provider: SmolStr,
    pub(crate) provider_point: SmolStr,
    pub(crate) provider_allows_multiple: bool,
    pub(crate) consumer: SmolStr,
    pub(crate) consumer_point: SmolStr,
    pub(crate) consumer_allows_multiple: bool,
    pub(crate) is_shared: bool,
    pub(crate) is_static: bool,
}

impl ActivationCandidate {
    fn conflicts_with_consumer(&self, other: &Self) -> bool {
        !self.consumer_allows_multiple
            && self.consumer == other.consumer
            && self.consumer_point.eq_ignore_ascii_case(&other.consumer_point)
    }

    fn conflicts_with_provider(&self, other: &Self) -> bool {
        !self.provider_allows_multiple
            && self.provider == other.provider
            && self.provider_point.eq_ignore_ascii_case(&other.provider_point)
    }

    pub(crate) fn conflicts_with(&self, other: &Self) -> bool {
        self.id != other.id
            && (self.conflicts_with_consumer(other) || self.conflicts_with_provider(other))
    }
}

/// A connection excluded from activation because another survivor shares its point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationConflict {
    pub connection: SmolStr,
    pub consumer: SmolStr,
    /// First other candidate it conflicts with.
    pub other: SmolStr,
}

impl ActivationConflict {
    /// Error text shown on the consumer.
    #[must_use]
    pub fn message(&self) -> SmolStr {
        format!(
            "connection '{}' was not activated: it conflicts with connection '{}' on the same connection point",
            self.connection, self.other
        )
        .into()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationPlan {
    /// Losers of the shared/static precedence passes, in discovery order.
    pub disconnect: Vec<SmolStr>,
    pub conflicts: Vec<ActivationConflict>,
    pub activate: Vec<SmolStr>,
}

pub(crate) fn resolve_conflicts(candidates: &[ActivationCandidate]) -> ActivationPlan {
    let mut plan = ActivationPlan::default();
    let mut removed: FxHashSet<&str> = FxHashSet::default();

    // Unshared beats shared.
    for winner in candidates.iter().filter(|c| !c.is_shared) {
        if removed.contains(winner.id.as_str()) {
            continue;
        }
        for loser in candidates.iter().filter(|c| c.is_shared) {
            if !removed.contains(loser.id.as_str()) && winner.conflicts_with(loser) {
                removed.insert(loser.id.as_str());
                plan.disconnect.push(loser.id.clone());
            }
        }
    }

    // Shared dynamic beats static.
    for winner in candidates.iter().filter(|c| c.is_shared && !c.is_static) {
        if removed.contains(winner.id.as_str()) {
            continue;
        }
        for loser in candidates.iter().filter(|c| c.is_static) {
            if !removed.contains(loser.id.as_str()) && winner.conflicts_with(loser) {
                removed.insert(loser.id.as_str());
                plan.disconnect.push(loser.id.clone());
            }
        }
    }

    let survivors: Vec<&ActivationCandidate> = candidates
        .iter()
        .filter(|c| !removed.contains(c.id.as_str()))
        .collect();
    for candidate in &survivors {
        let other = survivors
            .iter()
            .find(|other| candidate.conflicts_with(other) || other.conflicts_with(candidate));
        match other {
            Some(other) => plan.conflicts.push(ActivationConflict {
                connection: candidate.id.clone(),
                consumer: candidate.consumer.clone(),
                other: other.id.clone(),
            }),
            None => plan.activate.push(candidate.id.clone()),
        }
    }
    plan
}
