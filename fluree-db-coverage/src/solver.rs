//! Greedy set-cover solver.
//!
//! Starting from the mandatory identifiers, repeatedly selects the feature
//! that covers the most not-yet-covered regions until the universe is
//! covered or no remaining feature adds anything. This is the classical
//! ln(n)-approximation; the result is small but not guaranteed minimal.
//!
//! Each round computes gains over an immutable snapshot of the remaining
//! candidates and then applies the selection, so gain computation can run in
//! parallel without touching shared state.

use crate::incidence::{IncidenceMap, RegionId};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// One greedy selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionStep {
    /// Selected feature identifier.
    pub id: String,

    /// Number of newly covered regions at the time of selection.
    pub gain: usize,
}

/// Result of a set-cover run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverSolution {
    /// Selected identifiers; always a superset of `mandatory`.
    pub selected: BTreeSet<String>,

    /// Identifiers that seeded the selection.
    pub mandatory: BTreeSet<String>,

    /// Greedy selections in order (mandatory seeds are not listed).
    pub steps: Vec<SelectionStep>,

    /// Number of atomic regions in the universe.
    pub universe_size: usize,

    /// Number of universe regions covered by the selection.
    pub covered: usize,
}

impl CoverSolution {
    /// Whether every region of the universe is covered.
    pub fn is_complete(&self) -> bool {
        self.covered == self.universe_size
    }

    /// Number of regions left uncovered.
    pub fn uncovered(&self) -> usize {
        self.universe_size - self.covered
    }
}

/// Greedily cover `universe` with the sets in `subsets`, seeded with
/// `mandatory`.
///
/// Ties on gain go to the smallest identifier. Stops early, without error,
/// when no remaining feature has a positive gain.
pub fn solve_greedy(
    universe: &BTreeSet<RegionId>,
    subsets: &IncidenceMap<String, RegionId>,
    mandatory: &BTreeSet<String>,
    parallel: bool,
) -> CoverSolution {
    let mut selected = mandatory.clone();
    let mut covered: BTreeSet<RegionId> = BTreeSet::new();
    for id in mandatory {
        if let Some(regions) = subsets.get(id) {
            covered.extend(regions.iter().filter(|r| universe.contains(*r)));
        }
    }

    let mut remaining: Vec<(&String, &BTreeSet<RegionId>)> = subsets
        .iter()
        .filter(|(id, _)| !selected.contains(*id))
        .collect();
    let mut steps = Vec::new();

    while covered.len() < universe.len() {
        let Some((idx, gain)) = largest_gain(&remaining, &covered, parallel) else {
            break;
        };
        let (id, regions) = remaining.remove(idx);
        covered.extend(regions.iter().filter(|r| universe.contains(*r)));
        selected.insert(id.clone());
        steps.push(SelectionStep {
            id: id.clone(),
            gain,
        });
    }

    CoverSolution {
        selected,
        mandatory: mandatory.clone(),
        steps,
        universe_size: universe.len(),
        covered: covered.len(),
    }
}

/// Position and gain of the first candidate with the strictly largest
/// positive gain.
fn largest_gain(
    remaining: &[(&String, &BTreeSet<RegionId>)],
    covered: &BTreeSet<RegionId>,
    parallel: bool,
) -> Option<(usize, usize)> {
    let gain = |(_, regions): &(&String, &BTreeSet<RegionId>)| {
        regions.iter().filter(|r| !covered.contains(*r)).count()
    };
    let gains: Vec<usize> = if parallel {
        remaining.par_iter().map(gain).collect()
    } else {
        remaining.iter().map(gain).collect()
    };

    let mut best: Option<(usize, usize)> = None;
    for (idx, g) in gains.into_iter().enumerate() {
        if g > 0 && best.map_or(true, |(_, b)| g > b) {
            best = Some((idx, g));
        }
    }
    best
}
