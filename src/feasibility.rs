//! Arrangement feasibility pre-checks.
//!
//! These reason about per-color liquid totals and the capacity multiset, not
//! about moves: a solved board partitions every color (and the empty space)
//! into whole tubes, so totals that cannot be partitioned rule a puzzle out
//! before any search runs. A positive answer from the exact check still only
//! proves an arrangement exists, not that moves can reach it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rayon::prelude::*;

use crate::model::{FluidColor, PuzzleState};

/// Total liquid height per color across the whole board.
pub fn color_totals(state: &PuzzleState) -> HashMap<usize, u32> {
    let mut totals = HashMap::new();
    for tube in state.get_tubes() {
        for segment in tube.get_segments() {
            if let FluidColor::Fluid { color_id } = segment.color {
                *totals.entry(color_id).or_insert(0) += segment.height;
            }
        }
    }
    totals
}

fn total_empty_space(state: &PuzzleState) -> u32 {
    state.get_tubes().iter().map(|t| t.get_free_space()).sum()
}

fn capacity_counts(state: &PuzzleState) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for tube in state.get_tubes() {
        *counts.entry(tube.get_capacity()).or_insert(0) += 1;
    }
    counts
}

/// True when some color total (or the total empty space) is not a subset-sum
/// of the tube capacities, so no complete-tube partition can exist. Ignores
/// that a tube spent on one color is unavailable to another, hence only a
/// one-sided answer; exact when all capacities are equal.
pub fn definitely_unsolvable(state: &PuzzleState) -> bool {
    let mut reachable: HashSet<u32> = HashSet::new();
    reachable.insert(0);
    for tube in state.get_tubes() {
        let cap = tube.get_capacity();
        let current: Vec<u32> = reachable.iter().copied().collect();
        for r in current {
            reachable.insert(r + cap);
        }
    }
    if color_totals(state)
        .values()
        .any(|total| !reachable.contains(total))
    {
        return true;
    }
    // The leftover space has to land in wholly empty tubes.
    !reachable.contains(&total_empty_space(state))
}

/// True when every color total is matched by a dedicated tube of exactly that
/// capacity, counting multiplicity. Sufficient, not necessary: it never
/// splits a color across tubes.
pub fn definitely_solvable(state: &PuzzleState) -> bool {
    let capacities = capacity_counts(state);
    let mut liquid_counts: HashMap<u32, usize> = HashMap::new();
    for total in color_totals(state).values() {
        *liquid_counts.entry(*total).or_insert(0) += 1;
    }
    liquid_counts
        .iter()
        .all(|(size, liquids)| capacities.get(size).copied().unwrap_or(0) >= *liquids)
}

/// `Some(true)` / `Some(false)` when the fast checks settle it, `None` when
/// only the exact check can.
pub fn maybe_solvable(state: &PuzzleState) -> Option<bool> {
    if definitely_unsolvable(state) {
        debug!("a color total is not a subset-sum of the capacities");
        return Some(false);
    }
    let unique_sizes: HashSet<u32> = state
        .get_tubes()
        .iter()
        .map(|t| t.get_capacity())
        .collect();
    if unique_sizes.len() <= 1 {
        // With equal capacities the subset-sum check is exact.
        return Some(true);
    }
    if definitely_solvable(state) {
        return Some(true);
    }
    None
}

/// Exact check: does any assignment of whole tubes to colors partition every
/// color total? Enumerates the capacity sub-multisets reaching each total,
/// then matches colors to disjoint sub-multisets, parallel across the
/// alternatives for each color.
pub fn arrangement_exists(state: &PuzzleState) -> bool {
    if definitely_unsolvable(state) {
        return false;
    }

    let counts = capacity_counts(state);
    let mut sizes: Vec<(u32, usize)> = counts.iter().map(|(s, c)| (*s, *c)).collect();
    sizes.sort_by(|a, b| b.0.cmp(&a.0));

    let totals: Vec<u32> = color_totals(state).values().copied().collect();
    let target_set: HashSet<u32> = totals.iter().copied().collect();
    let Some(&max_target) = target_set.iter().max() else {
        // No liquid at all.
        return true;
    };

    let mut ways: HashMap<u32, Vec<HashMap<u32, usize>>> = HashMap::new();
    for &target in &target_set {
        ways.insert(target, Vec::new());
    }
    enumerate_subsets(
        &sizes,
        &mut HashMap::new(),
        0,
        &target_set,
        max_target,
        0,
        &mut ways,
    );
    debug!(
        "subset ways per color total: {:?}",
        ways.iter().map(|(k, v)| (*k, v.len())).collect::<Vec<_>>()
    );
    if ways.values().any(Vec::is_empty) {
        return false;
    }

    // Colors with the fewest alternatives first keeps the branching shallow.
    let mut ordered = totals;
    ordered.sort_by_key(|t| ways.get(t).map_or(0, Vec::len));

    let found = AtomicBool::new(false);
    matches_remaining(&ways, counts, &ordered, &found)
}

/// Walk the capacity multiset (descending sizes), recording every
/// sub-multiset whose sum is one of the targets.
fn enumerate_subsets(
    sizes: &[(u32, usize)],
    chosen: &mut HashMap<u32, usize>,
    index: usize,
    targets: &HashSet<u32>,
    max_target: u32,
    sum: u32,
    ways: &mut HashMap<u32, Vec<HashMap<u32, usize>>>,
) {
    let (size, count) = sizes[index];
    for k in 0..=count {
        let new_sum = sum + size * (k as u32);
        if new_sum > max_target {
            break;
        }
        chosen.insert(size, k);
        if index + 1 == sizes.len() {
            if targets.contains(&new_sum) {
                ways.entry(new_sum).or_default().push(chosen.clone());
            }
        } else {
            enumerate_subsets(sizes, chosen, index + 1, targets, max_target, new_sum, ways);
        }
    }
    chosen.remove(&size);
}

fn matches_remaining(
    ways: &HashMap<u32, Vec<HashMap<u32, usize>>>,
    remaining: HashMap<u32, usize>,
    targets: &[u32],
    found: &AtomicBool,
) -> bool {
    // Another branch may already have succeeded.
    if found.load(Ordering::Relaxed) {
        return true;
    }
    let Some((&current, rest)) = targets.split_first() else {
        found.store(true, Ordering::Relaxed);
        return true;
    };
    let Some(alternatives) = ways.get(&current) else {
        return false;
    };
    alternatives.par_iter().any(|way| {
        if found.load(Ordering::Relaxed) {
            return true;
        }
        let mut next_remaining = remaining.clone();
        for (size, used) in way {
            if *used == 0 {
                continue;
            }
            let entry = next_remaining.entry(*size).or_insert(0);
            if *entry < *used {
                return false;
            }
            *entry -= *used;
        }
        matches_remaining(ways, next_remaining, rest, found)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(repr: &str) -> PuzzleState {
        PuzzleState::from_repr(repr).unwrap()
    }

    #[test]
    fn totals_sum_across_tubes() {
        let s = state("A2,B2;.2,A2;.4");
        let totals = color_totals(&s);
        assert_eq!(totals.get(&0), Some(&4));
        assert_eq!(totals.get(&1), Some(&2));
    }

    #[test]
    fn short_color_total_is_unsolvable() {
        // 2 of each color against capacity-4 tubes: 2 is not a subset-sum.
        let s = state("A2,B2;.4");
        assert!(definitely_unsolvable(&s));
        assert_eq!(maybe_solvable(&s), Some(false));
        assert!(!arrangement_exists(&s));
    }

    #[test]
    fn matched_totals_pass_every_check() {
        let s = state("A2,B2;B2,A2;.4");
        assert!(!definitely_unsolvable(&s));
        assert_eq!(maybe_solvable(&s), Some(true));
        assert!(arrangement_exists(&s));
    }

    #[test]
    fn dedicated_tube_sizes_are_definitely_solvable() {
        // A totals 4, B totals 2; capacities 4, 2, 4, 2.
        let s = state("A2,B1,A1;B1,A1;.4;.2");
        assert!(!definitely_unsolvable(&s));
        assert!(definitely_solvable(&s));
        assert_eq!(maybe_solvable(&s), Some(true));
        assert!(arrangement_exists(&s));
    }

    #[test]
    fn split_color_needs_the_exact_check() {
        // A totals 6 with no capacity-6 tube, so the fast positive check
        // declines; 4 + 2 covers it exactly.
        let s = state("A4;A2;.4;.2");
        assert!(!definitely_unsolvable(&s));
        assert!(!definitely_solvable(&s));
        assert_eq!(maybe_solvable(&s), None);
        assert!(arrangement_exists(&s));
    }

    #[test]
    fn contended_capacity_defeats_per_color_checks() {
        // A, B, and the empty space each total 3, and only the single
        // capacity-3 tube can realize a 3 (the 2s only reach even sums).
        let s = state("A2,B1;.1,A1;B2;.2");
        assert!(!definitely_unsolvable(&s));
        assert!(!definitely_solvable(&s));
        assert_eq!(maybe_solvable(&s), None);
        assert!(!arrangement_exists(&s));
    }

    #[test]
    fn liquid_free_board_is_trivially_arrangeable() {
        let s = state(".4;.4");
        assert!(arrangement_exists(&s));
        assert_eq!(maybe_solvable(&s), Some(true));
    }
}
