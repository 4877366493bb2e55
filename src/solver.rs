use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::model::{Move, PuzzleState};

pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Expansions between progress log lines.
const PROGRESS_INTERVAL: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Longest move sequence the search will consider.
    pub max_depth: usize,
    /// Log progress counters at a bounded cadence while searching.
    pub progress: bool,
    /// Optional wall-clock budget for the whole search.
    pub time_limit: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            progress: false,
            time_limit: None,
        }
    }
}

/// How a search ended. `Exhausted` means the reachable space was fully
/// enumerated; `DepthLimited` means at least one branch was cut short, so a
/// deeper run might still succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Solved,
    Exhausted,
    DepthLimited,
    TimedOut { elapsed: Duration },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub states_explored: u64,
    pub unique_states: u64,
    pub max_depth_reached: usize,
}

#[derive(Debug, Clone)]
pub struct SolveResult {
    pub status: SolveStatus,
    /// Moves from the initial state to a solved one; empty unless `Solved`.
    pub moves: Vec<Move>,
    pub stats: SearchStats,
}

impl SolveResult {
    pub fn is_solved(&self) -> bool {
        self.status == SolveStatus::Solved
    }
}

struct TimeBudget {
    start: Instant,
    limit: Duration,
}

impl TimeBudget {
    fn new(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn expired(&self) -> bool {
        self.elapsed() >= self.limit
    }
}

/// Priority rank of a move, lower is better: 0 completes the destination,
/// 1 consolidates onto a matching color, 2 relocates a complete single-color
/// column into an empty tube, 3 is any other pour into an empty tube, 4 is
/// everything else. Ties keep the ascending `(from, to)` enumeration order.
pub fn move_rank(state: &PuzzleState, mv: Move) -> u8 {
    let tubes = state.get_tubes();
    let (Some(source), Some(dest)) = (tubes.get(mv.from), tubes.get(mv.to)) else {
        return 4;
    };
    if state.would_complete(mv) {
        0
    } else if let (Some(top), Some(below)) = (source.get_top_fluid(), dest.get_top_fluid())
        && top.color == below.color
    {
        1
    } else if source.is_complete() && dest.is_empty() {
        2
    } else if dest.is_empty() {
        3
    } else {
        4
    }
}

/// All legal moves from `state`, in ascending `(from, to)` order.
pub fn legal_moves(state: &PuzzleState) -> Vec<Move> {
    generate_moves(state, None)
}

/// Legal moves excluding the exact reversal of the previous move. One step of
/// lookback only; longer cycles are left to the visited set.
fn generate_moves(state: &PuzzleState, previous: Option<Move>) -> Vec<Move> {
    let tube_count = state.get_tubes().len();
    let mut moves = Vec::new();
    for from in 0..tube_count {
        for to in 0..tube_count {
            let mv = Move::new(from, to);
            if previous.is_some_and(|prev| mv == prev.reversed()) {
                continue;
            }
            if state.is_legal(mv) {
                moves.push(mv);
            }
        }
    }
    moves
}

fn prioritize(state: &PuzzleState, moves: &mut [Move]) {
    // Stable sort preserves the enumeration order within a rank.
    moves.sort_by_key(|&mv| move_rank(state, mv));
}

struct Search<'a> {
    config: &'a SolverConfig,
    budget: Option<TimeBudget>,
    visited: HashSet<u64>,
    stats: SearchStats,
    hit_depth_limit: bool,
    /// Elapsed time captured the moment the budget expired, so the report
    /// excludes the unwind back out of the recursion.
    timed_out: Option<Duration>,
}

impl Search<'_> {
    fn dfs(
        &mut self,
        state: &PuzzleState,
        previous: Option<Move>,
        depth: usize,
        path: &mut Vec<Move>,
    ) -> bool {
        self.stats.states_explored += 1;
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(depth);
        if self.config.progress && self.stats.states_explored % PROGRESS_INTERVAL == 0 {
            info!(
                "explored {} states, depth {depth}, {} unique",
                self.stats.states_explored,
                self.visited.len()
            );
        }
        if state.is_solved() {
            return true;
        }
        if depth >= self.config.max_depth {
            self.hit_depth_limit = true;
            return false;
        }
        if let Some(budget) = &self.budget
            && budget.expired()
        {
            self.timed_out = Some(budget.elapsed());
            return false;
        }

        let mut moves = generate_moves(state, previous);
        prioritize(state, &mut moves);
        for mv in moves {
            if self.timed_out.is_some() {
                break;
            }
            let next = state.apply_unchecked(mv);
            if !self.visited.insert(next.signature()) {
                continue;
            }
            path.push(mv);
            if self.dfs(&next, Some(mv), depth + 1, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

/// Depth-first backtracking search for a move sequence that completes every
/// tube. Single-threaded and deterministic: the same input and config always
/// yield the same result.
pub fn solve(initial: &PuzzleState, config: &SolverConfig) -> SolveResult {
    debug!(
        "solving {} tubes, max_depth {}",
        initial.get_tubes().len(),
        config.max_depth
    );
    let mut search = Search {
        config,
        budget: config.time_limit.map(TimeBudget::new),
        visited: HashSet::new(),
        stats: SearchStats::default(),
        hit_depth_limit: false,
        timed_out: None,
    };
    search.visited.insert(initial.signature());
    let mut path = Vec::new();
    let solved = search.dfs(initial, None, 0, &mut path);
    search.stats.unique_states = search.visited.len() as u64;

    let status = if solved {
        debug!(
            "solution of {} moves after exploring {} states",
            path.len(),
            search.stats.states_explored
        );
        SolveStatus::Solved
    } else if let Some(elapsed) = search.timed_out {
        SolveStatus::TimedOut { elapsed }
    } else if search.hit_depth_limit {
        SolveStatus::DepthLimited
    } else {
        SolveStatus::Exhausted
    };
    if !solved {
        path.clear();
    }
    SolveResult {
        status,
        moves: path,
        stats: search.stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support;

    fn state(repr: &str) -> PuzzleState {
        PuzzleState::from_repr(repr).unwrap()
    }

    mod ranking {
        use super::*;

        #[test]
        fn completing_the_destination_ranks_first() {
            let s = state(".2,A2;A2,B2");
            assert_eq!(move_rank(&s, Move::new(1, 0)), 0);
        }

        #[test]
        fn matching_consolidation_ranks_second() {
            let s = state(".4,A2;A2,B2");
            assert_eq!(move_rank(&s, Move::new(1, 0)), 1);
        }

        #[test]
        fn complete_column_into_empty_ranks_third() {
            let s = state("A4;.6");
            assert_eq!(move_rank(&s, Move::new(0, 1)), 2);
        }

        #[test]
        fn other_pours_into_empty_rank_fourth() {
            let s = state("A2,B2;.6");
            assert_eq!(move_rank(&s, Move::new(0, 1)), 3);
        }

        #[test]
        fn full_column_into_same_size_empty_completes() {
            let s = state("A4;.4");
            assert_eq!(move_rank(&s, Move::new(0, 1)), 0);
        }

        #[test]
        fn sort_is_stable_within_a_rank() {
            // Two rank-3 moves from distinct sources must keep (from, to)
            // order after prioritization.
            let s = state("A2,B2;B2,A2;.6;.6");
            let mut moves = legal_moves(&s);
            prioritize(&s, &mut moves);
            let rank3: Vec<Move> = moves
                .iter()
                .copied()
                .filter(|&mv| move_rank(&s, mv) == 3)
                .collect();
            let mut sorted = rank3.clone();
            sorted.sort_by_key(|mv| (mv.from, mv.to));
            assert_eq!(rank3, sorted);
        }
    }

    mod generation {
        use super::*;

        #[test]
        fn enumerates_in_ascending_order() {
            let s = state("A2,B2;B2,A2;.4");
            let moves = legal_moves(&s);
            let mut sorted = moves.clone();
            sorted.sort_by_key(|mv| (mv.from, mv.to));
            assert_eq!(moves, sorted);
        }

        #[test]
        fn excludes_only_the_immediate_reversal() {
            let s = state(".2,A2;.2,A2;.4");
            let prev = Move::new(0, 1);
            let moves = generate_moves(&s, Some(prev));
            assert!(!moves.contains(&prev.reversed()));
            assert!(moves.contains(&Move::new(1, 2)));
            assert!(s.is_legal(prev.reversed()));
        }

        #[test]
        fn ranking_and_generation_build_no_states() {
            let s = state("A2,B2;.2,A2;.4;B4");
            let before = test_support::states_built();
            let mut moves = legal_moves(&s);
            prioritize(&s, &mut moves);
            for mv in &moves {
                let _ = s.would_complete(*mv);
                let _ = move_rank(&s, *mv);
            }
            assert_eq!(test_support::states_built(), before);
        }
    }

    mod outcomes {
        use super::*;

        #[test]
        fn already_solved_returns_empty_path() {
            let s = state("A4;.4");
            let result = solve(&s, &SolverConfig::default());
            assert_eq!(result.status, SolveStatus::Solved);
            assert!(result.moves.is_empty());
            assert_eq!(result.stats.states_explored, 1);
        }

        #[test]
        fn solved_wins_even_at_depth_zero() {
            let s = state("A4;.4");
            let config = SolverConfig {
                max_depth: 0,
                ..SolverConfig::default()
            };
            assert_eq!(solve(&s, &config).status, SolveStatus::Solved);
        }

        #[test]
        fn no_legal_moves_is_exhausted() {
            let s = state("A2,B2;B2,A2");
            let result = solve(&s, &SolverConfig::default());
            assert_eq!(result.status, SolveStatus::Exhausted);
            assert!(result.moves.is_empty());
        }

        #[test]
        fn cut_branches_report_depth_limited() {
            let s = state("A2,B2;B2,A2;.4");
            let config = SolverConfig {
                max_depth: 1,
                ..SolverConfig::default()
            };
            let result = solve(&s, &config);
            assert_eq!(result.status, SolveStatus::DepthLimited);
            assert!(result.stats.max_depth_reached <= 1);
        }

        #[test]
        fn zero_budget_times_out() {
            let s = state("A2,B2;B2,A2;.4");
            let config = SolverConfig {
                time_limit: Some(Duration::ZERO),
                ..SolverConfig::default()
            };
            assert!(matches!(
                solve(&s, &config).status,
                SolveStatus::TimedOut { .. }
            ));
        }

        #[test]
        fn timeout_elapsed_is_bounded_by_the_whole_run() {
            let s = state("A2,B2;B2,A2;.4");
            let config = SolverConfig {
                time_limit: Some(Duration::ZERO),
                ..SolverConfig::default()
            };
            let started = Instant::now();
            let result = solve(&s, &config);
            let outer = started.elapsed();
            match result.status {
                SolveStatus::TimedOut { elapsed } => assert!(elapsed <= outer),
                status => panic!("expected a timeout, got {status:?}"),
            }
        }

        #[test]
        fn solution_replays_through_checked_apply() {
            let s = state("A2,B2;B2,A2;.4");
            let result = solve(&s, &SolverConfig::default());
            assert_eq!(result.status, SolveStatus::Solved);
            let mut current = s;
            for mv in &result.moves {
                current = current.apply(*mv).unwrap();
            }
            assert!(current.is_solved());
        }

        #[test]
        fn repeated_runs_are_identical() {
            let s = state("A2,B2;B2,A2;.4");
            let config = SolverConfig::default();
            let a = solve(&s, &config);
            let b = solve(&s, &config);
            assert_eq!(a.moves, b.moves);
            assert_eq!(a.stats, b.stats);
        }
    }
}
