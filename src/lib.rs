//! Solver for liquid-sorting puzzles.
//!
//! A board is a row of tubes holding height-valued color segments (as read
//! off a screen by pixel detection). A pour moves the entire top color run of
//! one tube onto a matching color or into empty space, and the goal is every
//! tube complete: all one color and full, or all empty. [`solver::solve`]
//! runs a prioritized depth-first backtracking search over that move space;
//! [`feasibility`] offers arrangement pre-checks and [`generator`] produces
//! fresh puzzles by reverse-pouring a solved board.

pub mod display;
pub mod errors;
pub mod feasibility;
pub mod generator;
pub mod log;
pub mod model;
pub mod solver;

pub use errors::{ParseError, StateError};
pub use model::{ColorSegment, FluidColor, Move, PuzzleState, Tube};
pub use solver::{SolveResult, SolveStatus, SolverConfig, solve};
