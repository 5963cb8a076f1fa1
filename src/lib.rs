#![warn(missing_docs)]

//! # `speedsolve`
//!
//! Solvers for two escape room puzzles: a board of numbered tiles turned four at a time, and a phone locked with a
//! four digit code that lights up hints for every guess.
//!
//! # Rotating tiles
//! Build a [`Puzzle`] with a [`PuzzleBuilder`] or load one from a file using [`config`].
//! A move turns the 2x2 block below and to the right of one of the board's interior pivots clockwise.
//! Holes in the goal mark cells whose content does not matter.
//!
//! [`search::search`] is a best-first search over grids, ordered by moves made plus a weighted estimate of the moves
//! left: the sum of every tile's distance from home, plus the distance from each goal hole to the nearest free hole.
//! Weights over [`ADMISSIBLE_WEIGHT`](puzzle::ADMISSIBLE_WEIGHT) overestimate, giving up guaranteed optimality for
//! speed.
//!
//! Solving the full board at once explodes quickly. [`staged::StagedSolver`] instead locks tiles down a few at a
//! time in the puzzle's order. Every stage collects all near-shortest ways to get there, and the next stage
//! continues from each resulting grid in turn, backtracking whenever a stage turns out to be unsolvable.
//! Stage results are cached, so grids reached along several branches are searched once.
//!
//! # Code breaking
//! See [`codes`].

pub use builder::{BuilderInvalidReason, PuzzleBuilder};
pub use cell::{Cell, TileId};
pub use grid::{Grid, Move, Path};
pub use location::Location;
pub use puzzle::Puzzle;

pub(crate) mod location;
pub(crate) mod cell;
/// Boards as values and the moves that turn them.
pub mod grid;
/// Assembling and validating puzzles.
pub mod builder;
/// Puzzle instances and the per-stage objectives derived from them.
pub mod puzzle;
/// Best-first search towards an [`Objective`](search::Objective).
pub mod search;
/// Solving a puzzle a few tiles at a time.
pub mod staged;
/// Stepping through, scrambling and clicking out paths.
pub mod replay;
/// Puzzle files.
pub mod config;
pub mod codes;
mod tests;
