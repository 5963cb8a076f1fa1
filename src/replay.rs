use itertools::Itertools;
use rand::Rng;

use crate::grid::{Grid, Move, Path};
use crate::location::Location;

/// Pixel distance between neighbouring pivots on the in-game board.
pub const DEFAULT_PIXEL_DIST: i32 = 84;

/// Steps through a path, yielding each move along with the grid it produces.
pub struct Replay<'a, const ROWS: usize, const COLS: usize> {
    grid: Grid<ROWS, COLS>,
    moves: std::slice::Iter<'a, Move>,
}

impl<'a, const ROWS: usize, const COLS: usize> Replay<'a, ROWS, COLS> {
    /// Replay `path` from `start`.
    pub fn new(start: Grid<ROWS, COLS>, path: &'a [Move]) -> Self {
        Self { grid: start, moves: path.iter() }
    }

    /// The grid after every move yielded so far.
    pub fn current(&self) -> &Grid<ROWS, COLS> {
        &self.grid
    }
}

impl<const ROWS: usize, const COLS: usize> Iterator for Replay<'_, ROWS, COLS> {
    type Item = (Move, Grid<ROWS, COLS>);

    fn next(&mut self) -> Option<Self::Item> {
        let mv = *self.moves.next()?;
        self.grid = self.grid.rotate(mv);
        Some((mv, self.grid))
    }
}

/// Apply `steps` uniformly random moves to `start`, returning the scrambled grid and the moves used.
pub fn scramble<const ROWS: usize, const COLS: usize>(
    start: Grid<ROWS, COLS>,
    steps: usize,
    rng: &mut impl Rng,
) -> (Grid<ROWS, COLS>, Path) {
    let path = (0..steps)
        .map(|_| Move(rng.gen_range(0..Grid::<ROWS, COLS>::PIVOTS) as u8))
        .collect_vec();
    (start.apply(&path), path)
}

/// Relative pointer offsets for clicking through `path`, starting with the pointer over pivot `0`.
///
/// Offsets are `(dx, dy)` in pixels, one per move.
pub fn cursor_offsets<const ROWS: usize, const COLS: usize>(path: &[Move], pixel_dist: i32) -> Vec<(i32, i32)> {
    let start = Grid::<ROWS, COLS>::pivot(Move(0));
    std::iter::once(start)
        .chain(path.iter().map(|mv| Grid::<ROWS, COLS>::pivot(*mv)))
        .tuple_windows()
        .map(|(Location(from_row, from_col), Location(to_row, to_col))| {
            let dx = to_col as i32 - from_col as i32;
            let dy = to_row as i32 - from_row as i32;
            (dx * pixel_dist, dy * pixel_dist)
        })
        .collect()
}
