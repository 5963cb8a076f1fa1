use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;

use crate::cell::{Cell, TileId};
use crate::location::Location;

/// A rotation of the 2x2 block whose upper left cell sits at a pivot.
///
/// Pivots are numbered in row-major order over the `(ROWS - 1) x (COLS - 1)` points where four cells meet,
/// so a 5x5 board has moves `0..16`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Move(pub u8);

impl Move {
    /// The pivot number as an index.
    pub fn index(self) -> usize {
        self.0.into()
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered sequence of moves, applied first to last.
pub type Path = Vec<Move>;

// each cell of the block takes the value of the one before it in this cycle
const ROTATION_CYCLE: [(isize, isize); 4] = [(0, 0), (0, 1), (1, 1), (1, 0)];

/// An arrangement of tiles on a `ROWS x COLS` board.
///
/// Grids are plain values: rotating one produces a new grid, and equality and hashing are structural,
/// so grids serve directly as keys for visited-state tracking.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Grid<const ROWS: usize, const COLS: usize>([[Cell; COLS]; ROWS]);

impl<const ROWS: usize, const COLS: usize> Grid<ROWS, COLS> {
    /// Number of distinct moves on a board of this size.
    pub const PIVOTS: usize = ROWS.saturating_sub(1) * COLS.saturating_sub(1);

    /// A grid holding `cells`, row by row.
    pub fn from_cells(cells: [[Cell; COLS]; ROWS]) -> Self {
        Self(cells)
    }

    /// Build a grid from an [`Array2`] of the matching shape, or `None` if the shape differs.
    pub fn from_array(array: &Array2<Cell>) -> Option<Self> {
        if array.dim() != (ROWS, COLS) {
            return None;
        }

        let mut cells = [[Cell::Hole; COLS]; ROWS];
        for ((row, col), cell) in array.indexed_iter() {
            cells[row][col] = *cell;
        }
        Some(Self(cells))
    }

    /// The cells as a `ROWS x COLS` array.
    pub fn to_array(&self) -> Array2<Cell> {
        Array2::from_shape_fn((ROWS, COLS), |(row, col)| self.0[row][col])
    }

    /// The cell at `location`, which must be on the board.
    pub fn get(&self, location: Location) -> Cell {
        let (row, col) = location.as_index();
        self.0[row][col]
    }

    /// All cells in row-major order alongside their locations.
    pub fn cells(&self) -> impl Iterator<Item=(Location, Cell)> + '_ {
        (0..ROWS).cartesian_product(0..COLS)
            .map(|index| (Location::from(index), self.0[index.0][index.1]))
    }

    /// Locations of every hole, in reading order.
    pub fn holes(&self) -> impl Iterator<Item=Location> + '_ {
        self.cells().filter(|(_, cell)| cell.is_hole()).map(|(location, _)| location)
    }

    /// Every tile and where it is, in reading order.
    pub fn tiles(&self) -> impl Iterator<Item=(Location, TileId)> + '_ {
        self.cells().filter_map(|(location, cell)| cell.tile().map(|tile| (location, tile)))
    }

    /// Where `tile` currently sits, if it is on the board at all.
    pub fn find(&self, tile: TileId) -> Option<Location> {
        self.tiles().find(|(_, t)| *t == tile).map(|(location, _)| location)
    }

    /// Whether `mv` names a pivot of this board.
    pub fn is_valid_move(mv: Move) -> bool {
        mv.index() < Self::PIVOTS
    }

    /// Every legal move, in pivot order.
    pub fn moves() -> impl Iterator<Item=Move> {
        (0..Self::PIVOTS).map(|index| Move(index as u8))
    }

    /// The upper left cell of the block turned by `mv`.
    ///
    /// # Panics
    /// If `mv` is not a legal pivot for this board size.
    pub fn pivot(mv: Move) -> Location {
        assert!(Self::is_valid_move(mv), "move {mv} out of range for a {ROWS}x{COLS} board");
        Location(mv.index() / (COLS - 1), mv.index() % (COLS - 1))
    }

    /// Apply `mv` to a copy of this grid, turning its 2x2 block clockwise.
    ///
    /// # Panics
    /// If `mv` is not a legal pivot for this board size.
    pub fn rotate(&self, mv: Move) -> Self {
        let pivot = Self::pivot(mv);
        let mut cells = self.0;

        for (from, to) in ROTATION_CYCLE.iter().circular_tuple_windows() {
            let (from_row, from_col) = pivot.offset_by(*from).as_index();
            let (to_row, to_col) = pivot.offset_by(*to).as_index();
            cells[to_row][to_col] = self.0[from_row][from_col];
        }

        Self(cells)
    }

    /// Apply every move of `path` in order.
    pub fn apply(&self, path: &[Move]) -> Self {
        path.iter().fold(*self, |grid, mv| grid.rotate(*mv))
    }
}

impl<const ROWS: usize, const COLS: usize> Display for Grid<ROWS, COLS> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let labels = self.to_array().map(|cell| cell.to_string());
        let width = labels.iter().map(String::len).max().unwrap_or(1);

        for row in labels.rows() {
            writeln!(f, "{}", row.iter().map(|label| format!("{label:>width$}")).join(" "))?;
        }

        Ok(())
    }
}
