use std::collections::HashSet;

use itertools::Itertools;
use ndarray::Array2;

use crate::cell::{Cell, TileId};
use crate::grid::Grid;
use crate::puzzle::{Puzzle, Target, DEFAULT_HEURISTIC_WEIGHT};

/// Reasons a builder may become invalid while building.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuilderInvalidReason {
    /// Rows were given which do not form a `ROWS x COLS` arrangement.
    DimensionMismatch,
    /// A raw value is neither the hole sentinel nor a valid tile id.
    BadCellValue,
    /// The same tile appears twice in one arrangement.
    DuplicateTile,
    /// A tile with a goal location is absent from the start arrangement, so the goal is unreachable.
    MissingTile,
    /// The lock-down order is not a permutation of the goal tiles.
    BadOrder,
    /// The heuristic weight is negative or not finite.
    BadWeight,
    /// The board is too small to hold a single 2x2 block.
    NoPivots,
}

/// A builder for [`Puzzle`]s on a `ROWS x COLS` board.
///
/// Both arrangements start out as all holes. Builders mutate themselves while building but can be [`Clone`]d
/// to save their state at some point. Once a setter has made the builder invalid, further setters do nothing.
#[derive(Clone, Debug)]
pub struct PuzzleBuilder<const ROWS: usize, const COLS: usize> {
    init: Array2<Cell>,
    goal: Array2<Cell>,
    order: Option<Vec<TileId>>,
    weight: f32,
    invalid_reasons: Vec<BuilderInvalidReason>,
}

impl<const ROWS: usize, const COLS: usize> Default for PuzzleBuilder<ROWS, COLS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROWS: usize, const COLS: usize> PuzzleBuilder<ROWS, COLS> {
    /// An empty builder: both arrangements all holes, default weight, order taken from the goal.
    pub fn new() -> Self {
        let mut invalid_reasons = Vec::new();
        if ROWS < 2 || COLS < 2 {
            invalid_reasons.push(BuilderInvalidReason::NoPivots);
        }

        Self {
            init: Array2::from_shape_simple_fn((ROWS, COLS), Cell::default),
            goal: Array2::from_shape_simple_fn((ROWS, COLS), Cell::default),
            order: None,
            weight: DEFAULT_HEURISTIC_WEIGHT,
            invalid_reasons,
        }
    }

    fn parse_rows(&mut self, rows: &[Vec<i32>]) -> Option<Array2<Cell>> {
        if rows.len() != ROWS || rows.iter().any(|row| row.len() != COLS) {
            self.invalid_reasons.push(BuilderInvalidReason::DimensionMismatch);
            return None;
        }

        let mut cells = Array2::from_shape_simple_fn((ROWS, COLS), Cell::default);
        for ((row, col), raw) in rows.iter().enumerate()
            .flat_map(|(row, values)| values.iter().enumerate().map(move |(col, raw)| ((row, col), *raw))) {
            match Cell::from_raw(raw) {
                Some(cell) => cells[(row, col)] = cell,
                None => {
                    self.invalid_reasons.push(BuilderInvalidReason::BadCellValue);
                    return None;
                }
            }
        }

        self.check_unique(cells)
    }

    fn check_unique(&mut self, cells: Array2<Cell>) -> Option<Array2<Cell>> {
        if !cells.iter().filter_map(|cell| cell.tile()).all_unique() {
            self.invalid_reasons.push(BuilderInvalidReason::DuplicateTile);
            return None;
        }

        Some(cells)
    }

    /// Set the start arrangement from raw rows, using [`Cell::SENTINEL`] for holes.
    ///
    /// May cause the builder to enter a [`DimensionMismatch`](BuilderInvalidReason::DimensionMismatch),
    /// [`BadCellValue`](BuilderInvalidReason::BadCellValue) or [`DuplicateTile`](BuilderInvalidReason::DuplicateTile) invalid state.
    /// If the builder is already in an invalid state, this function does nothing.
    pub fn init_rows(&mut self, rows: &[Vec<i32>]) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if let Some(cells) = self.parse_rows(rows) {
            self.init = cells;
        }
        self
    }

    /// Set the goal arrangement from raw rows. Holes in the goal are positions whose content does not matter.
    ///
    /// Invalid states are as for [`Self::init_rows`].
    pub fn goal_rows(&mut self, rows: &[Vec<i32>]) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if let Some(cells) = self.parse_rows(rows) {
            self.goal = cells;
        }
        self
    }

    /// Set the start arrangement from an existing grid.
    pub fn init_grid(&mut self, grid: &Grid<ROWS, COLS>) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        self.init = grid.to_array();
        self
    }

    /// Set the goal arrangement from an existing grid.
    pub fn goal_grid(&mut self, grid: &Grid<ROWS, COLS>) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        self.goal = grid.to_array();
        self
    }

    /// Choose which goal tiles are locked down first. Defaults to the goal's row-major reading order.
    ///
    /// May cause the builder to enter a [`BadOrder`](BuilderInvalidReason::BadOrder) invalid state if a value is not a tile id.
    /// Whether `order` covers exactly the goal tiles is checked on [`Self::build`].
    pub fn order(&mut self, order: &[i32]) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        match order.iter().map(|raw| TileId::try_from(*raw)).collect::<Result<Vec<_>, _>>() {
            Ok(order) => self.order = Some(order),
            Err(_) => self.invalid_reasons.push(BuilderInvalidReason::BadOrder),
        }
        self
    }

    /// May cause the builder to enter a [`BadWeight`](BuilderInvalidReason::BadWeight) invalid state.
    pub fn heuristic_weight(&mut self, weight: f32) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !weight.is_finite() || weight < 0.0 {
            self.invalid_reasons.push(BuilderInvalidReason::BadWeight);
            return self;
        }

        self.weight = weight;
        self
    }

    /// Check the validity of this builder, ensuring no [`BuilderInvalidReason`] condition has arisen so far.
    ///
    /// Returns `None` if the builder is valid, `Some(&Vec<BuilderInvalidReason>)` otherwise.
    pub fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// Convert the state of this builder into a [`Puzzle`].
    ///
    /// On top of the reasons gathered while building, this verifies that every goal tile exists in the start
    /// arrangement, which also guarantees the goal has room for every hole of the start arrangement.
    pub fn build(&self) -> Result<Puzzle<ROWS, COLS>, Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(self.invalid_reasons.clone());
        }

        let mut reasons = Vec::new();

        let init_tiles: HashSet<TileId> = self.init.iter().filter_map(|cell| cell.tile()).collect();
        let goal_order = self.goal.iter().filter_map(|cell| cell.tile()).collect_vec();
        if !goal_order.iter().all(|tile| init_tiles.contains(tile)) {
            reasons.push(BuilderInvalidReason::MissingTile);
        }

        let order = self.order.clone().unwrap_or_else(|| goal_order.clone());
        if order.len() != goal_order.len() || !order.iter().all_unique()
            || !order.iter().all(|tile| goal_order.contains(tile)) {
            reasons.push(BuilderInvalidReason::BadOrder);
        }

        let (Some(init), Some(goal)) = (Grid::from_array(&self.init), Grid::from_array(&self.goal)) else {
            reasons.push(BuilderInvalidReason::DimensionMismatch);
            return Err(reasons);
        };

        if !reasons.is_empty() {
            return Err(reasons);
        }

        let mut targets = vec![None; goal_order.iter().max().map_or(0, |max| usize::from(*max) + 1)];
        for (rank, tile) in order.iter().enumerate() {
            if let Some(location) = goal.find(*tile) {
                targets[usize::from(*tile)] = Some(Target { rank, location });
            }
        }

        Ok(Puzzle {
            init,
            goal,
            order,
            targets,
            goal_holes: goal.holes().collect(),
            weight: self.weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<i32>> {
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]]
    }

    #[test]
    fn rejects_wrong_shape() {
        let mut builder = PuzzleBuilder::<3, 3>::new();
        builder.init_rows(&[vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::DimensionMismatch]));
        // invalid builders ignore further setters
        builder.goal_rows(&[vec![0]]);
        assert_eq!(builder.build().unwrap_err(), vec![BuilderInvalidReason::DimensionMismatch]);
    }

    #[test]
    fn rejects_duplicates_and_bad_values() {
        let duplicate = PuzzleBuilder::<3, 3>::new()
            .init_rows(&[vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 7]])
            .build()
            .unwrap_err();
        assert_eq!(duplicate, vec![BuilderInvalidReason::DuplicateTile]);

        let bad_value = PuzzleBuilder::<3, 3>::new()
            .goal_rows(&[vec![0, 1, 2], vec![3, -4, 5], vec![6, 7, 8]])
            .build()
            .unwrap_err();
        assert_eq!(bad_value, vec![BuilderInvalidReason::BadCellValue]);
    }

    #[test]
    fn goal_tiles_must_exist_at_start() {
        let reasons = PuzzleBuilder::<3, 3>::new()
            .init_rows(&[vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, -1]])
            .goal_rows(&rows())
            .build()
            .unwrap_err();
        assert_eq!(reasons, vec![BuilderInvalidReason::MissingTile]);
    }

    #[test]
    fn order_must_cover_goal_tiles() {
        let reasons = PuzzleBuilder::<3, 3>::new()
            .init_rows(&rows())
            .goal_rows(&rows())
            .order(&[0, 1, 2])
            .build()
            .unwrap_err();
        assert_eq!(reasons, vec![BuilderInvalidReason::BadOrder]);

        let puzzle = PuzzleBuilder::<3, 3>::new()
            .init_rows(&rows())
            .goal_rows(&rows())
            .order(&[8, 7, 6, 5, 4, 3, 2, 1, 0])
            .build()
            .unwrap();
        assert_eq!(puzzle.target(8).map(|target| target.rank), Some(0));
    }

    #[test]
    fn degenerate_boards_and_weights() {
        assert_eq!(PuzzleBuilder::<1, 4>::new().is_valid(), Some(&vec![BuilderInvalidReason::NoPivots]));
        let mut builder = PuzzleBuilder::<3, 3>::new();
        builder.heuristic_weight(f32::NAN);
        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::BadWeight]));
    }
}
