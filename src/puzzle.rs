use crate::cell::TileId;
use crate::grid::Grid;
use crate::location::Location;
use crate::search::{Cost, Objective};

/// Heuristic weight used unless configured otherwise.
///
/// An empirical tuning constant: it overestimates on most boards, trading optimal solution length for search speed.
pub const DEFAULT_HEURISTIC_WEIGHT: f32 = 0.7;

/// A weight under which the heuristic never overestimates on boards without holes.
///
/// A rotation moves four tiles by one step each, so the summed distance shrinks by at most four per move.
pub const ADMISSIBLE_WEIGHT: f32 = 0.25;

/// Where a tile belongs and when it is locked down.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Target {
    /// Position of this tile in the lock-down order.
    pub rank: usize,
    /// Where the tile sits in the goal.
    pub location: Location,
}

/// A puzzle instance: start and goal arrangements, the order in which tiles are locked down, and the heuristic weight.
///
/// Holes in the goal mark positions whose content does not matter.
/// Instances should be built using a [`PuzzleBuilder`](crate::builder::PuzzleBuilder).
#[derive(Clone, Debug)]
pub struct Puzzle<const ROWS: usize, const COLS: usize> {
    pub(crate) init: Grid<ROWS, COLS>,
    pub(crate) goal: Grid<ROWS, COLS>,
    pub(crate) order: Vec<TileId>,
    // indexed by tile id
    pub(crate) targets: Vec<Option<Target>>,
    pub(crate) goal_holes: Vec<Location>,
    pub(crate) weight: f32,
}

impl<const ROWS: usize, const COLS: usize> Puzzle<ROWS, COLS> {
    /// The start arrangement.
    pub fn init(&self) -> &Grid<ROWS, COLS> {
        &self.init
    }

    /// The goal arrangement.
    pub fn goal(&self) -> &Grid<ROWS, COLS> {
        &self.goal
    }

    /// Goal tiles in the order they are locked down.
    pub fn order(&self) -> &[TileId] {
        &self.order
    }

    /// Number of tiles with a goal position.
    pub fn tile_count(&self) -> usize {
        self.order.len()
    }

    /// The cutoff covering every goal tile.
    pub fn last_rank(&self) -> usize {
        self.order.len().saturating_sub(1)
    }

    /// The factor distances are scaled by in [`Self::heuristic_up_to`].
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// A copy of this puzzle searching with a different heuristic weight.
    pub fn with_weight(&self, weight: f32) -> Self {
        Self { weight, ..self.clone() }
    }

    /// The same goal and order, starting from `init` instead.
    pub fn restarted_from(&self, init: Grid<ROWS, COLS>) -> Self {
        Self { init, ..self.clone() }
    }

    /// Where `tile` belongs, if it has a place in the goal.
    pub fn target(&self, tile: TileId) -> Option<Target> {
        self.targets.get(usize::from(tile)).copied().flatten()
    }

    fn ranked_tiles<'a>(&'a self, grid: &'a Grid<ROWS, COLS>, cutoff: usize) -> impl Iterator<Item=(Location, Target)> + 'a {
        grid.tiles()
            .filter_map(|(location, tile)| self.target(tile).map(|target| (location, target)))
            .filter(move |(_, target)| target.rank <= cutoff)
    }

    /// Whether every tile ranked `0..=cutoff` sits at its goal location.
    pub fn solved_up_to(&self, grid: &Grid<ROWS, COLS>, cutoff: usize) -> bool {
        let placed = self.ranked_tiles(grid, cutoff)
            .filter(|(location, target)| *location == target.location)
            .count();
        placed == self.tile_count().min(cutoff + 1)
    }

    /// Whether every goal tile is home.
    pub fn is_solved(&self, grid: &Grid<ROWS, COLS>) -> bool {
        self.solved_up_to(grid, self.last_rank())
    }

    /// Unweighted distance to lock down tiles ranked `0..=cutoff`.
    ///
    /// Sums each ranked tile's Manhattan distance from its goal, then matches each goal hole greedily
    /// to the nearest hole on `grid` not matched yet and adds those distances too.
    pub fn distance_up_to(&self, grid: &Grid<ROWS, COLS>, cutoff: usize) -> usize {
        let tiles = self.tile_distance_up_to(grid, cutoff);

        let mut holes: Vec<Option<Location>> = grid.holes().map(Some).collect();
        let mut hole_distance = 0;
        for goal_hole in &self.goal_holes {
            let nearest = holes.iter_mut()
                .filter(|hole| hole.is_some())
                .min_by_key(|hole| hole.map_or(usize::MAX, |hole| hole.manhattan(*goal_hole)));

            if let Some(slot) = nearest {
                if let Some(hole) = slot.take() {
                    hole_distance += hole.manhattan(*goal_hole);
                }
            }
        }

        tiles + hole_distance
    }

    /// Summed Manhattan distance of the tiles ranked `0..=cutoff` from their goal locations. Holes are ignored.
    pub fn tile_distance_up_to(&self, grid: &Grid<ROWS, COLS>, cutoff: usize) -> usize {
        self.ranked_tiles(grid, cutoff)
            .map(|(location, target)| location.manhattan(target.location))
            .sum()
    }

    /// Weighted estimate of the moves left to lock down tiles ranked `0..=cutoff`.
    pub fn heuristic_up_to(&self, grid: &Grid<ROWS, COLS>, cutoff: usize) -> Cost {
        (self.distance_up_to(grid, cutoff) as f32 * self.weight) as Cost
    }

    /// Like [`Self::heuristic_up_to`] without the hole term, so it is `0` on every grid [`Self::solved_up_to`]
    /// accepts. A true lower bound under [`ADMISSIBLE_WEIGHT`].
    pub fn lower_bound_up_to(&self, grid: &Grid<ROWS, COLS>, cutoff: usize) -> Cost {
        (self.tile_distance_up_to(grid, cutoff) as f32 * self.weight) as Cost
    }

    /// The objective of locking down tiles ranked `0..=cutoff`.
    pub fn stage(&self, cutoff: usize) -> Stage<'_, ROWS, COLS> {
        Stage { puzzle: self, cutoff }
    }

    /// The objective of solving every tile at once.
    pub fn full(&self) -> Stage<'_, ROWS, COLS> {
        self.stage(self.last_rank())
    }
}

/// One stage of a staged solve, see [`Puzzle::stage`].
#[derive(Clone, Copy, Debug)]
pub struct Stage<'a, const ROWS: usize, const COLS: usize> {
    puzzle: &'a Puzzle<ROWS, COLS>,
    cutoff: usize,
}

impl<const ROWS: usize, const COLS: usize> Stage<'_, ROWS, COLS> {
    /// The last rank this stage locks down.
    pub fn cutoff(&self) -> usize {
        self.cutoff
    }
}

impl<const ROWS: usize, const COLS: usize> Objective<ROWS, COLS> for Stage<'_, ROWS, COLS> {
    fn is_solved(&self, grid: &Grid<ROWS, COLS>) -> bool {
        self.puzzle.solved_up_to(grid, self.cutoff)
    }

    fn estimate(&self, grid: &Grid<ROWS, COLS>) -> Cost {
        // holes are free to sit anywhere once the ranked tiles are home
        if self.is_solved(grid) {
            0
        } else {
            self.puzzle.heuristic_up_to(grid, self.cutoff)
        }
    }

    fn lower_bound(&self, grid: &Grid<ROWS, COLS>) -> Cost {
        self.puzzle.lower_bound_up_to(grid, self.cutoff)
    }
}
