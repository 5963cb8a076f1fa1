use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use itertools::Itertools;
use tracing::debug;

use crate::grid::{Grid, Move, Path};

/// Estimated number of moves.
pub type Cost = u32;

/// What a search is trying to reach, and how far away it seems to be.
pub trait Objective<const ROWS: usize, const COLS: usize> {
    /// Whether `grid` meets the objective.
    fn is_solved(&self, grid: &Grid<ROWS, COLS>) -> bool;
    /// Estimated moves left from `grid`, used to order the frontier. Must be `0` wherever [`Self::is_solved`] holds.
    fn estimate(&self, grid: &Grid<ROWS, COLS>) -> Cost;
    /// Moves `grid` needs at the least. [`search_all`] keeps expanding every grid whose moves so far plus this bound
    /// stay within the slack, so it must be `0` wherever [`Self::is_solved`] holds and no greater than
    /// [`Self::estimate`]. Defaults to the estimate.
    fn lower_bound(&self, grid: &Grid<ROWS, COLS>) -> Cost {
        self.estimate(grid)
    }
}

/// An [`Objective`] assembled from a solved predicate and a heuristic.
pub struct FnObjective<S, H> {
    /// The solved predicate.
    pub solved: S,
    /// The estimate, also used as the lower bound.
    pub heuristic: H,
}

impl<S, H, const ROWS: usize, const COLS: usize> Objective<ROWS, COLS> for FnObjective<S, H>
where
    S: Fn(&Grid<ROWS, COLS>) -> bool,
    H: Fn(&Grid<ROWS, COLS>) -> Cost,
{
    fn is_solved(&self, grid: &Grid<ROWS, COLS>) -> bool {
        (self.solved)(grid)
    }

    fn estimate(&self, grid: &Grid<ROWS, COLS>) -> Cost {
        (self.heuristic)(grid)
    }
}

/// Bounds on a search.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SearchLimits {
    /// Grids this many moves deep are not expanded further.
    pub max_moves: Option<usize>,
    /// When collecting every solution, how many moves beyond the shortest one found are still accepted.
    pub slack: usize,
}

/// Reasons a search may come back empty handed. Neither is fatal: the caller decides whether to try something else.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SearchFailure {
    /// Every reachable grid was expanded without meeting the objective.
    #[error("no solution exists from this grid")]
    Exhausted,
    /// The objective was not met within the move limit.
    #[error("no solution within {max_moves} moves")]
    MoveLimit {
        /// The limit in force.
        max_moves: usize,
    },
}

/// A path meeting an objective and the grid it ends on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Solution<const ROWS: usize, const COLS: usize> {
    /// Moves from the start grid.
    pub path: Path,
    /// The grid reached by `path`.
    pub grid: Grid<ROWS, COLS>,
}

/// Counters describing how much work a search did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SearchStats {
    /// Grids popped and expanded.
    pub expanded: usize,
    /// Frontier entries pushed.
    pub generated: usize,
}

#[derive(Clone, Copy)]
struct Node<const ROWS: usize, const COLS: usize> {
    grid: Grid<ROWS, COLS>,
    parent: Option<(usize, Move)>,
    depth: usize,
}

// frontier entries are ordered so the max-heap pops the lowest (estimate + depth, depth, insertion order) first;
// grids themselves never take part in the comparison
#[derive(Eq, PartialEq)]
struct Entry {
    priority: usize,
    // lower bound + depth, not part of the ordering
    floor: usize,
    depth: usize,
    sequence: usize,
    node: usize,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.depth, other.sequence).cmp(&(self.priority, self.depth, self.sequence))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Search<'o, O, const ROWS: usize, const COLS: usize> {
    objective: &'o O,
    limits: SearchLimits,
    nodes: Vec<Node<ROWS, COLS>>,
    // shortest node discovered for each grid
    seen: HashMap<Grid<ROWS, COLS>, usize>,
    frontier: BinaryHeap<Entry>,
    stats: SearchStats,
}

impl<'o, O, const ROWS: usize, const COLS: usize> Search<'o, O, ROWS, COLS>
where
    O: Objective<ROWS, COLS>,
{
    fn new(start: Grid<ROWS, COLS>, objective: &'o O, limits: SearchLimits) -> Self {
        let mut search = Self {
            objective,
            limits,
            nodes: Vec::new(),
            seen: HashMap::new(),
            frontier: BinaryHeap::new(),
            stats: SearchStats::default(),
        };
        search.discover(start, None, 0);
        search
    }

    // a grid is only queued again when a strictly shorter path to it turns up, which an estimate that drops by
    // at most one per move never allows once the grid has been expanded
    fn discover(&mut self, grid: Grid<ROWS, COLS>, parent: Option<(usize, Move)>, depth: usize) {
        if let Some(&known) = self.seen.get(&grid) {
            if self.nodes[known].depth <= depth {
                return;
            }
        }

        let node = self.nodes.len();
        self.nodes.push(Node { grid, parent, depth });
        self.seen.insert(grid, node);
        self.frontier.push(Entry {
            priority: self.objective.estimate(&grid) as usize + depth,
            floor: self.objective.lower_bound(&grid) as usize + depth,
            depth,
            sequence: node,
            node,
        });
        self.stats.generated += 1;
    }

    fn path_to(&self, mut node: usize) -> Path {
        let mut path = Vec::with_capacity(self.nodes[node].depth);
        while let Some((parent, mv)) = self.nodes[node].parent {
            path.push(mv);
            node = parent;
        }
        path.reverse();
        path
    }

    /// Pop grids best first until the objective is met, or with `find_all`, until the frontier is drained of
    /// every entry whose lower bound could still finish within `slack` moves of the shortest solution found.
    fn run(&mut self, find_all: bool) -> Result<Vec<Solution<ROWS, COLS>>, SearchFailure> {
        let mut solutions = Vec::new();
        let mut bound: Option<usize> = None;
        let mut truncated = false;
        let mut deepest = 0;

        while let Some(entry) = self.frontier.pop() {
            // frontier order follows the estimate, so entries behind this one may still be within the bound
            if bound.is_some_and(|bound| entry.floor > bound) {
                continue;
            }
            if self.seen.get(&self.nodes[entry.node].grid) != Some(&entry.node) {
                // superseded by a shorter path to the same grid
                continue;
            }

            let Node { grid, depth, .. } = self.nodes[entry.node];
            if depth > deepest {
                deepest = depth;
                debug!("expanding search to {deepest} moves");
            }

            self.stats.expanded += 1;

            if self.objective.is_solved(&grid) {
                let solution = Solution { path: self.path_to(entry.node), grid };
                if !find_all {
                    return Ok(vec![solution]);
                }

                bound = Some(bound.map_or(depth + self.limits.slack, |bound| bound.min(depth + self.limits.slack)));
                solutions.push(solution);
                continue;
            }

            if self.limits.max_moves.is_some_and(|max_moves| depth >= max_moves) {
                truncated = true;
                continue;
            }
            if bound.is_some_and(|bound| depth >= bound) {
                continue;
            }

            for mv in Grid::<ROWS, COLS>::moves() {
                self.discover(grid.rotate(mv), Some((entry.node, mv)), depth + 1);
            }
        }

        if let Some(bound) = bound {
            solutions.retain(|solution| solution.path.len() <= bound);
            solutions.sort_by_key(|solution| solution.path.len());
            // a grid reopened through a shorter path is recorded again; keep its shortest solution
            solutions = solutions.into_iter().unique_by(|solution| solution.grid).collect();
        }

        match (solutions.is_empty(), truncated, self.limits.max_moves) {
            (false, _, _) => Ok(solutions),
            (true, true, Some(max_moves)) => Err(SearchFailure::MoveLimit { max_moves }),
            (true, _, _) => Err(SearchFailure::Exhausted),
        }
    }
}

/// Best-first search from `start` for the first grid meeting `objective`.
///
/// Grids are expanded in order of estimate plus moves so far. With an estimate that never overestimates the
/// first solution is a shortest one; with an inflated estimate it is usually close.
pub fn search<O, const ROWS: usize, const COLS: usize>(
    start: Grid<ROWS, COLS>,
    objective: &O,
    limits: SearchLimits,
) -> Result<Solution<ROWS, COLS>, SearchFailure>
where
    O: Objective<ROWS, COLS>,
{
    let mut search = Search::new(start, objective, limits);
    let result = search.run(false);
    debug!(expanded = search.stats.expanded, generated = search.stats.generated, "search finished");

    result.map(|mut solutions| solutions.remove(0))
}

/// Like [`search`], but keeps going after the first solution and returns every solution at most
/// [`SearchLimits::slack`] moves longer than the shortest one found, shortest first.
///
/// Each returned solution ends on a different grid.
pub fn search_all<O, const ROWS: usize, const COLS: usize>(
    start: Grid<ROWS, COLS>,
    objective: &O,
    limits: SearchLimits,
) -> Result<Vec<Solution<ROWS, COLS>>, SearchFailure>
where
    O: Objective<ROWS, COLS>,
{
    let mut search = Search::new(start, objective, limits);
    let result = search.run(true);
    debug!(expanded = search.stats.expanded, generated = search.stats.generated, "search finished");

    result
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::builder::PuzzleBuilder;
    use crate::cell::Cell;
    use crate::puzzle::{Puzzle, ADMISSIBLE_WEIGHT};
    use crate::replay::scramble;

    use super::*;

    fn identity() -> Vec<Vec<i32>> {
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]]
    }

    fn scrambled(moves: &[u8]) -> Puzzle<3, 3> {
        let goal = PuzzleBuilder::<3, 3>::new()
            .init_rows(&identity())
            .goal_rows(&identity())
            .heuristic_weight(ADMISSIBLE_WEIGHT)
            .build()
            .unwrap();
        let path = moves.iter().map(|mv| Move(*mv)).collect::<Vec<_>>();
        goal.restarted_from(goal.goal().apply(&path))
    }

    fn shortest_by_bfs(puzzle: &Puzzle<3, 3>) -> usize {
        let mut seen = HashSet::from([*puzzle.init()]);
        let mut queue = VecDeque::from([(*puzzle.init(), 0)]);
        while let Some((grid, depth)) = queue.pop_front() {
            if puzzle.is_solved(&grid) {
                return depth;
            }
            for mv in Grid::<3, 3>::moves() {
                let next = grid.rotate(mv);
                if seen.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        unreachable!("3x3 rotations reach every arrangement")
    }

    // every grid meeting the stage at the fewest moves, by breadth-first levels
    fn shortest_stage_ends(puzzle: &Puzzle<3, 3>, cutoff: usize) -> (usize, HashSet<Grid<3, 3>>) {
        let mut seen = HashSet::from([*puzzle.init()]);
        let mut level = vec![*puzzle.init()];
        let mut depth = 0;
        while !level.is_empty() {
            let ends: HashSet<_> = level.iter().copied().filter(|grid| puzzle.solved_up_to(grid, cutoff)).collect();
            if !ends.is_empty() {
                return (depth, ends);
            }
            level = level.iter()
                .flat_map(|grid| Grid::<3, 3>::moves().map(move |mv| grid.rotate(mv)))
                .filter(|next| seen.insert(*next))
                .collect();
            depth += 1;
        }
        unreachable!("stage {cutoff} cannot be met")
    }

    #[test]
    fn already_solved_is_empty_path() {
        let puzzle = scrambled(&[]);
        let solution = search(*puzzle.init(), &puzzle.full(), SearchLimits::default()).unwrap();
        assert!(solution.path.is_empty());
    }

    #[test]
    fn admissible_search_is_optimal() {
        for moves in [&[0u8, 3][..], &[1, 1, 2], &[0, 2, 3, 1, 0], &[3, 3, 0, 1, 2, 2]] {
            let puzzle = scrambled(moves);
            let solution = search(*puzzle.init(), &puzzle.full(), SearchLimits::default()).unwrap();
            assert!(puzzle.is_solved(&puzzle.init().apply(&solution.path)));
            assert_eq!(solution.grid, puzzle.init().apply(&solution.path));
            assert_eq!(solution.path.len(), shortest_by_bfs(&puzzle), "scramble {moves:?}");
        }
    }

    #[test]
    fn move_limit_is_reported() {
        let puzzle = scrambled(&[0, 1, 2, 3]);
        let shortest = shortest_by_bfs(&puzzle);
        let limits = SearchLimits { max_moves: Some(shortest - 1), slack: 0 };
        assert_eq!(
            search(*puzzle.init(), &puzzle.full(), limits),
            Err(SearchFailure::MoveLimit { max_moves: shortest - 1 })
        );
    }

    #[test]
    fn unreachable_objective_exhausts() {
        let puzzle = scrambled(&[0]);
        let never = FnObjective { solved: |_: &Grid<3, 3>| false, heuristic: |_: &Grid<3, 3>| -> Cost { 0 } };
        // a 2x2 board only ever shows four arrangements
        let tiny = Grid::<2, 2>::from_cells([[Cell::Tile(0), Cell::Tile(1)], [Cell::Tile(2), Cell::Tile(3)]]);
        let never_tiny = FnObjective { solved: |_: &Grid<2, 2>| false, heuristic: |_: &Grid<2, 2>| -> Cost { 0 } };
        assert_eq!(search(tiny, &never_tiny, SearchLimits::default()), Err(SearchFailure::Exhausted));
        let limits = SearchLimits { max_moves: Some(2), slack: 0 };
        assert_eq!(search(*puzzle.init(), &never, limits), Err(SearchFailure::MoveLimit { max_moves: 2 }));
    }

    #[test]
    fn search_all_respects_slack() {
        let puzzle = scrambled(&[0, 3]);
        // lock down only the first tile so several end grids qualify
        let stage = puzzle.stage(0);
        let tight = search_all(*puzzle.init(), &stage, SearchLimits { max_moves: None, slack: 0 }).unwrap();
        let loose = search_all(*puzzle.init(), &stage, SearchLimits { max_moves: None, slack: 1 }).unwrap();

        let shortest = tight[0].path.len();
        assert!(tight.iter().all(|solution| solution.path.len() == shortest));
        assert!(loose.len() >= tight.len());
        assert!(loose.iter().all(|solution| solution.path.len() <= shortest + 1));
        assert!(loose.windows(2).all(|pair| pair[0].path.len() <= pair[1].path.len()));
        for solution in &loose {
            assert!(puzzle.solved_up_to(&puzzle.init().apply(&solution.path), 0));
        }
        assert!(loose.iter().map(|solution| solution.grid).collect::<HashSet<_>>().len() == loose.len());
    }

    #[test]
    fn search_all_finds_every_shortest_stage_end_with_holes() {
        let rows = vec![vec![6, 7, 8], vec![3, 4, 5], vec![-1, -1, -1]];
        let goal = PuzzleBuilder::<3, 3>::new()
            .init_rows(&rows)
            .goal_rows(&rows)
            .heuristic_weight(ADMISSIBLE_WEIGHT)
            .build()
            .unwrap();

        for seed in 0..8 {
            let (start, _) = scramble(*goal.goal(), 8, &mut StdRng::seed_from_u64(seed));
            let puzzle = goal.restarted_from(start);
            for cutoff in [0, 1, 2] {
                let (shortest, ends) = shortest_stage_ends(&puzzle, cutoff);
                let stage = puzzle.stage(cutoff);
                let found = search_all(start, &stage, SearchLimits { max_moves: None, slack: 0 }).unwrap();

                assert!(found.iter().all(|solution| solution.path.len() == shortest), "seed {seed}, cutoff {cutoff}");
                assert!(found.iter().all(|solution| stage.estimate(&solution.grid) == 0));
                assert_eq!(found.iter().map(|solution| solution.grid).collect::<HashSet<_>>(), ends, "seed {seed}, cutoff {cutoff}");
            }
        }
    }
}
