use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::Path as FsPath;
use std::rc::Rc;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::grid::{Grid, Move, Path};
use crate::puzzle::Puzzle;
use crate::search::{search_all, SearchLimits, Solution};

/// The sequence of cutoffs a staged solve locks down, with the search bounds used at every stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StagePlan {
    cutoffs: Vec<usize>,
    /// Bounds applied to every stage search.
    pub limits: SearchLimits,
}

impl StagePlan {
    /// Stages ending at each of `cutoffs`, which must be non-empty and strictly increasing.
    pub fn new(cutoffs: Vec<usize>, limits: SearchLimits) -> Option<Self> {
        (!cutoffs.is_empty() && cutoffs.iter().tuple_windows().all(|(a, b)| a < b))
            .then_some(Self { cutoffs, limits })
    }

    /// Lock down tiles one at a time through rank `lock_through`, then everything left in one final stage.
    pub fn incremental<const ROWS: usize, const COLS: usize>(puzzle: &Puzzle<ROWS, COLS>, lock_through: usize, limits: SearchLimits) -> Self {
        let last = puzzle.last_rank();
        let mut cutoffs = (0..=lock_through.min(last)).collect_vec();
        if cutoffs.last() != Some(&last) {
            cutoffs.push(last);
        }
        Self { cutoffs, limits }
    }

    /// A single stage solving every tile at once.
    pub fn all_at_once<const ROWS: usize, const COLS: usize>(puzzle: &Puzzle<ROWS, COLS>, limits: SearchLimits) -> Self {
        Self { cutoffs: vec![puzzle.last_rank()], limits }
    }

    /// The last rank locked down by each stage, in order.
    pub fn cutoffs(&self) -> &[usize] {
        &self.cutoffs
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.cutoffs.len()
    }

    /// Always `false` for a plan built through [`Self::new`] or the other constructors.
    pub fn is_empty(&self) -> bool {
        self.cutoffs.is_empty()
    }
}

/// Memoized stage searches, keyed by the grid a stage starts from, its cutoff and the search limits.
///
/// An empty entry records a stage that has no solution from that grid. Entries depend on the puzzle's goal,
/// order and heuristic weight too, which the key leaves out: a cache only carries over between solves of one
/// [`Puzzle`].
#[derive(Debug, Default)]
pub struct StageCache<const ROWS: usize, const COLS: usize> {
    entries: HashMap<(Grid<ROWS, COLS>, usize, SearchLimits), Rc<[Solution<ROWS, COLS>]>>,
    hits: usize,
}

impl<const ROWS: usize, const COLS: usize> StageCache<ROWS, COLS> {
    /// An empty cache.
    pub fn new() -> Self {
        Self { entries: HashMap::new(), hits: 0 }
    }

    /// Number of stage searches stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no stage search has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered without searching.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Forget every entry and reset the hit count.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }
}

/// The staged solve could not complete any path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("no branch completed every stage (deepest stage reached: {deepest_stage} of {stages})")]
pub struct StagedFailure {
    /// Index of the furthest stage any branch started.
    pub deepest_stage: usize,
    /// Number of stages in the plan.
    pub stages: usize,
}

/// Why an exhaustive solve stopped short.
#[derive(Debug, thiserror::Error)]
pub enum ExhaustiveError {
    /// No branch completed every stage.
    #[error(transparent)]
    Unsolved(#[from] StagedFailure),
    /// A complete path could not be written to the solution log. Enumeration stops at that path.
    #[error("failed to record a complete path in the solution log")]
    Log(#[source] io::Error),
}

/// Summary of an exhaustive enumeration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Enumeration {
    /// Complete paths handed to the sink.
    pub complete: usize,
    /// The shortest of them.
    pub shortest: Option<Path>,
}

// one level of the explicit branch traversal: the branches of stage `stage`, the next one to try,
// and the length of the accumulated path before any of them was appended
struct Frame<const ROWS: usize, const COLS: usize> {
    stage: usize,
    branches: Rc<[Solution<ROWS, COLS>]>,
    next: usize,
    base: usize,
}

/// Solves a puzzle stage by stage: every stage searches for all near-shortest ways to lock down the next tiles,
/// and each resulting grid is a branch the following stage continues from.
pub struct StagedSolver<'p, const ROWS: usize, const COLS: usize> {
    puzzle: &'p Puzzle<ROWS, COLS>,
    plan: StagePlan,
    cache: StageCache<ROWS, COLS>,
}

impl<'p, const ROWS: usize, const COLS: usize> StagedSolver<'p, ROWS, COLS> {
    /// A solver for `puzzle` following `plan`, starting with an empty cache.
    pub fn new(puzzle: &'p Puzzle<ROWS, COLS>, plan: StagePlan) -> Self {
        Self::with_cache(puzzle, plan, StageCache::new())
    }

    /// Reuse a cache from an earlier solve of the same puzzle. The plan may differ.
    pub fn with_cache(puzzle: &'p Puzzle<ROWS, COLS>, plan: StagePlan, cache: StageCache<ROWS, COLS>) -> Self {
        Self { puzzle, plan, cache }
    }

    /// The stages this solver works through.
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Stage searches done so far.
    pub fn cache(&self) -> &StageCache<ROWS, COLS> {
        &self.cache
    }

    /// Give up the cache, to hand it to a later solver of the same puzzle.
    pub fn into_cache(self) -> StageCache<ROWS, COLS> {
        self.cache
    }

    fn branches(&mut self, grid: Grid<ROWS, COLS>, stage: usize) -> Rc<[Solution<ROWS, COLS>]> {
        let cutoff = self.plan.cutoffs[stage];
        let key = (grid, cutoff, self.plan.limits);
        if let Some(branches) = self.cache.entries.get(&key) {
            self.cache.hits += 1;
            debug!(stage, cutoff, branches = branches.len(), "stage cache hit");
            return branches.clone();
        }

        let branches: Rc<[Solution<ROWS, COLS>]> = match search_all(grid, &self.puzzle.stage(cutoff), self.plan.limits) {
            Ok(solutions) => {
                debug!(stage, cutoff, branches = solutions.len(), shortest = solutions[0].path.len(), "stage solved");
                solutions.into()
            }
            Err(failure) => {
                warn!(stage, cutoff, %failure, "abandoning branch");
                Rc::from(Vec::new())
            }
        };

        self.cache.entries.insert(key, branches.clone());
        branches
    }

    /// Walk the tree of stage branches depth first from `start`, handing every complete path to `sink`
    /// until it breaks or the tree is exhausted. Returns how many complete paths were found.
    ///
    /// The path passed to `sink` is the concatenation of each stage's moves, in stage order.
    pub fn enumerate<F>(&mut self, start: Grid<ROWS, COLS>, mut sink: F) -> Result<usize, StagedFailure>
    where
        F: FnMut(&[Move]) -> ControlFlow<()>,
    {
        let stages = self.plan.len();
        let mut path: Path = Vec::new();
        let mut complete = 0;
        let mut deepest_stage = 0;

        let mut stack = vec![Frame { stage: 0, branches: self.branches(start, 0), next: 0, base: 0 }];

        while let Some(frame) = stack.last_mut() {
            let Some(branch) = frame.branches.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;

            path.truncate(frame.base);
            path.extend_from_slice(&branch.path);
            let grid = branch.grid;
            let stage = frame.stage + 1;

            if stage == stages {
                complete += 1;
                info!(moves = path.len(), "found complete path");
                if sink(&path).is_break() {
                    break;
                }
                continue;
            }

            deepest_stage = deepest_stage.max(stage);
            let branches = self.branches(grid, stage);
            stack.push(Frame { stage, branches, next: 0, base: path.len() });
        }

        if complete == 0 {
            return Err(StagedFailure { deepest_stage, stages });
        }
        Ok(complete)
    }

    /// The first complete path found, backtracking into other branches whenever a stage has no solution.
    pub fn solve(&mut self, start: Grid<ROWS, COLS>) -> Result<Path, StagedFailure> {
        let mut found = None;
        self.enumerate(start, |path| {
            found = Some(path.to_vec());
            ControlFlow::Break(())
        })?;

        Ok(found.unwrap_or_default())
    }

    /// Every complete path, up to `limit` of them, each recorded in `log`. Reports the shortest path found.
    ///
    /// A failed write to `log` ends the enumeration with [`ExhaustiveError::Log`].
    pub fn solve_exhaustive(
        &mut self,
        start: Grid<ROWS, COLS>,
        limit: Option<usize>,
        log: &mut SolutionLog,
    ) -> Result<Enumeration, ExhaustiveError> {
        let mut summary = Enumeration::default();
        let mut write_error = None;

        self.enumerate(start, |path| {
            summary.complete += 1;
            if summary.shortest.as_ref().map_or(true, |shortest| path.len() < shortest.len()) {
                info!(moves = path.len(), "new shortest path");
                summary.shortest = Some(path.to_vec());
            }
            if let Err(error) = log.record(path) {
                write_error = Some(error);
                return ControlFlow::Break(());
            }
            match limit {
                Some(limit) if summary.complete >= limit => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            }
        })?;

        if let Some(error) = write_error {
            warn!(%error, complete = summary.complete, "stopped enumerating after failing to write the solution log");
            return Err(ExhaustiveError::Log(error));
        }
        Ok(summary)
    }
}

/// Append-only record of complete paths, one `<length> <moves...>` line per path.
pub struct SolutionLog {
    writer: Box<dyn Write>,
}

impl SolutionLog {
    /// Append to the file at `path`, creating it if needed.
    pub fn append_to(path: &FsPath) -> std::io::Result<Self> {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Log to any writer.
    pub fn new(writer: impl Write + 'static) -> Self {
        Self { writer: Box::new(writer) }
    }

    /// Write one line for `path` and flush it.
    pub fn record(&mut self, path: &[Move]) -> std::io::Result<()> {
        writeln!(self.writer, "{} {}", path.len(), path.iter().join(" "))?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;

    use crate::builder::PuzzleBuilder;
    use crate::puzzle::ADMISSIBLE_WEIGHT;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn scrambled(moves: &[u8]) -> Puzzle<3, 3> {
        let rows = vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]];
        let puzzle = PuzzleBuilder::<3, 3>::new()
            .init_rows(&rows)
            .goal_rows(&rows)
            .heuristic_weight(ADMISSIBLE_WEIGHT)
            .build()
            .unwrap();
        let path = moves.iter().map(|mv| Move(*mv)).collect_vec();
        puzzle.restarted_from(puzzle.goal().apply(&path))
    }

    #[test]
    fn incremental_plan_ends_with_full_stage() {
        let puzzle = scrambled(&[]);
        let plan = StagePlan::incremental(&puzzle, 2, SearchLimits::default());
        assert_eq!(plan.cutoffs(), &[0, 1, 2, 8]);
        let plan = StagePlan::incremental(&puzzle, 20, SearchLimits::default());
        assert_eq!(plan.cutoffs(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(StagePlan::new(vec![3, 1], SearchLimits::default()), None);
    }

    #[test]
    fn stages_compose_into_full_solution() {
        let puzzle = scrambled(&[0, 3, 1, 2, 0]);
        let plan = StagePlan::new(vec![2, 8], SearchLimits { max_moves: None, slack: 1 }).unwrap();
        let mut solver = StagedSolver::new(&puzzle, plan);
        let path = solver.solve(*puzzle.init()).unwrap();

        let end = puzzle.init().apply(&path);
        assert!(puzzle.is_solved(&end));
        assert!(puzzle.solved_up_to(&end, puzzle.last_rank()));
    }

    #[test]
    fn exhaustive_mode_logs_every_complete_path() {
        let puzzle = scrambled(&[0, 3]);
        let plan = StagePlan::new(vec![0, 8], SearchLimits { max_moves: None, slack: 1 }).unwrap();
        let buffer = SharedBuffer::default();
        let mut log = SolutionLog::new(buffer.clone());

        let mut solver = StagedSolver::new(&puzzle, plan);
        let summary = solver.solve_exhaustive(*puzzle.init(), None, &mut log).unwrap();

        let text = String::from_utf8(buffer.0.borrow().clone()).unwrap();
        let lines = text.lines().collect_vec();
        assert_eq!(lines.len(), summary.complete);
        assert!(summary.complete >= 1);

        for line in lines {
            let mut fields = line.split_whitespace();
            let length: usize = fields.next().unwrap().parse().unwrap();
            let path = fields.map(|mv| Move(mv.parse().unwrap())).collect_vec();
            assert_eq!(path.len(), length);
            assert!(puzzle.is_solved(&puzzle.init().apply(&path)));
        }

        let shortest = summary.shortest.unwrap();
        assert!(puzzle.is_solved(&puzzle.init().apply(&shortest)));
    }

    #[test]
    fn limit_stops_enumeration() {
        let puzzle = scrambled(&[0, 3]);
        let plan = StagePlan::new(vec![0, 8], SearchLimits { max_moves: None, slack: 2 }).unwrap();
        let mut log = SolutionLog::new(io::sink());
        let mut solver = StagedSolver::new(&puzzle, plan);
        let summary = solver.solve_exhaustive(*puzzle.init(), Some(1), &mut log).unwrap();
        assert_eq!(summary.complete, 1);
    }

    #[test]
    fn cache_is_reused_across_solves() {
        let puzzle = scrambled(&[1, 2]);
        let plan = StagePlan::new(vec![1, 8], SearchLimits::default()).unwrap();
        let mut solver = StagedSolver::new(&puzzle, plan.clone());
        let first = solver.solve(*puzzle.init()).unwrap();
        let cached = solver.cache().len();
        assert!(cached >= 2);

        let mut solver = StagedSolver::with_cache(&puzzle, plan, solver.into_cache());
        let second = solver.solve(*puzzle.init()).unwrap();
        assert_eq!(first, second);
        assert_eq!(solver.cache().len(), cached);
        assert!(solver.cache().hits() >= 2);
    }

    #[test]
    fn unsolvable_stage_fails_every_branch() {
        let puzzle = scrambled(&[0]);
        // undoing a clockwise turn takes three more of them
        let plan = StagePlan::new(vec![8], SearchLimits { max_moves: Some(1), slack: 0 }).unwrap();
        let mut solver = StagedSolver::new(&puzzle, plan);
        assert_eq!(solver.solve(*puzzle.init()), Err(StagedFailure { deepest_stage: 0, stages: 1 }));
    }

    #[test]
    fn log_write_failure_is_an_error() {
        let puzzle = scrambled(&[0, 3]);
        let plan = StagePlan::new(vec![0, 8], SearchLimits { max_moves: None, slack: 1 }).unwrap();
        let mut log = SolutionLog::new(BrokenPipe);
        let mut solver = StagedSolver::new(&puzzle, plan);
        let result = solver.solve_exhaustive(*puzzle.init(), None, &mut log);
        assert!(matches!(result, Err(ExhaustiveError::Log(error)) if error.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn cache_tells_move_limits_apart() {
        let puzzle = scrambled(&[0]);
        let tight = StagePlan::new(vec![8], SearchLimits { max_moves: Some(1), slack: 0 }).unwrap();
        let mut solver = StagedSolver::new(&puzzle, tight);
        assert!(solver.solve(*puzzle.init()).is_err());

        // the failed search under the tight limit must not answer for the loose one
        let loose = StagePlan::new(vec![8], SearchLimits::default()).unwrap();
        let mut solver = StagedSolver::with_cache(&puzzle, loose, solver.into_cache());
        let path = solver.solve(*puzzle.init()).unwrap();
        assert!(puzzle.is_solved(&puzzle.init().apply(&path)));
        assert_eq!(solver.cache().len(), 2);
        assert_eq!(solver.cache().hits(), 0);
    }
}
