use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use speedsolve::codes::code::CODE_LEN;
use speedsolve::codes::lights::FRAME_TIMEOUT;
use speedsolve::codes::monitor::run_monitor;
use speedsolve::codes::source::{solve_loop, AutomaticSource, ManualSource, Prompter, SourceError};
use speedsolve::codes::{Code, Constraint, Guesser};
use speedsolve::config::{load_instance, parse_path, Instance};
use speedsolve::replay::{cursor_offsets, scramble, Replay, DEFAULT_PIXEL_DIST};
use speedsolve::search::{search, SearchLimits};
use speedsolve::staged::{ExhaustiveError, SolutionLog, StagePlan, StagedSolver};
use speedsolve::{Move, Puzzle};

const ROWS: usize = 5;
const COLS: usize = 5;

#[derive(Parser)]
#[command(name = "solver")]
#[command(about = "Solves the rotating tile board and the phone code of the museum escape room")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Args)]
struct PuzzleArgs {
    /// Puzzle instance file
    #[arg(long, default_value = "puzzles/museum_tiles.json")]
    puzzle: PathBuf,
    /// Override the heuristic weight of the instance
    #[arg(long)]
    weight: Option<f32>,
}

#[derive(Args)]
struct CodeArgs {
    /// Allow a digit to appear more than once
    #[arg(long)]
    allow_repeats: bool,
    /// The digit the code always ends with
    #[arg(long, default_value_t = 9, value_parser = clap::value_parser!(u8).range(1..=9))]
    last_digit: u8,
    /// Do not assume anything about the last digit
    #[arg(long, conflicts_with = "last_digit")]
    free_last_digit: bool,
    /// Guesses to play before choosing them by minimax
    #[arg(long, value_delimiter = ',', default_value = "1234")]
    openers: Vec<Code>,
    /// Choose every guess by minimax
    #[arg(long, conflicts_with = "openers")]
    no_openers: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Solve every tile in one search
    Full {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(long)]
        max_moves: Option<usize>,
    },
    /// Lock tiles down one at a time, then solve the rest in one final stage
    Staged {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        /// Last rank locked down on its own
        #[arg(long, default_value_t = 10)]
        lock_through: usize,
        /// Moves beyond the shortest accepted for each stage
        #[arg(long, default_value_t = 0)]
        slack: usize,
        #[arg(long)]
        max_moves: Option<usize>,
        /// Keep enumerating complete paths instead of stopping at the first
        #[arg(long)]
        exhaustive: bool,
        /// Stop exhaustive enumeration after this many paths
        #[arg(long, requires = "exhaustive")]
        limit: Option<usize>,
        /// File complete paths are appended to in exhaustive mode
        #[arg(long, default_value = "solutions.log")]
        log: PathBuf,
    },
    /// Print the grid after every move of a path, by default the best known one
    Replay {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(value_delimiter = ',')]
        moves: Vec<u8>,
        /// Wait for Enter between moves
        #[arg(long)]
        pause: bool,
    },
    /// Scramble the goal with random moves and solve it back
    Scramble {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(long, default_value_t = 20)]
        steps: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print pointer offsets for clicking through a path, starting over the upper left pivot
    Clicks {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[arg(value_delimiter = ',')]
        moves: Vec<u8>,
        #[arg(long, default_value_t = DEFAULT_PIXEL_DIST)]
        pixel_dist: i32,
    },
    /// Break the phone code, typing in both guesses and responses
    Manual {
        #[command(flatten)]
        code: CodeArgs,
    },
    /// Break the phone code, typing in only the responses to suggested guesses
    Auto {
        #[command(flatten)]
        code: CodeArgs,
    },
    /// Follow a trace of `<millis> <lights>` frames captured from the phone panel
    Monitor {
        trace: PathBuf,
        #[arg(long, default_value_t = FRAME_TIMEOUT)]
        timeout: u64,
        #[command(flatten)]
        code: CodeArgs,
    },
}

impl PuzzleArgs {
    fn load(&self) -> Result<Instance<ROWS, COLS>> {
        let mut instance = load_instance(&self.puzzle)
            .with_context(|| format!("failed to load {}", self.puzzle.display()))?;
        if let Some(weight) = self.weight {
            ensure!(weight.is_finite() && weight >= 0.0, "heuristic weight must be a non-negative number");
            instance.puzzle = instance.puzzle.with_weight(weight);
        }
        Ok(instance)
    }
}

impl CodeArgs {
    fn guesser(&self) -> Guesser {
        let openers = if self.no_openers { Vec::new() } else { self.openers.clone() };
        let mut guesser = Guesser::new(openers);
        if !self.allow_repeats {
            guesser.add_constraint(Constraint::DistinctDigits);
        }
        if !self.free_last_digit {
            guesser.add_constraint(Constraint::DigitAt { position: CODE_LEN - 1, digit: self.last_digit });
        }
        guesser
    }
}

fn print_path(path: &[Move]) {
    println!("Solution ({} moves): {}", path.len(), path.iter().join(", "));
}

fn solve_full(puzzle: &Puzzle<ROWS, COLS>, max_moves: Option<usize>) {
    let limits = SearchLimits { max_moves, slack: 0 };
    match search(*puzzle.init(), &puzzle.full(), limits) {
        Ok(solution) => print_path(&solution.path),
        Err(failure) => {
            info!(%failure, "search failed");
            println!("No solution");
        }
    }
}

fn replay(puzzle: &Puzzle<ROWS, COLS>, path: &[Move], pause: bool) -> Result<()> {
    let mut stdin = io::stdin().lock();
    println!("Start:\n{}", puzzle.init());
    for (step, (mv, grid)) in Replay::new(*puzzle.init(), path).enumerate() {
        if pause {
            stdin.read_line(&mut String::new())?;
        }
        println!("Move {} of {}: {mv}\n{grid}", step + 1, path.len());
    }

    let end = puzzle.init().apply(path);
    println!("{}", if puzzle.is_solved(&end) { "Solved" } else { "Not solved" });
    Ok(())
}

fn finish_session(result: Result<impl std::fmt::Debug, SourceError>) -> Result<()> {
    match result {
        Ok(outcome) => {
            info!(?outcome, "session over");
            Ok(())
        }
        Err(SourceError::Closed) => Ok(()),
        Err(error) => Err(error.into()),
    }
}

fn dispatch(mode: Mode) -> Result<()> {
    match mode {
        Mode::Full { puzzle, max_moves } => {
            let Instance { puzzle, .. } = puzzle.load()?;
            solve_full(&puzzle, max_moves);
        }
        Mode::Staged { puzzle, lock_through, slack, max_moves, exhaustive, limit, log } => {
            let Instance { puzzle, .. } = puzzle.load()?;
            let plan = StagePlan::incremental(&puzzle, lock_through, SearchLimits { max_moves, slack });
            info!(cutoffs = ?plan.cutoffs(), "staged solve");
            let mut solver = StagedSolver::new(&puzzle, plan);

            if exhaustive {
                let mut solutions = SolutionLog::append_to(&log)
                    .with_context(|| format!("failed to open {}", log.display()))?;
                match solver.solve_exhaustive(*puzzle.init(), limit, &mut solutions) {
                    Ok(summary) => {
                        println!("Found {} complete paths", summary.complete);
                        if let Some(shortest) = summary.shortest {
                            print_path(&shortest);
                        }
                    }
                    Err(ExhaustiveError::Unsolved(failure)) => {
                        info!(%failure, "staged solve failed");
                        println!("No solution");
                    }
                    Err(error @ ExhaustiveError::Log(_)) => {
                        return Err(error).with_context(|| format!("solutions in {} are incomplete", log.display()));
                    }
                }
            } else {
                match solver.solve(*puzzle.init()) {
                    Ok(path) => print_path(&path),
                    Err(failure) => {
                        info!(%failure, "staged solve failed");
                        println!("No solution");
                    }
                }
            }
            info!(cached = solver.cache().len(), hits = solver.cache().hits(), "stage cache");
        }
        Mode::Replay { puzzle, moves, pause } => {
            let Instance { puzzle, best_known } = puzzle.load()?;
            let path = if moves.is_empty() {
                best_known.context("no moves given and the instance records no best known solution")?
            } else {
                parse_path::<ROWS, COLS>(&moves)?
            };
            replay(&puzzle, &path, pause)?;
        }
        Mode::Scramble { puzzle, steps, seed } => {
            let Instance { puzzle, .. } = puzzle.load()?;
            let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let (start, moves) = scramble(*puzzle.goal(), steps, &mut rng);
            println!("Scrambled with {}:\n{start}", moves.iter().join(", "));
            solve_full(&puzzle.restarted_from(start), None);
        }
        Mode::Clicks { puzzle, moves, pixel_dist } => {
            let Instance { best_known, .. } = puzzle.load()?;
            let path = if moves.is_empty() {
                best_known.context("no moves given and the instance records no best known solution")?
            } else {
                parse_path::<ROWS, COLS>(&moves)?
            };
            for (mv, (dx, dy)) in path.iter().zip(cursor_offsets::<ROWS, COLS>(&path, pixel_dist)) {
                println!("{mv}: {dx} {dy}");
            }
        }
        Mode::Manual { code } => {
            let mut guesser = code.guesser();
            let mut source = ManualSource(Prompter::new(io::stdin().lock(), io::stdout()));
            finish_session(solve_loop(&mut guesser, &mut source, &mut io::stdout()))?;
        }
        Mode::Auto { code } => {
            let mut guesser = code.guesser();
            let mut source = AutomaticSource(Prompter::new(io::stdin().lock(), io::stdout()));
            finish_session(solve_loop(&mut guesser, &mut source, &mut io::stdout()))?;
        }
        Mode::Monitor { trace, timeout, code } => {
            let file = File::open(&trace).with_context(|| format!("failed to open {}", trace.display()))?;
            let mut guesser = code.guesser();
            let summary = run_monitor(BufReader::new(file), &mut guesser, timeout, &mut io::stdout())?;
            println!("{} responses read, {} codes solved", summary.responses, summary.solved.len());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    dispatch(cli.mode)
}
