use std::io::{self, BufRead, Write};
use std::str::FromStr;

use itertools::Itertools;
use tracing::warn;

use crate::codes::code::{Code, Feedback, ParseError};
use crate::codes::guesser::{Guesser, Round};

/// Remaining candidates are listed in full below this count.
pub const LIST_BELOW: usize = 100;

/// Why a solve loop stopped early.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The player closed the input.
    #[error("input closed")]
    Closed,
    /// The guesser had nothing left to suggest.
    #[error("no candidates left to guess from")]
    NoGuess,
    /// Reading or writing the console failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How a solve loop ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Exactly one code fits.
    Solved(Code),
    /// No code fits the responses given, so one of them was mistyped.
    Contradiction,
}

/// Supplies the guess made and the response it got, one round at a time.
pub trait DataSource {
    /// The next guess and its response. `guesser` may be asked for a suggestion.
    fn next_round(&mut self, guesser: &mut Guesser) -> Result<Round, SourceError>;
}

/// Line-based questions with re-prompting on malformed answers.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Ask on `output`, read answers from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Write `line` as it is.
    pub fn say(&mut self, line: &str) -> Result<(), SourceError> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Ask `question` until the answer parses.
    pub fn ask<T: FromStr<Err = ParseError>>(&mut self, question: &str) -> Result<T, SourceError> {
        loop {
            write!(self.output, "{question} > ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(SourceError::Closed);
            }

            match line.parse() {
                Ok(answer) => return Ok(answer),
                Err(error) => {
                    warn!(input = line.trim(), %error, "rejected input");
                    writeln!(self.output, "{error}, try again")?;
                }
            }
        }
    }

    fn ask_response(&mut self) -> Result<Feedback, SourceError> {
        self.ask("Response? [wcp] (w)rong/(c)orrect/(p)artial")
    }
}

/// The player picks every guess and types it in along with the response.
pub struct ManualSource<R, W>(pub Prompter<R, W>);

impl<R: BufRead, W: Write> DataSource for ManualSource<R, W> {
    fn next_round(&mut self, _guesser: &mut Guesser) -> Result<Round, SourceError> {
        let guess = self.0.ask("Guess? [xxxx]")?;
        let response = self.0.ask_response()?;
        Ok(Round { guess, response })
    }
}

/// The guesser picks every guess; the player only types in the response.
pub struct AutomaticSource<R, W>(pub Prompter<R, W>);

impl<R: BufRead, W: Write> DataSource for AutomaticSource<R, W> {
    fn next_round(&mut self, guesser: &mut Guesser) -> Result<Round, SourceError> {
        let guess = guesser.consume_best_guess().ok_or(SourceError::NoGuess)?;
        self.0.say(&format!("Guess: {guess}"))?;
        let response = self.0.ask_response()?;
        Ok(Round { guess, response })
    }
}

/// Play rounds from `source` until a single candidate remains or none do, reporting progress to `out`.
pub fn solve_loop<S, W>(guesser: &mut Guesser, source: &mut S, out: &mut W) -> Result<Outcome, SourceError>
where
    S: DataSource,
    W: Write,
{
    loop {
        let candidates = guesser.candidates();
        writeln!(out, "Found {} candidates", candidates.len())?;

        match *candidates {
            [] => {
                writeln!(out, "No solution")?;
                return Ok(Outcome::Contradiction);
            }
            [solution] => {
                writeln!(out, "Found solution: {solution}")?;
                return Ok(Outcome::Solved(solution));
            }
            _ if candidates.len() < LIST_BELOW => {
                writeln!(out, "Current candidates:")?;
                writeln!(out, "{}", candidates.iter().join(" "))?;
            }
            _ => {}
        }
        writeln!(out)?;

        let Round { guess, response } = source.next_round(guesser)?;
        guesser.record(guess, response);
    }
}
