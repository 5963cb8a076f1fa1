use std::io::{self, BufRead, Write};
use std::str::FromStr;

use tracing::{info, warn};

use crate::codes::code::Code;
use crate::codes::guesser::Guesser;
use crate::codes::lights::{FlashDecoder, ENTRY_SEQUENCE};

/// One captured frame: a timestamp in milliseconds and the light state classified from it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// Capture time of the frame.
    pub millis: u64,
    /// One of [`ON`](crate::codes::lights::ON), [`OFF`](crate::codes::lights::OFF) or
    /// [`DARK`](crate::codes::lights::DARK) per light, empty when the panel is off.
    pub lights: String,
}

/// Why a trace line is not a [`Frame`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// The line does not start with a timestamp in milliseconds.
    #[error("missing or malformed timestamp")]
    BadTimestamp,
    /// Something follows the light state.
    #[error("unexpected fields after the light state")]
    TrailingFields,
}

/// Why a monitoring session stopped.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// A line of the trace could not be read as a frame.
    #[error("line {line}: expected `<millis> <lights>`")]
    BadFrame {
        /// One-based line number in the trace.
        line: usize,
        /// What is wrong with the line.
        #[source]
        source: FrameError,
    },
    /// Reading the trace or writing suggestions failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let millis = fields.next()
            .and_then(|millis| millis.parse().ok())
            .ok_or(FrameError::BadTimestamp)?;
        // no lights at all is a valid state
        let lights = fields.next().unwrap_or_default().to_owned();
        if fields.next().is_some() {
            return Err(FrameError::TrailingFields);
        }
        Ok(Self { millis, lights })
    }
}

/// What a monitoring session saw.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// Responses decoded.
    pub responses: usize,
    /// Codes solved, in order.
    pub solved: Vec<Code>,
}

/// Follow a trace of frames, feeding every decoded response to `guesser` against the guess it suggested,
/// and write the next suggestion to `out` each time.
///
/// After a solved code the session starts over. Blank lines and lines starting with `#` are skipped.
pub fn run_monitor<R, W>(trace: R, guesser: &mut Guesser, timeout: u64, out: &mut W) -> Result<Summary, MonitorError>
where
    R: BufRead,
    W: Write,
{
    let mut decoder = FlashDecoder::new(timeout);
    let mut summary = Summary::default();
    let mut suggested = false;

    for (index, line) in trace.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let frame: Frame = line.parse().map_err(|source| MonitorError::BadFrame { line: index + 1, source })?;

        let response = match decoder.update(&frame.lights, frame.millis) {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, millis = frame.millis, "could not read the flashes, waiting for the next ones");
                continue;
            }
        };

        let Some(response) = response else {
            if !suggested && guesser.history().is_empty() && decoder.last_state() == Some(ENTRY_SEQUENCE[0]) {
                if let Some(first) = guesser.peek_best_guess() {
                    writeln!(out, "Guess: {first}")?;
                    suggested = true;
                }
            }
            continue;
        };

        summary.responses += 1;
        let Some(guess) = guesser.consume_best_guess() else {
            writeln!(out, "No solution, starting over")?;
            guesser.reset();
            decoder = FlashDecoder::new(timeout);
            suggested = false;
            continue;
        };
        guesser.record(guess, response);
        writeln!(out, ">>> Adding guess {guess}/{response}")?;

        if response.is_solved() {
            info!(%guess, "code solved");
            writeln!(out, "Solved, congrats!")?;
            summary.solved.push(guess);
            guesser.reset();
            decoder = FlashDecoder::new(timeout);
            suggested = false;
            continue;
        }

        let remaining = guesser.candidates().len();
        match guesser.peek_best_guess() {
            Some(next) if remaining == 1 => writeln!(out, "Solution: {next}")?,
            Some(next) => writeln!(out, "Guess: {next} ({remaining} candidates)")?,
            None => writeln!(out, "No solution")?,
        }
        suggested = true;
    }

    Ok(summary)
}
