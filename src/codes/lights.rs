use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::codes::code::{Feedback, Mark, CODE_LEN};

/// A lit green light.
pub const ON: char = '1';
/// A lit red light.
pub const OFF: char = '0';
/// A dark light.
pub const DARK: char = 'x';

/// Frames to wait for a second flash that may never come. Frames are numbered in milliseconds during live capture.
pub const FRAME_TIMEOUT: u64 = 400;

/// Light states remembered, oldest first.
pub const HISTORY_CAP: usize = 500;

/// What the panel shows while a code is typed in, one more red light per key.
pub const ENTRY_SEQUENCE: [&str; CODE_LEN + 1] = ["xxxx", "0xxx", "00xx", "000x", "0000"];

/// Flashes that do not spell out a response.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FlashError {
    /// A light showed a combination with no meaning, such as green then red.
    #[error("flash pair {first:?}/{second:?} has no meaning")]
    UnknownPair {
        /// The light in the first flash.
        first: char,
        /// The light in the second flash.
        second: char,
    },
    /// A flash did not show exactly one state per digit.
    #[error("flashes {first:?} and {second:?} do not show 4 lights each")]
    WrongLength {
        /// The first flash.
        first: String,
        /// The second flash.
        second: String,
    },
}

/// Where the decoder is in the cycle of typing a code and reading its response.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// No code entry seen yet.
    #[default]
    Idle,
    /// This many keys have been typed in.
    Entered(usize),
    /// The first flash is showing.
    FirstFlash,
    /// Both flashes seen, waiting for the panel to go dark.
    SecondFlash,
    /// The panel went dark after a response.
    Resetting,
}

/// Turns a stream of light states into responses.
///
/// After a code is entered the panel flashes twice. A light lit the same way in both flashes is a correct or wrong
/// digit, and a light that is green in one flash and dark in the other is a partial one.
#[derive(Clone, Debug)]
pub struct FlashDecoder {
    history: VecDeque<String>,
    mode: Mode,
    last_frame: u64,
    flashes: Vec<String>,
    last_response: Option<Feedback>,
    timeout: u64,
}

impl Default for FlashDecoder {
    fn default() -> Self {
        Self::new(FRAME_TIMEOUT)
    }
}

fn merge_pair(first: char, second: char) -> Result<Mark, FlashError> {
    match (first, second) {
        (ON, ON) => Ok(Mark::Correct),
        (OFF, OFF) => Ok(Mark::Wrong),
        (ON, DARK) | (DARK, ON) => Ok(Mark::Partial),
        (OFF, DARK) | (DARK, OFF) => {
            warn!("red light paired with a dark one, reading it as wrong");
            Ok(Mark::Wrong)
        }
        _ => Err(FlashError::UnknownPair { first, second }),
    }
}

impl FlashDecoder {
    /// A decoder treating frames `timeout` apart as distinct even when they look the same.
    pub fn new(timeout: u64) -> Self {
        Self {
            history: VecDeque::new(),
            mode: Mode::Idle,
            last_frame: 0,
            flashes: Vec::new(),
            last_response: None,
            timeout,
        }
    }

    /// The current state.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The most recently recorded light state.
    pub fn last_state(&self) -> Option<&str> {
        self.history.back().map(String::as_str)
    }

    /// The response shown by the two flashes, once both have been seen.
    pub fn response(&self) -> Result<Option<Feedback>, FlashError> {
        let [first, second] = self.flashes.as_slice() else {
            return Ok(None);
        };
        if !matches!(self.mode, Mode::SecondFlash | Mode::Resetting) {
            return Ok(None);
        }

        let marks = first.chars().zip(second.chars())
            .map(|(a, b)| merge_pair(a, b))
            .collect::<Result<Vec<_>, _>>()?;
        let marks = <[Mark; CODE_LEN]>::try_from(marks)
            .map_err(|_| FlashError::WrongLength { first: first.clone(), second: second.clone() })?;
        Ok(Some(Feedback(marks)))
    }

    fn entered_keys(&self) -> Option<usize> {
        (1..ENTRY_SEQUENCE.len()).find(|keys| {
            let expected = &ENTRY_SEQUENCE[..=*keys];
            self.history.len() >= expected.len()
                && self.history.iter().skip(self.history.len() - expected.len()).zip(expected).all(|(seen, want)| seen.as_str() == *want)
        })
    }

    /// Record the light state seen on `frame`. Returns each new response exactly once.
    ///
    /// A repeat of the previous state is ignored, unless the decoder has been waiting on a flash for at least the
    /// timeout, in which case the repeat counts as the next flash.
    pub fn update(&mut self, state: &str, frame: u64) -> Result<Option<Feedback>, FlashError> {
        if self.last_state() == Some(state) {
            let waiting = matches!(self.mode, Mode::FirstFlash | Mode::Entered(CODE_LEN));
            if !waiting || frame.saturating_sub(self.last_frame) < self.timeout {
                return Ok(None);
            }
        }

        self.last_frame = frame;
        self.history.push_back(state.to_owned());
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        if let Some(keys) = self.entered_keys() {
            debug!(keys, "code entry");
            self.mode = Mode::Entered(keys);
        } else {
            match self.mode {
                Mode::Entered(CODE_LEN) => {
                    debug!(state, "first flash");
                    self.mode = Mode::FirstFlash;
                    self.flashes = vec![state.to_owned()];
                }
                Mode::FirstFlash => {
                    debug!(state, "second flash");
                    self.mode = Mode::SecondFlash;
                    self.flashes.push(state.to_owned());
                    self.last_response = None;
                }
                Mode::SecondFlash if state.is_empty() => {
                    debug!("resetting");
                    self.mode = Mode::Resetting;
                    self.flashes.clear();
                }
                _ => {}
            }
        }

        match self.response()? {
            Some(response) if self.last_response != Some(response) => {
                info!(%response, "new response");
                self.last_response = Some(response);
                Ok(Some(response))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut FlashDecoder, states: &[&str], start: u64) -> Vec<Result<Option<Feedback>, FlashError>> {
        states.iter()
            .enumerate()
            .map(|(i, state)| decoder.update(state, start + i as u64))
            .collect()
    }

    fn enter_code(decoder: &mut FlashDecoder, start: u64) {
        for result in feed(decoder, &ENTRY_SEQUENCE, start) {
            assert_eq!(result, Ok(None));
        }
        assert_eq!(decoder.mode(), Mode::Entered(CODE_LEN));
    }

    #[test]
    fn tracks_code_entry() {
        let mut decoder = FlashDecoder::default();
        decoder.update("xxxx", 0).unwrap();
        assert_eq!(decoder.mode(), Mode::Idle);
        decoder.update("0xxx", 1).unwrap();
        assert_eq!(decoder.mode(), Mode::Entered(1));
        decoder.update("00xx", 2).unwrap();
        assert_eq!(decoder.mode(), Mode::Entered(2));
    }

    #[test]
    fn merges_two_flashes_once() {
        let mut decoder = FlashDecoder::default();
        enter_code(&mut decoder, 0);
        assert_eq!(decoder.update("1x10", 10), Ok(None));
        assert_eq!(decoder.mode(), Mode::FirstFlash);
        let response = decoder.update("1110", 11).unwrap();
        assert_eq!(response.map(|response| response.to_string()), Some("cpcw".to_owned()));
        // the same response is never reported twice
        assert_eq!(decoder.update("", 12), Ok(None));
        assert_eq!(decoder.mode(), Mode::Resetting);
    }

    #[test]
    fn duplicate_frames_are_ignored_until_timeout() {
        let mut decoder = FlashDecoder::new(100);
        enter_code(&mut decoder, 0);
        decoder.update("1111", 10).unwrap();
        assert_eq!(decoder.update("1111", 50), Ok(None));
        assert_eq!(decoder.mode(), Mode::FirstFlash);
        // no second flash arrived: the repeat stands in for it
        let response = decoder.update("1111", 110).unwrap();
        assert_eq!(response, Some(Feedback::SOLVED));
    }

    #[test]
    fn red_and_dark_reads_as_wrong() {
        let mut decoder = FlashDecoder::default();
        enter_code(&mut decoder, 0);
        decoder.update("0x00", 10).unwrap();
        let response = decoder.update("x000", 11).unwrap();
        assert_eq!(response.map(|response| response.to_string()), Some("wwww".to_owned()));
    }

    #[test]
    fn unknown_pairs_ask_for_a_retry() {
        let mut decoder = FlashDecoder::default();
        enter_code(&mut decoder, 0);
        decoder.update("10xx", 10).unwrap();
        assert_eq!(decoder.update("01xx", 11), Err(FlashError::UnknownPair { first: '1', second: '0' }));
    }

    #[test]
    fn history_is_capped() {
        let mut decoder = FlashDecoder::default();
        for frame in 0..(HISTORY_CAP as u64 + 20) {
            let state = if frame % 2 == 0 { "xxxx" } else { "x1xx" };
            decoder.update(state, frame).unwrap();
        }
        assert_eq!(decoder.history.len(), HISTORY_CAP);
    }
}
