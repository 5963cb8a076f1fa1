use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use strum::VariantArray;

/// Number of digits in a code.
pub const CODE_LEN: usize = 4;

/// One digit of a code.
pub type Digit = u8;

/// Digits a code may contain. There is no zero key.
pub const DIGITS: std::ops::RangeInclusive<Digit> = 1..=9;

/// Why a code or a response could not be read.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Not exactly four characters.
    #[error("expected 4 characters, got {0}")]
    WrongLength(usize),
    /// A character of a code is not a key on the phone.
    #[error("{0:?} is not a digit from 1 to 9")]
    InvalidDigit(char),
    /// A character of a response is not a mark.
    #[error("{0:?} is not one of w, p or c")]
    InvalidMark(char),
}

/// A guess, or a possible solution.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Code(pub [Digit; CODE_LEN]);

impl Code {
    /// Every code, in lexicographic order.
    pub fn universe() -> Vec<Code> {
        (0..CODE_LEN)
            .map(|_| DIGITS)
            .multi_cartesian_product()
            .filter_map(|digits| <[Digit; CODE_LEN]>::try_from(digits).ok())
            .map(Code)
            .collect()
    }

    /// The digits, first to last.
    pub fn digits(&self) -> &[Digit; CODE_LEN] {
        &self.0
    }

    /// Whether `digit` appears anywhere in the code.
    pub fn contains(&self, digit: Digit) -> bool {
        self.0.contains(&digit)
    }
}

impl FromStr for Code {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars = s.trim().chars().collect_vec();
        if chars.len() != CODE_LEN {
            return Err(ParseError::WrongLength(chars.len()));
        }

        let mut digits = [0; CODE_LEN];
        for (slot, ch) in digits.iter_mut().zip(chars) {
            *slot = ch.to_digit(10)
                .and_then(|digit| Digit::try_from(digit).ok())
                .filter(|digit| DIGITS.contains(digit))
                .ok_or(ParseError::InvalidDigit(ch))?;
        }
        Ok(Self(digits))
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|digit| write!(f, "{digit}"))
    }
}

/// The light shown for one digit of a guess.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
pub enum Mark {
    /// The digit is nowhere in the solution.
    #[strum(serialize = "w")]
    Wrong,
    /// The digit is in the solution, somewhere else.
    #[strum(serialize = "p")]
    Partial,
    /// The digit is in place.
    #[strum(serialize = "c")]
    Correct,
}

/// One mark per digit of the guess, in guess order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Feedback(pub [Mark; CODE_LEN]);

impl Feedback {
    /// Number of distinct feedback patterns.
    pub const PATTERNS: usize = 3usize.pow(CODE_LEN as u32);

    /// Every digit in place.
    pub const SOLVED: Self = Self([Mark::Correct; CODE_LEN]);

    /// Whether this is [`Self::SOLVED`].
    pub fn is_solved(&self) -> bool {
        *self == Self::SOLVED
    }

    /// A dense index in `0..PATTERNS`, for bucketing.
    pub fn bucket(&self) -> usize {
        self.0.iter().fold(0, |index, mark| {
            let digit = Mark::VARIANTS.iter().position(|variant| variant == mark).unwrap_or(0);
            index * Mark::VARIANTS.len() + digit
        })
    }
}

impl FromStr for Feedback {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars = s.trim().chars().collect_vec();
        if chars.len() != CODE_LEN {
            return Err(ParseError::WrongLength(chars.len()));
        }

        let mut marks = [Mark::Wrong; CODE_LEN];
        for (slot, ch) in marks.iter_mut().zip(chars) {
            *slot = Mark::from_str(ch.encode_utf8(&mut [0; 4])).map_err(|_| ParseError::InvalidMark(ch))?;
        }
        Ok(Self(marks))
    }
}

impl Display for Feedback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|mark| write!(f, "{mark}"))
    }
}

/// The feedback the game shows for `guess` when the answer is `solution`.
///
/// A digit that is not in place is marked partial whenever it appears anywhere in the solution, even if another
/// digit of the guess already accounts for that occurrence.
pub fn feedback(guess: Code, solution: Code) -> Feedback {
    let mut marks = [Mark::Wrong; CODE_LEN];
    for ((mark, g), s) in marks.iter_mut().zip(guess.0).zip(solution.0) {
        *mark = if g == s {
            Mark::Correct
        } else if solution.contains(g) {
            Mark::Partial
        } else {
            Mark::Wrong
        };
    }
    Feedback(marks)
}
