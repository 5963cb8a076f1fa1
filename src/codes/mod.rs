//! Breaking the four digit code of the museum phone.
//!
//! Every guess lights up one mark per digit: [`Correct`](code::Mark::Correct) when it is in place,
//! [`Partial`](code::Mark::Partial) when it is elsewhere in the code, and [`Wrong`](code::Mark::Wrong) otherwise.
//! A [`Guesser`] keeps every code still consistent with the marks seen so far and picks the guess whose worst
//! outcome leaves the fewest of them.
//!
//! Responses come from a person typing them in ([`source`]) or from the panel's flashing lights ([`lights`],
//! [`monitor`]).

pub use code::{feedback, Code, Feedback, Mark, ParseError};
pub use guesser::{best_guess, candidates, worst_case, Constraint, Guesser, Round};

/// Codes, marks and the feedback rule.
pub mod code;
/// Candidate filtering and minimax guess selection.
pub mod guesser;
/// Reading responses off the panel's flashing lights.
pub mod lights;
/// Following a recorded trace of panel frames.
pub mod monitor;
/// Interactive sessions on a console.
pub mod source;
