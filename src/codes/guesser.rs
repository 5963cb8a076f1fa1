use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use tracing::{debug, info};

use crate::codes::code::{feedback, Code, Digit, Feedback, CODE_LEN};

/// Prior knowledge about the solution, applied on top of the feedback received.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Constraint {
    /// No digit appears twice.
    DistinctDigits,
    /// The digit at `position` (counting from zero) is known.
    DigitAt {
        /// Zero-based position in the code.
        position: usize,
        /// The digit found there.
        digit: Digit,
    },
}

impl Constraint {
    /// The setup of the phone in the museum: distinct digits, the last of which is always 9.
    pub fn museum_defaults() -> Vec<Constraint> {
        vec![Constraint::DigitAt { position: CODE_LEN - 1, digit: 9 }, Constraint::DistinctDigits]
    }

    /// Whether `code` satisfies this constraint.
    pub fn accepts(&self, code: &Code) -> bool {
        match self {
            Self::DistinctDigits => {
                let digits = code.digits();
                (0..CODE_LEN).all(|i| !digits[i + 1..].contains(&digits[i]))
            }
            Self::DigitAt { position, digit } => code.digits().get(*position) == Some(digit),
        }
    }
}

/// One guess and the feedback it got.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Round {
    /// The code entered.
    pub guess: Code,
    /// The marks it lit up.
    pub response: Feedback,
}

/// Every code of `universe` consistent with each round of `history` and accepted by each constraint,
/// in universe order.
pub fn candidates(universe: &[Code], history: &[Round], constraints: &[Constraint]) -> Vec<Code> {
    universe.iter()
        .filter(|code| history.iter().all(|round| feedback(round.guess, **code) == round.response))
        .filter(|code| constraints.iter().all(|constraint| constraint.accepts(code)))
        .copied()
        .collect()
}

/// Size of the largest group `candidates` splits into by the feedback `guess` would get.
pub fn worst_case(guess: Code, candidates: &[Code]) -> usize {
    let mut buckets = [0usize; Feedback::PATTERNS];
    for candidate in candidates {
        buckets[feedback(guess, *candidate).bucket()] += 1;
    }
    buckets.into_iter().max().unwrap_or(0)
}

/// The guess from `universe` leaving the fewest candidates in the worst case.
///
/// Ties go to guesses that could still be the solution, then to the earliest in `universe`.
/// A lone candidate is returned directly; no candidates means there is nothing sensible to guess.
pub fn best_guess(universe: &[Code], candidates: &[Code]) -> Option<Code> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => {
            let live: HashSet<&Code> = candidates.iter().collect();
            universe.iter()
                .enumerate()
                .min_by_key(|(index, guess)| (worst_case(**guess, candidates), !live.contains(guess), *index))
                .map(|(_, guess)| *guess)
        }
    }
}

/// Candidate sets already derived, keyed by the history that produced them.
#[derive(Debug, Default)]
pub struct CandidateCache {
    entries: HashMap<Vec<Round>, Rc<[Code]>>,
}

impl CandidateCache {
    /// Number of histories with a stored candidate set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every stored candidate set.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Accumulates rounds of one code-breaking session and suggests what to guess next.
#[derive(Debug)]
pub struct Guesser {
    universe: Vec<Code>,
    constraints: Vec<Constraint>,
    history: Vec<Round>,
    openers: Vec<Code>,
    pending_openers: VecDeque<Code>,
    cache: CandidateCache,
}

impl Default for Guesser {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Guesser {
    /// A guesser which plays `openers` in order before it starts choosing guesses itself.
    pub fn new(openers: Vec<Code>) -> Self {
        Self {
            universe: Code::universe(),
            constraints: Vec::new(),
            history: Vec::new(),
            pending_openers: openers.iter().copied().collect(),
            openers,
            cache: CandidateCache::default(),
        }
    }

    /// A guesser set up for the museum phone: opening with 1234 under [`Constraint::museum_defaults`].
    pub fn museum() -> Self {
        let mut guesser = Self::new(vec![Code([1, 2, 3, 4])]);
        for constraint in Constraint::museum_defaults() {
            guesser.add_constraint(constraint);
        }
        guesser
    }

    /// Narrow every later candidate set by `constraint`.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
        self.cache.clear();
    }

    /// Constraints added so far.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Every code, in the order guesses are tie-broken by.
    pub fn universe(&self) -> &[Code] {
        &self.universe
    }

    /// Rounds recorded this session, oldest first.
    pub fn history(&self) -> &[Round] {
        &self.history
    }

    /// Candidate sets derived so far.
    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    /// Add a round to the history.
    pub fn record(&mut self, guess: Code, response: Feedback) {
        self.history.push(Round { guess, response });
    }

    /// Codes still consistent with everything recorded so far.
    pub fn candidates(&mut self) -> Rc<[Code]> {
        if let Some(known) = self.cache.entries.get(&self.history) {
            return known.clone();
        }

        let found: Rc<[Code]> = candidates(&self.universe, &self.history, &self.constraints).into();
        debug!(rounds = self.history.len(), candidates = found.len(), "derived candidates");
        self.cache.entries.insert(self.history.clone(), found.clone());
        found
    }

    /// The next guess to play, without committing to it.
    pub fn peek_best_guess(&mut self) -> Option<Code> {
        if let Some(opener) = self.pending_openers.front() {
            return Some(*opener);
        }
        let candidates = self.candidates();
        best_guess(&self.universe, &candidates)
    }

    /// The next guess to play. Opening guesses are used up by this.
    pub fn consume_best_guess(&mut self) -> Option<Code> {
        if let Some(opener) = self.pending_openers.pop_front() {
            info!(%opener, "playing opening guess");
            return Some(opener);
        }
        let candidates = self.candidates();
        best_guess(&self.universe, &candidates)
    }

    /// Start a new session: forget every round and queue the opening guesses again. Constraints stay.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pending_openers = self.openers.iter().copied().collect();
    }
}
