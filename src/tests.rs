#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use itertools::Itertools;
    use rstest::rstest;

    use crate::builder::PuzzleBuilder;
    use crate::codes::{best_guess, candidates, feedback, worst_case, Code, Constraint, Feedback, Guesser, Round};
    use crate::config::{load_instance, Instance};
    use crate::grid::Move;
    use crate::puzzle::ADMISSIBLE_WEIGHT;
    use crate::replay::Replay;
    use crate::search::{search, SearchLimits};
    use crate::staged::{StagePlan, StagedSolver};

    fn museum() -> Instance<5, 5> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("puzzles/museum_tiles.json");
        load_instance(&path).unwrap()
    }

    fn code(s: &str) -> Code {
        s.parse().unwrap()
    }

    #[test]
    fn best_known_solution_replays() {
        let Instance { puzzle, best_known } = museum();
        let best_known = best_known.unwrap();

        let mut replay = Replay::new(*puzzle.init(), &best_known);
        let (last_move, last) = replay.by_ref().last().unwrap();
        assert_eq!(Some(&last_move), best_known.last());
        assert_eq!(replay.current(), &last);
        assert!(puzzle.is_solved(&last));
        assert!(!puzzle.is_solved(puzzle.init()));
    }

    #[test]
    fn museum_goal_solves_back_from_scramble() {
        let Instance { puzzle, .. } = museum();
        let scramble = [3, 7, 12, 0, 9].map(Move);
        let puzzle = puzzle.restarted_from(puzzle.goal().apply(&scramble));

        let solution = search(*puzzle.init(), &puzzle.full(), SearchLimits::default()).unwrap();
        assert!(puzzle.is_solved(&puzzle.init().apply(&solution.path)));
    }

    #[test]
    fn museum_goal_solves_back_in_stages() {
        let Instance { puzzle, .. } = museum();
        let scramble = [5, 10, 10, 1, 14, 6].map(Move);
        let puzzle = puzzle.restarted_from(puzzle.goal().apply(&scramble));

        let plan = StagePlan::incremental(&puzzle, 3, SearchLimits::default());
        let mut solver = StagedSolver::new(&puzzle, plan);
        let path = solver.solve(*puzzle.init()).unwrap();
        assert!(puzzle.solved_up_to(&puzzle.init().apply(&path), puzzle.last_rank()));
    }

    #[test]
    #[ignore = "searches the full museum board, takes minutes"]
    fn museum_full_search() {
        let Instance { puzzle, .. } = museum();
        let solution = search(*puzzle.init(), &puzzle.full(), SearchLimits::default()).unwrap();
        assert!(puzzle.solved_up_to(&puzzle.init().apply(&solution.path), puzzle.last_rank()));
    }

    #[test]
    fn staged_solve_with_holes() {
        let puzzle = PuzzleBuilder::<3, 3>::new()
            .init_rows(&[vec![6, 1, 2], vec![-1, 4, 3], vec![0, 7, 5]])
            .goal_rows(&[vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, -1]])
            .heuristic_weight(ADMISSIBLE_WEIGHT)
            .build()
            .unwrap();
        let plan = StagePlan::new(vec![2, puzzle.last_rank()], SearchLimits { max_moves: None, slack: 1 }).unwrap();
        let mut solver = StagedSolver::new(&puzzle, plan);
        let path = solver.solve(*puzzle.init()).unwrap();

        let end = puzzle.init().apply(&path);
        assert!(puzzle.is_solved(&end));
        assert!(end.get(crate::Location(2, 2)).is_hole());
    }

    #[rstest]
    fn own_feedback_is_all_correct(#[values("1111", "1234", "9876", "5559", "2929")] input: &str) {
        assert_eq!(feedback(code(input), code(input)), Feedback::SOLVED);
    }

    #[test]
    fn every_code_matches_itself() {
        assert!(Code::universe().into_iter().all(|code| feedback(code, code).is_solved()));
    }

    #[test]
    fn candidates_never_grow() {
        let universe = Code::universe();
        let secret = code("4719");
        let mut history = Vec::new();
        let mut previous = candidates(&universe, &history, &[]);
        for guess in ["1234", "5678", "9999", "4179", "4719"] {
            let guess = code(guess);
            history.push(Round { guess, response: feedback(guess, secret) });
            let next = candidates(&universe, &history, &[]);
            assert!(next.iter().all(|candidate| previous.contains(candidate)));
            assert!(next.contains(&secret));
            previous = next;
        }
        assert_eq!(previous, vec![secret]);
    }

    #[test]
    fn minimax_splits_small_sets() {
        let universe = Code::universe();
        let remaining = [code("1234"), code("1243"), code("4321")];
        let chosen = best_guess(&universe, &remaining).unwrap();
        let best_candidate = remaining.iter().map(|guess| worst_case(*guess, &remaining)).min().unwrap();
        assert!(worst_case(chosen, &remaining) <= best_candidate);

        let pair = [code("1234"), code("4321")];
        assert_eq!(worst_case(code("1234"), &pair), 1);
        assert_eq!(best_guess(&universe, &pair), Some(code("1234")));
    }

    #[test]
    fn museum_phone_first_round() {
        let mut guesser = Guesser::new(Vec::new());
        guesser.add_constraint(Constraint::DistinctDigits);
        guesser.add_constraint(Constraint::DigitAt { position: 3, digit: 9 });
        guesser.record(code("1239"), "CPWC".parse().unwrap());

        let first = guesser.candidates();
        let again = guesser.candidates();
        assert_eq!(first, again);
        assert_eq!(first.iter().map(Code::to_string).collect_vec(), ["1429", "1529", "1629", "1729", "1829"]);

        let fresh = candidates(guesser.universe(), guesser.history(), guesser.constraints());
        assert_eq!(&*first, fresh.as_slice());
    }
}
