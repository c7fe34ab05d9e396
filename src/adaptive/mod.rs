// src/adaptive/mod.rs

//! Adaptive session controller.
//!
//! Decides which question a student is served next, when a session is
//! complete, and the difficulty-weighted final score. Every call is a pure
//! function of `(bank, answered, target_count)`; the caller owns all session
//! state between round trips.

mod scoring;
mod selection;
mod validation;

pub use scoring::{FinalScore, ScoringMode, compute_final_score, final_score};
pub use selection::{DifficultyLadder, SelectionStrategy};
pub use validation::{InvalidInput, validate_inputs};

use std::collections::HashSet;

use crate::models::question::{AnsweredQuestion, Question};

/// Outcome of one `select_next` call. Exactly one of the two is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionResult {
    /// Serve this question next. Never one that was already answered.
    Continue { question: Question },
    /// The session is over.
    Complete(FinalScore),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session input: {0}")]
    InvalidInput(#[from] InvalidInput),
}

/// Selects the next question using the default [`DifficultyLadder`] strategy.
pub fn select_next(
    bank: &[Question],
    answered: &[AnsweredQuestion],
    target_count: usize,
) -> Result<SessionResult, SessionError> {
    select_next_with(&DifficultyLadder, bank, answered, target_count)
}

/// Runs one step of the session state machine with a caller-supplied strategy.
///
/// The strategy only proposes an identifier. Anything it returns outside the
/// unanswered pool is discarded and the lowest unanswered identifier is
/// served instead.
pub fn select_next_with(
    strategy: &dyn SelectionStrategy,
    bank: &[Question],
    answered: &[AnsweredQuestion],
    target_count: usize,
) -> Result<SessionResult, SessionError> {
    validate_inputs(bank, answered, target_count)?;

    if answered.len() >= target_count {
        return Ok(SessionResult::Complete(final_score(answered, false)));
    }

    let answered_ids: HashSet<&str> = answered.iter().map(|a| a.id()).collect();
    let unanswered: Vec<&Question> = bank
        .iter()
        .filter(|q| !answered_ids.contains(q.id.as_str()))
        .collect();

    if unanswered.is_empty() {
        tracing::warn!(
            answered = answered.len(),
            target_count,
            "Question pool exhausted before target count, ending session early"
        );
        return Ok(SessionResult::Complete(final_score(answered, true)));
    }

    let proposed = strategy.choose(&unanswered, answered);
    let question = match proposed
        .as_deref()
        .and_then(|id| unanswered.iter().find(|q| q.id == id))
    {
        Some(q) => *q,
        None => {
            tracing::warn!(
                strategy = strategy.name(),
                proposed = ?proposed,
                "Strategy proposed no unanswered question, falling back to lowest identifier"
            );
            lowest_id(&unanswered)
        }
    };

    Ok(SessionResult::Continue {
        question: question.clone(),
    })
}

fn lowest_id<'a>(unanswered: &[&'a Question]) -> &'a Question {
    // Callers guarantee the pool is non-empty.
    unanswered
        .iter()
        .copied()
        .min_by(|a, b| a.id.cmp(&b.id))
        .unwrap_or(unanswered[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn question(id: &str, difficulty: u8) -> Question {
        Question {
            id: id.to_string(),
            content: format!("Question {}", id),
            answer: "A".to_string(),
            options: None,
            difficulty,
            tags: BTreeSet::new(),
            question_type: "short".to_string(),
        }
    }

    fn answered(q: &Question, correct: bool) -> AnsweredQuestion {
        AnsweredQuestion::new(q.clone(), if correct { "A" } else { "B" }, correct)
    }

    fn scenario_bank() -> Vec<Question> {
        vec![
            question("q1", 1),
            question("q2", 2),
            question("q3", 3),
            question("q4", 3),
            question("q5", 4),
            question("q6", 5),
        ]
    }

    fn served(result: SessionResult) -> Question {
        match result {
            SessionResult::Continue { question } => question,
            other => panic!("expected a question, got {:?}", other),
        }
    }

    #[test]
    fn test_first_question_is_median_with_lowest_id() {
        let bank = scenario_bank();
        let q = served(select_next(&bank, &[], 3).unwrap());
        assert_eq!(q.difficulty, 3);
        assert_eq!(q.id, "q3");
    }

    #[test]
    fn test_correct_answer_steps_up() {
        let bank = scenario_bank();
        let history = vec![answered(&bank[2], true)];
        let q = served(select_next(&bank, &history, 3).unwrap());
        assert_eq!(q.id, "q5");
        assert_eq!(q.difficulty, 4);
    }

    #[test]
    fn test_correct_answer_takes_closest_when_level_missing() {
        let bank = scenario_bank();
        let history = vec![answered(&bank[2], true), answered(&bank[4], true)];
        // Target 5 is still available.
        let q = served(select_next(&bank, &history, 4).unwrap());
        assert_eq!(q.difficulty, 5);

        let without_four: Vec<Question> =
            bank.iter().filter(|q| q.difficulty != 4).cloned().collect();
        let history = vec![answered(&without_four[2], true)];
        let q = served(select_next(&without_four, &history, 3).unwrap());
        assert_eq!(q.difficulty, 3, "closest to 4 among {{1,2,3,5}} ties 3 and 5");
    }

    #[test]
    fn test_incorrect_answer_steps_down() {
        let bank = scenario_bank();
        let history = vec![answered(&bank[2], false)];
        let q = served(select_next(&bank, &history, 3).unwrap());
        assert_eq!(q.difficulty, 2);
    }

    #[test]
    fn test_complete_when_target_reached() {
        let bank = vec![question("a", 2), question("b", 4), question("c", 5)];
        let history = vec![
            answered(&bank[0], true),
            answered(&bank[1], true),
            answered(&bank[2], false),
        ];
        match select_next(&bank, &history, 3).unwrap() {
            SessionResult::Complete(score) => {
                assert!((score.score - 54.545454).abs() < 0.01);
                assert!(!score.ended_early);
                assert_eq!(score.mode, ScoringMode::DifficultyWeighted);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_pool_exhausted_ends_early() {
        let bank = vec![question("only", 3)];
        let q = served(select_next(&bank, &[], 2).unwrap());
        assert_eq!(q.id, "only");

        let history = vec![answered(&q, true)];
        match select_next(&bank, &history, 2).unwrap() {
            SessionResult::Complete(score) => {
                assert!(score.ended_early);
                assert_eq!(score.score, 100.0);
            }
            other => panic!("expected early completion, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let bank = scenario_bank();
        assert_eq!(
            select_next(&[], &[], 1),
            Err(SessionError::InvalidInput(InvalidInput::EmptyBank))
        );
        assert_eq!(
            select_next(&bank, &[], 0),
            Err(SessionError::InvalidInput(InvalidInput::ZeroTargetCount))
        );
        let stranger = question("zz", 2);
        assert_eq!(
            select_next(&bank, &[answered(&stranger, true)], 3),
            Err(SessionError::InvalidInput(InvalidInput::UnknownQuestion(
                "zz".to_string()
            )))
        );
        let dup = vec![answered(&bank[0], true), answered(&bank[0], false)];
        assert_eq!(
            select_next(&bank, &dup, 3),
            Err(SessionError::InvalidInput(InvalidInput::DuplicateAnswer(
                "q1".to_string()
            )))
        );
    }

    struct Rogue(Option<&'static str>);

    impl SelectionStrategy for Rogue {
        fn name(&self) -> &'static str {
            "rogue"
        }

        fn choose(&self, _: &[&Question], _: &[AnsweredQuestion]) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_strategy_proposing_answered_question_falls_back() {
        let bank = scenario_bank();
        let history = vec![answered(&bank[0], true)];
        let q = served(select_next_with(&Rogue(Some("q1")), &bank, &history, 3).unwrap());
        assert_eq!(q.id, "q2");

        let q = served(select_next_with(&Rogue(None), &bank, &history, 3).unwrap());
        assert_eq!(q.id, "q2");

        let q = served(select_next_with(&Rogue(Some("q6")), &bank, &history, 3).unwrap());
        assert_eq!(q.id, "q6");
    }

    #[test]
    fn test_selection_is_deterministic() {
        let bank = scenario_bank();
        let history = vec![answered(&bank[2], true), answered(&bank[4], false)];
        let first = select_next(&bank, &history, 5).unwrap();
        for _ in 0..10 {
            assert_eq!(select_next(&bank, &history, 5).unwrap(), first);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Banks of unique ids in shuffled order, difficulties including the unrated 0.
        fn any_bank() -> impl Strategy<Value = Vec<Question>> {
            prop::collection::btree_map("[a-z0-9]{1,6}", 0u8..=5, 1..12)
                .prop_map(|levels| {
                    levels
                        .into_iter()
                        .map(|(id, difficulty)| question(&id, difficulty))
                        .collect::<Vec<_>>()
                })
                .prop_shuffle()
        }

        /// Drives a whole session, grading the n-th served question with `verdicts[n]`.
        fn run(
            bank: &[Question],
            verdicts: &[bool],
            target: usize,
        ) -> (Vec<AnsweredQuestion>, FinalScore) {
            let mut history = Vec::new();
            loop {
                assert!(history.len() <= bank.len(), "session outlived its bank");
                match select_next(bank, &history, target).unwrap() {
                    SessionResult::Continue { question } => {
                        let correct = verdicts[history.len() % verdicts.len()];
                        history.push(answered(&question, correct));
                    }
                    SessionResult::Complete(score) => return (history, score),
                }
            }
        }

        proptest! {
            #[test]
            fn test_sessions_terminate_without_repeats(
                bank in any_bank(),
                verdicts in prop::collection::vec(any::<bool>(), 1..16),
                target in 1usize..16,
            ) {
                let (history, score) = run(&bank, &verdicts, target);

                let ids: HashSet<&str> = history.iter().map(|a| a.id()).collect();
                prop_assert_eq!(ids.len(), history.len());
                prop_assert_eq!(history.len(), target.min(bank.len()));
                prop_assert_eq!(score.ended_early, target > bank.len());
                prop_assert!((0.0..=100.0).contains(&score.score));
            }

            #[test]
            fn test_sessions_are_deterministic(
                bank in any_bank(),
                verdicts in prop::collection::vec(any::<bool>(), 1..16),
                target in 1usize..16,
            ) {
                let (history, score) = run(&bank, &verdicts, target);
                prop_assert_eq!(run(&bank, &verdicts, target), (history.clone(), score));

                // Bank order is irrelevant, only ids and difficulties matter.
                let mut sorted = bank.clone();
                sorted.sort_by(|a, b| a.id.cmp(&b.id));
                let (replayed, _) = run(&sorted, &verdicts, target);
                let served: Vec<&str> = history.iter().map(|a| a.id()).collect();
                let reserved: Vec<&str> = replayed.iter().map(|a| a.id()).collect();
                prop_assert_eq!(served, reserved);

                for n in 0..history.len() {
                    let prefix = &history[..n];
                    prop_assert_eq!(
                        select_next(&bank, prefix, target).unwrap(),
                        select_next(&bank, prefix, target).unwrap()
                    );
                }
            }

            #[test]
            fn test_correcting_one_answer_raises_the_score(
                bank in any_bank(),
                verdicts in prop::collection::vec(any::<bool>(), 1..16),
                target in 1usize..16,
                pick in any::<prop::sample::Index>(),
            ) {
                let (history, _) = run(&bank, &verdicts, target);
                let wrong: Vec<usize> = (0..history.len())
                    .filter(|&i| !history[i].is_correct)
                    .collect();
                prop_assume!(!wrong.is_empty());

                let flipped_at = wrong[pick.index(wrong.len())];
                let mut improved = history.clone();
                improved[flipped_at].is_correct = true;

                let before = compute_final_score(&history);
                let after = compute_final_score(&improved);
                prop_assert!((0.0..=100.0).contains(&after));

                let total: u32 = history.iter().map(|a| u32::from(a.difficulty())).sum();
                if history[flipped_at].difficulty() > 0 || total == 0 {
                    prop_assert!(after > before, "{} -> {}", before, after);
                } else {
                    // An unrated question carries no weight.
                    prop_assert!(after >= before);
                }
            }
        }
    }
}
