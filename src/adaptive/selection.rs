// src/adaptive/selection.rs

use crate::models::question::{AnsweredQuestion, MAX_DIFFICULTY, MIN_DIFFICULTY, Question};

/// Picks the next question out of the unanswered pool.
///
/// Implementations propose an identifier; the controller verifies it before
/// serving. `unanswered` is never empty and keeps bank order.
pub trait SelectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn choose(&self, unanswered: &[&Question], answered: &[AnsweredQuestion]) -> Option<String>;
}

/// Deterministic difficulty ladder.
///
/// Opens at the median difficulty of the pool, then moves one level up after
/// a correct answer and one level down after an incorrect one, taking the
/// closest available difficulty when the exact level is gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifficultyLadder;

impl SelectionStrategy for DifficultyLadder {
    fn name(&self) -> &'static str {
        "difficulty_ladder"
    }

    fn choose(&self, unanswered: &[&Question], answered: &[AnsweredQuestion]) -> Option<String> {
        let picked = match answered.last() {
            None => opening_question(unanswered),
            Some(last) => {
                let target = next_target(last);
                let mean = mean_correct_difficulty(answered);
                closest_to(unanswered, target, mean)
            }
        };
        picked.map(|q| q.id.clone())
    }
}

/// Lowest-id question at the lower median difficulty of the pool.
fn opening_question<'a>(unanswered: &[&'a Question]) -> Option<&'a Question> {
    let mut difficulties: Vec<u8> = unanswered.iter().map(|q| q.difficulty).collect();
    if difficulties.is_empty() {
        return None;
    }
    difficulties.sort_unstable();
    let median = difficulties[(difficulties.len() - 1) / 2];

    unanswered
        .iter()
        .copied()
        .filter(|q| q.difficulty == median)
        .min_by(|a, b| a.id.cmp(&b.id))
}

fn next_target(last: &AnsweredQuestion) -> u8 {
    let step: i16 = if last.is_correct { 1 } else { -1 };
    let next = i16::from(last.difficulty()) + step;
    next.clamp(i16::from(MIN_DIFFICULTY), i16::from(MAX_DIFFICULTY)) as u8
}

/// Mean difficulty over correctly answered questions, `None` if there are none.
fn mean_correct_difficulty(answered: &[AnsweredQuestion]) -> Option<f64> {
    let (sum, count) = answered
        .iter()
        .filter(|a| a.is_correct)
        .fold((0u32, 0u32), |(sum, count), a| {
            (sum + u32::from(a.difficulty()), count + 1)
        });
    (count > 0).then(|| f64::from(sum) / f64::from(count))
}

fn closest_to<'a>(
    unanswered: &[&'a Question],
    target: u8,
    mean: Option<f64>,
) -> Option<&'a Question> {
    let distance = |q: &Question| q.difficulty.abs_diff(target);
    let mean_distance = |q: &Question| mean.map_or(0.0, |m| (f64::from(q.difficulty) - m).abs());

    unanswered.iter().copied().min_by(|a, b| {
        distance(*a)
            .cmp(&distance(*b))
            .then_with(|| mean_distance(*a).total_cmp(&mean_distance(*b)))
            .then_with(|| a.id.cmp(&b.id))
    })
}
