// src/adaptive/scoring.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::question::AnsweredQuestion;

/// How a final score was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Correct difficulty over attempted difficulty.
    DifficultyWeighted,
    /// Plain correct/total percentage, used when difficulties sum to zero.
    Unweighted,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::DifficultyWeighted => "difficulty_weighted",
            ScoringMode::Unweighted => "unweighted",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "difficulty_weighted" => Ok(ScoringMode::DifficultyWeighted),
            "unweighted" => Ok(ScoringMode::Unweighted),
            other => Err(format!("unknown scoring mode '{}'", other)),
        }
    }
}

/// Score of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    /// Percentage in `[0, 100]`.
    pub score: f64,
    /// The bank ran out before the target count was reached.
    pub ended_early: bool,
    pub mode: ScoringMode,
}

/// Difficulty-weighted percentage of the answered questions.
///
/// Returns `0.0` for an empty slice.
pub fn compute_final_score(answered: &[AnsweredQuestion]) -> f64 {
    final_score(answered, false).score
}

/// Computes the final score and records which formula produced it.
pub fn final_score(answered: &[AnsweredQuestion], ended_early: bool) -> FinalScore {
    if answered.is_empty() {
        return FinalScore {
            score: 0.0,
            ended_early,
            mode: ScoringMode::Unweighted,
        };
    }

    let (earned, attempted) = answered.iter().fold((0u64, 0u64), |(earned, total), a| {
        let weight = u64::from(a.difficulty());
        if a.is_correct {
            (earned + weight, total + weight)
        } else {
            (earned, total + weight)
        }
    });

    let (score, mode) = if attempted == 0 {
        tracing::warn!(
            answered = answered.len(),
            "All answered questions have zero difficulty, using unweighted score"
        );
        let correct = answered.iter().filter(|a| a.is_correct).count();
        (
            correct as f64 / answered.len() as f64 * 100.0,
            ScoringMode::Unweighted,
        )
    } else {
        (
            earned as f64 / attempted as f64 * 100.0,
            ScoringMode::DifficultyWeighted,
        )
    };

    FinalScore {
        score: score.clamp(0.0, 100.0),
        ended_early,
        mode,
    }
}
