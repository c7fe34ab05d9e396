// src/adaptive/validation.rs

use std::collections::HashSet;

use crate::models::question::{AnsweredQuestion, Question};

/// Precondition violations. These are integration errors, the caller must not
/// keep driving the session after receiving one.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("question bank is empty")]
    EmptyBank,
    #[error("target count must be at least 1")]
    ZeroTargetCount,
    #[error("question bank contains identifier '{0}' more than once")]
    DuplicateBankId(String),
    #[error("answered question '{0}' is not part of the bank")]
    UnknownQuestion(String),
    #[error("question '{0}' was answered more than once")]
    DuplicateAnswer(String),
    #[error("{answered} questions answered but the target is {target_count}")]
    AnsweredExceedsTarget { answered: usize, target_count: usize },
}

/// Checks every precondition of `select_next` before any selection happens.
///
/// A target larger than the bank is accepted; the session then ends early
/// once the pool runs dry.
pub fn validate_inputs(
    bank: &[Question],
    answered: &[AnsweredQuestion],
    target_count: usize,
) -> Result<(), InvalidInput> {
    if bank.is_empty() {
        return Err(InvalidInput::EmptyBank);
    }
    if target_count == 0 {
        return Err(InvalidInput::ZeroTargetCount);
    }

    let mut bank_ids = HashSet::with_capacity(bank.len());
    for q in bank {
        if !bank_ids.insert(q.id.as_str()) {
            return Err(InvalidInput::DuplicateBankId(q.id.clone()));
        }
    }

    let mut seen = HashSet::with_capacity(answered.len());
    for a in answered {
        if !bank_ids.contains(a.id()) {
            return Err(InvalidInput::UnknownQuestion(a.id().to_string()));
        }
        if !seen.insert(a.id()) {
            return Err(InvalidInput::DuplicateAnswer(a.id().to_string()));
        }
    }

    if answered.len() > target_count {
        return Err(InvalidInput::AnsweredExceedsTarget {
            answered: answered.len(),
            target_count,
        });
    }

    Ok(())
}
