// src/grading.rs

use async_trait::async_trait;

use crate::{error::AppError, models::question::Question};

/// Judges a student's free-text answer.
///
/// The session controller never calls a grader; the answer handler does and
/// attaches the verdict to the answered question.
#[async_trait]
pub trait AnswerGrader: Send + Sync {
    async fn grade(&self, question: &Question, answer: &str) -> Result<bool, AppError>;
}

/// Case and whitespace insensitive comparison against the answer key.
///
/// For multiple-choice questions a choice letter ("B") and the choice text
/// are interchangeable on both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchGrader;

#[async_trait]
impl AnswerGrader for ExactMatchGrader {
    async fn grade(&self, question: &Question, answer: &str) -> Result<bool, AppError> {
        Ok(matches(question, answer))
    }
}

fn matches(question: &Question, answer: &str) -> bool {
    let given = normalize(answer);
    if given.is_empty() {
        return false;
    }
    let expected = normalize(&question.answer);
    if given == expected {
        return true;
    }

    match &question.options {
        Some(options) => {
            let given = resolve_choice(options, &given).unwrap_or(given);
            let expected = resolve_choice(options, &expected).unwrap_or(expected);
            given == expected
        }
        None => false,
    }
}

/// Maps a single choice letter to the normalized text of that option.
fn resolve_choice(options: &[String], value: &str) -> Option<String> {
    let mut chars = value.chars();
    let letter = chars.next()?;
    if chars.next().is_some() || !letter.is_ascii_alphabetic() {
        return None;
    }
    let index = (letter.to_ascii_lowercase() as u8 - b'a') as usize;
    options.get(index).map(|o| normalize(o))
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer: &str, options: Option<Vec<&str>>) -> Question {
        Question {
            id: "q".to_string(),
            content: "content".to_string(),
            answer: answer.to_string(),
            options: options.map(|o| o.into_iter().map(str::to_string).collect()),
            difficulty: 2,
            tags: Default::default(),
            question_type: "mcq".to_string(),
        }
    }

    #[tokio::test]
    async fn test_free_text_ignores_case_and_spacing() {
        let q = question("Photo synthesis", None);
        let grader = ExactMatchGrader;
        assert!(grader.grade(&q, "  photo   SYNTHESIS ").await.unwrap());
        assert!(!grader.grade(&q, "respiration").await.unwrap());
        assert!(!grader.grade(&q, "   ").await.unwrap());
    }

    #[tokio::test]
    async fn test_choice_letter_and_text_are_interchangeable() {
        let grader = ExactMatchGrader;
        let keyed_by_text = question("Delhi", Some(vec!["Mumbai", "Delhi", "Pune"]));
        assert!(grader.grade(&keyed_by_text, "b").await.unwrap());
        assert!(grader.grade(&keyed_by_text, "delhi").await.unwrap());
        assert!(!grader.grade(&keyed_by_text, "A").await.unwrap());

        let keyed_by_letter = question("B", Some(vec!["Mumbai", "Delhi", "Pune"]));
        assert!(grader.grade(&keyed_by_letter, "Delhi").await.unwrap());
        assert!(!grader.grade(&keyed_by_letter, "Pune").await.unwrap());
        assert!(!grader.grade(&keyed_by_letter, "z").await.unwrap());
    }
}
