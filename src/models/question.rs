// src/models/question.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Lowest difficulty a question can be rated.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty a question can be rated.
pub const MAX_DIFFICULTY: u8 = 5;

/// A single question of an assessment's bank.
///
/// Immutable once created. Identifiers are unique within one bank and are
/// compared as plain strings wherever an ordering is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// The text content of the question.
    pub content: String,

    /// The correct answer text.
    pub answer: String,

    /// Choices, present only for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    /// 1 (easiest) to 5 (hardest).
    pub difficulty: u8,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Free-form label, e.g. 'mcq', 'short', 'true_false'.
    pub question_type: String,
}

/// A question together with the student's graded answer.
///
/// Created once when the grader returns its verdict, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub student_answer: String,
    pub is_correct: bool,
}

impl AnsweredQuestion {
    pub fn new(question: Question, student_answer: impl Into<String>, is_correct: bool) -> Self {
        Self {
            question,
            student_answer: student_answer.into(),
            is_correct,
        }
    }

    pub fn id(&self) -> &str {
        &self.question.id
    }

    pub fn difficulty(&self) -> u8 {
        self.question.difficulty
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub assessment_id: i64,
    pub id: String,
    pub question_type: String,
    pub content: String,
    pub options: Option<Json<Vec<String>>>,
    pub answer: String,
    pub difficulty: i16,
    pub tags: Json<Vec<String>>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            content: row.content,
            answer: row.answer,
            options: row.options.map(|o| o.0),
            // Out-of-range ratings are kept as 0 so scoring can detect them.
            difficulty: u8::try_from(row.difficulty)
                .ok()
                .filter(|d| (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(d))
                .unwrap_or(0),
            tags: row.tags.0.into_iter().collect(),
            question_type: row.question_type,
        }
    }
}

/// DTO for sending question to client (excludes answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub difficulty: u8,
    pub tags: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question_type: q.question_type.clone(),
            content: q.content.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
            tags: q.tags.iter().cloned().collect(),
        }
    }
}

/// DTO for adding a question to an assessment's bank.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 20))]
    pub question_type: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(range(min = 1, max = 5))]
    pub difficulty: u8,
    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,
}

impl CreateQuestionRequest {
    /// Builds the stored question, sanitizing teacher-entered text.
    pub fn into_question(self) -> Question {
        Question {
            id: self.id,
            content: crate::utils::html::clean_html(&self.content),
            answer: self.answer.trim().to_string(),
            options: self
                .options
                .map(|opts| opts.iter().map(|o| crate::utils::html::clean_html(o)).collect()),
            difficulty: self.difficulty,
            tags: self.tags.into_iter().map(|t| t.trim().to_lowercase()).collect(),
            question_type: self.question_type,
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 20 {
        return Err(validator::ValidationError::new("too_many_tags"));
    }
    if tags.iter().any(|t| t.trim().is_empty() || t.len() > 50) {
        return Err(validator::ValidationError::new("invalid_tag"));
    }
    Ok(())
}
