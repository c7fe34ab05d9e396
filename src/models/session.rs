// src/models/session.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    adaptive::ScoringMode,
    models::question::{AnsweredQuestion, PublicQuestion},
};

/// Represents the 'assessment_sessions' table in the database.
/// One student's single attempt at one assessment.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssessmentSession {
    pub id: i64,
    pub student_id: i64,
    pub assessment_id: i64,
    pub target_count: i32,

    /// The question currently awaiting an answer. `None` once complete.
    pub current_question_id: Option<String>,

    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AssessmentSession {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Values needed to open a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub student_id: i64,
    pub assessment_id: i64,
    pub target_count: i32,
    pub first_question_id: String,
}

/// The immutable record written when a session completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub session_id: i64,
    pub student_id: i64,
    pub assessment_id: i64,
    pub answered: Vec<AnsweredQuestion>,
    pub score: f64,
    pub scoring_mode: ScoringMode,
    pub ended_early: bool,
    pub time_taken_secs: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for answering the currently served question.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 64))]
    pub question_id: String,
    #[validate(length(max = 2000))]
    pub answer: String,
}

/// Response for every step of a session.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStep {
    Continue {
        session_id: i64,
        answered_count: usize,
        target_count: i32,
        question: PublicQuestion,
        /// Verdict on the answer just submitted, absent on session start.
        #[serde(skip_serializing_if = "Option::is_none")]
        last_correct: Option<bool>,
    },
    Complete {
        session_id: i64,
        answered_count: usize,
        target_count: i32,
        score: f64,
        scoring_mode: ScoringMode,
        ended_early: bool,
        time_taken_secs: i64,
        last_correct: Option<bool>,
    },
}

/// Progress summary for `GET /sessions/{id}`.
#[derive(Debug, Serialize)]
pub struct SessionProgress {
    #[serde(flatten)]
    pub session: AssessmentSession,
    pub answered_count: usize,
    pub correct_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AssessmentResult>,
}
