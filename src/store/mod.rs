// src/store/mod.rs

//! Persistence for users, question banks, sessions and results.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, NewAssessment},
        question::{AnsweredQuestion, Question},
        session::{AssessmentResult, AssessmentSession, NewSession},
        user::User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DynStore = Arc<dyn AssessmentStore>;

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str, role: &str)
    -> Result<User, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn create_assessment(&self, new: NewAssessment) -> Result<Assessment, AppError>;

    async fn get_assessment(&self, id: i64) -> Result<Option<Assessment>, AppError>;

    async fn list_assessments(&self) -> Result<Vec<Assessment>, AppError>;

    /// Fails with `Conflict` when the identifier already exists in the bank.
    async fn add_question(&self, assessment_id: i64, question: &Question) -> Result<(), AppError>;

    /// Returns `false` when no such question existed.
    async fn delete_question(&self, assessment_id: i64, question_id: &str)
    -> Result<bool, AppError>;

    /// The bank ordered by identifier.
    async fn question_bank(&self, assessment_id: i64) -> Result<Vec<Question>, AppError>;

    async fn create_session(&self, new: NewSession) -> Result<AssessmentSession, AppError>;

    async fn get_session(&self, id: i64) -> Result<Option<AssessmentSession>, AppError>;

    /// Answers of a session in the order they were given.
    async fn answered_questions(&self, session_id: i64)
    -> Result<Vec<AnsweredQuestion>, AppError>;

    /// Appends an answer and moves the session on to `next_question_id`.
    ///
    /// Fails with `Conflict` if `answer` was already recorded or the session
    /// no longer awaits `answer.id()`, which guards concurrent submissions.
    async fn record_answer(
        &self,
        session_id: i64,
        answer: &AnsweredQuestion,
        next_question_id: &str,
    ) -> Result<(), AppError>;

    /// Appends the final answer, marks the session complete and writes its
    /// immutable result, all or nothing.
    ///
    /// Fails with `Conflict` under the same rules as `record_answer`, or when
    /// the session is already complete. Nothing is written on failure.
    async fn complete_session(
        &self,
        last_answer: &AnsweredQuestion,
        result: &AssessmentResult,
    ) -> Result<(), AppError>;

    async fn get_result(&self, session_id: i64) -> Result<Option<AssessmentResult>, AppError>;

    /// Results of one student for one assessment, newest first.
    async fn results_for(
        &self,
        student_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, AppError>;
}
