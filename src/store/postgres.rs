// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction, types::Json};

use crate::{
    adaptive::ScoringMode,
    error::AppError,
    models::{
        assessment::{Assessment, NewAssessment},
        question::{AnsweredQuestion, Question, QuestionRow},
        session::{AssessmentResult, AssessmentSession, NewSession},
        user::User,
    },
    store::AssessmentStore,
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Helper struct for reading answers back in order.
#[derive(FromRow)]
struct AnswerRow {
    question: Json<Question>,
    student_answer: String,
    is_correct: bool,
}

#[derive(FromRow)]
struct ResultRow {
    session_id: i64,
    student_id: i64,
    assessment_id: i64,
    answered: Json<Vec<AnsweredQuestion>>,
    score: f64,
    scoring_mode: String,
    ended_early: bool,
    time_taken_secs: i64,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<ResultRow> for AssessmentResult {
    type Error = AppError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let scoring_mode = row
            .scoring_mode
            .parse::<ScoringMode>()
            .map_err(AppError::InternalServerError)?;
        Ok(AssessmentResult {
            session_id: row.session_id,
            student_id: row.student_id,
            assessment_id: row.assessment_id,
            answered: row.answered.0,
            score: row.score,
            scoring_mode,
            ended_early: row.ended_early,
            time_taken_secs: row.time_taken_secs,
            created_at: row.created_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

const RESULT_COLUMNS: &str = "session_id, student_id, assessment_id, answered, score, \
     scoring_mode, ended_early, time_taken_secs, created_at";

/// Appends `answer` and points the session at `next` inside `tx`.
/// Only the served question of an open session may move it forward.
async fn advance(
    tx: &mut Transaction<'_, Postgres>,
    session_id: i64,
    answer: &AnsweredQuestion,
    next: Option<&str>,
) -> Result<(), AppError> {
    let moved = sqlx::query(
        r#"
        UPDATE assessment_sessions
        SET current_question_id = $1
        WHERE id = $2 AND current_question_id = $3 AND completed_at IS NULL
        "#,
    )
    .bind(next)
    .bind(session_id)
    .bind(answer.id())
    .execute(&mut **tx)
    .await?;

    if moved.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Session is no longer awaiting this question".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO session_answers (session_id, position, question_id, question, student_answer, is_correct)
        VALUES ($1, (SELECT COUNT(*)::INT FROM session_answers WHERE session_id = $1), $2, $3, $4, $5)
        "#,
    )
    .bind(session_id)
    .bind(answer.id())
    .bind(Json(&answer.question))
    .bind(&answer.student_answer)
    .bind(answer.is_correct)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Question '{}' was already answered", answer.id()))
        } else {
            tracing::error!("Failed to record answer: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok(())
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_assessment(&self, new: NewAssessment) -> Result<Assessment, AppError> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"
            INSERT INTO assessments (title, subject, target_count, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, subject, target_count, created_by, created_at
            "#,
        )
        .bind(&new.title)
        .bind(&new.subject)
        .bind(new.target_count)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create assessment: {:?}", e);
            AppError::from(e)
        })?;
        Ok(assessment)
    }

    async fn get_assessment(&self, id: i64) -> Result<Option<Assessment>, AppError> {
        let assessment = sqlx::query_as::<_, Assessment>(
            "SELECT id, title, subject, target_count, created_by, created_at FROM assessments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assessment)
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, AppError> {
        let assessments = sqlx::query_as::<_, Assessment>(
            "SELECT id, title, subject, target_count, created_by, created_at FROM assessments ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(assessments)
    }

    async fn add_question(&self, assessment_id: i64, question: &Question) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO questions (assessment_id, id, question_type, content, options, answer, difficulty, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(assessment_id)
        .bind(&question.id)
        .bind(&question.question_type)
        .bind(&question.content)
        .bind(question.options.as_ref().map(Json))
        .bind(&question.answer)
        .bind(i16::from(question.difficulty))
        .bind(Json(&question.tags))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Question '{}' already exists", question.id))
            } else {
                tracing::error!("Failed to add question: {:?}", e);
                AppError::from(e)
            }
        })?;
        Ok(())
    }

    async fn delete_question(
        &self,
        assessment_id: i64,
        question_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE assessment_id = $1 AND id = $2")
            .bind(assessment_id)
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn question_bank(&self, assessment_id: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT assessment_id, id, question_type, content, options, answer, difficulty, tags
            FROM questions
            WHERE assessment_id = $1
            ORDER BY id
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch question bank: {:?}", e);
            AppError::from(e)
        })?;
        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn create_session(&self, new: NewSession) -> Result<AssessmentSession, AppError> {
        let session = sqlx::query_as::<_, AssessmentSession>(
            r#"
            INSERT INTO assessment_sessions (student_id, assessment_id, target_count, current_question_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, student_id, assessment_id, target_count, current_question_id, started_at, completed_at
            "#,
        )
        .bind(new.student_id)
        .bind(new.assessment_id)
        .bind(new.target_count)
        .bind(&new.first_question_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> Result<Option<AssessmentSession>, AppError> {
        let session = sqlx::query_as::<_, AssessmentSession>(
            r#"
            SELECT id, student_id, assessment_id, target_count, current_question_id, started_at, completed_at
            FROM assessment_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn answered_questions(
        &self,
        session_id: i64,
    ) -> Result<Vec<AnsweredQuestion>, AppError> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT question, student_answer, is_correct
            FROM session_answers
            WHERE session_id = $1
            ORDER BY position
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| AnsweredQuestion::new(r.question.0, r.student_answer, r.is_correct))
            .collect())
    }

    async fn record_answer(
        &self,
        session_id: i64,
        answer: &AnsweredQuestion,
        next_question_id: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        advance(&mut tx, session_id, answer, Some(next_question_id)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn complete_session(
        &self,
        last_answer: &AnsweredQuestion,
        result: &AssessmentResult,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        advance(&mut tx, result.session_id, last_answer, None).await?;

        sqlx::query(
            "UPDATE assessment_sessions SET completed_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(result.session_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO assessment_results
                (session_id, student_id, assessment_id, answered, score, scoring_mode, ended_early, time_taken_secs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(result.session_id)
        .bind(result.student_id)
        .bind(result.assessment_id)
        .bind(Json(&result.answered))
        .bind(result.score)
        .bind(result.scoring_mode.as_str())
        .bind(result.ended_early)
        .bind(result.time_taken_secs)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Session already completed".to_string())
            } else {
                tracing::error!("Failed to persist assessment result: {:?}", e);
                AppError::from(e)
            }
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_result(&self, session_id: i64) -> Result<Option<AssessmentResult>, AppError> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {} FROM assessment_results WHERE session_id = $1",
            RESULT_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AssessmentResult::try_from).transpose()
    }

    async fn results_for(
        &self,
        student_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, AppError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {} FROM assessment_results \
             WHERE student_id = $1 AND assessment_id = $2 \
             ORDER BY created_at DESC, session_id DESC",
            RESULT_COLUMNS
        ))
        .bind(student_id)
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AssessmentResult::try_from).collect()
    }
}
