// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    adaptive::{FinalScore, SessionResult, select_next_with},
    error::AppError,
    models::{
        question::{AnsweredQuestion, PublicQuestion, Question},
        session::{
            AssessmentResult, AssessmentSession, NewSession, SessionProgress, SessionStep,
            SubmitAnswerRequest,
        },
        user::ROLE_STUDENT,
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Starts a new attempt at an assessment and serves its first question.
///
/// The student is always the token's subject.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != ROLE_STUDENT {
        return Err(AppError::Forbidden(
            "Only students can take assessments".to_string(),
        ));
    }
    let student_id = claims.user_id()?;

    let assessment = state
        .store
        .get_assessment(assessment_id)
        .await?
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    let bank = state.store.question_bank(assessment_id).await?;
    let target = target_count(assessment.target_count)?;
    if target > bank.len() {
        tracing::warn!(
            assessment_id,
            target,
            bank_size = bank.len(),
            "Assessment asks for more questions than its bank holds"
        );
    }

    let first = match select_next_with(state.strategy.as_ref(), &bank, &[], target)? {
        SessionResult::Continue { question } => question,
        SessionResult::Complete(_) => {
            return Err(AppError::InternalServerError(
                "Session completed before its first question".to_string(),
            ));
        }
    };

    let session = state
        .store
        .create_session(NewSession {
            student_id,
            assessment_id,
            target_count: assessment.target_count,
            first_question_id: first.id.clone(),
        })
        .await?;

    tracing::info!(
        session_id = session.id,
        student_id,
        assessment_id,
        question_id = %first.id,
        "Session started"
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionStep::Continue {
            session_id: session.id,
            answered_count: 0,
            target_count: session.target_count,
            question: PublicQuestion::from(&first),
            last_correct: None,
        }),
    ))
}

/// Grades the answer to the served question, then serves the next one or
/// completes the session and persists its result.
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let session = owned_session(&state, session_id, &claims).await?;

    if session.is_complete() {
        return Err(AppError::Conflict("Session already completed".to_string()));
    }
    let current = session.current_question_id.as_deref().ok_or(AppError::Conflict(
        "Session is not awaiting an answer".to_string(),
    ))?;
    if req.question_id != current {
        return Err(AppError::BadRequest(format!(
            "Question '{}' is not the question being served",
            req.question_id
        )));
    }

    let mut answered = state.store.answered_questions(session_id).await?;
    let bank = session_bank(state.store.question_bank(session.assessment_id).await?, &answered);
    let question = bank
        .iter()
        .find(|q| q.id == current)
        .ok_or(AppError::Conflict(format!(
            "Question '{}' was removed from the assessment",
            current
        )))?;

    let is_correct = state.grader.grade(question, &req.answer).await?;
    let answer = AnsweredQuestion::new(question.clone(), req.answer, is_correct);
    answered.push(answer.clone());

    let target = target_count(session.target_count)?;
    let step = match select_next_with(state.strategy.as_ref(), &bank, &answered, target)? {
        SessionResult::Continue { question: next } => {
            state
                .store
                .record_answer(session_id, &answer, &next.id)
                .await?;
            tracing::debug!(
                session_id,
                answered = answered.len(),
                next = %next.id,
                difficulty = next.difficulty,
                "Serving next question"
            );
            SessionStep::Continue {
                session_id,
                answered_count: answered.len(),
                target_count: session.target_count,
                question: PublicQuestion::from(&next),
                last_correct: Some(is_correct),
            }
        }
        SessionResult::Complete(score) => {
            let result = finish(&state, &session, &answer, answered, score).await?;
            complete_step(&session, &result, Some(is_correct))
        }
    };

    Ok(Json(step))
}

/// Returns progress of the caller's session, including the result once complete.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = owned_session(&state, session_id, &claims).await?;
    let answered = state.store.answered_questions(session_id).await?;
    let bank = session_bank(state.store.question_bank(session.assessment_id).await?, &answered);

    // A session either serves a question or has its result.
    let result = if session.is_complete() {
        state.store.get_result(session_id).await?
    } else {
        None
    };

    let current_question = session
        .current_question_id
        .as_deref()
        .filter(|_| result.is_none())
        .and_then(|id| bank.iter().find(|q| q.id == id))
        .map(PublicQuestion::from);

    Ok(Json(SessionProgress {
        answered_count: answered.len(),
        correct_count: answered.iter().filter(|a| a.is_correct).count(),
        session,
        current_question,
        result,
    }))
}

async fn owned_session(
    state: &AppState,
    session_id: i64,
    claims: &Claims,
) -> Result<AssessmentSession, AppError> {
    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or(AppError::NotFound("Session not found".to_string()))?;

    if session.student_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "Session belongs to another student".to_string(),
        ));
    }
    Ok(session)
}

/// Stores the last answer together with the immutable result of the session.
async fn finish(
    state: &AppState,
    session: &AssessmentSession,
    last_answer: &AnsweredQuestion,
    answered: Vec<AnsweredQuestion>,
    score: FinalScore,
) -> Result<AssessmentResult, AppError> {
    let time_taken_secs = (Utc::now() - session.started_at).num_seconds().max(0);

    if score.ended_early {
        tracing::warn!(
            session_id = session.id,
            answered = answered.len(),
            target = session.target_count,
            "Session ended early, question bank exhausted"
        );
    }

    let result = AssessmentResult {
        session_id: session.id,
        student_id: session.student_id,
        assessment_id: session.assessment_id,
        answered,
        score: score.score,
        scoring_mode: score.mode,
        ended_early: score.ended_early,
        time_taken_secs,
        created_at: None,
    };
    state.store.complete_session(last_answer, &result).await?;

    tracing::info!(
        session_id = session.id,
        student_id = session.student_id,
        score = result.score,
        mode = %result.scoring_mode,
        "Session completed"
    );

    Ok(result)
}

fn complete_step(
    session: &AssessmentSession,
    result: &AssessmentResult,
    last_correct: Option<bool>,
) -> SessionStep {
    SessionStep::Complete {
        session_id: session.id,
        answered_count: result.answered.len(),
        target_count: session.target_count,
        score: result.score,
        scoring_mode: result.scoring_mode,
        ended_early: result.ended_early,
        time_taken_secs: result.time_taken_secs,
        last_correct,
    }
}

fn target_count(stored: i32) -> Result<usize, AppError> {
    usize::try_from(stored)
        .map_err(|_| AppError::InternalServerError(format!("Invalid target count {}", stored)))
}

/// The current bank plus snapshots of answered questions a teacher has
/// since removed, so a session in progress stays consistent.
fn session_bank(mut bank: Vec<Question>, answered: &[AnsweredQuestion]) -> Vec<Question> {
    for a in answered {
        if !bank.iter().any(|q| q.id == a.id()) {
            bank.push(a.question.clone());
        }
    }
    bank
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str) -> Question {
        Question {
            id: id.to_string(),
            content: String::new(),
            answer: "a".to_string(),
            options: None,
            difficulty: 2,
            tags: Default::default(),
            question_type: "short".to_string(),
        }
    }

    #[test]
    fn test_session_bank_restores_removed_questions() {
        let answered = vec![AnsweredQuestion::new(q("gone"), "a", true)];
        let bank = session_bank(vec![q("kept")], &answered);
        let ids: Vec<&str> = bank.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["kept", "gone"]);
    }

    #[test]
    fn test_negative_target_is_rejected() {
        assert!(target_count(-1).is_err());
        assert_eq!(target_count(4).unwrap(), 4);
    }
}
