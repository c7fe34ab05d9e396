// src/handlers/teacher.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, CreateAssessmentRequest},
        question::CreateQuestionRequest,
    },
    store::DynStore,
    utils::jwt::Claims,
};

/// Creates an assessment owned by the calling teacher.
pub async fn create_assessment(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let assessment = store
        .create_assessment(payload.into_new(claims.user_id()?))
        .await?;

    tracing::info!(assessment_id = assessment.id, "Assessment created");
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// Adds a question to the bank of an assessment the caller created.
pub async fn add_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    owned_assessment(&store, assessment_id, &claims).await?;

    let question = payload.into_question();
    store.add_question(assessment_id, &question).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Removes a question from an assessment's bank.
///
/// Sessions already past this question keep their copy of it.
pub async fn delete_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path((assessment_id, question_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    owned_assessment(&store, assessment_id, &claims).await?;

    if !store.delete_question(assessment_id, &question_id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Loads an assessment, refusing teachers other than its author.
async fn owned_assessment(
    store: &DynStore,
    assessment_id: i64,
    claims: &Claims,
) -> Result<Assessment, AppError> {
    let assessment = store
        .get_assessment(assessment_id)
        .await?
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    if assessment.created_by != claims.user_id()? {
        tracing::warn!(
            assessment_id,
            author = assessment.created_by,
            caller = %claims.sub,
            "Teacher tried to edit another teacher's bank"
        );
        return Err(AppError::Forbidden(
            "Assessment belongs to another teacher".to_string(),
        ));
    }
    Ok(assessment)
}
