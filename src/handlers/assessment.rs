// src/handlers/assessment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::assessment::AssessmentDetail, store::DynStore, utils::jwt::Claims,
};

/// Lists all assessments, newest first.
pub async fn list_assessments(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_assessments().await?))
}

/// Assessment metadata and the size of its question bank.
pub async fn get_assessment(
    State(store): State<DynStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = store
        .get_assessment(id)
        .await?
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;
    let question_count = store.question_bank(id).await?.len();

    Ok(Json(AssessmentDetail {
        assessment,
        question_count,
    }))
}

/// The caller's completed attempts at an assessment, newest first.
pub async fn my_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    Ok(Json(store.results_for(student_id, id).await?))
}
