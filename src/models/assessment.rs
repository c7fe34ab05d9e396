// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::DEFAULT_TARGET_COUNT;

/// Represents the 'assessments' table in the database.
/// An assessment owns a question bank and the number of questions a session asks.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,
    pub title: String,
    pub subject: Option<String>,

    /// Questions asked per session.
    pub target_count: i32,

    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Assessment metadata together with the current size of its bank.
#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub question_count: usize,
}

/// DTO for a teacher creating an assessment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    /// Falls back to `DEFAULT_TARGET_COUNT` when omitted.
    #[validate(range(min = 1, max = 200))]
    pub target_count: Option<i32>,
}

/// Values needed to insert an assessment.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub title: String,
    pub subject: Option<String>,
    pub target_count: i32,
    pub created_by: i64,
}

impl CreateAssessmentRequest {
    pub fn into_new(self, created_by: i64) -> NewAssessment {
        NewAssessment {
            title: crate::utils::html::clean_html(&self.title),
            subject: self.subject.map(|s| crate::utils::html::clean_html(&s)),
            target_count: self.target_count.unwrap_or(DEFAULT_TARGET_COUNT),
            created_by,
        }
    }
}
