// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, NewAssessment},
        question::{AnsweredQuestion, Question},
        session::{AssessmentResult, AssessmentSession, NewSession},
        user::User,
    },
    store::AssessmentStore,
};

/// In-process store. Backs the integration tests and local runs without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>,
    assessments: BTreeMap<i64, Assessment>,
    /// Keyed by assessment, then question id, so iteration is id-ordered.
    questions: HashMap<i64, BTreeMap<String, Question>>,
    sessions: BTreeMap<i64, AssessmentSession>,
    answers: HashMap<i64, Vec<AnsweredQuestion>>,
    results: BTreeMap<i64, AssessmentResult>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Appends `answer` and points the session at `next`. Checks everything
    /// before the first write, so a rejected answer leaves no trace.
    fn advance(
        &mut self,
        session_id: i64,
        answer: &AnsweredQuestion,
        next: Option<&str>,
    ) -> Result<&mut AssessmentSession, AppError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(AppError::NotFound("Session not found".to_string()))?;
        if session.completed_at.is_some()
            || session.current_question_id.as_deref() != Some(answer.id())
        {
            return Err(AppError::Conflict(
                "Session is no longer awaiting this question".to_string(),
            ));
        }
        if self
            .answers
            .get(&session_id)
            .is_some_and(|answers| answers.iter().any(|a| a.id() == answer.id()))
        {
            return Err(AppError::Conflict(format!(
                "Question '{}' was already answered",
                answer.id()
            )));
        }

        self.answers.entry(session_id).or_default().push(answer.clone());
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(AppError::NotFound("Session not found".to_string()))?;
        session.current_question_id = next.map(str::to_string);
        Ok(session)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }
        let user = User {
            id: inner.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Some(Utc::now()),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_assessment(&self, new: NewAssessment) -> Result<Assessment, AppError> {
        let mut inner = self.inner.write().await;
        let assessment = Assessment {
            id: inner.next_id(),
            title: new.title,
            subject: new.subject,
            target_count: new.target_count,
            created_by: new.created_by,
            created_at: Some(Utc::now()),
        };
        inner.assessments.insert(assessment.id, assessment.clone());
        Ok(assessment)
    }

    async fn get_assessment(&self, id: i64) -> Result<Option<Assessment>, AppError> {
        Ok(self.inner.read().await.assessments.get(&id).cloned())
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.assessments.values().rev().cloned().collect())
    }

    async fn add_question(&self, assessment_id: i64, question: &Question) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if !inner.assessments.contains_key(&assessment_id) {
            return Err(AppError::NotFound("Assessment not found".to_string()));
        }
        let bank = inner.questions.entry(assessment_id).or_default();
        if bank.contains_key(&question.id) {
            return Err(AppError::Conflict(format!(
                "Question '{}' already exists",
                question.id
            )));
        }
        bank.insert(question.id.clone(), question.clone());
        Ok(())
    }

    async fn delete_question(
        &self,
        assessment_id: i64,
        question_id: &str,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .questions
            .get_mut(&assessment_id)
            .and_then(|bank| bank.remove(question_id))
            .is_some())
    }

    async fn question_bank(&self, assessment_id: i64) -> Result<Vec<Question>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .questions
            .get(&assessment_id)
            .map(|bank| bank.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_session(&self, new: NewSession) -> Result<AssessmentSession, AppError> {
        let mut inner = self.inner.write().await;
        let session = AssessmentSession {
            id: inner.next_id(),
            student_id: new.student_id,
            assessment_id: new.assessment_id,
            target_count: new.target_count,
            current_question_id: Some(new.first_question_id),
            started_at: Utc::now(),
            completed_at: None,
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> Result<Option<AssessmentSession>, AppError> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn answered_questions(
        &self,
        session_id: i64,
    ) -> Result<Vec<AnsweredQuestion>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.answers.get(&session_id).cloned().unwrap_or_default())
    }

    async fn record_answer(
        &self,
        session_id: i64,
        answer: &AnsweredQuestion,
        next_question_id: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.advance(session_id, answer, Some(next_question_id))?;
        Ok(())
    }

    async fn complete_session(
        &self,
        last_answer: &AnsweredQuestion,
        result: &AssessmentResult,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.results.contains_key(&result.session_id) {
            return Err(AppError::Conflict("Session already completed".to_string()));
        }
        let completed_at = Utc::now();
        inner
            .advance(result.session_id, last_answer, None)?
            .completed_at = Some(completed_at);

        let mut stored = result.clone();
        stored.created_at = Some(completed_at);
        inner.results.insert(result.session_id, stored);
        Ok(())
    }

    async fn get_result(&self, session_id: i64) -> Result<Option<AssessmentResult>, AppError> {
        Ok(self.inner.read().await.results.get(&session_id).cloned())
    }

    async fn results_for(
        &self,
        student_id: i64,
        assessment_id: i64,
    ) -> Result<Vec<AssessmentResult>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .results
            .values()
            .rev()
            .filter(|r| r.student_id == student_id && r.assessment_id == assessment_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::ScoringMode;

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            content: "c".to_string(),
            answer: "a".to_string(),
            options: None,
            difficulty: 3,
            tags: Default::default(),
            question_type: "short".to_string(),
        }
    }

    async fn seeded() -> (MemoryStore, Assessment) {
        let store = MemoryStore::new();
        let assessment = store
            .create_assessment(NewAssessment {
                title: "Fractions".to_string(),
                subject: None,
                target_count: 2,
                created_by: 1,
            })
            .await
            .unwrap();
        store.add_question(assessment.id, &question("b")).await.unwrap();
        store.add_question(assessment.id, &question("a")).await.unwrap();
        (store, assessment)
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user("asha", "hash", "student").await.unwrap();
        let err = store.create_user("asha", "hash", "student").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_bank_is_ordered_by_id_and_rejects_duplicates() {
        let (store, assessment) = seeded().await;
        let ids: Vec<String> = store
            .question_bank(assessment.id)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        let err = store.add_question(assessment.id, &question("a")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_record_answer_only_accepts_served_question() {
        let (store, assessment) = seeded().await;
        let session = store
            .create_session(NewSession {
                student_id: 7,
                assessment_id: assessment.id,
                target_count: 2,
                first_question_id: "a".to_string(),
            })
            .await
            .unwrap();

        let wrong = AnsweredQuestion::new(question("b"), "a", true);
        let err = store.record_answer(session.id, &wrong, "a").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let right = AnsweredQuestion::new(question("a"), "a", true);
        store.record_answer(session.id, &right, "b").await.unwrap();
        // Replaying the same submission is rejected.
        let err = store.record_answer(session.id, &right, "b").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let current = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(current.current_question_id.as_deref(), Some("b"));
        assert_eq!(store.answered_questions(session.id).await.unwrap().len(), 1);
    }

    async fn open_session(store: &MemoryStore, assessment: &Assessment) -> AssessmentSession {
        store
            .create_session(NewSession {
                student_id: 7,
                assessment_id: assessment.id,
                target_count: 2,
                first_question_id: "a".to_string(),
            })
            .await
            .unwrap()
    }

    fn result_for(session: &AssessmentSession, answered: Vec<AnsweredQuestion>) -> AssessmentResult {
        AssessmentResult {
            session_id: session.id,
            student_id: session.student_id,
            assessment_id: session.assessment_id,
            answered,
            score: 100.0,
            scoring_mode: ScoringMode::DifficultyWeighted,
            ended_early: false,
            time_taken_secs: 3,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_complete_session_is_written_once() {
        let (store, assessment) = seeded().await;
        let session = open_session(&store, &assessment).await;
        let last = AnsweredQuestion::new(question("a"), "a", true);
        let result = result_for(&session, vec![last.clone()]);

        store.complete_session(&last, &result).await.unwrap();
        let err = store.complete_session(&last, &result).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let session = store.get_session(session.id).await.unwrap().unwrap();
        assert!(session.is_complete());
        assert!(session.current_question_id.is_none());
        assert_eq!(store.answered_questions(session.id).await.unwrap(), vec![last]);
        assert_eq!(store.results_for(7, assessment.id).await.unwrap().len(), 1);
        assert!(store.results_for(8, assessment.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_never_leaves_a_half_finished_session() {
        let (store, assessment) = seeded().await;
        let session = open_session(&store, &assessment).await;

        // Every observable state is either "awaiting a" or "complete with a result".
        let snapshot = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(snapshot.current_question_id.as_deref(), Some("a"));
        assert!(store.get_result(session.id).await.unwrap().is_none());

        // A rejected completion writes nothing at all.
        let stray = AnsweredQuestion::new(question("b"), "a", true);
        let err = store
            .complete_session(&stray, &result_for(&session, vec![stray.clone()]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let untouched = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(untouched.current_question_id.as_deref(), Some("a"));
        assert!(!untouched.is_complete());
        assert!(store.answered_questions(session.id).await.unwrap().is_empty());
        assert!(store.get_result(session.id).await.unwrap().is_none());

        let last = AnsweredQuestion::new(question("a"), "a", true);
        store
            .complete_session(&last, &result_for(&session, vec![last.clone()]))
            .await
            .unwrap();
        let done = store.get_session(session.id).await.unwrap().unwrap();
        assert!(done.is_complete());
        let stored = store.get_result(session.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, done.completed_at);
    }
}
