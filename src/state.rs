// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    adaptive::{DifficultyLadder, SelectionStrategy},
    config::Config,
    grading::{AnswerGrader, ExactMatchGrader},
    store::DynStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Config,
    pub grader: Arc<dyn AnswerGrader>,
    pub strategy: Arc<dyn SelectionStrategy>,
}

impl AppState {
    /// State with the default exact-match grader and difficulty ladder.
    pub fn new(store: DynStore, config: Config) -> Self {
        Self {
            store,
            config,
            grader: Arc::new(ExactMatchGrader),
            strategy: Arc::new(DifficultyLadder),
        }
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
