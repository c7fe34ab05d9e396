// src/lib.rs

pub mod adaptive;
pub mod config;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

pub use adaptive::{SessionResult, compute_final_score, select_next};
pub use routes::create_router;
