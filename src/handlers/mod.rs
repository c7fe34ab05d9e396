// src/handlers/mod.rs

pub mod assessment;
pub mod auth;
pub mod session;
pub mod teacher;
