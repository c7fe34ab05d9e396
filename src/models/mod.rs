// src/models/mod.rs

pub mod assessment;
pub mod question;
pub mod session;
pub mod user;
