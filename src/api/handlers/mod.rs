//! HTTP request handlers

pub mod generate;
pub mod health;
pub mod jobs;
pub mod profiles;
pub mod usage;
