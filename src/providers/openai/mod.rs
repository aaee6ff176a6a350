//! OpenAI images API integration
//!
//! API Documentation: https://platform.openai.com/docs/api-reference/images

mod client;
mod models;

pub use client::OpenAiImageProvider;
