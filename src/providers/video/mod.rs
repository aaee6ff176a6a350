//! Asynchronous video generation backend

mod client;
mod models;

pub use client::VideoJobProvider;
