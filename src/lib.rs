//! Comment Sentiment Service
//!
//! Rates short comments as positive, negative or neutral with a 1-5 score,
//! delegating the classification to a hosted LLM and validating its answer.

pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod types;
