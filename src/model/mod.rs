//! Comment classification backed by a hosted LLM

pub mod llm;
pub mod sentiment;

pub use llm::{CompletionProvider, CompletionRequest, LlmClient, LlmProvider};
pub use sentiment::{parse_sentiment_output, SentimentAnalyzer};
