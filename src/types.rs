//! Wire types for the comment endpoint

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest accepted rating (very negative)
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating (very positive)
pub const MAX_RATING: u8 = 5;

/// Incoming comment to classify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

impl CommentRequest {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
        }
    }

    /// Returns true if the comment is empty after trimming whitespace
    pub fn is_blank(&self) -> bool {
        self.comment.trim().is_empty()
    }
}

/// Sentiment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Exact, case-sensitive match against the wire labels
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated analysis result returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentimentResult {
    sentiment: Sentiment,
    rating: u8,
}

impl SentimentResult {
    /// Build a result, rejecting ratings outside `MIN_RATING..=MAX_RATING`
    pub fn new(sentiment: Sentiment, rating: u8) -> Option<Self> {
        (MIN_RATING..=MAX_RATING)
            .contains(&rating)
            .then_some(Self { sentiment, rating })
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }
}
