//! Sentiment analysis through a completion provider
//!
//! The provider's reply is untrusted: it is re-parsed and every field is
//! checked before a [`SentimentResult`] is built.

use super::llm::{CompletionProvider, CompletionRequest};
use crate::error::{ApiError, Result, UpstreamError};
use crate::types::{CommentRequest, Sentiment, SentimentResult, MAX_RATING, MIN_RATING};
use serde_json::Value;
use std::sync::Arc;

pub const SYSTEM_PROMPT: &str = "You are a sentiment analysis assistant. \
Analyze the sentiment of the user's comment. \
Reply ONLY with a valid JSON object, no extra text. \
Use this exact format: {\"sentiment\": \"positive\", \"rating\": 5} \
sentiment must be one of: positive, negative, neutral. \
rating must be an integer 1-5 (1=very negative, 3=neutral, 5=very positive).";

/// Classifies comments by delegating to a shared completion provider
pub struct SentimentAnalyzer {
    provider: Arc<dyn CompletionProvider>,
}

impl SentimentAnalyzer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Validate the comment, ask the provider, and validate its answer
    pub async fn analyze(&self, request: &CommentRequest) -> Result<SentimentResult> {
        if request.is_blank() {
            return Err(ApiError::InvalidInput);
        }

        let completion = build_request(&request.comment);
        let raw = self.provider.complete(&completion).await?;
        let result = parse_sentiment_output(&raw)?;

        tracing::debug!(
            sentiment = %result.sentiment(),
            rating = result.rating(),
            "Comment analyzed"
        );
        Ok(result)
    }
}

/// Fixed instruction, the comment as the only user message, deterministic sampling, JSON mode
pub fn build_request(comment: &str) -> CompletionRequest {
    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: comment.to_string(),
        temperature: 0.0,
        json_mode: true,
    }
}

/// Parse and validate raw provider output
pub fn parse_sentiment_output(raw: &str) -> std::result::Result<SentimentResult, UpstreamError> {
    let parsed: Value = serde_json::from_str(raw)?;
    let object = parsed
        .as_object()
        .ok_or_else(|| violation("expected a JSON object"))?;

    let sentiment = object
        .get("sentiment")
        .ok_or_else(|| violation("Missing field: sentiment"))?
        .as_str()
        .and_then(Sentiment::from_label)
        .ok_or_else(|| violation("Invalid sentiment value"))?;

    let rating = object
        .get("rating")
        .ok_or_else(|| violation("Missing field: rating"))?;
    let rating = as_integer(rating).ok_or_else(|| violation("Rating is not an integer"))?;

    if !(i128::from(MIN_RATING)..=i128::from(MAX_RATING)).contains(&rating) {
        return Err(violation("Rating out of range"));
    }

    u8::try_from(rating)
        .ok()
        .and_then(|r| SentimentResult::new(sentiment, r))
        .ok_or_else(|| violation("Rating out of range"))
}

/// Integer, integral float, or a string holding a base-10 integer.
/// Float magnitudes beyond `i128` saturate, which still lands out of range.
fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i128)
            }),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

fn violation(msg: &str) -> UpstreamError {
    UpstreamError::SchemaViolation(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::llm::MockCompletionProvider;

    fn schema_message(raw: &str) -> String {
        match parse_sentiment_output(raw) {
            Err(UpstreamError::SchemaViolation(msg)) => msg,
            other => panic!("expected schema violation for {}, got {:?}", raw, other),
        }
    }

    fn analyzer_replying(reply: &'static str) -> SentimentAnalyzer {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(move |_| Ok(reply.to_string()));
        SentimentAnalyzer::new(Arc::new(mock))
    }

    #[test]
    fn test_parse_valid_output() {
        let result = parse_sentiment_output(r#"{"sentiment": "positive", "rating": 5}"#).unwrap();
        assert_eq!(result.sentiment(), Sentiment::Positive);
        assert_eq!(result.rating(), 5);
    }

    #[test]
    fn test_parse_ignores_extra_keys() {
        let result =
            parse_sentiment_output(r#"{"sentiment": "neutral", "rating": 3, "why": "meh"}"#)
                .unwrap();
        assert_eq!(result.sentiment(), Sentiment::Neutral);
    }

    #[test]
    fn test_parse_integer_encodings() {
        let result = parse_sentiment_output(r#"{"sentiment": "negative", "rating": "2"}"#).unwrap();
        assert_eq!(result.rating(), 2);
        let result = parse_sentiment_output(r#"{"sentiment": "negative", "rating": 1.0}"#).unwrap();
        assert_eq!(result.rating(), 1);
    }

    #[test]
    fn test_parse_not_json() {
        let err = parse_sentiment_output("The sentiment is positive.").unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedOutput(_)));
    }

    #[test]
    fn test_parse_not_an_object() {
        assert_eq!(schema_message("[1, 2]"), "expected a JSON object");
    }

    #[test]
    fn test_parse_invalid_sentiment() {
        assert_eq!(
            schema_message(r#"{"sentiment": "happy", "rating": 4}"#),
            "Invalid sentiment value"
        );
        assert_eq!(
            schema_message(r#"{"sentiment": "Positive", "rating": 4}"#),
            "Invalid sentiment value"
        );
        assert_eq!(
            schema_message(r#"{"sentiment": 1, "rating": 4}"#),
            "Invalid sentiment value"
        );
    }

    #[test]
    fn test_parse_missing_fields() {
        assert_eq!(schema_message(r#"{"rating": 4}"#), "Missing field: sentiment");
        assert_eq!(
            schema_message(r#"{"sentiment": "positive"}"#),
            "Missing field: rating"
        );
    }

    #[test]
    fn test_parse_rating_out_of_range() {
        for raw in [
            r#"{"sentiment": "negative", "rating": 0}"#,
            r#"{"sentiment": "positive", "rating": 6}"#,
            r#"{"sentiment": "positive", "rating": -3}"#,
            r#"{"sentiment": "positive", "rating": 18446744073709551615}"#,
            r#"{"sentiment": "positive", "rating": 99999999999999999999}"#,
            r#"{"sentiment": "positive", "rating": 1e20}"#,
        ] {
            assert_eq!(schema_message(raw), "Rating out of range", "{}", raw);
        }
        assert_eq!(
            schema_message(r#"{"sentiment": "positive", "rating": 6}"#),
            "Rating out of range"
        );
    }

    #[test]
    fn test_parse_rating_not_integer() {
        for raw in [
            r#"{"sentiment": "positive", "rating": "high"}"#,
            r#"{"sentiment": "positive", "rating": 4.5}"#,
            r#"{"sentiment": "positive", "rating": true}"#,
            r#"{"sentiment": "positive", "rating": null}"#,
        ] {
            assert_eq!(schema_message(raw), "Rating is not an integer");
        }
    }

    #[test]
    fn test_build_request() {
        let request = build_request("I love this product!");
        assert_eq!(request.user, "I love this product!");
        assert_eq!(request.temperature, 0.0);
        assert!(request.json_mode);
        assert!(request.system.contains("positive, negative, neutral"));
    }

    #[tokio::test]
    async fn test_blank_comment_skips_provider() {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete().times(0);
        let analyzer = SentimentAnalyzer::new(Arc::new(mock));

        for comment in ["", "   ", "\n\t "] {
            let err = analyzer
                .analyze(&CommentRequest::new(comment))
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput));
        }
    }

    #[tokio::test]
    async fn test_analyze_sends_comment_verbatim() {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .withf(|req| {
                req.user == "  It was okay, nothing special. "
                    && req.temperature == 0.0
                    && req.json_mode
            })
            .times(1)
            .returning(|_| Ok(r#"{"sentiment": "neutral", "rating": 3}"#.to_string()));
        let analyzer = SentimentAnalyzer::new(Arc::new(mock));

        let result = analyzer
            .analyze(&CommentRequest::new("  It was okay, nothing special. "))
            .await
            .unwrap();
        assert_eq!(result.sentiment(), Sentiment::Neutral);
        assert_eq!(result.rating(), 3);
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_reply() {
        let analyzer = analyzer_replying(r#"{"sentiment": "happy", "rating": 4}"#);
        let err = analyzer
            .analyze(&CommentRequest::new("I love this product!"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error: Invalid sentiment value");
    }

    #[tokio::test]
    async fn test_analyze_provider_failure() {
        let mut mock = MockCompletionProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Err(UpstreamError::MissingCredential));
        let analyzer = SentimentAnalyzer::new(Arc::new(mock));

        let err = analyzer
            .analyze(&CommentRequest::new("fine"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Upstream(UpstreamError::MissingCredential)
        ));
    }
}
