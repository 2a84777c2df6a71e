//! HTTP surface
//!
//! - `POST /comment`: classify a comment
//! - `GET /health`: liveness, no provider call


use crate::config::{CorsConfig, ServerConfig};
use crate::error::{ApiError, Result};
use crate::model::{CompletionProvider, SentimentAnalyzer};
use crate::types::{CommentRequest, SentimentResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Shared, read-only state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<SentimentAnalyzer>,
}

impl AppState {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            analyzer: Arc::new(SentimentAnalyzer::new(provider)),
        }
    }
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInput => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) | ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorBody { detail })).into_response()
}

pub fn build_router(state: AppState, cors: &CorsConfig) -> Result<Router> {
    let router = Router::new()
        .route("/comment", post(analyze_comment))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors)?),
        )
        .with_state(state);

    Ok(router)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let provider = state.analyzer.provider_name().to_string();
    let app = build_router(state, &config.cors)?;

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(
        "Starting server on {} (provider: {})",
        listener.local_addr()?,
        provider
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the cross-origin layer; `"*"` in a list permits anything
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let origin: AllowOrigin = if is_wildcard(&config.allowed_origins) {
        Any.into()
    } else {
        parse_all(&config.allowed_origins, |s| HeaderValue::from_str(s).ok(), "origin")?.into()
    };

    let methods: AllowMethods = if is_wildcard(&config.allowed_methods) {
        Any.into()
    } else {
        parse_all(
            &config.allowed_methods,
            |s| Method::from_bytes(s.to_uppercase().as_bytes()).ok(),
            "method",
        )?
        .into()
    };

    let headers: AllowHeaders = if is_wildcard(&config.allowed_headers) {
        Any.into()
    } else {
        parse_all(
            &config.allowed_headers,
            |s| HeaderName::from_bytes(s.as_bytes()).ok(),
            "header",
        )?
        .into()
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers))
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v.trim() == "*")
}

fn parse_all<T>(values: &[String], parse: impl Fn(&str) -> Option<T>, what: &str) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| {
            let v = v.trim();
            parse(v).ok_or_else(|| ApiError::Config(format!("invalid CORS {}: {}", what, v)))
        })
        .collect()
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: state.analyzer.provider_name().to_string(),
    })
}

async fn analyze_comment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CommentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    let span = tracing::info_span!("comment", request_id = %Uuid::new_v4());
    async move {
        match state.analyzer.analyze(&request).await {
            Ok(result) => Json::<SentimentResult>(result).into_response(),
            Err(e) => {
                if let ApiError::Upstream(inner) = &e {
                    warn!(kind = inner.kind(), "Upstream failure: {}", inner);
                }
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}
