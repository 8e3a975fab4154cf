//! HTTP surface of the inference service.
//!
//! - `POST /analyze` - classify `{ "text": ... }`
//! - `GET /health` - liveness check
//! - `GET /info` - classifier shape and categories

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{ClassifierInfo, SentimentClassifier};

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Body of `POST /analyze`. A missing or null `text` means the empty string.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

/// Create the application router
pub fn create_router(classifier: Arc<SentimentClassifier>) -> Router {
    // The service is consumed by a browser-facing app on another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .route("/info", get(info))
        .layer(cors)
        .with_state(classifier)
}

/// POST /analyze - classify one piece of text
pub async fn analyze(
    State(classifier): State<Arc<SentimentClassifier>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        // Unparseable JSON is a client error; other rejections fail like analysis.
        Err(JsonRejection::JsonSyntaxError(rejection)) => {
            log::warn!("Rejected /analyze body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
        Err(rejection) => {
            log::error!("Error in sentiment analysis [E_INTERNAL]: {}", rejection.body_text());
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, rejection.body_text());
        }
    };
    let text = request.text.unwrap_or_default();

    let outcome = tokio::task::spawn_blocking(move || classifier.predict(&text)).await;
    match outcome {
        Ok(Ok(prediction)) => (StatusCode::OK, Json(prediction)).into_response(),
        Ok(Err(failure)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, failure.message),
        Err(join_error) => {
            log::error!("Prediction task failed [E_INTERNAL]: {}", join_error);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, join_error.to_string())
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /info
pub async fn info(State(classifier): State<Arc<SentimentClassifier>>) -> Json<ClassifierInfo> {
    Json(classifier.info())
}

/// Binds `config.bind_addr()` and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, classifier: Arc<SentimentClassifier>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(classifier))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_request_text_is_optional() {
        let request: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.text, None);
        let request: AnalyzeRequest = serde_json::from_str(r#"{"text": null}"#).unwrap();
        assert_eq!(request.text, None);
        let request: AnalyzeRequest = serde_json::from_str(r#"{"text": "calm"}"#).unwrap();
        assert_eq!(request.text.as_deref(), Some("calm"));
    }
}
