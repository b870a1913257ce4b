//! HTTP endpoint serving emotion predictions.
//!
//! Routes:
//! - `POST /detect_emotion` with `{"landmarks": [...]}`
//! - `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use emotion_core::{InferenceService, PredictError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Body of `POST /detect_emotion`.
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Flattened landmark coordinates.
    pub landmarks: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    labels: Vec<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Builds the router over a shared, immutable service.
pub fn router(service: Arc<InferenceService>) -> Router {
    Router::new()
        .route("/detect_emotion", post(detect_emotion))
        .route("/health", get(health))
        .with_state(service)
}

async fn detect_emotion(
    State(service): State<Arc<InferenceService>>,
    payload: std::result::Result<Json<DetectRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Rejected request body: {rejection}");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", rejection.body_text()),
            );
        }
    };

    let result =
        tokio::task::spawn_blocking(move || service.predict(&request.landmarks)).await;

    match result {
        Ok(Ok(prediction)) => (StatusCode::OK, Json(prediction)).into_response(),
        Ok(Err(err @ PredictError::InvalidInput { .. })) => {
            debug!("{err}");
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Ok(Err(PredictError::Unavailable(reason))) => {
            warn!("Prediction requested but model unavailable: {reason}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Model unavailable")
        }
        Ok(Err(PredictError::Internal(reason))) => {
            error!("Prediction failed: {reason}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed")
        }
        Err(join_error) => {
            error!("Prediction task failed: {join_error}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed")
        }
    }
}

async fn health(State(service): State<Arc<InferenceService>>) -> Response {
    let (status, code) = if service.is_available() {
        ("ready", StatusCode::OK)
    } else {
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE)
    };
    let labels = service
        .labels()
        .map(|l| l.as_slice().to_vec())
        .unwrap_or_default();
    (code, Json(HealthBody { status, labels })).into_response()
}

/// Serves `service` on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, service: Arc<InferenceService>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener.local_addr().unwrap_or(addr);
    info!("Listening on http://{local}");
    eprintln!("Serving emotion predictions on http://{local}");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
