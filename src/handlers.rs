use crate::{
    capture::CaptureOrchestrator,
    errors::AppError,
    models::{RequestOrigin, ShareRequest},
    AppState,
};
use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing;

/// Handler for GET /card
pub async fn card(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, AppError> {
    let request = ShareRequest::from_raw_query(uri.query());
    let origin = RequestOrigin::from_parts(&headers, &uri, &state.default_scheme);

    let document = state.synthesizer.synthesize(&request, &origin).await?;
    tracing::debug!(
        title = %document.metadata.title,
        share_message_len = document.share_message.len(),
        "Serving card page"
    );

    let headers = [
        (header::CONTENT_TYPE, "text/html; charset=utf-8"),
        (header::CACHE_CONTROL, "s-maxage=3600, stale-while-revalidate"),
    ];
    Ok((StatusCode::OK, headers, document.html).into_response())
}

/// Handler for GET /screenshot
pub async fn screenshot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, AppError> {
    let request = ShareRequest::from_raw_query(uri.query());
    // Reject undecodable messages before paying for a browser launch
    request
        .decode_message()
        .map_err(AppError::InvalidCaptureInput)?;
    let origin = RequestOrigin::from_parts(&headers, &uri, &state.default_scheme);

    tracing::debug!(card_url = %CaptureOrchestrator::card_url(&request, &origin), "Screenshot requested");

    let capturer = Arc::clone(&state.capturer);
    let result = tokio::task::spawn_blocking(move || capturer.capture(&request, &origin))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Capture task failed: {}", e)))??;

    let headers = [
        (header::CONTENT_TYPE, "image/png"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"holiday-greeting.png\"",
        ),
        (header::CACHE_CONTROL, "no-cache"),
    ];
    Ok((StatusCode::OK, headers, result.png).into_response())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Handler for GET /health, for load balancer probes.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
