use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed percent-encoding at byte {0}")]
    MalformedEscape(usize),

    #[error("Decoded message is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read base template '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // The base document must contain each anchor exactly once
    #[error("Base template must contain exactly one '{anchor}' (found {found})")]
    Anchor { anchor: &'static str, found: usize },

    #[error("Base template anchors are out of order: '{first}' must precede '{second}'")]
    AnchorOrder {
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Invalid message parameter: {0}")]
    InvalidMessage(#[from] DecodeError),

    #[error("Base template unavailable: {0}")]
    Template(#[from] TemplateError),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to start headless browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} did not settle within {timeout:?}: {reason}")]
    Navigation {
        url: String,
        timeout: Duration,
        reason: String,
    },

    #[error("Card element '{selector}' did not appear within {timeout:?}: {reason}")]
    ReadinessTimeout {
        selector: String,
        timeout: Duration,
        reason: String,
    },

    #[error("Card element not found: {0}")]
    ElementNotFound(String),

    #[error("Failed to capture card element: {0}")]
    Screenshot(String),
}

impl CaptureError {
    /// Stable name of the failure category, logged as a structured field.
    pub fn category(&self) -> &'static str {
        match self {
            CaptureError::Launch(_) => "resource_acquisition",
            CaptureError::Navigation { .. } => "navigation_timeout",
            CaptureError::ReadinessTimeout { .. } => "readiness_timeout",
            CaptureError::ElementNotFound(_) => "element_missing",
            CaptureError::Screenshot(_) => "capture_failed",
        }
    }

    /// Caller-facing description. Never includes backend error text.
    pub fn public_message(&self) -> String {
        match self {
            CaptureError::Launch(_) => "Headless browser could not be started".to_string(),
            CaptureError::Navigation { timeout, .. } => format!(
                "Card page did not finish loading within {} seconds",
                timeout.as_secs()
            ),
            CaptureError::ReadinessTimeout { timeout, .. } => format!(
                "Card did not render within {} seconds",
                timeout.as_secs()
            ),
            CaptureError::ElementNotFound(_) => "Card element not found".to_string(),
            CaptureError::Screenshot(_) => "Card image could not be captured".to_string(),
        }
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // /card failures answer in plain text
    #[error("Invalid message parameter: {0}")]
    InvalidMessage(DecodeError),
    #[error("Could not load greeting card template")]
    TemplateUnavailable(#[source] TemplateError),

    // /screenshot failures answer with a JSON payload
    #[error("Invalid message parameter for capture: {0}")]
    InvalidCaptureInput(DecodeError),
    #[error("Screenshot capture failed")]
    Capture(#[source] CaptureError),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<SynthesisError> for AppError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::InvalidMessage(e) => AppError::InvalidMessage(e),
            SynthesisError::Template(e) => AppError::TemplateUnavailable(e),
        }
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

/// JSON body returned by `/screenshot` on failure.
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub error: String,
    pub details: String,
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            // 4xx Client Errors
            AppError::InvalidMessage(e) => {
                tracing::warn!(error = %e, "Rejecting card request with malformed message");
                plain_text(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid message parameter: {}", e),
                )
            }

            // 5xx Server Errors
            AppError::TemplateUnavailable(e) => {
                tracing::error!(error.source = ?e, "Error serving card");
                plain_text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error loading greeting card".to_string(),
                )
            }
            AppError::InvalidCaptureInput(e) => {
                tracing::warn!(error = %e, "Rejecting screenshot request with malformed message");
                json_failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate screenshot",
                    "Invalid message parameter".to_string(),
                )
            }
            AppError::Capture(e) => {
                tracing::error!(category = e.category(), error.detail = %e, "Screenshot error");
                json_failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate screenshot",
                    e.public_message(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                json_failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate screenshot",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn json_failure(status: StatusCode, error: &str, details: String) -> Response {
    let body = FailureBody {
        error: error.to_string(),
        details,
    };
    (status, Json(body)).into_response()
}
