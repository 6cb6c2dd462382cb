//! Developer exception page

use crate::error::{ErrorDetails, ErrorResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use tracing::error;

/// Turn a handler panic into a 500 carrying the panic message.
///
/// Only installed in development.
pub fn developer_exception_page(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "handler panicked".to_string()
    };

    error!(panic = %detail, "Unhandled exception in request handler");

    let body = ErrorResponse {
        error: ErrorDetails {
            code: "API_HOST_UNHANDLED_EXCEPTION".to_string(),
            message: detail,
            timestamp: chrono::Utc::now(),
            retryable: false,
        },
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
