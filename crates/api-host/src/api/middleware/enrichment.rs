//! Per-request log context

use super::correlation::correlation_id;
use crate::{auth::CurrentUser, localization::RequestCulture};
use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info_span, Instrument};

/// Run the rest of the pipeline inside a span carrying the correlation id,
/// user id and culture
pub async fn enrich_logs(req: Request, next: Next) -> Response {
    let correlation = correlation_id(req.headers()).unwrap_or_else(|| "-".to_string());
    let user_id = req
        .extensions()
        .get::<CurrentUser>()
        .map(|u| u.id.clone())
        .unwrap_or_else(|| "-".to_string());
    let culture = req
        .extensions()
        .get::<RequestCulture>()
        .map(|c| c.0.clone())
        .unwrap_or_default();

    let span = info_span!(
        "request_context",
        correlation_id = %correlation,
        user_id = %user_id,
        culture = %culture,
    );

    next.run(req).instrument(span).await
}
