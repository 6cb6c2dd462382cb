//! Request culture selection

use crate::{
    localization::{culture_from_query, RequestCulture},
    server::AppState,
};
use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT_LANGUAGE, CONTENT_LANGUAGE},
        HeaderValue,
    },
    middleware::Next,
    response::Response,
};

/// Resolve the culture from `?culture=` then `Accept-Language`, expose it
/// to handlers and announce it in `Content-Language`
pub async fn localize_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let from_query = req.uri().query().and_then(culture_from_query);
    let accept_language = req
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    let culture = state
        .localizer
        .resolve_culture(from_query.as_deref(), accept_language);

    req.extensions_mut().insert(RequestCulture(culture.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&culture) {
        response.headers_mut().insert(CONTENT_LANGUAGE, value);
    }
    response
}
