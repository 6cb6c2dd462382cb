//! Cross-origin policy

use super::auth::TOKEN_EXPIRED_HEADER;
use axum::http::{request::Parts, HeaderName, HeaderValue};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Origins admitted by the CORS stage
#[derive(Debug, Clone, Default)]
pub struct CorsOptions {
    pub origins: Vec<String>,
}

/// Match an origin against configured origins.
///
/// `https://*.example.com` admits any subdomain of `example.com` over https
/// but not `example.com` itself.
pub fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    let origin = origin.to_ascii_lowercase();
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        if pattern == origin {
            return true;
        }
        match pattern.split_once("://*.") {
            Some((scheme, domain)) => origin
                .strip_prefix(scheme)
                .and_then(|rest| rest.strip_prefix("://"))
                .and_then(|host| host.strip_suffix(domain))
                .map(|sub| sub.len() > 1 && sub.ends_with('.'))
                .unwrap_or(false),
            None => false,
        }
    })
}

/// Credentialed CORS over the configured origins, mirroring requested
/// methods and headers
pub fn cors_layer(origins: Vec<String>) -> CorsLayer {
    let origins = Arc::new(origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| origin_allowed(&origins, o))
                    .unwrap_or(false)
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(TOKEN_EXPIRED_HEADER)])
}
