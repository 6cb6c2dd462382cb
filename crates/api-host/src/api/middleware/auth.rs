//! Bearer authentication and the authorization gate

use crate::{auth::CurrentUser, error::Error, server::AppState};
use axum::{
    extract::{Request, State},
    http::{
        header::{HeaderName, AUTHORIZATION},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Set to `true` on responses to requests whose token had expired
pub const TOKEN_EXPIRED_HEADER: &str = "token-expired";

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Attach the caller to the request when a valid token is presented.
///
/// A rejected token does not fail the request; it continues anonymously
/// and the authorization gate decides.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = bearer_token(req.headers()).map(str::to_string);

    let mut expired = false;
    if let Some(token) = token {
        match state.auth.validate(&token).await {
            Ok(user) => {
                debug!(user_id = %user.id, "Authenticated request");
                req.extensions_mut().insert(user);
            }
            Err(failure) => {
                debug!(kind = ?failure.kind, reason = %failure.message, "Bearer token rejected");
                expired = failure.is_expired();
            }
        }
    }

    let mut response = next.run(req).await;
    if expired {
        response.headers_mut().insert(
            HeaderName::from_static(TOKEN_EXPIRED_HEADER),
            HeaderValue::from_static("true"),
        );
    }
    response
}

/// Answer 401 for protected controller sets when no caller is attached
pub async fn authorize(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Error> {
    if req.extensions().get::<CurrentUser>().is_none()
        && state.authorization.requires_user(req.uri().path())
    {
        return Err(Error::Authentication {
            message: "Authentication required".to_string(),
        });
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer  abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
