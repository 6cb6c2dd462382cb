//! Virtual file serving

use crate::{error::Error, server::AppState};
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, Method, Uri},
    response::{IntoResponse, Response},
};

/// Router fallback serving module assets from the virtual file system
pub async fn virtual_file(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, Error> {
    let not_found = || Error::NotFound {
        resource: uri.path().to_string(),
    };

    if method != Method::GET && method != Method::HEAD {
        return Err(not_found());
    }

    let bytes = state.vfs.read(uri.path()).await.ok_or_else(not_found)?;
    let mime = mime_guess::from_path(uri.path()).first_or_octet_stream();

    Ok(([(CONTENT_TYPE, mime.to_string())], bytes.into_owned()).into_response())
}
