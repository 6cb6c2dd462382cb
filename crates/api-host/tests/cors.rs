mod support;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use support::{dev_config, host, send};

fn config() -> api_host::Config {
    let mut config = dev_config();
    config.app.cors_origins = "https://a.com/,https://*.example.com".to_string();
    config
}

#[tokio::test]
async fn test_preflight_from_allowed_origin() -> Result<()> {
    let host = host(config()).await?;

    let response = send(
        &host,
        Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/account/profile")
            .header("origin", "https://a.com")
            .header("access-control-request-method", "PUT")
            .header("access-control-request-headers", "authorization,content-type")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "https://a.com");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-methods"], "PUT");
    assert_eq!(
        headers["access-control-allow-headers"],
        "authorization,content-type"
    );
    Ok(())
}

#[tokio::test]
async fn test_wildcard_subdomain_and_exposed_header() -> Result<()> {
    let host = host(config()).await?;

    let response = send(
        &host,
        Request::builder()
            .uri("/api/v1/app/info")
            .header("origin", "https://portal.example.com")
            .body(Body::empty())?,
    )
    .await?;

    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://portal.example.com"
    );
    assert!(headers["access-control-expose-headers"]
        .to_str()?
        .contains("token-expired"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_origin_not_allowed() -> Result<()> {
    let host = host(config()).await?;

    let response = send(
        &host,
        Request::builder()
            .uri("/api/v1/app/info")
            .header("origin", "https://evil.com")
            .body(Body::empty())?,
    )
    .await?;

    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
    Ok(())
}
