mod support;

use anyhow::Result;
use api_host::config::AuthMode;
use axum::http::StatusCode;
use support::{body_json, dev_config, get, host};

#[tokio::test]
async fn test_one_document_per_major_version() -> Result<()> {
    let host = host(dev_config()).await?;

    let response = get(&host, "/swagger/v1/swagger.json").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let v1 = body_json(response).await?;
    let paths = v1["paths"].as_object().cloned().unwrap_or_default();
    assert!(paths.contains_key("/api/v1/app/info"));
    assert!(paths.contains_key("/api/v1/account/profile"));
    assert!(!paths.keys().any(|p| p.contains("{version}") || p.contains("/v2/")));
    assert_eq!(v1["info"]["version"], "v1");
    assert!(v1["info"]["contact"]["name"].is_string());

    let response = get(&host, "/swagger/v2/swagger.json").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let v2 = body_json(response).await?;
    let paths = v2["paths"].as_object().cloned().unwrap_or_default();
    assert_eq!(paths.keys().collect::<Vec<_>>(), vec!["/api/v2/account/me"]);
    Ok(())
}

#[tokio::test]
async fn test_parameters_camel_cased_without_version() -> Result<()> {
    let host = host(dev_config()).await?;
    let v2 = body_json(get(&host, "/swagger/v2/swagger.json").await?).await?;

    let parameters = v2["paths"]["/api/v2/account/me"]["get"]["parameters"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let names: Vec<_> = parameters
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, vec!["includeClaims"]);
    Ok(())
}

#[tokio::test]
async fn test_bearer_scheme_in_local_mode() -> Result<()> {
    let host = host(dev_config()).await?;
    let v1 = body_json(get(&host, "/swagger/v1/swagger.json").await?).await?;

    let scheme = &v1["components"]["securitySchemes"]["bearer"];
    assert_eq!(scheme["type"], "http");
    assert_eq!(scheme["scheme"], "bearer");
    assert!(v1["components"]["securitySchemes"]["oauth2"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_oauth_scheme_in_remote_mode() -> Result<()> {
    let mut config = dev_config();
    config.auth_server.mode = AuthMode::Remote;
    config.auth_server.authority = "https://auth.example.com/".to_string();
    let host = host(config).await?;

    let v1 = body_json(get(&host, "/swagger/v1/swagger.json").await?).await?;
    let flow = &v1["components"]["securitySchemes"]["oauth2"]["flows"]["authorizationCode"];
    assert_eq!(
        flow["authorizationUrl"],
        "https://auth.example.com/connect/authorize"
    );
    assert_eq!(flow["tokenUrl"], "https://auth.example.com/connect/token");
    assert!(flow["scopes"]["ApiHost"].is_string());
    Ok(())
}
