mod support;

use anyhow::Result;
use api_host::{
    config::HostEnvironment,
    modules::{ControllerSet, EndpointGroup, HostModule, ServiceConfigurationContext},
    pipeline::Stage,
    server::AppState,
    versioning::ApiVersion,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use support::{body_json, body_text, dev_config, get, host, send};

#[tokio::test]
async fn test_stage_order() -> Result<()> {
    let host = host(dev_config()).await?;
    assert_eq!(
        host.stages(),
        &[
            Stage::DeveloperExceptionPage,
            Stage::RequestLocalization,
            Stage::CorrelationId,
            Stage::StaticFiles,
            Stage::Routing,
            Stage::Cors,
            Stage::Authentication,
            Stage::Authorization,
            Stage::HealthChecks,
            Stage::Swagger,
            Stage::Auditing,
            Stage::LogEnrichment,
            Stage::UnitOfWork,
            Stage::Endpoints,
        ]
    );
    assert_eq!(
        host.modules(),
        &["caching", "application", "account", "api-host"]
    );
    Ok(())
}

#[tokio::test]
async fn test_health_without_probes() -> Result<()> {
    let host = host(dev_config()).await?;
    let response = get(&host, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["status"], "Healthy");
    assert!(body["totalDurationMs"].is_number());
    assert!(body["entries"].as_object().map(|e| e.is_empty()).unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn test_correlation_id_generated_and_echoed() -> Result<()> {
    let host = host(dev_config()).await?;

    let response = get(&host, "/api/v1/app/info").await?;
    let generated = response
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());

    let response = send(
        &host,
        Request::builder()
            .uri("/api/v1/app/info")
            .header("x-correlation-id", "req-123")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.headers()["x-correlation-id"], "req-123");
    Ok(())
}

#[tokio::test]
async fn test_culture_selection() -> Result<()> {
    let host = host(dev_config()).await?;

    let response = send(
        &host,
        Request::builder()
            .uri("/api/v1/app/info")
            .header("accept-language", "zh-TW,zh;q=0.8,en;q=0.5")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.headers()["content-language"], "zh-Hant");
    let body = body_json(response).await?;
    assert_eq!(body["culture"], "zh-Hant");

    let response = send(
        &host,
        Request::builder()
            .uri("/api/v1/app/info?culture=zh-Hans")
            .header("accept-language", "en")
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(response.headers()["content-language"], "zh-Hans");

    let response = get(&host, "/api/v1/app/info").await?;
    assert_eq!(response.headers()["content-language"], "en");
    Ok(())
}

#[tokio::test]
async fn test_default_version_and_lowercase_paths() -> Result<()> {
    let host = host(dev_config()).await?;

    let response = get(&host, "/api/app/info").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&host, "/API/V1/App/INFO").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&host, "/api/v1.0/app/info").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&host, "/api/v9/app/info").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_version_groups_are_separate() -> Result<()> {
    let host = host(dev_config()).await?;

    // `me` exists only in v2, `info` only in v1
    let response = get(&host, "/api/v2/app/info").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_virtual_files_served_as_fallback() -> Result<()> {
    let host = host(dev_config()).await?;

    let response = get(&host, "/pages/welcome.html").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()?
        .starts_with("text/html"));

    let response = get(&host, "/branding/logo.svg").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&host, "/missing.txt").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await?;
    assert_eq!(body["error"]["code"], "API_HOST_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_development_services() -> Result<()> {
    let host = host(dev_config()).await?;
    let state = host.state();

    assert!(state.vfs.is_physical("domain-shared"));
    assert_eq!(
        state.data_protector.storage(),
        api_host::data_protection::KeyStorage::Ephemeral
    );

    let protected = state.data_protector.protect("test", b"payload").await?;
    assert_eq!(state.data_protector.unprotect("test", &protected).await?, b"payload");
    Ok(())
}

fn panicking_routes() -> Router<AppState> {
    Router::new().route(
        "/now",
        axum::routing::get(|| async {
            if true {
                panic!("handler exploded");
            }
            "unreachable"
        }),
    )
}

fn no_docs() -> utoipa::openapi::OpenApi {
    utoipa::openapi::OpenApiBuilder::new().build()
}

struct PanickingModule;

#[async_trait]
impl HostModule for PanickingModule {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn pre_configure_services(
        &self,
        ctx: &mut ServiceConfigurationContext,
    ) -> api_host::Result<()> {
        ctx.controllers.create(ControllerSet {
            name: "panicking",
            root: "boom",
            requires_authentication: false,
            groups: vec![EndpointGroup {
                version: ApiVersion::new(1, 0),
                routes: panicking_routes,
                openapi: no_docs,
            }],
        })?;
        Ok(())
    }

    async fn configure_services(&self, _ctx: &mut ServiceConfigurationContext) -> api_host::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_developer_exception_page() -> Result<()> {
    let host = api_host::Host::builder(dev_config())
        .add_module(PanickingModule)
        .build()
        .await?;

    let response = get(&host, "/api/v1/boom/now").await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await?;
    assert!(body.contains("handler exploded"));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_redis_aborts_startup_outside_development() -> Result<()> {
    let mut config = api_host::Config {
        environment: HostEnvironment::Production,
        ..Default::default()
    };
    config.redis.configuration = "redis://127.0.0.1:1".to_string();

    let result = api_host::Host::builder(config).build().await;
    assert!(matches!(result, Err(api_host::Error::Redis(_))));
    Ok(())
}

#[tokio::test]
async fn test_invalid_key_lifetime_aborts_startup() -> Result<()> {
    for days in [0, i64::MAX] {
        let mut config = dev_config();
        config.data_protection.key_lifetime_days = days;
        let result = api_host::Host::builder(config).build().await;
        assert!(matches!(result, Err(api_host::Error::Config(_))));
    }
    Ok(())
}
