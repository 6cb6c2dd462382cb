//! OpenAPI documents and Swagger UI
//!
//! Endpoint groups contribute OpenAPI fragments whose paths carry the
//! `v{version}` token. One document is produced per major version; a
//! fragment lands in document `vN` only when its group name is `vN`.

use crate::config::{AuthMode, AuthServerConfig};
use crate::versioning::{ApiVersion, VERSION_TOKEN};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use utoipa::openapi::{
    path::Operation,
    security::{
        AuthorizationCode, Flow, HttpAuthScheme, HttpBuilder, OAuth2, Scopes, SecurityRequirement,
        SecurityScheme,
    },
    Components, ContactBuilder, InfoBuilder, OpenApi, OpenApiBuilder, Paths,
};
use utoipa_swagger_ui::{oauth, SwaggerUi, Url};

pub const DOCUMENT_TITLE: &str = "ApiHost API";

/// Description overlays merged into every document when present
pub const DOC_OVERLAY_FILES: [&str; 3] = [
    "docs/api-host.json",
    "docs/application.json",
    "docs/account.json",
];

/// Scope requested by the Swagger UI in remote mode
pub const API_SCOPE: &str = "ApiHost";

const CONTACT_NAME: &str = "ApiHost Team";
const CONTACT_EMAIL: &str = "api@apihost.local";
const CONTACT_URL: &str = "https://apihost.local";

/// How documents describe authentication
#[derive(Debug, Clone)]
pub enum DocumentSecurity {
    OAuth2 {
        authorization_url: String,
        token_url: String,
    },
    Bearer,
}

impl DocumentSecurity {
    pub fn for_auth(config: &AuthServerConfig) -> Self {
        match config.mode {
            AuthMode::Remote => DocumentSecurity::OAuth2 {
                authorization_url: format!("{}/connect/authorize", config.authority_base()),
                token_url: format!("{}/connect/token", config.authority_base()),
            },
            AuthMode::Local => DocumentSecurity::Bearer,
        }
    }

    fn scheme_name(&self) -> &'static str {
        match self {
            DocumentSecurity::OAuth2 { .. } => "oauth2",
            DocumentSecurity::Bearer => "bearer",
        }
    }

    fn scheme(&self) -> SecurityScheme {
        match self {
            DocumentSecurity::OAuth2 {
                authorization_url,
                token_url,
            } => SecurityScheme::OAuth2(OAuth2::new([Flow::AuthorizationCode(
                AuthorizationCode::new(
                    authorization_url,
                    token_url,
                    Scopes::from_iter([(API_SCOPE, "ApiHost API")]),
                ),
            )])),
            DocumentSecurity::Bearer => SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        }
    }

    fn requirement(&self) -> SecurityRequirement {
        match self {
            DocumentSecurity::OAuth2 { .. } => {
                SecurityRequirement::new(self.scheme_name(), [API_SCOPE])
            }
            DocumentSecurity::Bearer => {
                SecurityRequirement::new(self.scheme_name(), Vec::<String>::new())
            }
        }
    }
}

/// OAuth client injected into the Swagger UI
#[derive(Debug, Clone)]
pub struct SwaggerClient {
    pub client_id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerOptions {
    pub security: DocumentSecurity,
    pub client: Option<SwaggerClient>,
    /// Directory the overlay files are resolved against
    pub overlay_dir: Option<PathBuf>,
}

impl Default for SwaggerOptions {
    fn default() -> Self {
        Self {
            security: DocumentSecurity::Bearer,
            client: None,
            overlay_dir: None,
        }
    }
}

impl SwaggerOptions {
    /// Options for the configured auth mode, with overlays next to the executable
    pub fn for_auth(config: &AuthServerConfig) -> Self {
        let client = match config.mode {
            AuthMode::Remote => config.swagger_client_id.clone().map(|client_id| SwaggerClient {
                client_id,
                client_secret: config.swagger_client_secret.clone(),
            }),
            AuthMode::Local => None,
        };

        Self {
            security: DocumentSecurity::for_auth(config),
            client,
            overlay_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        }
    }
}

/// Summary and description supplied for an operation id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationOverlay {
    pub summary: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocOverlay {
    #[serde(default)]
    pub operations: HashMap<String, OperationOverlay>,
}

/// Read the overlay files under `dir`, skipping missing or malformed ones
pub fn load_overlays(dir: &Path) -> Vec<DocOverlay> {
    DOC_OVERLAY_FILES
        .iter()
        .filter_map(|file| {
            let path = dir.join(file);
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(_) => {
                    debug!(path = %path.display(), "No documentation overlay");
                    return None;
                }
            };
            match serde_json::from_str::<DocOverlay>(&raw) {
                Ok(overlay) => Some(overlay),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed documentation overlay");
                    None
                }
            }
        })
        .collect()
}

/// Whether an operation of `version` belongs to `document`
pub fn include_in_document(document: &str, version: ApiVersion) -> bool {
    version.group_name() == document
}

/// `first_name`, `First-Name` and `FirstName` all become `firstName`
pub fn to_camel_case(name: &str) -> String {
    let mut joined: Vec<char> = Vec::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            upper_next = !joined.is_empty();
            continue;
        }
        if upper_next {
            joined.extend(c.to_uppercase());
        } else {
            joined.push(c);
        }
        upper_next = false;
    }

    // Lowercase the leading run of capitals, keeping the one that starts the next word
    for i in 0..joined.len() {
        if !joined[i].is_uppercase() {
            break;
        }
        let next_is_lower = joined.get(i + 1).is_some_and(|c| c.is_lowercase());
        if i > 0 && next_is_lower {
            break;
        }
        joined[i] = joined[i].to_ascii_lowercase();
    }
    joined.into_iter().collect()
}

/// Drop the version path parameter and camelCase the rest
fn prepare_operation(operation: &mut Operation) {
    if let Some(parameters) = operation.parameters.as_mut() {
        parameters.retain(|p| p.name != "version");
        for parameter in parameters.iter_mut() {
            parameter.name = to_camel_case(&parameter.name);
        }
    }
}

fn apply_overlay(openapi: &mut OpenApi, overlay: &DocOverlay) {
    for item in openapi.paths.paths.values_mut() {
        for operation in item.operations.values_mut() {
            let Some(doc) = operation
                .operation_id
                .as_ref()
                .and_then(|id| overlay.operations.get(id))
            else {
                continue;
            };
            if let Some(summary) = &doc.summary {
                operation.summary = Some(summary.clone());
            }
            if let Some(description) = &doc.description {
                operation.description = Some(description.clone());
            }
        }
    }
}

/// A generated document
pub struct ApiDocument {
    pub name: String,
    pub openapi: OpenApi,
}

/// Every generated document, newest version first
pub struct ApiDocumentation {
    documents: Vec<ApiDocument>,
}

impl ApiDocumentation {
    pub fn build(fragments: &[(ApiVersion, OpenApi)], options: &SwaggerOptions) -> Self {
        let overlays = options
            .overlay_dir
            .as_deref()
            .map(load_overlays)
            .unwrap_or_default();

        let mut majors: Vec<u32> = fragments.iter().map(|(v, _)| v.major).collect();
        majors.sort_unstable_by(|a, b| b.cmp(a));
        majors.dedup();

        let documents = majors
            .into_iter()
            .map(|major| {
                let name = format!("v{major}");
                let mut openapi = Self::document(&name, fragments, options);
                for overlay in &overlays {
                    apply_overlay(&mut openapi, overlay);
                }
                ApiDocument { name, openapi }
            })
            .collect();

        Self { documents }
    }

    fn document(name: &str, fragments: &[(ApiVersion, OpenApi)], options: &SwaggerOptions) -> OpenApi {
        let info = InfoBuilder::new()
            .title(DOCUMENT_TITLE)
            .version(name)
            .contact(Some(
                ContactBuilder::new()
                    .name(Some(CONTACT_NAME))
                    .email(Some(CONTACT_EMAIL))
                    .url(Some(CONTACT_URL))
                    .build(),
            ))
            .build();

        let mut paths = Paths::new();
        let mut components = Components::new();
        let mut tags = Vec::new();

        for (version, fragment) in fragments {
            if !include_in_document(name, *version) {
                continue;
            }

            for (path, item) in &fragment.paths.paths {
                let mut item = item.clone();
                for operation in item.operations.values_mut() {
                    prepare_operation(operation);
                }

                let path = path.replace(VERSION_TOKEN, name);
                match paths.paths.get_mut(&path) {
                    Some(existing) => existing.operations.extend(item.operations),
                    None => {
                        paths.paths.insert(path, item);
                    }
                }
            }

            if let Some(fragment_components) = &fragment.components {
                components
                    .schemas
                    .extend(fragment_components.schemas.clone());
                components
                    .responses
                    .extend(fragment_components.responses.clone());
            }

            for tag in fragment.tags.iter().flatten() {
                if !tags.iter().any(|t: &utoipa::openapi::Tag| t.name == tag.name) {
                    tags.push(tag.clone());
                }
            }
        }

        components.add_security_scheme(options.security.scheme_name(), options.security.scheme());

        let mut openapi = OpenApiBuilder::new().info(info).build();
        openapi.paths = paths;
        openapi.components = Some(components);
        openapi.security = Some(vec![options.security.requirement()]);
        if !tags.is_empty() {
            openapi.tags = Some(tags);
        }
        openapi
    }

    pub fn documents(&self) -> &[ApiDocument] {
        &self.documents
    }

    pub fn get(&self, name: &str) -> Option<&OpenApi> {
        self.documents
            .iter()
            .find(|d| d.name == name)
            .map(|d| &d.openapi)
    }

    /// JSON route of a document
    pub fn json_path(name: &str) -> String {
        format!("/swagger/{name}/swagger.json")
    }

    /// Swagger UI serving every document
    pub fn swagger_ui(&self, options: &SwaggerOptions) -> SwaggerUi {
        let urls = self
            .documents
            .iter()
            .map(|doc| {
                let label = intern(format!("{DOCUMENT_TITLE} {}", doc.name));
                (
                    Url::new(label, intern(Self::json_path(&doc.name))),
                    doc.openapi.clone(),
                )
            })
            .collect();

        let mut ui = SwaggerUi::new("/swagger").urls(urls);
        if let (DocumentSecurity::OAuth2 { .. }, Some(client)) = (&options.security, &options.client) {
            let mut config = oauth::Config::new()
                .client_id(&client.client_id)
                .scopes(vec![API_SCOPE.to_string()])
                .use_pkce_with_authorization_code_grant(true);
            if let Some(secret) = &client.client_secret {
                config = config.client_secret(secret);
            }
            ui = ui.oauth(config);
        }
        ui
    }
}

/// `'static` copy of a Swagger UI string, allocated once per distinct value
fn intern(value: String) -> &'static str {
    static INTERNED: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();

    let mut interned = INTERNED.get_or_init(Default::default).lock();
    if let Some(existing) = interned.get(value.as_str()) {
        return *existing;
    }
    let leaked: &'static str = Box::leak(value.into_boxed_str());
    interned.insert(leaked);
    leaked
}
