//! URL-segment API versioning
//!
//! Routes live under `/api/v{major}/...`. Requests without a version segment
//! are routed to the default version, `v{major}.{minor}` segments resolve to
//! the registered version's group, and known literal segments are matched
//! case-insensitively by lowercasing them before routing.

use axum::http::{uri::PathAndQuery, Request, Uri};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::trace;

/// Root segment of every versioned API route
pub const API_ROOT: &str = "api";

/// Placeholder for the version segment in route and document templates
pub const VERSION_TOKEN: &str = "v{version}";

/// An API version, `major.minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    /// Version used when a request does not name one
    pub const DEFAULT: ApiVersion = ApiVersion::new(1, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Document and route group name, `'v' + major`
    pub fn group_name(&self) -> String {
        format!("v{}", self.major)
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    /// Accepts `1`, `1.0`, `v1` and `v1.0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(['v', 'V']).unwrap_or(s);
        let (major, minor) = match raw.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (raw, "0"),
        };

        let major = major
            .parse::<u32>()
            .map_err(|_| format!("invalid API version: {s}"))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|_| format!("invalid API version: {s}"))?;

        Ok(Self { major, minor })
    }
}

/// Version that routing resolved for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedApiVersion(pub ApiVersion);

/// Versioning options registered during service configuration
#[derive(Debug, Clone)]
pub struct ApiVersioningOptions {
    pub default_version: ApiVersion,
    pub assume_default_when_unspecified: bool,
    pub lowercase_urls: bool,
}

impl Default for ApiVersioningOptions {
    fn default() -> Self {
        Self {
            default_version: ApiVersion::DEFAULT,
            assume_default_when_unspecified: true,
            lowercase_urls: true,
        }
    }
}

/// Rewrites request paths before they reach the router
#[derive(Debug, Clone)]
pub struct ApiPathNormalizer {
    options: ApiVersioningOptions,
    versions: BTreeSet<ApiVersion>,
    literals: HashSet<String>,
}

impl ApiPathNormalizer {
    /// `versions` are the registered API versions; `literals` the lowercase
    /// literal route segments that may be matched case-insensitively.
    pub fn new(
        options: ApiVersioningOptions,
        versions: BTreeSet<ApiVersion>,
        literals: HashSet<String>,
    ) -> Self {
        Self {
            options,
            versions,
            literals,
        }
    }

    /// Resolve a version segment to a registered version
    fn resolve_version(&self, segment: &str) -> Option<ApiVersion> {
        if !segment.starts_with(['v', 'V']) {
            return None;
        }
        let requested: ApiVersion = segment.parse().ok()?;

        // `v2` names the group, `v2.1` names an exact version
        if segment.contains('.') {
            self.versions.get(&requested).copied()
        } else {
            self.versions
                .iter()
                .find(|v| v.major == requested.major)
                .copied()
        }
    }

    fn normalize_segment(&self, segment: &str) -> String {
        if !self.options.lowercase_urls {
            return segment.to_string();
        }
        let lower = segment.to_ascii_lowercase();
        if lower == API_ROOT || self.literals.contains(&lower) {
            lower
        } else {
            segment.to_string()
        }
    }

    /// Normalize a request path, returning it with the resolved version
    pub fn normalize_path(&self, path: &str) -> (String, Option<ApiVersion>) {
        let segments: Vec<&str> = path.split('/').skip(1).collect();

        let is_api = segments
            .first()
            .map(|s| s.eq_ignore_ascii_case(API_ROOT))
            .unwrap_or(false);
        if !is_api {
            return (path.to_string(), None);
        }

        let mut out = vec![self.normalize_segment(segments[0])];
        let mut rest = &segments[1..];

        let version = match rest.first().and_then(|s| self.resolve_version(s)) {
            Some(version) => {
                rest = &rest[1..];
                Some(version)
            }
            None => {
                let looks_versioned = rest
                    .first()
                    .map(|s| s.starts_with(['v', 'V']) && s.parse::<ApiVersion>().is_ok())
                    .unwrap_or(false);
                if looks_versioned || !self.options.assume_default_when_unspecified {
                    // Unknown version: leave the path for the router to reject
                    return (path.to_string(), None);
                }
                Some(self.options.default_version)
            }
        };

        if let Some(version) = version {
            out.push(version.group_name());
        }
        out.extend(rest.iter().map(|s| self.normalize_segment(s)));

        (format!("/{}", out.join("/")), version)
    }

    /// Rewrite the request URI in place and record the resolved version
    pub fn rewrite<B>(&self, req: &mut Request<B>) {
        let (path, version) = self.normalize_path(req.uri().path());

        if path != req.uri().path() {
            let path_and_query = match req.uri().query() {
                Some(query) => format!("{path}?{query}"),
                None => path,
            };
            let mut parts = req.uri().clone().into_parts();
            if let Ok(pq) = path_and_query.parse::<PathAndQuery>() {
                parts.path_and_query = Some(pq);
                if let Ok(uri) = Uri::from_parts(parts) {
                    trace!(from = %req.uri(), to = %uri, "Normalized API path");
                    *req.uri_mut() = uri;
                }
            }
        }

        if let Some(version) = version {
            req.extensions_mut().insert(RequestedApiVersion(version));
        }
    }
}

/// Layer applying [`ApiPathNormalizer`] in front of the router
#[derive(Debug, Clone)]
pub struct NormalizeApiPathLayer {
    normalizer: Arc<ApiPathNormalizer>,
}

impl NormalizeApiPathLayer {
    pub fn new(normalizer: ApiPathNormalizer) -> Self {
        Self {
            normalizer: Arc::new(normalizer),
        }
    }
}

impl<S> Layer<S> for NormalizeApiPathLayer {
    type Service = NormalizeApiPath<S>;

    fn layer(&self, inner: S) -> Self::Service {
        NormalizeApiPath {
            inner,
            normalizer: self.normalizer.clone(),
        }
    }
}

/// Service wrapper produced by [`NormalizeApiPathLayer`]
#[derive(Debug, Clone)]
pub struct NormalizeApiPath<S> {
    inner: S,
    normalizer: Arc<ApiPathNormalizer>,
}

impl<S, B> Service<Request<B>> for NormalizeApiPath<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        self.normalizer.rewrite(&mut req);
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> ApiPathNormalizer {
        let versions = [ApiVersion::new(1, 0), ApiVersion::new(2, 0)]
            .into_iter()
            .collect();
        let literals = ["app", "info", "account", "profile"]
            .into_iter()
            .map(String::from)
            .collect();
        ApiPathNormalizer::new(ApiVersioningOptions::default(), versions, literals)
    }

    #[test]
    fn test_parse_versions() {
        assert_eq!("1.0".parse::<ApiVersion>().unwrap(), ApiVersion::new(1, 0));
        assert_eq!("2".parse::<ApiVersion>().unwrap(), ApiVersion::new(2, 0));
        assert_eq!("v3.1".parse::<ApiVersion>().unwrap(), ApiVersion::new(3, 1));
        assert!("vx".parse::<ApiVersion>().is_err());
        assert!("1.x".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_display_and_group_name() {
        let version = ApiVersion::new(2, 1);
        assert_eq!(version.to_string(), "2.1");
        assert_eq!(version.group_name(), "v2");
        assert_eq!(ApiVersion::default().to_string(), "1.0");
    }

    #[test]
    fn test_unversioned_path_uses_default() {
        let (path, version) = normalizer().normalize_path("/api/app/info");
        assert_eq!(path, "/api/v1/app/info");
        assert_eq!(version, Some(ApiVersion::new(1, 0)));
    }

    #[test]
    fn test_explicit_versions() {
        let n = normalizer();
        assert_eq!(n.normalize_path("/api/v2/account/me").0, "/api/v2/account/me");
        assert_eq!(
            n.normalize_path("/api/v1.0/app/info"),
            ("/api/v1/app/info".to_string(), Some(ApiVersion::new(1, 0)))
        );
    }

    #[test]
    fn test_unknown_version_left_alone() {
        let n = normalizer();
        assert_eq!(n.normalize_path("/api/v9/app/info"), ("/api/v9/app/info".to_string(), None));
        assert_eq!(n.normalize_path("/api/v2.7/app/info").1, None);
    }

    #[test]
    fn test_literal_segments_lowercased() {
        let (path, _) = normalizer().normalize_path("/API/V1/App/Info");
        assert_eq!(path, "/api/v1/app/info");

        // Unknown segments keep their case
        let (path, _) = normalizer().normalize_path("/api/v1/account/Profile/AbC");
        assert_eq!(path, "/api/v1/account/profile/AbC");
    }

    #[test]
    fn test_non_api_paths_untouched() {
        let n = normalizer();
        assert_eq!(n.normalize_path("/health").0, "/health");
        assert_eq!(n.normalize_path("/swagger/v1/swagger.json").0, "/swagger/v1/swagger.json");
        assert_eq!(n.normalize_path("/apiary/x").0, "/apiary/x");
    }

    #[test]
    fn test_rewrite_keeps_query() {
        let mut req = Request::builder()
            .uri("/api/account/me?includeClaims=true")
            .body(())
            .unwrap();
        normalizer().rewrite(&mut req);
        assert_eq!(req.uri().path(), "/api/v1/account/me");
        assert_eq!(req.uri().query(), Some("includeClaims=true"));
        assert_eq!(
            req.extensions().get::<RequestedApiVersion>(),
            Some(&RequestedApiVersion(ApiVersion::DEFAULT))
        );
    }
}
