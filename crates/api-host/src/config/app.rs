//! Application configuration

use serde::{Deserialize, Serialize};

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, used as the audit tag
    pub name: String,

    /// Public URL of this host
    pub self_url: String,

    /// Comma-separated list of allowed CORS origins
    pub cors_origins: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "ApiHost".to_string(),
            self_url: "https://localhost:44300".to_string(),
            cors_origins: "https://*.apihost.local,http://localhost:4200".to_string(),
        }
    }
}

impl AppConfig {
    /// Allowed origins in configured order, each without its trailing `/`
    pub fn cors_origins(&self) -> Vec<String> {
        parse_origins(&self.cors_origins)
    }
}

/// Split a comma-separated origin list, dropping blanks and one trailing `/`
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.strip_suffix('/').unwrap_or(origin).to_string())
        .collect()
}

/// Optional connection strings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStrings {
    /// PostgreSQL URL probed by the database health check
    pub default: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_stripped() {
        let origins = parse_origins("https://a.com/,https://b.com");
        assert_eq!(origins, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn test_blank_entries_dropped() {
        let origins = parse_origins(" https://a.com , ,https://b.com/ ,");
        assert_eq!(origins, vec!["https://a.com", "https://b.com"]);
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_only_one_slash_removed() {
        assert_eq!(parse_origins("https://a.com//"), vec!["https://a.com/"]);
    }
}
