//! Localized text lookup and request culture selection

use crate::error::Result;
use crate::vfs::VirtualFileSystem;
use common::ConfigurationError;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Cultures served when nothing else is configured
pub const SUPPORTED_CULTURES: [&str; 3] = ["zh-Hans", "zh-Hant", "en"];

/// Culture used when a request names none or an unsupported one
pub const DEFAULT_CULTURE: &str = "en";

/// Regional tags mapped onto the script cultures that carry the texts
const CULTURE_ALIASES: [(&str, &str); 6] = [
    ("zh", "zh-Hans"),
    ("zh-CN", "zh-Hans"),
    ("zh-SG", "zh-Hans"),
    ("zh-TW", "zh-Hant"),
    ("zh-HK", "zh-Hant"),
    ("zh-MO", "zh-Hant"),
];

/// Culture selected for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCulture(pub String);

/// A named text resource and where its files live
#[derive(Debug, Clone)]
pub struct LocalizationResourceOptions {
    pub name: String,
    pub base: Option<String>,
    /// Virtual directory holding one `{culture}.json` per culture
    pub virtual_path: String,
}

#[derive(Debug, Clone)]
pub struct LocalizationOptions {
    pub supported_cultures: Vec<String>,
    pub default_culture: String,
    pub resources: Vec<LocalizationResourceOptions>,
    /// Resource used by [`Localizer::text`]
    pub default_resource: Option<String>,
}

impl Default for LocalizationOptions {
    fn default() -> Self {
        Self {
            supported_cultures: SUPPORTED_CULTURES.iter().map(|c| c.to_string()).collect(),
            default_culture: DEFAULT_CULTURE.to_string(),
            resources: Vec::new(),
            default_resource: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResourceFile {
    culture: String,
    texts: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Resource {
    base: Option<String>,
    cultures: HashMap<String, HashMap<String, String>>,
}

/// Resolves localized texts with culture and resource fallback
#[derive(Debug)]
pub struct Localizer {
    options: LocalizationOptions,
    resources: HashMap<String, Resource>,
}

/// Base chain starting at `start`, if it leads back to a resource already visited
fn base_cycle<'a>(
    resources: &'a [LocalizationResourceOptions],
    start: &'a str,
) -> Option<Vec<&'a str>> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(base) = resources
        .iter()
        .find(|r| r.name == current)
        .and_then(|r| r.base.as_deref())
    {
        let seen = chain.contains(&base);
        chain.push(base);
        if seen {
            return Some(chain);
        }
        current = base;
    }
    None
}

impl Localizer {
    /// Load every configured resource from the virtual file system
    pub async fn load(options: LocalizationOptions, vfs: &VirtualFileSystem) -> Result<Self> {
        let mut resources = HashMap::new();

        for resource in &options.resources {
            if let Some(base) = &resource.base {
                if !options.resources.iter().any(|r| &r.name == base) {
                    return Err(ConfigurationError::validation_failed(format!(
                        "localization resource '{}' extends unknown resource '{base}'",
                        resource.name
                    ))
                    .into());
                }
            }
            if let Some(cycle) = base_cycle(&options.resources, &resource.name) {
                return Err(ConfigurationError::validation_failed(format!(
                    "localization resource '{}' has a cyclic base chain: {}",
                    resource.name,
                    cycle.join(" -> ")
                ))
                .into());
            }

            let mut loaded = Resource {
                base: resource.base.clone(),
                cultures: HashMap::new(),
            };
            for culture in &options.supported_cultures {
                let path = format!("{}/{culture}.json", resource.virtual_path);
                let Some(bytes) = vfs.read(&path).await else {
                    debug!(resource = %resource.name, culture = %culture, "No texts for culture");
                    continue;
                };
                let file: ResourceFile = serde_json::from_slice(&bytes)?;
                if !file.culture.eq_ignore_ascii_case(culture) {
                    warn!(path = %path, declared = %file.culture, "Culture mismatch in resource file");
                }
                loaded.cultures.insert(culture.clone(), file.texts);
            }
            resources.insert(resource.name.clone(), loaded);
        }

        Ok(Self::from_parts(options, resources))
    }

    fn from_parts(options: LocalizationOptions, resources: HashMap<String, Resource>) -> Self {
        Self { options, resources }
    }

    pub fn default_culture(&self) -> &str {
        &self.options.default_culture
    }

    pub fn supported_cultures(&self) -> &[String] {
        &self.options.supported_cultures
    }

    /// Text from the default resource
    pub fn text(&self, culture: &str, key: &str) -> String {
        match &self.options.default_resource {
            Some(resource) => self.get(resource, culture, key),
            None => key.to_string(),
        }
    }

    /// Look up `key`, trying each culture in the fallback chain against the
    /// resource and then its bases. Falls back to the key itself.
    pub fn get(&self, resource: &str, culture: &str, key: &str) -> String {
        for culture in self.culture_chain(culture) {
            let mut next = Some(resource);
            while let Some(name) = next {
                let Some(res) = self.resources.get(name) else {
                    break;
                };
                if let Some(text) = res.cultures.get(&culture).and_then(|t| t.get(key)) {
                    return text.clone();
                }
                next = res.base.as_deref();
            }
        }
        key.to_string()
    }

    /// Requested culture, its parents, then the default culture
    fn culture_chain(&self, culture: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = culture;
        loop {
            chain.push(current.to_string());
            match current.rsplit_once('-') {
                Some((parent, _)) => current = parent,
                None => break,
            }
        }
        if !chain.iter().any(|c| c == &self.options.default_culture) {
            chain.push(self.options.default_culture.clone());
        }
        chain
    }

    /// Map a culture tag onto a supported culture
    pub fn match_culture(&self, requested: &str) -> Option<String> {
        let requested = requested.trim();
        if requested.is_empty() || requested == "*" {
            return None;
        }

        let mut candidate = requested;
        loop {
            let aliased = CULTURE_ALIASES
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(candidate))
                .map(|(_, target)| *target)
                .unwrap_or(candidate);

            if let Some(found) = self
                .options
                .supported_cultures
                .iter()
                .find(|c| c.eq_ignore_ascii_case(aliased))
            {
                return Some(found.clone());
            }

            match candidate.rsplit_once('-') {
                Some((parent, _)) => candidate = parent,
                None => return None,
            }
        }
    }

    /// Pick the request culture from the `culture` query parameter, then
    /// `Accept-Language` by quality, then the default culture.
    pub fn resolve_culture(&self, query: Option<&str>, accept_language: Option<&str>) -> String {
        if let Some(culture) = query.and_then(|q| self.match_culture(q)) {
            return culture;
        }

        if let Some(header) = accept_language {
            for tag in parse_accept_language(header) {
                if let Some(culture) = self.match_culture(&tag) {
                    return culture;
                }
            }
        }

        self.options.default_culture.clone()
    }
}

/// Culture tags from an `Accept-Language` header, highest quality first
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();

    // Stable sort keeps header order between equal qualities
    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

/// Value of the `culture` query parameter, if present
pub fn culture_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "culture" || k == "ui-culture")
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn localizer() -> Localizer {
        let mut resources = HashMap::new();
        resources.insert(
            "Ui".to_string(),
            Resource {
                base: None,
                cultures: HashMap::from([
                    ("en".to_string(), texts(&[("Save", "Save"), ("Yes", "Yes")])),
                    ("zh-Hans".to_string(), texts(&[("Save", "保存")])),
                ]),
            },
        );
        resources.insert(
            "ApiHost".to_string(),
            Resource {
                base: Some("Ui".to_string()),
                cultures: HashMap::from([
                    ("en".to_string(), texts(&[("Welcome", "Welcome")])),
                    ("zh-Hans".to_string(), texts(&[("Welcome", "欢迎")])),
                ]),
            },
        );

        let options = LocalizationOptions {
            default_resource: Some("ApiHost".to_string()),
            ..Default::default()
        };
        Localizer::from_parts(options, resources)
    }

    #[test]
    fn test_resource_and_culture_fallback() {
        let l = localizer();
        assert_eq!(l.text("zh-Hans", "Welcome"), "欢迎");
        // Inherited from the base resource in the requested culture
        assert_eq!(l.text("zh-Hans", "Save"), "保存");
        // Missing in zh-Hans everywhere, so the default culture answers
        assert_eq!(l.text("zh-Hans", "Yes"), "Yes");
        // zh-Hant has no texts at all
        assert_eq!(l.text("zh-Hant", "Welcome"), "Welcome");
        assert_eq!(l.text("en", "Unknown"), "Unknown");
    }

    #[test]
    fn test_match_culture_aliases() {
        let l = localizer();
        assert_eq!(l.match_culture("zh-CN").as_deref(), Some("zh-Hans"));
        assert_eq!(l.match_culture("zh-tw").as_deref(), Some("zh-Hant"));
        assert_eq!(l.match_culture("zh-Hant-HK").as_deref(), Some("zh-Hant"));
        assert_eq!(l.match_culture("en-GB").as_deref(), Some("en"));
        assert_eq!(l.match_culture("fr-FR"), None);
        assert_eq!(l.match_culture("*"), None);
    }

    #[test]
    fn test_resolve_culture_order() {
        let l = localizer();
        assert_eq!(l.resolve_culture(Some("zh-Hant"), Some("en")), "zh-Hant");
        assert_eq!(l.resolve_culture(Some("xx"), Some("fr;q=0.9, zh-CN;q=0.8")), "zh-Hans");
        assert_eq!(l.resolve_culture(None, Some("de")), "en");
        assert_eq!(l.resolve_culture(None, None), "en");
    }

    #[test]
    fn test_accept_language_quality_order() {
        assert_eq!(
            parse_accept_language("en;q=0.5, zh-Hant, fr;q=0, zh-Hans;q=0.8"),
            vec!["zh-Hant", "zh-Hans", "en"]
        );
    }

    #[test]
    fn test_culture_query_parameter() {
        assert_eq!(culture_from_query("a=1&culture=zh-Hans").as_deref(), Some("zh-Hans"));
        assert_eq!(culture_from_query("ui-culture=en").as_deref(), Some("en"));
        assert_eq!(culture_from_query("a=1"), None);
    }

    #[tokio::test]
    async fn test_load_from_embedded_files() {
        let options = LocalizationOptions {
            resources: vec![
                LocalizationResourceOptions {
                    name: "Ui".to_string(),
                    base: None,
                    virtual_path: "localization/ui".to_string(),
                },
                LocalizationResourceOptions {
                    name: "ApiHost".to_string(),
                    base: Some("Ui".to_string()),
                    virtual_path: "localization/apihost".to_string(),
                },
            ],
            default_resource: Some("ApiHost".to_string()),
            ..Default::default()
        };

        let l = Localizer::load(options, &VirtualFileSystem::embedded())
            .await
            .unwrap();
        assert_eq!(l.text("zh-Hans", "Welcome"), "欢迎使用 ApiHost");
        assert_eq!(l.text("zh-Hant", "Save"), "儲存");
        assert_eq!(l.text("zh-Hant", "DisplayNameRequired"), "Display name is required");
    }

    #[tokio::test]
    async fn test_unknown_base_rejected() {
        let options = LocalizationOptions {
            resources: vec![LocalizationResourceOptions {
                name: "ApiHost".to_string(),
                base: Some("Missing".to_string()),
                virtual_path: "localization/apihost".to_string(),
            }],
            ..Default::default()
        };
        assert!(Localizer::load(options, &VirtualFileSystem::embedded())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_cyclic_base_rejected() {
        let resource = |name: &str, base: &str| LocalizationResourceOptions {
            name: name.to_string(),
            base: Some(base.to_string()),
            virtual_path: format!("localization/{}", name.to_lowercase()),
        };
        let options = LocalizationOptions {
            resources: vec![resource("Ui", "Forms"), resource("Forms", "Ui")],
            ..Default::default()
        };
        let err = Localizer::load(options, &VirtualFileSystem::embedded())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Ui -> Forms -> Ui"));

        let options = LocalizationOptions {
            resources: vec![resource("Self", "Self")],
            ..Default::default()
        };
        assert!(Localizer::load(options, &VirtualFileSystem::embedded())
            .await
            .is_err());
    }
}
