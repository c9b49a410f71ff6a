//! Gateway configuration.
//!
//! Partition names, the API allow-list and the static-asset pattern are passed
//! to a [`CacheGateway`](super::CacheGateway) at construction instead of being
//! baked in, so tests can run isolated gateways side by side.

use serde::Deserialize;

pub const DEFAULT_STATIC_CACHE: &str = "smart-erp-static-v1";
pub const DEFAULT_API_CACHE: &str = "smart-erp-api-v1";
pub const DEFAULT_API_PREFIX: &str = "/api/";
pub const DEFAULT_OFFLINE_DOCUMENT: &str = "/";
pub const DEFAULT_CACHEABLE_API_PREFIXES: [&str; 4] = [
    "/api/customers",
    "/api/products",
    "/api/tables",
    "/api/pattern-master/stats",
];
pub const DEFAULT_STATIC_EXTENSIONS: [&str; 12] = [
    "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf", "eot",
];
pub const DEFAULT_SHELL_ASSETS: [&str; 3] = ["/", "/index.html", "/manifest.json"];
pub const DEFAULT_EXTENSION_SCHEMES: [&str; 4] = [
    "chrome-extension",
    "moz-extension",
    "safari-extension",
    "safari-web-extension",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Partition holding shell and static assets.
    pub static_cache: String,
    /// Partition holding allow-listed API responses.
    pub api_cache: String,
    /// Requests under this path prefix are API calls.
    pub api_prefix: String,
    /// API paths whose successful responses may be kept for offline use.
    pub cacheable_api_prefixes: Vec<String>,
    /// File extensions served cache-first.
    pub static_extensions: Vec<String>,
    /// Assets fetched into the static partition on install.
    pub shell_assets: Vec<String>,
    /// Document served to offline HTML navigations.
    pub offline_document: String,
    /// Schemes that are never intercepted.
    pub extension_schemes: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            static_cache: DEFAULT_STATIC_CACHE.to_string(),
            api_cache: DEFAULT_API_CACHE.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            cacheable_api_prefixes: to_strings(&DEFAULT_CACHEABLE_API_PREFIXES),
            static_extensions: to_strings(&DEFAULT_STATIC_EXTENSIONS),
            shell_assets: to_strings(&DEFAULT_SHELL_ASSETS),
            offline_document: DEFAULT_OFFLINE_DOCUMENT.to_string(),
            extension_schemes: to_strings(&DEFAULT_EXTENSION_SCHEMES),
        }
    }
}

impl From<&crate::config::GatewaySettings> for GatewayConfig {
    fn from(settings: &crate::config::GatewaySettings) -> Self {
        Self {
            static_cache: settings.static_cache.clone(),
            api_cache: settings.api_cache.clone(),
            api_prefix: settings.api_prefix.clone(),
            cacheable_api_prefixes: settings.cacheable_api_prefixes.clone(),
            static_extensions: settings.static_extensions.clone(),
            shell_assets: settings.shell_assets.clone(),
            offline_document: settings.offline_document.clone(),
            extension_schemes: to_strings(&DEFAULT_EXTENSION_SCHEMES),
        }
    }
}

impl GatewayConfig {
    /// Partitions that survive activation.
    pub fn known_caches(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.api_cache.as_str()]
    }

    pub fn is_known_cache(&self, name: &str) -> bool {
        self.known_caches().contains(&name)
    }

    pub fn is_api_path(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    pub fn is_cacheable_api(&self, path: &str) -> bool {
        self.cacheable_api_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// True when the last path segment ends in one of the static extensions.
    pub fn is_static_asset(&self, path: &str) -> bool {
        let segment = path.rsplit('/').next().unwrap_or(path);
        let Some((_, extension)) = segment.rsplit_once('.') else {
            return false;
        };
        self.static_extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
    }

    pub fn is_extension_scheme(&self, scheme: &str) -> bool {
        self.extension_schemes
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(scheme))
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
