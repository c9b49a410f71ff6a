//! Request classification.

use axum::http::Method;

use super::config::GatewayConfig;
use super::request::GatewayRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
        }
    }
}

/// Pick the strategy for `request`; `None` means the request is not
/// intercepted and goes straight to the network. First match wins.
pub fn classify(config: &GatewayConfig, request: &GatewayRequest) -> Option<Strategy> {
    if request.method != Method::GET {
        return None;
    }
    if config.is_extension_scheme(request.url.scheme()) {
        return None;
    }

    let path = request.path();
    if config.is_api_path(path) {
        return Some(Strategy::NetworkFirst);
    }
    if config.is_static_asset(path) {
        return Some(Strategy::CacheFirst);
    }
    if request.accepts_html() {
        return Some(Strategy::NetworkFirst);
    }
    Some(Strategy::NetworkFirst)
}

#[cfg(test)]
mod tests {
    use axum::http::header;
    use url::Url;

    use super::*;

    fn get(raw: &str) -> GatewayRequest {
        GatewayRequest::get(Url::parse(raw).expect("valid url"))
    }

    #[test]
    fn non_get_is_not_intercepted() {
        let config = GatewayConfig::default();
        let request = GatewayRequest::new(
            Method::POST,
            Url::parse("http://erp.local/api/planning-entry").expect("valid url"),
        );
        assert_eq!(classify(&config, &request), None);
    }

    #[test]
    fn extension_scheme_is_not_intercepted() {
        let config = GatewayConfig::default();
        let request = get("chrome-extension://abcdef/content.js");
        assert_eq!(classify(&config, &request), None);
    }

    #[test]
    fn api_prefix_wins_over_static_extension() {
        let config = GatewayConfig::default();
        let request = get("http://erp.local/api/reports/export.js");
        assert_eq!(classify(&config, &request), Some(Strategy::NetworkFirst));
    }

    #[test]
    fn static_assets_are_cache_first() {
        let config = GatewayConfig::default();
        for path in ["/assets/app.js", "/styles/main.css", "/logo.svg", "/favicon.ico"] {
            let request = get(&format!("http://erp.local{path}"));
            assert_eq!(
                classify(&config, &request),
                Some(Strategy::CacheFirst),
                "{path}"
            );
        }
    }

    #[test]
    fn navigations_and_everything_else_are_network_first() {
        let config = GatewayConfig::default();
        let navigation =
            get("http://erp.local/planning").with_header(header::ACCEPT, "text/html");
        assert_eq!(
            classify(&config, &navigation),
            Some(Strategy::NetworkFirst)
        );

        let other = get("http://erp.local/healthz");
        assert_eq!(classify(&config, &other), Some(Strategy::NetworkFirst));
    }
}
