//! Request and response values flowing through the gateway.

use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use bytes::Bytes;
use url::Url;

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.contains("text/html"))
    }

    /// Cache key of this request: its URL without fragment.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    /// GET request for `path` on the same origin, used for shell assets and
    /// the offline document.
    pub fn sibling(&self, path: &str) -> Option<Self> {
        self.url.join(path).ok().map(Self::get)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::OfflineFallback => "offline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Served {
    pub response: GatewayResponse,
    pub source: ResponseSource,
}

impl Served {
    pub fn network(response: GatewayResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
        }
    }

    pub fn cached(response: GatewayResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
        }
    }

    pub fn offline(response: GatewayResponse) -> Self {
        Self {
            response,
            source: ResponseSource::OfflineFallback,
        }
    }
}
