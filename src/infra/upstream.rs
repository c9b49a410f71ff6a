//! Network [`Fetcher`] backed by reqwest.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use metrics::histogram;
use reqwest::Client;
use tracing::debug;

use crate::gateway::{FetchError, Fetcher, GatewayRequest, GatewayResponse};

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::HOST,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::UPGRADE,
    header::TE,
];

#[derive(Clone, Debug)]
pub struct UpstreamFetcher {
    client: Client,
}

impl UpstreamFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("smart-erp-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in &HOP_BY_HOP {
        forwarded.remove(name);
    }
    forwarded
}

#[async_trait]
impl Fetcher for UpstreamFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse, FetchError> {
        let started = Instant::now();
        let url = request.url.as_str();

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(end_to_end(&request.headers));
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| FetchError::new(url, err.to_string()))?;
        let status = response.status();
        let headers = end_to_end(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::new(url, err.to_string()))?;

        let elapsed = started.elapsed();
        histogram!("smart_erp_upstream_fetch_ms").record(elapsed.as_secs_f64() * 1000.0);
        debug!(
            url,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "upstream responded"
        );
        Ok(GatewayResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.local"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        let forwarded = end_to_end(&headers);
        assert_eq!(forwarded.len(), 1);
        assert!(forwarded.contains_key(header::ACCEPT));
    }
}
