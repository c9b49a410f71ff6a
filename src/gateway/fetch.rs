use async_trait::async_trait;
use thiserror::Error;

use super::request::{GatewayRequest, GatewayResponse};

/// A fetch that produced no response at all. HTTP error statuses are
/// responses, not failures.
#[derive(Debug, Clone, Error)]
#[error("fetch of `{url}` failed: {message}")]
pub struct FetchError {
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Network access used by the gateway.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse, FetchError>;
}
