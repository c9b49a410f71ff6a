//! Offline-first request gateway.
//!
//! The gateway sits between ERP clients and the backend. Static assets are
//! served cache-first with a background refresh; API calls and navigations go
//! network-first and fall back to cached copies when the backend is
//! unreachable.

pub mod classify;
pub mod config;
pub mod fetch;
pub mod lifecycle;
pub mod request;
pub mod store;
pub mod strategy;
mod worker;

use thiserror::Error;

pub use classify::{Strategy, classify};
pub use config::GatewayConfig;
pub use fetch::{FetchError, Fetcher};
pub use lifecycle::{ControlMessage, ControlOutcome, LifecycleState};
pub use request::{GatewayRequest, GatewayResponse, ResponseSource, Served};
pub use store::{CacheStorage, CacheStoreError, MemoryCacheStorage};
pub use strategy::BackgroundRefresh;
pub use worker::CacheGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Neither the network nor any cache could answer.
    #[error("network request failed: {0}")]
    Network(#[from] FetchError),
    #[error("failed to install `{asset}`: {reason}")]
    Install { asset: String, reason: String },
    #[error("cannot {action} while {}", state.as_str())]
    Lifecycle {
        action: &'static str,
        state: LifecycleState,
    },
}
