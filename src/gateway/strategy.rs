//! Cache-first and network-first serving.

use std::sync::{Arc, Mutex};

use dashmap::DashSet;
use metrics::counter;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::util::lock::mutex_lock;

use super::GatewayError;
use super::config::GatewayConfig;
use super::fetch::Fetcher;
use super::request::{GatewayRequest, GatewayResponse, Served};
use super::store::CacheStorage;

const SOURCE: &str = "gateway::strategy";

/// Serve from any partition when possible, refreshing the static entry in the
/// background; fetch and store on a miss.
pub async fn cache_first(
    config: &GatewayConfig,
    storage: &Arc<dyn CacheStorage>,
    fetcher: &Arc<dyn Fetcher>,
    refresh: &BackgroundRefresh,
    request: &GatewayRequest,
) -> Result<Served, GatewayError> {
    let key = request.cache_key();

    if let Some(cached) = storage.match_any(&key).await {
        counter!("smart_erp_gateway_cache_hit_total", "strategy" => "cache_first").increment(1);
        debug!(cache = %config.static_cache, key = %key, outcome = "hit", "serving cached asset");
        refresh.schedule(
            Arc::clone(storage),
            Arc::clone(fetcher),
            config.static_cache.clone(),
            request.clone(),
        );
        return Ok(Served::cached(cached));
    }

    counter!("smart_erp_gateway_cache_miss_total", "strategy" => "cache_first").increment(1);
    debug!(cache = %config.static_cache, key = %key, outcome = "miss", "fetching asset");

    let response = fetcher.fetch(request).await?;
    if response.is_success() {
        store_best_effort(
            storage.as_ref(),
            &config.static_cache,
            &key,
            response.clone(),
        )
        .await;
    }
    Ok(Served::network(response))
}

/// Prefer the network, keeping allow-listed API responses for offline use;
/// fall back to any cached copy, then to the offline document for HTML.
pub async fn network_first(
    config: &GatewayConfig,
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    request: &GatewayRequest,
) -> Result<Served, GatewayError> {
    let key = request.cache_key();

    match fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_success() && config.is_cacheable_api(request.path()) {
                store_best_effort(storage, &config.api_cache, &key, response.clone()).await;
            }
            Ok(Served::network(response))
        }
        Err(error) => {
            if let Some(cached) = storage.match_any(&key).await {
                counter!("smart_erp_gateway_cache_hit_total", "strategy" => "network_first")
                    .increment(1);
                debug!(key = %key, error = %error, "network failed, serving cached copy");
                return Ok(Served::cached(cached));
            }

            if request.accepts_html()
                && let Some(document) = request.sibling(&config.offline_document)
                && let Some(cached) = storage.match_any(&document.cache_key()).await
            {
                counter!("smart_erp_gateway_offline_fallback_total").increment(1);
                debug!(key = %key, error = %error, "network failed, serving offline document");
                return Ok(Served::offline(cached));
            }

            counter!("smart_erp_gateway_cache_miss_total", "strategy" => "network_first")
                .increment(1);
            Err(GatewayError::Network(error))
        }
    }
}

/// Write to the cache, logging and swallowing any failure.
pub(crate) async fn store_best_effort(
    storage: &dyn CacheStorage,
    cache: &str,
    key: &str,
    response: GatewayResponse,
) {
    if let Err(error) = storage.put(cache, key, response).await {
        counter!("smart_erp_gateway_cache_write_failed_total").increment(1);
        warn!(
            target = "smart_erp::gateway",
            cache,
            key,
            error = %error,
            "cache write failed"
        );
    }
}

/// Fire-and-forget refreshes of stale cache entries, at most one per key.
#[derive(Default)]
pub struct BackgroundRefresh {
    in_flight: Arc<DashSet<String>>,
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a refresh of `request` into `cache`. Returns `false` when a
    /// refresh for the same key is already running.
    pub fn schedule(
        &self,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        cache: String,
        request: GatewayRequest,
    ) -> bool {
        let key = request.cache_key();
        if !self.in_flight.insert(key.clone()) {
            debug!(key = %key, "refresh already in flight");
            return false;
        }

        let in_flight = Arc::clone(&self.in_flight);
        let mut tasks = mutex_lock(&self.tasks, SOURCE, "schedule");
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    store_best_effort(storage.as_ref(), &cache, &key, response).await;
                }
                Ok(response) => {
                    debug!(key = %key, status = response.status.as_u16(), "refresh not stored");
                }
                Err(error) => {
                    debug!(key = %key, error = %error, "refresh failed");
                }
            }
            in_flight.remove(&key);
        });
        true
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for every refresh scheduled so far.
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(&mut *mutex_lock(&self.tasks, SOURCE, "settle"));
        while tasks.join_next().await.is_some() {}
    }
}
