use std::sync::{Arc, RwLock};

use axum::http::Method;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::util::lock::{rw_read, rw_write};

use super::classify::{Strategy, classify};
use super::config::GatewayConfig;
use super::fetch::Fetcher;
use super::lifecycle::{ControlMessage, ControlOutcome, LifecycleState};
use super::request::{GatewayRequest, Served};
use super::store::CacheStorage;
use super::strategy::{BackgroundRefresh, cache_first, network_first};
use super::GatewayError;

const SOURCE: &str = "gateway::worker";

/// Offline-first gateway in front of the ERP backend.
///
/// Requests are only intercepted once the gateway is [`LifecycleState::Active`];
/// before that, and for requests [`classify`] leaves alone, they go straight
/// to the network.
pub struct CacheGateway {
    scope: Url,
    config: GatewayConfig,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
    refresh: BackgroundRefresh,
}

impl CacheGateway {
    /// `scope` is the origin the gateway controls; relative paths such as the
    /// shell manifest resolve against it.
    pub fn new(
        scope: Url,
        config: GatewayConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            scope,
            config,
            storage,
            fetcher,
            state: RwLock::new(LifecycleState::Parsed),
            refresh: BackgroundRefresh::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn state(&self) -> LifecycleState {
        *rw_read(&self.state, SOURCE, "state")
    }

    /// Build a request for `path_and_query` on the scope's origin. The target
    /// only ever sets path and query, so `//host/...` stays on the scope.
    pub fn request(&self, method: Method, path_and_query: &str) -> GatewayRequest {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        let mut url = self.scope.clone();
        if path.starts_with('/') {
            url.set_path(path);
        } else {
            url.set_path(&format!("/{path}"));
        }
        url.set_query(query);
        url.set_fragment(None);
        GatewayRequest::new(method, url)
    }

    /// Fetch the shell manifest into the static partition. Nothing is stored
    /// unless every asset was fetched successfully.
    #[instrument(skip_all, fields(cache = %self.config.static_cache))]
    pub async fn install(&self) -> Result<usize, GatewayError> {
        {
            let mut state = rw_write(&self.state, SOURCE, "install.begin");
            if !matches!(*state, LifecycleState::Parsed | LifecycleState::Redundant) {
                return Err(GatewayError::Lifecycle {
                    action: "install",
                    state: *state,
                });
            }
            *state = LifecycleState::Installing;
        }

        match self.fetch_shell().await {
            Ok(count) => {
                *rw_write(&self.state, SOURCE, "install.done") = LifecycleState::Installed;
                info!(
                    target = "smart_erp::gateway",
                    assets = count,
                    "shell assets installed"
                );
                Ok(count)
            }
            Err(error) => {
                *rw_write(&self.state, SOURCE, "install.failed") = LifecycleState::Redundant;
                warn!(target = "smart_erp::gateway", error = %error, "install failed");
                Err(error)
            }
        }
    }

    async fn fetch_shell(&self) -> Result<usize, GatewayError> {
        let mut fetched = Vec::with_capacity(self.config.shell_assets.len());
        for asset in &self.config.shell_assets {
            let install_error = |reason: String| GatewayError::Install {
                asset: asset.clone(),
                reason,
            };
            let url = self
                .scope
                .join(asset)
                .map_err(|err| install_error(err.to_string()))?;
            let request = GatewayRequest::get(url);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|err| install_error(err.to_string()))?;
            if !response.is_success() {
                return Err(install_error(format!("status {}", response.status)));
            }
            fetched.push((request.cache_key(), response));
        }

        let count = fetched.len();
        for (key, response) in fetched {
            self.storage
                .put(&self.config.static_cache, &key, response)
                .await
                .map_err(|err| GatewayError::Install {
                    asset: key.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(count)
    }

    /// Delete partitions outside the known set and start controlling clients.
    pub async fn activate(&self) -> Result<Vec<String>, GatewayError> {
        let current = self.state();
        match current {
            LifecycleState::Installed => {}
            LifecycleState::Active => return Ok(Vec::new()),
            state => {
                return Err(GatewayError::Lifecycle {
                    action: "activate",
                    state,
                });
            }
        }

        let mut deleted = Vec::new();
        for name in self.storage.cache_names().await {
            if !self.config.is_known_cache(&name) && self.storage.delete(&name).await {
                deleted.push(name);
            }
        }

        *rw_write(&self.state, SOURCE, "activate") = LifecycleState::Active;
        info!(
            target = "smart_erp::gateway",
            deleted = ?deleted,
            "gateway active"
        );
        Ok(deleted)
    }

    pub async fn handle_message(
        &self,
        message: ControlMessage,
    ) -> Result<ControlOutcome, GatewayError> {
        debug!(message = ?message, "control message received");
        match message {
            ControlMessage::SkipWaiting => {
                if self.state() == LifecycleState::Active {
                    return Ok(ControlOutcome::AlreadyActive);
                }
                let deleted = self.activate().await?;
                Ok(ControlOutcome::Activated { deleted })
            }
            ControlMessage::ClearCache => {
                let mut deleted = Vec::new();
                for name in self.storage.cache_names().await {
                    if self.storage.delete(&name).await {
                        deleted.push(name);
                    }
                }
                info!(
                    target = "smart_erp::gateway",
                    deleted = ?deleted,
                    "all caches cleared"
                );
                Ok(ControlOutcome::Cleared { deleted })
            }
        }
    }

    /// Serve `request` through the strategy it classifies into.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path()))]
    pub async fn respond(&self, request: &GatewayRequest) -> Result<Served, GatewayError> {
        let strategy = match self.state() {
            LifecycleState::Active => classify(&self.config, request),
            _ => None,
        };

        match strategy {
            Some(Strategy::CacheFirst) => {
                cache_first(
                    &self.config,
                    &self.storage,
                    &self.fetcher,
                    &self.refresh,
                    request,
                )
                .await
            }
            Some(Strategy::NetworkFirst) => {
                network_first(
                    &self.config,
                    self.storage.as_ref(),
                    self.fetcher.as_ref(),
                    request,
                )
                .await
            }
            None => {
                let response = self.fetcher.fetch(request).await?;
                Ok(Served::network(response))
            }
        }
    }

    /// Number of background refreshes still running.
    pub fn refreshes_in_flight(&self) -> usize {
        self.refresh.in_flight()
    }

    /// Wait for every background refresh scheduled so far.
    pub async fn settle(&self) {
        self.refresh.settle().await;
    }
}
