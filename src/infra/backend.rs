//! reqwest adapter for the ERP backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use smart_erp_api_types::{
    PatternDetail, PatternNumber, PatternPart, PlanningBatch, PlanningRecord,
    PlanningRecordUpdate,
};
use tracing::debug;

use crate::application::backend::{BackendError, PlanningBackend};

#[derive(Clone, Debug)]
pub struct HttpPlanningBackend {
    client: Client,
    base: Url,
}

impl HttpPlanningBackend {
    /// `base` is the API root, e.g. `http://erp.local/api/`. A missing
    /// trailing slash is added so relative paths stay below it.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, BackendError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::transport(base.as_str(), err))?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("smart-erp/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(path)?)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, BackendError> {
        let url = self.url(path)?;
        debug!(method = %method, url = %url, "backend request");
        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| BackendError::transport(url.as_str(), err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        let url = response.url().to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| BackendError::transport(url.as_str(), err))?;
        serde_json::from_slice(&bytes).map_err(|err| BackendError::decode(url, err))
    }
}

#[async_trait]
impl PlanningBackend for HttpPlanningBackend {
    async fn list_patterns(&self) -> Result<Vec<PatternNumber>, BackendError> {
        self.get_json("pattern-master/numbers").await
    }

    async fn parts_by_pattern(&self, pattern_id: i64) -> Result<Vec<PatternPart>, BackendError> {
        self.get_json(&format!("pattern-master/parts-by-pattern/{pattern_id}"))
            .await
    }

    async fn pattern_detail(&self, pattern_id: i64) -> Result<PatternDetail, BackendError> {
        self.get_json(&format!("pattern-master/{pattern_id}")).await
    }

    async fn list_entries(&self) -> Result<Vec<PlanningRecord>, BackendError> {
        self.get_json("planning-entry").await
    }

    async fn create_entries(&self, batch: &PlanningBatch) -> Result<(), BackendError> {
        self.send(Method::POST, "planning-entry", Some(batch))
            .await
            .map(drop)
    }

    async fn update_entry(
        &self,
        id: i64,
        update: &PlanningRecordUpdate,
    ) -> Result<(), BackendError> {
        self.send(Method::PUT, &format!("planning-entry/{id}"), Some(update))
            .await
            .map(drop)
    }

    async fn delete_entry(&self, id: i64) -> Result<(), BackendError> {
        self.send::<()>(Method::DELETE, &format!("planning-entry/{id}"), None)
            .await
            .map(drop)
    }
}
