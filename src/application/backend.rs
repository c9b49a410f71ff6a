//! Backend adapter trait for pattern master data and planning entries.

use async_trait::async_trait;
use smart_erp_api_types::{
    PatternDetail, PatternNumber, PatternPart, PlanningBatch, PlanningRecord,
    PlanningRecordUpdate,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to `{url}` failed: {message}")]
    Transport { url: String, message: String },
    #[error("status {status} body {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response from `{url}`: {message}")]
    Decode { url: String, message: String },
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    pub fn decode(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// True for a backend that answered with 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[async_trait]
pub trait PlanningBackend: Send + Sync {
    async fn list_patterns(&self) -> Result<Vec<PatternNumber>, BackendError>;

    async fn parts_by_pattern(&self, pattern_id: i64) -> Result<Vec<PatternPart>, BackendError>;

    async fn pattern_detail(&self, pattern_id: i64) -> Result<PatternDetail, BackendError>;

    async fn list_entries(&self) -> Result<Vec<PlanningRecord>, BackendError>;

    /// Persist a whole batch; the backend commits all entries or none.
    async fn create_entries(&self, batch: &PlanningBatch) -> Result<(), BackendError>;

    async fn update_entry(
        &self,
        id: i64,
        update: &PlanningRecordUpdate,
    ) -> Result<(), BackendError>;

    async fn delete_entry(&self, id: i64) -> Result<(), BackendError>;
}
