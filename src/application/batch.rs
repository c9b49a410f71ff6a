//! Plan files: a batch of line items described in TOML.
//!
//! ```toml
//! [[entries]]
//! plan_date = "2026-10-19"
//! pattern_id = 12
//! parts = [101, 102]   # omit to plan every part of the pattern
//! plate_qty = 40
//! shift = 1
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use time::Date;

use crate::application::planning::{LineItemDraft, PlanningError, PlanningService};
use crate::domain::planning::{PLAN_DATE_FORMAT, PlanningLineItem};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read plan file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse plan file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("plan file has no entries")]
    NoEntries,
    #[error("entry {index}: invalid plan date `{value}`")]
    InvalidDate { index: usize, value: String },
    #[error("entry {index}: {source}")]
    Entry {
        index: usize,
        source: PlanningError,
    },
    #[error(transparent)]
    Planning(#[from] PlanningError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub entries: Vec<PlanFileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanFileEntry {
    pub plan_date: String,
    pub pattern_id: i64,
    #[serde(default)]
    pub parts: Option<Vec<i64>>,
    pub plate_qty: i64,
    pub shift: u8,
}

impl PlanFileEntry {
    /// Empty dates are left to line-item validation.
    fn plan_date(&self, index: usize) -> Result<Option<Date>, BatchError> {
        let raw = self.plan_date.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Date::parse(raw, PLAN_DATE_FORMAT)
            .map(Some)
            .map_err(|_| BatchError::InvalidDate {
                index,
                value: self.plan_date.clone(),
            })
    }
}

pub fn parse_plan_file(text: &str) -> Result<PlanFile, BatchError> {
    let file: PlanFile = toml::from_str(text)?;
    if file.entries.is_empty() {
        return Err(BatchError::NoEntries);
    }
    Ok(file)
}

pub async fn load_plan_file(path: &Path) -> Result<PlanFile, BatchError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_plan_file(&text)
}

/// Stage every entry of `plan` in order. Stops at the first entry that
/// fails; entries staged before it stay staged.
pub async fn stage_plan(
    service: &PlanningService,
    plan: &PlanFile,
) -> Result<Vec<PlanningLineItem>, BatchError> {
    service.load_patterns().await?;

    let mut staged = Vec::with_capacity(plan.entries.len());
    for (index, entry) in plan.entries.iter().enumerate() {
        let entry_error = |source: PlanningError| BatchError::Entry { index, source };
        let plan_date = entry.plan_date(index)?;

        service
            .select_pattern(entry.pattern_id)
            .await
            .map_err(entry_error)?;
        let selected = match &entry.parts {
            Some(ids) => service.select_parts(ids),
            None => service.select_all_parts(),
        };
        selected.map_err(entry_error)?;

        let item = service
            .add_line_item(LineItemDraft {
                plan_date,
                plate_qty: Some(entry.plate_qty),
                shift: Some(entry.shift),
            })
            .map_err(entry_error)?;
        staged.push(item);
    }
    Ok(staged)
}
