//! Planning workflow: pattern selection, staging and batch submission.
//!
//! [`PlanningService`] owns the operator session. The mutable state sits
//! behind a plain mutex that is never held across a backend call; the
//! staging list's `Submitting` state keeps a second submit out while the
//! first is in flight.

use std::sync::{Arc, Mutex};

use metrics::counter;
use smart_erp_api_types::{PlanningBatch, PlanningEntry, PlanningRecord, PlanningRecordUpdate};
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

use crate::application::backend::{BackendError, PlanningBackend};
use crate::domain::pattern::{PartLine, PatternSpec, PatternSummary, SelectedPattern};
use crate::domain::planning::{
    LineItemInput, PlanningLineItem, PlanningValidationError, build_line_item,
};
use crate::domain::records::{PrintCriteria, select_for_print};
use crate::domain::staging::{StagingError, StagingList, StagingState};
use crate::util::lock::mutex_lock;

const SOURCE: &str = "application::planning";

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Validation(#[from] PlanningValidationError),
    #[error("no planning entries to submit")]
    EmptyStaging,
    #[error("a submission is already in progress")]
    SubmitInProgress,
    #[error("no pattern selected")]
    NoPatternSelected,
    #[error("pattern {pattern_id} has no part {part_row_id}")]
    UnknownPart { pattern_id: i64, part_row_id: i64 },
    #[error("no records found for the selected date and shift")]
    NoRecords,
    #[error(transparent)]
    Staging(StagingError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<StagingError> for PlanningError {
    fn from(error: StagingError) -> Self {
        match error {
            StagingError::SubmitInProgress => Self::SubmitInProgress,
            StagingError::Empty => Self::EmptyStaging,
            other => Self::Staging(other),
        }
    }
}

/// Operator input for one line item; parts come from the current selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineItemDraft {
    pub plan_date: Option<Date>,
    pub plate_qty: Option<i64>,
    pub shift: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReport {
    pub submitted: usize,
    /// False when the batch was saved but re-reading the records failed.
    pub refreshed: bool,
}

#[derive(Default)]
struct PlanningState {
    patterns: Vec<PatternSummary>,
    active: Option<SelectedPattern>,
    selected_parts: Vec<i64>,
    /// Bumped whenever the active pattern is replaced or reset, so a slow
    /// pattern load cannot overwrite a newer choice.
    selection_epoch: u64,
    staging: StagingList,
    records: Vec<PlanningRecord>,
}

impl PlanningState {
    fn reset_selection(&mut self) {
        self.active = None;
        self.selected_parts.clear();
        self.selection_epoch += 1;
    }

    fn selected_lines(&self) -> Vec<PartLine> {
        let Some(pattern) = self.active.as_ref() else {
            return Vec::new();
        };
        pattern
            .parts
            .iter()
            .filter(|part| self.selected_parts.contains(&part.part_row_id))
            .cloned()
            .collect()
    }
}

pub struct PlanningService {
    backend: Arc<dyn PlanningBackend>,
    state: Mutex<PlanningState>,
}

impl PlanningService {
    pub fn new(backend: Arc<dyn PlanningBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(PlanningState::default()),
        }
    }

    /// Fetch the pattern list. A failed fetch leaves the list empty.
    pub async fn load_patterns(&self) -> Result<Vec<PatternSummary>, PlanningError> {
        let rows = match self.backend.list_patterns().await {
            Ok(rows) => rows,
            Err(err) => {
                mutex_lock(&self.state, SOURCE, "load_patterns.failed")
                    .patterns
                    .clear();
                warn!(target = "smart_erp::planning", error = %err, "failed to load patterns");
                return Err(err.into());
            }
        };

        let patterns: Vec<PatternSummary> = rows.into_iter().map(PatternSummary::from).collect();
        mutex_lock(&self.state, SOURCE, "load_patterns").patterns = patterns.clone();
        info!(
            target = "smart_erp::planning",
            count = patterns.len(),
            "patterns loaded"
        );
        Ok(patterns)
    }

    pub fn patterns(&self) -> Vec<PatternSummary> {
        mutex_lock(&self.state, SOURCE, "patterns").patterns.clone()
    }

    /// Make `pattern_id` the active pattern, loading its parts and detail.
    /// The part selection is reset; on failure no pattern is active.
    pub async fn select_pattern(&self, pattern_id: i64) -> Result<SelectedPattern, PlanningError> {
        let epoch = {
            let mut state = mutex_lock(&self.state, SOURCE, "select_pattern.begin");
            state.reset_selection();
            state.selection_epoch
        };

        let (parts, detail) = tokio::try_join!(
            self.backend.parts_by_pattern(pattern_id),
            self.backend.pattern_detail(pattern_id),
        )
        .inspect_err(|err| {
            warn!(
                target = "smart_erp::planning",
                pattern_id,
                error = %err,
                "failed to load pattern"
            );
        })?;

        let mut state = mutex_lock(&self.state, SOURCE, "select_pattern.done");
        let summary = state
            .patterns
            .iter()
            .find(|summary| summary.id == pattern_id)
            .cloned()
            .unwrap_or_else(|| PatternSummary {
                id: pattern_id,
                pattern_no: detail
                    .pattern_no
                    .clone()
                    .unwrap_or_else(|| pattern_id.to_string()),
                customer_name: String::new(),
            });
        let selected = SelectedPattern {
            summary,
            spec: PatternSpec::from(&detail),
            parts: parts.into_iter().map(PartLine::from).collect(),
        };

        if state.selection_epoch == epoch {
            state.active = Some(selected.clone());
        }
        info!(
            target = "smart_erp::planning",
            pattern_id,
            parts = selected.parts.len(),
            "pattern selected"
        );
        Ok(selected)
    }

    pub fn active_pattern(&self) -> Option<SelectedPattern> {
        mutex_lock(&self.state, SOURCE, "active_pattern").active.clone()
    }

    /// Replace the part selection with `part_row_ids`, all of which must
    /// belong to the active pattern. Returns the number selected.
    pub fn select_parts(&self, part_row_ids: &[i64]) -> Result<usize, PlanningError> {
        let mut state = mutex_lock(&self.state, SOURCE, "select_parts");
        let pattern = state
            .active
            .as_ref()
            .ok_or(PlanningError::NoPatternSelected)?;

        if let Some(missing) = part_row_ids
            .iter()
            .find(|id| !pattern.parts.iter().any(|part| part.part_row_id == **id))
        {
            return Err(PlanningError::UnknownPart {
                pattern_id: pattern.summary.id,
                part_row_id: *missing,
            });
        }

        let selection: Vec<i64> = pattern
            .parts
            .iter()
            .map(|part| part.part_row_id)
            .filter(|id| part_row_ids.contains(id))
            .collect();
        state.selected_parts = selection;
        Ok(state.selected_parts.len())
    }

    pub fn select_all_parts(&self) -> Result<usize, PlanningError> {
        let mut state = mutex_lock(&self.state, SOURCE, "select_all_parts");
        let pattern = state
            .active
            .as_ref()
            .ok_or(PlanningError::NoPatternSelected)?;
        let selection: Vec<i64> = pattern.parts.iter().map(|part| part.part_row_id).collect();
        state.selected_parts = selection;
        Ok(state.selected_parts.len())
    }

    pub fn selected_parts(&self) -> Vec<PartLine> {
        mutex_lock(&self.state, SOURCE, "selected_parts").selected_lines()
    }

    /// Validate `draft` against the active pattern and selected parts and
    /// stage the resulting line item. The part selection is reset; the
    /// pattern stays active.
    pub fn add_line_item(&self, draft: LineItemDraft) -> Result<PlanningLineItem, PlanningError> {
        let mut state = mutex_lock(&self.state, SOURCE, "add_line_item");
        if state.staging.state() == StagingState::Submitting {
            return Err(PlanningError::SubmitInProgress);
        }

        let parts = state.selected_lines();
        let item = build_line_item(LineItemInput {
            plan_date: draft.plan_date,
            pattern: state.active.as_ref(),
            parts: &parts,
            plate_qty: draft.plate_qty,
            shift: draft.shift,
        })?;

        state.staging.push(item.clone())?;
        state.selected_parts.clear();
        info!(
            target = "smart_erp::planning",
            pattern_id = item.pattern_id,
            production_qty = item.production_qty,
            no_of_heats = item.no_of_heats,
            staged = state.staging.len(),
            "line item staged"
        );
        Ok(item)
    }

    pub fn staged(&self) -> Vec<PlanningLineItem> {
        mutex_lock(&self.state, SOURCE, "staged")
            .staging
            .items()
            .to_vec()
    }

    pub fn staging_state(&self) -> StagingState {
        mutex_lock(&self.state, SOURCE, "staging_state")
            .staging
            .state()
    }

    pub fn remove_staged(&self, index: usize) -> Result<PlanningLineItem, PlanningError> {
        let mut state = mutex_lock(&self.state, SOURCE, "remove_staged");
        Ok(state.staging.remove(index)?)
    }

    /// Drop every staged item and reset the pattern and part selection.
    pub fn clear(&self) -> Result<usize, PlanningError> {
        let mut state = mutex_lock(&self.state, SOURCE, "clear");
        let dropped = state.staging.clear()?;
        state.reset_selection();
        info!(target = "smart_erp::planning", dropped, "staging cleared");
        Ok(dropped)
    }

    /// Submit every staged item as one batch. On failure nothing changes and
    /// the error is returned; on success staging is emptied and the records
    /// are re-read.
    pub async fn submit_all(&self) -> Result<SubmitReport, PlanningError> {
        let items = mutex_lock(&self.state, SOURCE, "submit_all.begin")
            .staging
            .begin_submit()?;
        let batch = PlanningBatch {
            entries: items.iter().map(PlanningEntry::from).collect(),
        };

        let outcome = self.backend.create_entries(&batch).await;
        {
            let mut state = mutex_lock(&self.state, SOURCE, "submit_all.finish");
            state.staging.finish_submit(outcome.is_ok())?;
        }
        if let Err(err) = outcome {
            counter!("smart_erp_planning_submit_total", "outcome" => "failed").increment(1);
            warn!(
                target = "smart_erp::planning",
                entries = items.len(),
                error = %err,
                "batch submit failed"
            );
            return Err(err.into());
        }

        counter!("smart_erp_planning_submit_total", "outcome" => "committed").increment(1);
        info!(
            target = "smart_erp::planning",
            entries = items.len(),
            "batch submitted"
        );
        let refreshed = self.refresh_after_write("submit_all").await;
        Ok(SubmitReport {
            submitted: items.len(),
            refreshed,
        })
    }

    /// Re-read persisted records. A failed read keeps the previous view.
    pub async fn refresh_records(&self) -> Result<usize, PlanningError> {
        let records = self.backend.list_entries().await?;
        let count = records.len();
        mutex_lock(&self.state, SOURCE, "refresh_records").records = records;
        Ok(count)
    }

    pub fn records(&self) -> Vec<PlanningRecord> {
        mutex_lock(&self.state, SOURCE, "records").records.clone()
    }

    /// Update a persisted record, then re-read the records. Returns whether
    /// the re-read succeeded.
    pub async fn update_record(
        &self,
        id: i64,
        update: &PlanningRecordUpdate,
    ) -> Result<bool, PlanningError> {
        self.backend.update_entry(id, update).await?;
        info!(target = "smart_erp::planning", id, "record updated");
        Ok(self.refresh_after_write("update_record").await)
    }

    /// Delete a persisted record, then re-read the records. Returns whether
    /// the re-read succeeded.
    pub async fn delete_record(&self, id: i64) -> Result<bool, PlanningError> {
        self.backend.delete_entry(id).await?;
        info!(target = "smart_erp::planning", id, "record deleted");
        Ok(self.refresh_after_write("delete_record").await)
    }

    /// Records for one shift sheet, taken from the last refreshed view.
    pub fn print_subset(&self, criteria: &PrintCriteria) -> Result<Vec<PlanningRecord>, PlanningError> {
        let state = mutex_lock(&self.state, SOURCE, "print_subset");
        let selected: Vec<PlanningRecord> = select_for_print(&state.records, criteria)
            .into_iter()
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(PlanningError::NoRecords);
        }
        Ok(selected)
    }

    async fn refresh_after_write(&self, op: &'static str) -> bool {
        match self.refresh_records().await {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    target = "smart_erp::planning",
                    op,
                    error = %err,
                    "write succeeded but records could not be refreshed"
                );
                false
            }
        }
    }
}
