//! In-memory staging list of planning line items awaiting a batch submit.
//!
//! Lifecycle: `Empty -> Staging` on push, `Staging -> Submitting` when a submit
//! begins, then `Empty` on success or back to `Staging` (unchanged) on failure.
//! `clear` drops every uncommitted item. Nothing may change while a submit is
//! in flight.

use thiserror::Error;

use super::planning::PlanningLineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingState {
    Empty,
    Staging,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("a submission is already in progress")]
    SubmitInProgress,
    #[error("no planning entries to submit")]
    Empty,
    #[error("staged entry {index} does not exist")]
    IndexOutOfRange { index: usize },
    #[error("no submission is in progress")]
    NotSubmitting,
}

#[derive(Debug, Default)]
pub struct StagingList {
    items: Vec<PlanningLineItem>,
    submitting: bool,
}

impl StagingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StagingState {
        if self.submitting {
            StagingState::Submitting
        } else if self.items.is_empty() {
            StagingState::Empty
        } else {
            StagingState::Staging
        }
    }

    pub fn items(&self) -> &[PlanningLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: PlanningLineItem) -> Result<(), StagingError> {
        self.ensure_idle()?;
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<PlanningLineItem, StagingError> {
        self.ensure_idle()?;
        if index >= self.items.len() {
            return Err(StagingError::IndexOutOfRange { index });
        }
        Ok(self.items.remove(index))
    }

    /// Discard every staged item, returning how many were dropped.
    pub fn clear(&mut self) -> Result<usize, StagingError> {
        self.ensure_idle()?;
        let dropped = self.items.len();
        self.items.clear();
        Ok(dropped)
    }

    /// Enter `Submitting` and hand out a snapshot of the batch to send.
    pub fn begin_submit(&mut self) -> Result<Vec<PlanningLineItem>, StagingError> {
        self.ensure_idle()?;
        if self.items.is_empty() {
            return Err(StagingError::Empty);
        }
        self.submitting = true;
        Ok(self.items.clone())
    }

    /// Leave `Submitting`. Committed batches are dropped; a failed batch stays
    /// staged exactly as it was.
    pub fn finish_submit(&mut self, committed: bool) -> Result<(), StagingError> {
        if !self.submitting {
            return Err(StagingError::NotSubmitting);
        }
        self.submitting = false;
        if committed {
            self.items.clear();
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), StagingError> {
        if self.submitting {
            Err(StagingError::SubmitInProgress)
        } else {
            Ok(())
        }
    }
}
