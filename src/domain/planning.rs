//! Planning line items: validation and production arithmetic.
//!
//! Everything here is pure. A line item is derived from a plan date, the
//! active pattern, a subset of its parts, the number of plates and a shift;
//! every derived figure (cavities, weights, heats) is computed once here and
//! never edited afterwards.

use std::fmt;

use smart_erp_api_types::{PlanningEntry, PlanningEntryPart};
use thiserror::Error;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use super::pattern::{LabelQty, PartLine, SelectedPattern, format_pairs};

pub const PLAN_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// First failing check when staging a line item. The display text is the
/// message shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanningValidationError {
    #[error("Please select a plan date")]
    MissingPlanDate,
    #[error("Please select a pattern")]
    MissingPattern,
    #[error("Please select at least one part")]
    MissingParts,
    #[error("Please enter a valid plate quantity")]
    InvalidPlateQty,
    #[error("Please select a shift")]
    MissingShift,
    #[error("Plate quantity is too large for the selected parts")]
    QuantityOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    First,
    Second,
    Third,
}

impl Shift {
    pub fn number(self) -> u8 {
        match self {
            Shift::First => 1,
            Shift::Second => 2,
            Shift::Third => 3,
        }
    }
}

impl TryFrom<u8> for Shift {
    type Error = PlanningValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Shift::First),
            2 => Ok(Shift::Second),
            3 => Ok(Shift::Third),
            _ => Err(PlanningValidationError::MissingShift),
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Raw operator input for one line item. `None` means the field was left empty.
#[derive(Debug, Clone, Copy)]
pub struct LineItemInput<'a> {
    pub plan_date: Option<Date>,
    pub pattern: Option<&'a SelectedPattern>,
    pub parts: &'a [PartLine],
    pub plate_qty: Option<i64>,
    pub shift: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPart {
    pub part: PartLine,
    pub production_qty: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanningLineItem {
    pub plan_date: Date,
    pub pattern_id: i64,
    pub pattern_no: String,
    pub customer_name: String,
    pub mould_box_size: Option<String>,
    pub parts: Vec<PlannedPart>,
    pub plate_qty: i64,
    pub shift: Shift,
    pub total_cavity: i64,
    pub total_cast_weight: f64,
    pub production_qty: i64,
    pub total_weight: f64,
    pub no_of_heats: i64,
    pub core_type: Vec<LabelQty>,
    pub sleeve: Vec<LabelQty>,
}

/// Cavity and cast-weight totals of one plate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastTotals {
    pub total_cavity: i64,
    pub total_cast_weight: f64,
}

/// `None` when the cavity count does not fit in an `i64`.
pub fn cast_totals(parts: &[PartLine]) -> Option<CastTotals> {
    parts.iter().try_fold(
        CastTotals {
            total_cavity: 0,
            total_cast_weight: 0.0,
        },
        |acc, part| {
            Some(CastTotals {
                total_cavity: acc.total_cavity.checked_add(part.cavity)?,
                total_cast_weight: acc.total_cast_weight + part.cavity as f64 * part.weight,
            })
        },
    )
}

/// Furnace heats needed for `plate_qty` boxes, rounded half-up. Zero when the
/// pattern has no boxes-per-heat figure.
pub fn no_of_heats(plate_qty: f64, box_per_heat: f64) -> i64 {
    if box_per_heat > 0.0 {
        (plate_qty / box_per_heat).round() as i64
    } else {
        0
    }
}

/// Validate the input in order (date, pattern, parts, plate quantity, shift)
/// and derive the line item.
pub fn build_line_item(input: LineItemInput<'_>) -> Result<PlanningLineItem, PlanningValidationError> {
    let plan_date = input
        .plan_date
        .ok_or(PlanningValidationError::MissingPlanDate)?;
    let pattern = input.pattern.ok_or(PlanningValidationError::MissingPattern)?;
    if input.parts.is_empty() {
        return Err(PlanningValidationError::MissingParts);
    }
    let plate_qty = input
        .plate_qty
        .filter(|qty| *qty > 0)
        .ok_or(PlanningValidationError::InvalidPlateQty)?;
    let shift = input
        .shift
        .ok_or(PlanningValidationError::MissingShift)
        .and_then(Shift::try_from)?;

    let totals = cast_totals(input.parts).ok_or(PlanningValidationError::QuantityOverflow)?;
    let production_qty = plate_qty
        .checked_mul(totals.total_cavity)
        .ok_or(PlanningValidationError::QuantityOverflow)?;
    let parts = input
        .parts
        .iter()
        .map(|part| {
            plate_qty
                .checked_mul(part.cavity)
                .map(|production_qty| PlannedPart {
                    production_qty,
                    part: part.clone(),
                })
                .ok_or(PlanningValidationError::QuantityOverflow)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlanningLineItem {
        plan_date,
        pattern_id: pattern.summary.id,
        pattern_no: pattern.summary.pattern_no.clone(),
        customer_name: pattern.summary.customer_name.clone(),
        mould_box_size: pattern.spec.mould_box_size.clone(),
        parts,
        plate_qty,
        shift,
        total_cavity: totals.total_cavity,
        total_cast_weight: totals.total_cast_weight,
        production_qty,
        total_weight: plate_qty as f64 * totals.total_cast_weight,
        no_of_heats: no_of_heats(plate_qty as f64, pattern.spec.box_per_heat),
        core_type: pattern.spec.cores.clone(),
        sleeve: pattern.spec.sleeves.clone(),
    })
}

pub fn format_plan_date(date: Date) -> String {
    date.format(PLAN_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

impl From<&PlanningLineItem> for PlanningEntry {
    fn from(item: &PlanningLineItem) -> Self {
        Self {
            plan_date: format_plan_date(item.plan_date),
            pattern_id: item.pattern_id,
            pattern_no: item.pattern_no.clone(),
            customer_name: item.customer_name.clone(),
            mould_box_size: item.mould_box_size.clone().unwrap_or_default(),
            parts: item
                .parts
                .iter()
                .map(|planned| PlanningEntryPart {
                    part_row_id: planned.part.part_row_id,
                    part_no: planned.part.part_no.clone(),
                    internal_part_no: planned.part.internal_part_no.clone(),
                    part_name: planned.part.part_name.clone(),
                    cavity: planned.part.cavity,
                    weight: planned.part.weight,
                    production_qty: planned.production_qty,
                })
                .collect(),
            plate_qty: item.plate_qty,
            shift: item.shift.number(),
            total_cavity: item.total_cavity,
            total_cast_weight: item.total_cast_weight,
            production_qty: item.production_qty,
            total_weight: item.total_weight,
            no_of_heats: item.no_of_heats,
            core_type: format_pairs(&item.core_type),
            sleeve: format_pairs(&item.sleeve),
        }
    }
}
