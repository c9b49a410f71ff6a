//! Pattern-master reference data as seen by planning.

use std::fmt;

use smart_erp_api_types::{Numeric, PatternDetail, PatternNumber, PatternPart};

use super::lenient;

/// Sentinel rendered when a pattern has no core or sleeve configuration.
pub const EMPTY_SUMMARY: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub struct PatternSummary {
    pub id: i64,
    pub pattern_no: String,
    pub customer_name: String,
}

impl From<PatternNumber> for PatternSummary {
    fn from(row: PatternNumber) -> Self {
        Self {
            id: row.pattern_id,
            pattern_no: row.pattern_no,
            customer_name: row.customer_name.unwrap_or_default(),
        }
    }
}

/// A part attached to a pattern, with its quantities already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct PartLine {
    pub part_row_id: i64,
    pub part_no: String,
    pub internal_part_no: String,
    pub part_name: String,
    pub cavity: i64,
    pub weight: f64,
}

impl From<PatternPart> for PartLine {
    fn from(row: PatternPart) -> Self {
        Self {
            part_row_id: row.part_row_id,
            cavity: lenient::cavity(row.qty.as_ref()),
            weight: lenient::weight(row.weight.as_ref()),
            part_no: row.part_no.unwrap_or_default(),
            internal_part_no: row.internal_part_no.unwrap_or_default(),
            part_name: row.part_name.unwrap_or_default(),
        }
    }
}

/// A `label=qty` pair of the core or sleeve configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelQty {
    pub label: String,
    pub qty: i64,
}

impl LabelQty {
    pub fn new(label: impl Into<String>, qty: i64) -> Self {
        Self {
            label: label.into(),
            qty,
        }
    }
}

impl fmt::Display for LabelQty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.label, self.qty)
    }
}

/// Render pairs as `a=1, b=2`, or [`EMPTY_SUMMARY`] when there are none.
pub fn format_pairs(pairs: &[LabelQty]) -> String {
    if pairs.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    pairs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Production constants of a pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternSpec {
    pub box_per_heat: f64,
    pub mould_box_size: Option<String>,
    pub cores: Vec<LabelQty>,
    pub sleeves: Vec<LabelQty>,
}

impl From<&PatternDetail> for PatternSpec {
    fn from(detail: &PatternDetail) -> Self {
        let cores = [
            ("Shell", detail.shell_core_qty.as_ref()),
            ("Cold Box", detail.cold_box_qty.as_ref()),
            ("No-Bake", detail.no_bake_qty.as_ref()),
            ("CO2", detail.co2_core_qty.as_ref()),
        ]
        .into_iter()
        .filter_map(|(label, qty)| positive_pair(Some(label), qty))
        .collect();

        let sleeves = detail
            .sleeve_rows
            .iter()
            .filter_map(|row| positive_pair(row.sleeve_size.as_deref(), row.quantity.as_ref()))
            .collect();

        Self {
            box_per_heat: lenient::number(detail.box_per_heat.as_ref()),
            mould_box_size: detail
                .moulding_box_size
                .as_deref()
                .map(str::trim)
                .filter(|size| !size.is_empty())
                .map(str::to_string),
            cores,
            sleeves,
        }
    }
}

fn positive_pair(label: Option<&str>, qty: Option<&Numeric>) -> Option<LabelQty> {
    let label = label.map(str::trim).filter(|label| !label.is_empty())?;
    let qty = qty.and_then(|qty| lenient::parse_int_prefix(&qty.to_text()))?;
    (qty > 0).then(|| LabelQty::new(label, qty))
}

/// The pattern currently chosen for planning, with its reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPattern {
    pub summary: PatternSummary,
    pub spec: PatternSpec,
    pub parts: Vec<PartLine>,
}
