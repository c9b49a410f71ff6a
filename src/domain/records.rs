//! Persisted planning records and the print selection over them.

use smart_erp_api_types::{Numeric, PlanningRecord};
use time::Date;

use super::lenient;
use super::pattern::EMPTY_SUMMARY;
use super::planning::{PLAN_DATE_FORMAT, Shift, format_plan_date};

/// Which persisted records belong on a shift sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCriteria {
    pub date: Date,
    pub shift: Shift,
    pub mould_box_size: Option<String>,
}

impl PrintCriteria {
    pub fn matches(&self, record: &PlanningRecord) -> bool {
        if record_date(record) != Some(self.date) {
            return false;
        }
        if record_shift(record) != Some(self.shift) {
            return false;
        }
        match self.box_size_filter() {
            Some(size) => record.mould_box_size.as_deref().map(str::trim) == Some(size),
            None => true,
        }
    }

    fn box_size_filter(&self) -> Option<&str> {
        self.mould_box_size
            .as_deref()
            .map(str::trim)
            .filter(|size| !size.is_empty())
    }
}

/// Records matching `criteria`, in backend order.
pub fn select_for_print<'a>(
    records: &'a [PlanningRecord],
    criteria: &PrintCriteria,
) -> Vec<&'a PlanningRecord> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .collect()
}

/// Calendar date of a record. The backend may append a time component
/// (`2026-10-19T00:00:00.000Z`); only the date part is compared.
pub fn record_date(record: &PlanningRecord) -> Option<Date> {
    let text = record.plan_date.trim();
    let day = text.get(..10).unwrap_or(text);
    Date::parse(day, PLAN_DATE_FORMAT).ok()
}

pub fn record_shift(record: &PlanningRecord) -> Option<Shift> {
    lenient::parse_int_prefix(&record.shift.to_text())
        .and_then(|value| u8::try_from(value).ok())
        .and_then(|value| Shift::try_from(value).ok())
}

const SHEET_COLUMNS: [&str; 10] = [
    "Id", "Pattern", "Customer", "Box", "Plates", "Qty", "Weight", "Heats", "Core", "Sleeve",
];

/// Tab-separated shift sheet: a title line, a header row, then one row per
/// record. Missing values print as `-`.
pub fn format_sheet(criteria: &PrintCriteria, records: &[PlanningRecord]) -> String {
    let mut title = format!(
        "Plan date {} shift {}",
        format_plan_date(criteria.date),
        criteria.shift
    );
    if let Some(size) = criteria.box_size_filter() {
        title.push_str(&format!(" box {size}"));
    }

    let mut lines = vec![title, SHEET_COLUMNS.join("\t")];
    lines.extend(records.iter().map(sheet_row));
    lines.join("\n")
}

fn sheet_row(record: &PlanningRecord) -> String {
    let text = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(EMPTY_SUMMARY)
            .to_string()
    };
    let number = |value: Option<&Numeric>| {
        value
            .map(Numeric::to_text)
            .unwrap_or_else(|| EMPTY_SUMMARY.to_string())
    };

    [
        record.id.to_string(),
        text(record.pattern_no.as_deref()),
        text(record.customer_name.as_deref()),
        text(record.mould_box_size.as_deref()),
        number(record.plate_qty.as_ref()),
        number(record.production_qty.as_ref()),
        number(record.total_weight.as_ref()),
        number(record.no_of_heats.as_ref()),
        text(record.core_type.as_deref()),
        text(record.sleeve.as_deref()),
    ]
    .join("\t")
}
