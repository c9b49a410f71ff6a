//! Wire shapes of the foundry ERP backend.
//!
//! The backend mixes naming conventions: pattern-master rows use PascalCase
//! (`PatternId`), pattern detail uses snake-ish PascalCase (`Box_Per_Heat`)
//! alongside camelCase collections (`sleeveRows`), and planning entries are
//! posted in camelCase. Field names here follow the wire exactly.

use serde::{Deserialize, Serialize};

/// A numeric field the backend sends either as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    /// Textual form used by lenient parsers.
    pub fn to_text(&self) -> String {
        match self {
            Numeric::Int(value) => value.to_string(),
            Numeric::Float(value) => value.to_string(),
            Numeric::Text(value) => value.clone(),
        }
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::Int(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Float(value)
    }
}

impl From<&str> for Numeric {
    fn from(value: &str) -> Self {
        Numeric::Text(value.to_string())
    }
}

/// Row of `GET /pattern-master/numbers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternNumber {
    #[serde(rename = "PatternId")]
    pub pattern_id: i64,
    #[serde(rename = "PatternNo")]
    pub pattern_no: String,
    #[serde(rename = "CustomerName", default)]
    pub customer_name: Option<String>,
}

/// Row of `GET /pattern-master/parts-by-pattern/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternPart {
    #[serde(rename = "PartRowId")]
    pub part_row_id: i64,
    #[serde(rename = "PartNo", default)]
    pub part_no: Option<String>,
    #[serde(rename = "InternalPartNo", default)]
    pub internal_part_no: Option<String>,
    #[serde(rename = "PartName", default)]
    pub part_name: Option<String>,
    #[serde(rename = "Qty", default)]
    pub qty: Option<Numeric>,
    #[serde(rename = "Weight", default)]
    pub weight: Option<Numeric>,
}

/// Body of `GET /pattern-master/{id}`, restricted to the fields planning reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternDetail {
    #[serde(rename = "PatternId", default)]
    pub pattern_id: Option<i64>,
    #[serde(rename = "PatternNo", default)]
    pub pattern_no: Option<String>,
    #[serde(rename = "Box_Per_Heat", default)]
    pub box_per_heat: Option<Numeric>,
    #[serde(rename = "Moulding_Box_Size", default)]
    pub moulding_box_size: Option<String>,
    #[serde(rename = "Shell_Core_Qty", default)]
    pub shell_core_qty: Option<Numeric>,
    #[serde(rename = "Cold_Box_Qty", default)]
    pub cold_box_qty: Option<Numeric>,
    #[serde(rename = "No_Bake_Qty", default)]
    pub no_bake_qty: Option<Numeric>,
    #[serde(rename = "CO2_Core_Qty", default)]
    pub co2_core_qty: Option<Numeric>,
    #[serde(rename = "sleeveRows", default)]
    pub sleeve_rows: Vec<SleeveRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleeveRow {
    #[serde(default, alias = "sleeveSize", alias = "Sleeve_Size")]
    pub sleeve_size: Option<String>,
    #[serde(default, alias = "Quantity", alias = "qty")]
    pub quantity: Option<Numeric>,
}

/// One part of a staged planning entry as posted to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningEntryPart {
    pub part_row_id: i64,
    pub part_no: String,
    pub internal_part_no: String,
    pub part_name: String,
    pub cavity: i64,
    pub weight: f64,
    pub production_qty: i64,
}

/// One staged planning entry as posted to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningEntry {
    pub plan_date: String,
    pub pattern_id: i64,
    pub pattern_no: String,
    pub customer_name: String,
    pub mould_box_size: String,
    pub parts: Vec<PlanningEntryPart>,
    pub plate_qty: i64,
    pub shift: u8,
    pub total_cavity: i64,
    pub total_cast_weight: f64,
    pub production_qty: i64,
    pub total_weight: f64,
    pub no_of_heats: i64,
    pub core_type: String,
    pub sleeve: String,
}

/// Body of `POST /planning-entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningBatch {
    pub entries: Vec<PlanningEntry>,
}

/// Row of `GET /planning-entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRecord {
    #[serde(rename = "PlanningId", alias = "id", alias = "Id")]
    pub id: i64,
    #[serde(rename = "PlanDate")]
    pub plan_date: String,
    #[serde(rename = "Shift")]
    pub shift: Numeric,
    #[serde(rename = "PatternId", default)]
    pub pattern_id: Option<i64>,
    #[serde(rename = "PatternNo", default)]
    pub pattern_no: Option<String>,
    #[serde(rename = "CustomerName", default)]
    pub customer_name: Option<String>,
    #[serde(rename = "MouldBoxSize", alias = "Moulding_Box_Size", default)]
    pub mould_box_size: Option<String>,
    #[serde(rename = "PlateQty", default)]
    pub plate_qty: Option<Numeric>,
    #[serde(rename = "ProductionQty", default)]
    pub production_qty: Option<Numeric>,
    #[serde(rename = "TotalWeight", default)]
    pub total_weight: Option<Numeric>,
    #[serde(rename = "NoOfHeats", default)]
    pub no_of_heats: Option<Numeric>,
    #[serde(rename = "CoreType", default)]
    pub core_type: Option<String>,
    #[serde(rename = "Sleeve", default)]
    pub sleeve: Option<String>,
}

/// Body of `PUT /planning-entry/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRecordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_qty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mould_box_size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_accepts_text_and_numeric_quantities() {
        let parts: Vec<PatternPart> = serde_json::from_str(
            r#"[
                {"PartRowId": 1, "PartNo": "P-1", "Qty": "2", "Weight": 3.5},
                {"PartRowId": 2, "PartNo": "P-2", "Qty": 1, "Weight": null}
            ]"#,
        )
        .expect("parts should decode");

        assert_eq!(parts[0].qty, Some(Numeric::Text("2".to_string())));
        assert_eq!(parts[0].weight, Some(Numeric::Float(3.5)));
        assert_eq!(parts[1].qty, Some(Numeric::Int(1)));
        assert_eq!(parts[1].weight, None);
        assert_eq!(parts[1].part_name, None);
    }

    #[test]
    fn detail_reads_sleeve_rows_with_alternate_keys() {
        let detail: PatternDetail = serde_json::from_str(
            r#"{
                "PatternId": 7,
                "Box_Per_Heat": "12",
                "Moulding_Box_Size": "600x500",
                "sleeveRows": [{"sleeveSize": "S-40", "Quantity": 2}]
            }"#,
        )
        .expect("detail should decode");

        assert_eq!(detail.box_per_heat, Some(Numeric::Text("12".to_string())));
        assert_eq!(detail.sleeve_rows.len(), 1);
        assert_eq!(detail.sleeve_rows[0].sleeve_size.as_deref(), Some("S-40"));
        assert_eq!(detail.sleeve_rows[0].quantity, Some(Numeric::Int(2)));
    }

    #[test]
    fn batch_serializes_camel_case() {
        let batch = PlanningBatch {
            entries: vec![PlanningEntry {
                plan_date: "2026-10-19".to_string(),
                pattern_id: 7,
                pattern_no: "PT-7".to_string(),
                customer_name: "Acme".to_string(),
                mould_box_size: "600x500".to_string(),
                parts: Vec::new(),
                plate_qty: 4,
                shift: 1,
                total_cavity: 3,
                total_cast_weight: 11.0,
                production_qty: 12,
                total_weight: 44.0,
                no_of_heats: 1,
                core_type: "-".to_string(),
                sleeve: "-".to_string(),
            }],
        };

        let value = serde_json::to_value(&batch).expect("batch should serialize");
        let entry = &value["entries"][0];
        assert_eq!(entry["planDate"], "2026-10-19");
        assert_eq!(entry["totalCastWeight"], 11.0);
        assert_eq!(entry["noOfHeats"], 1);
    }
}
