use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One line of the tabular-report CSV export.
#[derive(Debug, Deserialize)]
pub struct RawCell {
    #[serde(rename = "ReportName")]
    pub report_name: Option<String>,
    #[serde(rename = "ReportForString")]
    pub report_for_string: Option<String>,
    #[serde(rename = "TableName")]
    pub table_name: Option<String>,
    #[serde(rename = "RowName")]
    pub row_name: Option<String>,
    #[serde(rename = "ColumnName")]
    pub column_name: Option<String>,
    #[serde(rename = "Units")]
    pub units: Option<String>,
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

/// Identifies one logical table in the report store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Selector {
    pub report: String,
    pub sub_report: String,
    pub table: String,
}

impl Selector {
    pub fn new(report: impl Into<String>, sub_report: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            report: report.into(),
            sub_report: sub_report.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.report, self.sub_report, self.table)
    }
}

/// A fully addressed raw value from the report store.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportCell {
    pub selector: Selector,
    pub row: String,
    pub column: String,
    pub unit: String,
    pub value: String,
}

/// Typed value of a materialized field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// One record per distinct row name of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedRow {
    pub name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, CellValue>,
}

impl MaterializedRow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(CellValue::as_f64)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(CellValue::as_str)
    }

    /// Sum of every numeric field whose name ends with `suffix`.
    pub fn sum_with_suffix(&self, suffix: &str) -> f64 {
        self.fields
            .iter()
            .filter(|(k, _)| k.ends_with(suffix))
            .filter_map(|(_, v)| v.as_f64())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub report_name: String,
    pub report_for_string: String,
    pub table_name: String,
    #[serde(rename = "table")]
    pub rows: Vec<MaterializedRow>,
}

impl ReportTable {
    pub fn row(&self, name: &str) -> Option<&MaterializedRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

/// Outcome of one check: fixed metadata followed by zero or more flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub category: String,
    pub description: String,
    pub flags: Vec<String>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
            flags: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.flags.is_empty()
    }

    /// Attributes in emission order: name, category, description, then one `flag` per message.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("name", self.name.as_str()),
            ("category", self.category.as_str()),
            ("description", self.description.as_str()),
        ];
        out.extend(self.flags.iter().map(|f| ("flag", f.as_str())));
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Red,
}

impl StatusColor {
    pub fn for_flag_count(count: usize) -> Self {
        if count == 0 {
            StatusColor::Green
        } else {
            StatusColor::Red
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusColor::Green => write!(f, "green"),
            StatusColor::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SummaryRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Flags")]
    #[tabled(rename = "Flags")]
    pub flag_count: usize,
    #[serde(rename = "Description")]
    #[tabled(rename = "Description")]
    pub description: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: StatusColor,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailRow {
    #[serde(rename = "#")]
    #[tabled(rename = "#")]
    pub index: usize,
    #[serde(rename = "Flag")]
    #[tabled(rename = "Flag")]
    pub message: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct DetailTable {
    pub title: String,
    pub rows: Vec<DetailRow>,
}
