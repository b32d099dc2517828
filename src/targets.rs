//! Target-value lookups keyed by standard, category and search criteria.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

pub const CATEGORY_EUI: &str = "eui";
pub const CATEGORY_END_USE_EUI: &str = "end_use_eui";
pub const CATEGORY_ENVELOPE_R_VALUE: &str = "envelope_r_value";
pub const CATEGORY_ENVELOPE_U_VALUE: &str = "envelope_u_value";
pub const CATEGORY_SCHEDULE_HOURS: &str = "schedule_eflh";
pub const CATEGORY_SPACE_LOAD: &str = "space_load";
pub const CATEGORY_HOT_WATER: &str = "hot_water_gal_per_person_day";

/// Keyed lookup of target values. `None` means no target exists.
pub trait TargetLookup {
    fn find(&self, standard: &str, category: &str, criteria: &[(&str, &str)]) -> Option<f64>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetRow {
    pub standard: String,
    pub category: String,
    #[serde(default)]
    pub criteria: BTreeMap<String, String>,
    #[serde(deserialize_with = "deserialize_target_value")]
    pub value: f64,
}

impl TargetRow {
    fn matches(&self, standard: &str, category: &str, criteria: &[(&str, &str)]) -> bool {
        self.standard == standard
            && self.category == category
            && criteria
                .iter()
                .all(|(k, v)| self.criteria.get(*k).map(String::as_str) == Some(*v))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTargetValue {
    Number(f64),
    Text(String),
}

/// Accepts a number or the strings `"Infinity"` / `"inf"` for unbounded targets.
fn deserialize_target_value<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTargetValue::deserialize(deserializer)? {
        RawTargetValue::Number(n) => Ok(n),
        RawTargetValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "infinity" | "inf" => Ok(f64::INFINITY),
            other => other
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid target value '{}'", s))),
        },
    }
}

/// Target rows loaded from JSON; the first matching row wins.
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    rows: Vec<TargetRow>,
}

impl TargetTable {
    pub fn new(rows: Vec<TargetRow>) -> Self {
        Self { rows }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let rows: Vec<TargetRow> = serde_json::from_str(s)?;
        Ok(Self::new(rows))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TargetLookup for TargetTable {
    fn find(&self, standard: &str, category: &str, criteria: &[(&str, &str)]) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.matches(standard, category, criteria))
            .map(|r| r.value)
    }
}
