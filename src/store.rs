//! Coordinate-addressed access to the simulation's tabular report data.

use std::collections::{HashMap, HashSet};

use crate::types::{ReportCell, Selector};
use crate::util::parse_f64_safe;

/// Query surface of the report store: one point query plus three
/// schema-discovery queries scoped to a selector.
pub trait ReportStore {
    fn get_cell(&self, selector: &Selector, row: &str, column: &str, unit: &str) -> Option<String>;

    fn distinct_rows(&self, selector: &Selector) -> Vec<String>;

    fn distinct_columns(&self, selector: &Selector) -> Vec<String>;

    fn distinct_units(&self, selector: &Selector) -> Vec<String>;

    /// Point query parsed as a float; absent or non-numeric cells yield `None`.
    fn value_f64(&self, selector: &Selector, row: &str, column: &str, unit: &str) -> Option<f64> {
        let raw = self.get_cell(selector, row, column, unit)?;
        parse_f64_safe(Some(&raw))
    }
}

#[derive(Debug, Default)]
struct Discovered {
    values: Vec<String>,
    seen: HashSet<String>,
}

impl Discovered {
    fn push(&mut self, value: &str) {
        if self.seen.insert(value.to_string()) {
            self.values.push(value.to_string());
        }
    }
}

#[derive(Debug, Default)]
struct TableIndex {
    rows: Discovered,
    columns: Discovered,
    units: Discovered,
}

type Coordinate = (Selector, String, String, String);

/// In-memory report store built from exported cells.
///
/// Discovery queries return values in first-appearance order. A cell whose
/// full coordinate was already seen is rejected.
#[derive(Debug, Default)]
pub struct CellStore {
    cells: HashMap<Coordinate, String>,
    tables: HashMap<Selector, TableIndex>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the coordinate is already occupied.
    pub fn insert(&mut self, cell: ReportCell) -> bool {
        let key = (
            cell.selector.clone(),
            cell.row.clone(),
            cell.column.clone(),
            cell.unit.clone(),
        );
        if self.cells.contains_key(&key) {
            return false;
        }
        let index = self.tables.entry(cell.selector).or_default();
        index.rows.push(&cell.row);
        index.columns.push(&cell.column);
        index.units.push(&cell.unit);
        self.cells.insert(key, cell.value);
        true
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl FromIterator<ReportCell> for CellStore {
    fn from_iter<I: IntoIterator<Item = ReportCell>>(iter: I) -> Self {
        let mut store = CellStore::new();
        for cell in iter {
            store.insert(cell);
        }
        store
    }
}

impl ReportStore for CellStore {
    fn get_cell(&self, selector: &Selector, row: &str, column: &str, unit: &str) -> Option<String> {
        let key = (
            selector.clone(),
            row.to_string(),
            column.to_string(),
            unit.to_string(),
        );
        self.cells.get(&key).cloned()
    }

    fn distinct_rows(&self, selector: &Selector) -> Vec<String> {
        self.tables
            .get(selector)
            .map(|t| t.rows.values.clone())
            .unwrap_or_default()
    }

    fn distinct_columns(&self, selector: &Selector) -> Vec<String> {
        self.tables
            .get(selector)
            .map(|t| t.columns.values.clone())
            .unwrap_or_default()
    }

    fn distinct_units(&self, selector: &Selector) -> Vec<String> {
        self.tables
            .get(selector)
            .map(|t| t.units.values.clone())
            .unwrap_or_default()
    }
}

/// Shorthand used by tests and fixtures.
pub fn cell(selector: &Selector, row: &str, column: &str, unit: &str, value: &str) -> ReportCell {
    ReportCell {
        selector: selector.clone(),
        row: row.to_string(),
        column: column.to_string(),
        unit: unit.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel() -> Selector {
        Selector::new("R", "Entire Facility", "T")
    }

    #[test]
    fn test_discovery_keeps_first_appearance_order() {
        let s = sel();
        let store: CellStore = vec![
            cell(&s, "B", "Val", "kWh", "1"),
            cell(&s, "A", "Val", "kWh", "2"),
            cell(&s, "B", "Other", "", "x"),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.distinct_rows(&s), vec!["B", "A"]);
        assert_eq!(store.distinct_columns(&s), vec!["Val", "Other"]);
        assert_eq!(store.distinct_units(&s), vec!["kWh", ""]);
    }

    #[test]
    fn test_duplicate_coordinate_keeps_first() {
        let s = sel();
        let mut store = CellStore::new();
        assert!(store.insert(cell(&s, "A", "Val", "kWh", "1")));
        assert!(!store.insert(cell(&s, "A", "Val", "kWh", "9")));
        assert_eq!(store.get_cell(&s, "A", "Val", "kWh").as_deref(), Some("1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_selector_is_empty() {
        let store = CellStore::new();
        assert!(store.distinct_rows(&sel()).is_empty());
        assert_eq!(store.get_cell(&sel(), "A", "Val", ""), None);
    }

    #[test]
    fn test_value_f64() {
        let s = sel();
        let store: CellStore = vec![cell(&s, "A", "Val", "W", " 1,200.5 "), cell(&s, "A", "Txt", "", "abc")]
            .into_iter()
            .collect();
        assert_eq!(store.value_f64(&s, "A", "Val", "W"), Some(1200.5));
        assert_eq!(store.value_f64(&s, "A", "Txt", ""), None);
    }
}
