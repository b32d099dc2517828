//! Input loading: the tabular report export and the JSON collaborators.

use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{Building, CostResult};
use crate::store::CellStore;
use crate::types::{RawCell, ReportCell, Selector};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_cells: usize,
    /// Lines the CSV reader could not deserialize.
    pub parse_errors: usize,
    /// Lines without a report, table or column name.
    pub incomplete_rows: usize,
    /// Lines whose full coordinate was already loaded.
    pub duplicate_cells: usize,
}

impl LoadReport {
    pub fn rejected(&self) -> usize {
        self.parse_errors + self.incomplete_rows + self.duplicate_cells
    }
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn into_cell(raw: RawCell) -> Option<ReportCell> {
    let selector = Selector::new(
        required(raw.report_name)?,
        raw.report_for_string.unwrap_or_default().trim(),
        required(raw.table_name)?,
    );
    Some(ReportCell {
        selector,
        row: raw.row_name.unwrap_or_default().trim().to_string(),
        column: required(raw.column_name)?,
        unit: raw.units.unwrap_or_default().trim().to_string(),
        value: raw.value.unwrap_or_default(),
    })
}

pub fn load_cells_from_reader<R: io::Read>(reader: R) -> Result<(CellStore, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut store = CellStore::new();
    let mut report = LoadReport::default();

    for result in rdr.deserialize::<RawCell>() {
        report.total_rows += 1;
        let raw = match result {
            Ok(r) => r,
            Err(_) => {
                report.parse_errors += 1;
                continue;
            }
        };
        let Some(cell) = into_cell(raw) else {
            report.incomplete_rows += 1;
            continue;
        };
        if store.insert(cell) {
            report.loaded_cells += 1;
        } else {
            report.duplicate_cells += 1;
        }
    }
    Ok((store, report))
}

/// Load the report store from a CSV export with header
/// `ReportName,ReportForString,TableName,RowName,ColumnName,Units,Value`.
pub fn load_cells(path: impl AsRef<Path>) -> Result<(CellStore, LoadReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (store, report) = load_cells_from_reader(file)?;
    info!(
        path = %path.display(),
        rows = report.total_rows,
        cells = report.loaded_cells,
        tables = store.table_count(),
        "loaded report store"
    );
    if report.rejected() > 0 {
        warn!(
            parse_errors = report.parse_errors,
            incomplete = report.incomplete_rows,
            duplicates = report.duplicate_cells,
            "rejected report rows"
        );
    }
    Ok((store, report))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

pub fn load_building(path: impl AsRef<Path>) -> Result<Building> {
    let path = path.as_ref();
    let building: Building = load_json(path)?;
    info!(
        path = %path.display(),
        name = %building.name,
        zones = building.zones.len(),
        surfaces = building.surfaces.len(),
        "loaded building model"
    );
    Ok(building)
}

pub fn load_costing(path: impl AsRef<Path>) -> Result<CostResult> {
    let path = path.as_ref();
    let costs: CostResult = load_json(path)?;
    info!(path = %path.display(), grand_total = costs.totals.grand_total, "loaded costing summary");
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ReportStore;

    const HEADER: &str = "ReportName,ReportForString,TableName,RowName,ColumnName,Units,Value\n";

    #[test]
    fn test_load_counts_rejections() {
        let csv = format!(
            "{}{}{}{}{}",
            HEADER,
            "AnnualBuildingUtilityPerformanceSummary,Entire Facility,End Uses,Heating,Electricity,GJ,  12.50\n",
            "AnnualBuildingUtilityPerformanceSummary,Entire Facility,End Uses,Heating,Electricity,GJ,99.00\n",
            ",Entire Facility,End Uses,Cooling,Electricity,GJ,1.00\n",
            "AnnualBuildingUtilityPerformanceSummary,Entire Facility,End Uses,Cooling,Electricity,GJ,3.00\n",
        );
        let (store, report) = load_cells_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_cells, 2);
        assert_eq!(report.duplicate_cells, 1);
        assert_eq!(report.incomplete_rows, 1);
        assert_eq!(report.rejected(), 2);

        let sel = crate::tables::end_uses();
        assert_eq!(store.value_f64(&sel, "Heating", "Electricity", "GJ"), Some(12.5));
        assert_eq!(store.distinct_rows(&sel), vec!["Heating", "Cooling"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_cells("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, crate::error::ReportError::Io(_)));
    }
}
