//! Rebuilds dense, typed records from a sparse report table.

use std::time::Instant;

use tracing::debug;

use crate::error::{ReportError, Result};
use crate::store::ReportStore;
use crate::types::{MaterializedRow, ReportTable, Selector};
use crate::util::{coerce, normalize_field_name};

/// Materialize every row of `selector`.
///
/// Schema is discovered with the store's three distinct-value queries, then
/// each (row, column, unit) triple is fetched with a point query and coerced.
/// Rows that resolve no data field are dropped. An unknown selector yields an
/// empty table.
pub fn materialize<S: ReportStore + ?Sized>(store: &S, selector: &Selector) -> ReportTable {
    let started = Instant::now();
    let row_names = store.distinct_rows(selector);
    let columns = store.distinct_columns(selector);
    let units = store.distinct_units(selector);

    let mut rows = Vec::new();
    for row_name in row_names.iter().filter(|r| !r.is_empty()) {
        let mut row = MaterializedRow::new(row_name.as_str());
        for column in &columns {
            for unit in &units {
                let Some(raw) = store.get_cell(selector, row_name, column, unit) else {
                    continue;
                };
                let Some(value) = coerce(&raw, unit).into_value() else {
                    continue;
                };
                row.fields.insert(normalize_field_name(column, unit), value);
            }
        }
        if !row.fields.is_empty() {
            rows.push(row);
        }
    }

    debug!(
        table = %selector,
        discovered_rows = row_names.len(),
        kept_rows = rows.len(),
        point_queries = row_names.len() * columns.len() * units.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "materialized report table"
    );

    ReportTable {
        report_name: selector.report.clone(),
        report_for_string: selector.sub_report.clone(),
        table_name: selector.table.clone(),
        rows,
    }
}

/// Like [`materialize`], but an empty result is an error naming the selector.
pub fn materialize_required<S: ReportStore + ?Sized>(store: &S, selector: &Selector) -> Result<ReportTable> {
    let table = materialize(store, selector);
    if table.rows.is_empty() {
        return Err(ReportError::SourceTableMissing {
            selector: selector.clone(),
        });
    }
    Ok(table)
}
