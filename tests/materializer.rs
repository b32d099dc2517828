use energy_qaqc::materialize::{materialize, materialize_required};
use energy_qaqc::store::{cell, CellStore};
use energy_qaqc::types::{CellValue, Selector};
use energy_qaqc::ReportError;

fn selector() -> Selector {
    Selector::new("AnnualBuildingUtilityPerformanceSummary", "Entire Facility", "End Uses")
}

#[test]
fn test_zero_row_is_dropped() {
    let s = selector();
    let store: CellStore = vec![cell(&s, "A", "Val", "kWh", "12.5"), cell(&s, "B", "Val", "kWh", "0.00")]
        .into_iter()
        .collect();

    let table = materialize(&store, &s);
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].name, "A");
    assert_eq!(table.rows[0].get("val_kwh"), Some(&CellValue::Number(12.5)));
    assert_eq!(table.table_name, "End Uses");
}

#[test]
fn test_materialize_is_idempotent() {
    let s = selector();
    let store: CellStore = vec![
        cell(&s, "Heating", "Electricity", "GJ", "1.23E-05"),
        cell(&s, "Heating", "Natural Gas", "GJ", "310.25"),
        cell(&s, "Cooling", "Electricity", "GJ", "88.00"),
        cell(&s, "Time of Peak", "Electricity", "", "15-JAN-10:30"),
        cell(&s, "Note", "Comment", "", "see table"),
    ]
    .into_iter()
    .collect();

    let first = materialize(&store, &s);
    let second = materialize(&store, &s);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    let heating = first.row("Heating").unwrap();
    assert_eq!(heating.number("electricity_gj"), Some(1.23e-5));
    assert!(matches!(first.row("Time of Peak").unwrap().get("electricity"), Some(CellValue::Date(_))));
    assert_eq!(first.row("Note").unwrap().text("comment"), Some("see table"));
}

#[test]
fn test_required_table_missing_is_an_error() {
    let store = CellStore::new();
    assert!(materialize(&store, &selector()).rows.is_empty());
    let err = materialize_required(&store, &selector()).unwrap_err();
    assert!(matches!(err, ReportError::SourceTableMissing { .. }));
}
