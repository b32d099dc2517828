//! Error types for report loading, materialization, and metric computation.

use thiserror::Error;

use crate::types::Selector;

/// Errors that abort an analysis run or a single input load.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Underlying filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader or writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required report table produced no rows.
    #[error("source table missing: {selector}")]
    SourceTableMissing { selector: Selector },

    /// No conversion factor is known between two unit labels.
    #[error("cannot convert from '{from}' to '{to}'")]
    UnknownUnitConversion { from: String, to: String },

    /// The price dataset has no entry for the requested fuel/province/year.
    #[error("no {fuel} price for province '{province}' in year {year}")]
    MissingPrice {
        fuel: String,
        province: String,
        year: i32,
    },

    /// A value the run cannot proceed without is absent.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// Input data is present but unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised inside a single check body. The check boundary turns these
/// into a flag; they never leave the registry.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("{0}")]
    MissingData(String),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EvaluationError {
    pub fn missing(what: impl Into<String>) -> Self {
        EvaluationError::MissingData(what.into())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReportError::SourceTableMissing {
            selector: Selector::new("AnnualBuildingUtilityPerformanceSummary", "Entire Facility", "End Uses"),
        };
        assert_eq!(
            err.to_string(),
            "source table missing: AnnualBuildingUtilityPerformanceSummary / Entire Facility / End Uses"
        );

        let err = ReportError::MissingPrice {
            fuel: "Electricity".into(),
            province: "ON".into(),
            year: 2050,
        };
        assert!(err.to_string().contains("2050"));

        let err: EvaluationError = ReportError::MissingPrerequisite("floor area".into()).into();
        assert_eq!(err.to_string(), "missing prerequisite: floor area");
    }
}
