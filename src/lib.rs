//! Quality checks and derived metrics for whole-building energy simulation results.
//!
//! The simulation's tabular output is loaded into a [`store::CellStore`],
//! materialized into typed tables on demand, evaluated by the checks in
//! [`checks`] and summarized by [`metrics`].

pub mod analysis;
pub mod checks;
pub mod config;
pub mod error;
pub mod loader;
pub mod materialize;
pub mod metrics;
pub mod model;
pub mod output;
pub mod reports;
pub mod store;
pub mod tables;
pub mod targets;
pub mod types;
pub mod units;
pub mod util;

pub use analysis::{run_analysis, AnalysisInputs, AnalysisOutput};
pub use error::{EvaluationError, ReportError, Result};
