//! One analysis run: every check, the aggregated report, then the metrics.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::checks::{CheckRegistry, EvaluationContext};
use crate::config::{AnalysisConfig, InputPaths};
use crate::error::Result;
use crate::loader::{self, LoadReport};
use crate::metrics::{self, MetricRecord, MetricsContext, PriceTable};
use crate::model::{Building, CostResult};
use crate::reports::{aggregate, QaqcReport};
use crate::store::{CellStore, ReportStore};
use crate::targets::{TargetLookup, TargetTable};
use crate::types::CheckResult;

/// Borrowed collaborators for one run.
pub struct AnalysisInputs<'a> {
    pub building: &'a Building,
    pub store: &'a dyn ReportStore,
    pub targets: &'a dyn TargetLookup,
    pub prices: &'a PriceTable,
    pub costs: Option<&'a CostResult>,
    pub config: &'a AnalysisConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    #[serde(skip)]
    pub results: Vec<CheckResult>,
    #[serde(flatten)]
    pub report: QaqcReport,
    pub metrics: MetricRecord,
}

/// Run all checks in `registry` and compute the metrics.
///
/// Check failures are contained in their own results. A metrics failure is
/// fatal and is returned as the run's error.
pub fn run_with_registry(registry: &CheckRegistry, inputs: &AnalysisInputs<'_>) -> Result<AnalysisOutput> {
    let started = Instant::now();
    let ctx = EvaluationContext {
        building: inputs.building,
        store: inputs.store,
        targets: inputs.targets,
        config: inputs.config,
    };
    let results = registry.run_all(&ctx);
    let report = aggregate(&results);
    info!(
        checks = results.len(),
        failing = report.failing_checks(),
        flags = report.total_flags,
        "QAQC checks complete"
    );

    let metrics = metrics::compute_all(&MetricsContext {
        building: inputs.building,
        store: inputs.store,
        prices: inputs.prices,
        costs: inputs.costs,
        config: inputs.config,
    })?;

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "analysis run complete");
    Ok(AnalysisOutput {
        results,
        report,
        metrics,
    })
}

pub fn run_analysis(inputs: &AnalysisInputs<'_>) -> Result<AnalysisOutput> {
    run_with_registry(&CheckRegistry::standard(), inputs)
}

/// Owned inputs read from the paths in the configuration.
pub struct LoadedInputs {
    pub building: Building,
    pub store: CellStore,
    pub load_report: LoadReport,
    pub targets: TargetTable,
    pub prices: PriceTable,
    pub costs: Option<CostResult>,
}

impl LoadedInputs {
    /// Report store, building and prices are required; a missing target
    /// table leaves every target-driven check to flag its absence.
    pub fn load(paths: &InputPaths) -> Result<Self> {
        let (store, load_report) = loader::load_cells(&paths.report_csv)?;
        let building = loader::load_building(&paths.building_json)?;
        let targets = if paths.targets_json.exists() {
            TargetTable::from_path(&paths.targets_json)?
        } else {
            warn!(path = %paths.targets_json.display(), "target table not found; continuing without targets");
            TargetTable::default()
        };
        let prices = PriceTable::from_path(&paths.prices_csv)?;
        let costs = paths.costing_json.as_ref().map(loader::load_costing).transpose()?;
        Ok(Self {
            building,
            store,
            load_report,
            targets,
            prices,
            costs,
        })
    }

    pub fn inputs<'a>(&'a self, config: &'a AnalysisConfig) -> AnalysisInputs<'a> {
        AnalysisInputs {
            building: &self.building,
            store: &self.store,
            targets: &self.targets,
            prices: &self.prices,
            costs: self.costs.as_ref(),
            config,
        }
    }
}
