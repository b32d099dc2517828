//! Independent QA/QC rule evaluators.
//!
//! Each check describes itself (name, category, description) and then
//! evaluates one rule against the shared, read-only [`EvaluationContext`],
//! pushing human-readable flags. [`run_check`] is the isolation boundary: an
//! error or panic inside a check becomes a flag on that check only.

mod eui;
mod envelope;
mod hvac;
mod internal_loads;
mod service_water_heating;
mod weather_files;
mod zone_conditions;

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use eui::{EndUseByCategory, EuiReasonableness};
pub use envelope::EnvelopeRValue;
pub use hvac::{
    AirLoopTemperatures, FanPower, MechanicalSystemCapacity, PartLoad, PlantCapacity, PlantLoopTemperatures, PumpPower,
    SimultaneousHeatingCooling,
};
pub use internal_loads::{InternalLoads, Schedules};
pub use service_water_heating::DomesticHotWater;
pub use weather_files::WeatherFiles;
pub use zone_conditions::{ConditionedZones, PlenumLoads, SupplyAirTemperature, UnmetHours};

use crate::config::{AnalysisConfig, CheckCategories};
use crate::error::EvaluationError;
use crate::model::Building;
use crate::store::ReportStore;
use crate::targets::TargetLookup;
use crate::types::{CheckResult, Selector};
use crate::util::format_pct;

/// Everything a check may read. Shared by all checks; nothing in it is mutable.
pub struct EvaluationContext<'a> {
    pub building: &'a Building,
    pub store: &'a dyn ReportStore,
    pub targets: &'a dyn TargetLookup,
    pub config: &'a AnalysisConfig,
}

impl<'a> EvaluationContext<'a> {
    pub fn standard(&self) -> &str {
        &self.config.target_standard
    }

    pub fn report_value(&self, selector: &Selector, row: &str, column: &str, unit: &str) -> Option<f64> {
        self.store.value_f64(selector, row, column, unit)
    }

    pub fn building_type(&self) -> &str {
        self.building.standards_building_type.as_deref().unwrap_or("")
    }

    pub fn climate_zone(&self) -> &str {
        self.building.climate_zone.as_deref().unwrap_or("")
    }
}

pub type CheckOutcome = Result<(), EvaluationError>;

pub trait Check {
    fn name(&self) -> &'static str;

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str;

    fn description(&self, ctx: &EvaluationContext<'_>) -> String;

    /// Push flags for every violation found. Returning `Err` stops the check;
    /// flags pushed so far are kept.
    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome;
}

/// The fixed metadata of a check, with no flags.
pub fn describe(check: &dyn Check, ctx: &EvaluationContext<'_>) -> CheckResult {
    CheckResult::new(
        check.name(),
        check.category(&ctx.config.categories),
        check.description(ctx),
    )
}

/// Run one check. With `name_only` the check body is not evaluated.
pub fn run_check(check: &dyn Check, ctx: &EvaluationContext<'_>, name_only: bool) -> CheckResult {
    let mut result = describe(check, ctx);
    if name_only {
        return result;
    }

    let mut flags = Vec::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| check.evaluate(ctx, &mut flags)));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            flags.push(failure_flag(&err.to_string()));
            if ctx.config.error_backtrace {
                flags.push(diagnostic_trace(&err));
            }
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            flags.push(failure_flag(&msg));
            if ctx.config.error_backtrace {
                flags.push(format!("panic: {}\n{}", msg, Backtrace::force_capture()));
            }
        }
    }
    debug!(check = check.name(), flags = flags.len(), "check evaluated");
    result.flags = flags;
    result
}

fn failure_flag(msg: &str) -> String {
    format!("Error prevented QAQC check from running ({}).", msg)
}

fn diagnostic_trace(err: &EvaluationError) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    lines.push(Backtrace::force_capture().to_string());
    lines.join("\n")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}

/// Ordered collection of checks.
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in check, in report order.
    pub fn standard() -> Self {
        Self::new()
            .with(EuiReasonableness)
            .with(EndUseByCategory)
            .with(WeatherFiles)
            .with(EnvelopeRValue)
            .with(InternalLoads)
            .with(Schedules)
            .with(DomesticHotWater)
            .with(PlenumLoads)
            .with(ConditionedZones)
            .with(SupplyAirTemperature)
            .with(UnmetHours)
            .with(AirLoopTemperatures)
            .with(FanPower)
            .with(MechanicalSystemCapacity)
            .with(PlantCapacity)
            .with(PlantLoopTemperatures)
            .with(PumpPower)
            .with(SimultaneousHeatingCooling)
            .with(PartLoad)
    }

    pub fn with(mut self, check: impl Check + 'static) -> Self {
        self.register(Box::new(check));
        self
    }

    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Metadata of every registered check without evaluating any of them.
    pub fn describe_all(&self, ctx: &EvaluationContext<'_>) -> Vec<CheckResult> {
        self.checks.iter().map(|c| run_check(c.as_ref(), ctx, true)).collect()
    }

    /// One result per registered check, in registration order.
    pub fn run_all(&self, ctx: &EvaluationContext<'_>) -> Vec<CheckResult> {
        self.checks.iter().map(|c| run_check(c.as_ref(), ctx, false)).collect()
    }
}

/// Two-sided tolerance around a target, as fractions of the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub min_pass_pct: f64,
    pub max_pass_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Below,
    Above,
}

/// How an actual value left its tolerance band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub direction: Direction,
    pub pct: f64,
}

impl Deviation {
    /// `"more than 10% below"` / `"more than 20% above"`.
    pub fn phrase(&self) -> String {
        let dir = match self.direction {
            Direction::Below => "below",
            Direction::Above => "above",
        };
        format!("more than {} {}", format_pct(self.pct), dir)
    }
}

impl ToleranceBand {
    pub fn new(min_pass_pct: f64, max_pass_pct: f64) -> Self {
        Self {
            min_pass_pct,
            max_pass_pct,
        }
    }

    pub fn symmetric(pct: f64) -> Self {
        Self::new(pct, pct)
    }

    /// `None` when `actual` is inside the band, or when the target is zero,
    /// infinite or NaN.
    pub fn evaluate(&self, actual: f64, target: f64) -> Option<Deviation> {
        evaluate_tolerance(actual, target, self.min_pass_pct, self.max_pass_pct)
    }
}

pub fn evaluate_tolerance(actual: f64, target: f64, min_pct: f64, max_pct: f64) -> Option<Deviation> {
    if target == 0.0 || !target.is_finite() {
        return None;
    }
    if actual < target * (1.0 - min_pct) {
        Some(Deviation {
            direction: Direction::Below,
            pct: min_pct,
        })
    } else if actual > target * (1.0 + max_pct) {
        Some(Deviation {
            direction: Direction::Above,
            pct: max_pct,
        })
    } else {
        None
    }
}
