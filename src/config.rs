//! Run configuration: target standard, tolerances, NPV parameters and input paths.
//!
//! Loaded from an optional JSON file; every field falls back to its default
//! so an empty `{}` (or a missing file) is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::checks::ToleranceBand;
use crate::error::Result;
use crate::util::parse_f64_safe;

pub const DEFAULT_NPV_START_YEAR: i32 = 2022;
pub const DEFAULT_NPV_END_YEAR: i32 = 2041;
pub const DEFAULT_NPV_DISCOUNT_RATE: f64 = 0.03;

/// Sentinels that request the built-in default for an NPV parameter.
const DEFAULT_SENTINELS: [&str; 2] = ["NECB_Default", "none"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Standard the targets are looked up against, e.g. `90.1-2013`.
    pub target_standard: String,
    pub categories: CheckCategories,
    pub tolerances: Tolerances,
    pub npv: NpvSettings,
    /// Price column used for the single-year utility cost metrics.
    pub utility_price_year: i32,
    /// `building_type` column of the price dataset.
    pub building_type_for_prices: String,
    /// Attach the error source chain as an extra flag when a check fails.
    pub error_backtrace: bool,
    /// Allowable weather files keyed by file name (e.g. `CAN_ON_Toronto.epw`).
    pub weather_files: BTreeMap<String, WeatherFileOption>,
    pub inputs: InputPaths,
}

/// Design days and climate zone expected with one allowable weather file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherFileOption {
    pub summer: Vec<String>,
    pub winter: Vec<String>,
    pub climate_zone: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_standard: "90.1-2013".to_string(),
            categories: CheckCategories::default(),
            tolerances: Tolerances::default(),
            npv: NpvSettings::default(),
            utility_price_year: 2021,
            building_type_for_prices: "Commercial".to_string(),
            error_backtrace: false,
            weather_files: BTreeMap::new(),
            inputs: InputPaths::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn with_error_backtrace(mut self, enabled: bool) -> Self {
        self.error_backtrace = enabled;
        self
    }

    pub fn with_target_standard(mut self, standard: impl Into<String>) -> Self {
        self.target_standard = standard.into();
        self
    }
}

/// Category label attached to each group of checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckCategories {
    pub energy: String,
    pub envelope: String,
    pub internal_loads: String,
    pub service_water_heating: String,
    pub zone_conditions: String,
    pub hvac: String,
}

impl Default for CheckCategories {
    fn default() -> Self {
        Self {
            energy: "General".to_string(),
            envelope: "Envelope".to_string(),
            internal_loads: "Internal Loads".to_string(),
            service_water_heating: "Service Water Heating".to_string(),
            zone_conditions: "Zone Conditions".to_string(),
            hvac: "HVAC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub eui: ToleranceBand,
    pub end_use: ToleranceBand,
    pub envelope: ToleranceBand,
    pub internal_loads: ToleranceBand,
    pub schedules: ToleranceBand,
    pub hot_water: ToleranceBand,
    pub fan_power_max_pct_delta: f64,
    pub pump_power_max_pct_delta: f64,
    /// Allowed deviation (F) from the expected 20 F supply-air delta.
    pub supply_air_max_delta_f: f64,
    pub max_unmet_hours: f64,
    pub expect_cooling_unmet_hours: bool,
    pub expect_heating_unmet_hours: bool,
    /// Allowed gap (F) between sizing temperatures and setpoint manager limits.
    pub air_loop_max_sizing_temp_delta_f: f64,
    /// Allowed excursion (F) of operating supply temperatures beyond the expected range.
    pub air_loop_max_operating_temp_delta_f: f64,
    pub plant_loop_max_sizing_temp_delta_f: f64,
    pub plant_loop_max_operating_temp_delta_f: f64,
    pub plant_capacity_max_pct_delta: f64,
    /// Largest acceptable share of cooling hours spent reheating.
    pub simultaneous_heating_cooling_max_pct: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            eui: ToleranceBand::symmetric(0.1),
            end_use: ToleranceBand::symmetric(0.2),
            envelope: ToleranceBand::symmetric(0.2),
            internal_loads: ToleranceBand::symmetric(0.2),
            schedules: ToleranceBand::symmetric(0.2),
            hot_water: ToleranceBand::symmetric(0.25),
            fan_power_max_pct_delta: 0.3,
            pump_power_max_pct_delta: 0.3,
            supply_air_max_delta_f: 2.0,
            max_unmet_hours: 550.0,
            expect_cooling_unmet_hours: false,
            expect_heating_unmet_hours: false,
            air_loop_max_sizing_temp_delta_f: 2.0,
            air_loop_max_operating_temp_delta_f: 5.0,
            plant_loop_max_sizing_temp_delta_f: 2.0,
            plant_loop_max_operating_temp_delta_f: 5.0,
            plant_capacity_max_pct_delta: 0.3,
            simultaneous_heating_cooling_max_pct: 0.1,
        }
    }
}

/// One NPV parameter as written in the config: a number, a numeric string,
/// a default sentinel, or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NpvParam {
    Number(f64),
    Text(String),
}

impl NpvParam {
    fn resolve(param: Option<&NpvParam>, default: f64, name: &str) -> f64 {
        match param {
            None => default,
            Some(NpvParam::Number(n)) => *n,
            Some(NpvParam::Text(s)) if DEFAULT_SENTINELS.contains(&s.as_str()) => default,
            Some(NpvParam::Text(s)) => match parse_f64_safe(Some(s)) {
                Some(v) => v,
                None => {
                    warn!(parameter = name, value = %s, default, "unparsable NPV parameter, using default");
                    default
                }
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpvSettings {
    pub start_year: Option<NpvParam>,
    pub end_year: Option<NpvParam>,
    pub discount_rate: Option<NpvParam>,
}

/// NPV parameters after defaulting; the end year is not yet clamped to the
/// price dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNpv {
    pub start_year: i32,
    pub end_year: i32,
    pub discount_rate: f64,
}

impl NpvSettings {
    pub fn resolve(&self) -> ResolvedNpv {
        ResolvedNpv {
            start_year: NpvParam::resolve(self.start_year.as_ref(), DEFAULT_NPV_START_YEAR as f64, "start_year") as i32,
            end_year: NpvParam::resolve(self.end_year.as_ref(), DEFAULT_NPV_END_YEAR as f64, "end_year") as i32,
            discount_rate: NpvParam::resolve(self.discount_rate.as_ref(), DEFAULT_NPV_DISCOUNT_RATE, "discount_rate"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub report_csv: PathBuf,
    pub building_json: PathBuf,
    pub targets_json: PathBuf,
    pub prices_csv: PathBuf,
    pub costing_json: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            report_csv: PathBuf::from("eplustbl.csv"),
            building_json: PathBuf::from("building.json"),
            targets_json: PathBuf::from("targets.json"),
            prices_csv: PathBuf::from("neb_end_use_prices.csv"),
            costing_json: None,
            output_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let cfg: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.target_standard, "90.1-2013");
        assert_eq!(cfg.utility_price_year, 2021);
        assert!((cfg.tolerances.hot_water.min_pass_pct - 0.25).abs() < 1e-12);
        assert_eq!(cfg.npv.resolve(), ResolvedNpv {
            start_year: 2022,
            end_year: 2041,
            discount_rate: 0.03,
        });
    }

    #[test]
    fn test_npv_parameters_default_independently() {
        let cfg: AnalysisConfig = serde_json::from_str(
            r#"{"npv": {"start_year": "2025", "end_year": "NECB_Default", "discount_rate": 0.05}}"#,
        )
        .unwrap();
        let npv = cfg.npv.resolve();
        assert_eq!(npv.start_year, 2025);
        assert_eq!(npv.end_year, 2041);
        assert!((npv.discount_rate - 0.05).abs() < 1e-12);

        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"npv": {"start_year": null, "end_year": 2030, "discount_rate": "none"}}"#).unwrap();
        let npv = cfg.npv.resolve();
        assert_eq!((npv.start_year, npv.end_year), (2022, 2030));
        assert!((npv.discount_rate - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_garbage_npv_string_falls_back() {
        let s = NpvSettings {
            discount_rate: Some(NpvParam::Text("lots".into())),
            ..Default::default()
        };
        assert!((s.resolve().discount_rate - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_missing_config_file_is_default() {
        let cfg = AnalysisConfig::load("/nonexistent/qaqc_config.json").unwrap();
        assert!(!cfg.error_backtrace);
    }

    #[test]
    fn test_builder_overrides() {
        let cfg = AnalysisConfig::default()
            .with_target_standard("NECB2017")
            .with_error_backtrace(true);
        assert_eq!(cfg.target_standard, "NECB2017");
        assert!(cfg.error_backtrace);
    }
}
