//! Derived performance metrics.
//!
//! Each calculator returns a partial [`MetricRecord`]; [`compute_all`] merges
//! them in a fixed order, so a later calculator overwrites keys written by an
//! earlier one.

pub mod building;
pub mod economics;
pub mod energy;
pub mod envelope;
pub mod performance;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::model::{Building, CostResult};
use crate::store::ReportStore;
use crate::util::{normalize_field_name, safe_div};

pub use economics::{Fuel, PriceTable};

/// Everything a metric calculator reads.
pub struct MetricsContext<'a> {
    pub building: &'a Building,
    pub store: &'a dyn ReportStore,
    pub prices: &'a PriceTable,
    pub costs: Option<&'a CostResult>,
    pub config: &'a AnalysisConfig,
}

impl<'a> MetricsContext<'a> {
    /// Conditioned floor area as reported by the simulation, falling back to the model.
    pub fn conditioned_area_m2(&self) -> f64 {
        self.store
            .value_f64(
                &crate::tables::building_area(),
                "Net Conditioned Building Area",
                "Area",
                "m2",
            )
            .filter(|a| *a > 0.0)
            .unwrap_or(self.building.conditioned_floor_area_m2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirScope {
    AirLoops,
    Zones,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirComponent {
    MechanicalVentilation,
    NaturalVentilation,
    Infiltration,
}

impl AirComponent {
    pub fn column(&self) -> &'static str {
        match self {
            AirComponent::MechanicalVentilation => "Mechanical Ventilation",
            AirComponent::NaturalVentilation => "Natural Ventilation",
            AirComponent::Infiltration => "Infiltration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirMeasure {
    VolumeM3,
    AirChangesPerHour,
    PerConditionedArea,
    PerExteriorArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeMeasure {
    AreaM2,
    AverageConductance,
}

/// Typed metric names. Dynamic families (end uses, fuels, envelope groups)
/// carry their discriminating part; anything else goes through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKey {
    BldgName,
    BldgConditionedFloorArea,
    BldgExteriorArea,
    BldgVolume,
    BldgStandardsTemplate,
    BldgStandardsBuildingType,
    BldgStandardsNumberOfStories,
    BldgStandardsNumberOfAboveGroundStories,
    BldgNominalFloorToCeilingHeight,
    BldgNominalFloorToFloorHeight,
    BldgSurfaceToVolumeRatio,
    BldgFdwr,
    BldgSrr,

    CostRsMeansProv,
    CostRsMeansCity,
    /// `cost_equipment_<item>_total_cost_per_m_sq`
    CostEquipment(&'static str),
    CostEquipmentTotal,

    LocationNecbHdd,
    LocationWeatherFile,
    LocationEpwCdd,
    LocationEpwHdd,
    LocationCity,
    LocationStateProvinceRegion,
    LocationCountry,
    LocationLatitude,
    LocationLongitude,

    ShwTotalNominalOccupancy,
    ShwElectricityPerYear,
    ShwElectricityPerDay,
    ShwElectricityPerDayPerOccupant,
    ShwNaturalGasPerYear,
    ShwAdditionalFuelPerYear,
    ShwWaterPerYear,
    ShwWaterPerDay,
    ShwWaterPerDayPerOccupant,

    /// `energy_eui_<slug>_gj_per_m_sq` for an end use or fuel column.
    Eui(String),
    EuiTotal,
    TotalSiteEui,
    NetSiteEui,
    OnsiteGeneration,
    ElectricityNetOfGeneration,

    PrincipalHeatingSource,
    PeakElectric,
    PeakNaturalGas,
    HeatingPeak,
    CoolingPeak,

    UtilityCost(Fuel),
    UtilityCostTotal,
    UtilityGhg(Fuel),
    UtilityGhgTotal,

    UnmetHoursCoolingOccupied,
    UnmetHoursHeatingOccupied,

    OutdoorAir(AirScope, AirComponent, AirMeasure),

    /// Per envelope component group, e.g. `outdoor_walls`.
    Envelope(&'static str, EnvelopeMeasure),
    EnvelopeTotalOutdoorArea,
    EnvelopeTotalGroundArea,
    EnvelopeOutdoorAverageConductance,
    EnvelopeGroundAverageConductance,
    EnvelopeAverageConductance,

    PhiusAnnualHeatingDemand,
    PhiusAnnualCoolingDemand,
    PhiusPeakHeatingLoad,
    PhiusPeakCoolingLoad,
    PeakHeatingLoadNecb,
    PeakCoolingLoadNecb,
    PhiusNecbMeetHeatingDemand,
    PhiusNecbMeetCoolingDemand,
    PhiusNecbMeetHeatingPeakLoad,
    PhiusNecbMeetCoolingPeakLoad,

    BcStepCodeTedi,
    BcStepCodeMeui,

    Npv(Fuel),
    NpvTotal,

    Custom(String),
}

impl MetricKey {
    /// EUI key for a report end-use row or fuel column name.
    pub fn eui(name: &str) -> Self {
        MetricKey::Eui(normalize_field_name(name, ""))
    }

    pub fn name(&self) -> Cow<'static, str> {
        use MetricKey::*;
        let s: &'static str = match self {
            BldgName => "bldg_name",
            BldgConditionedFloorArea => "bldg_conditioned_floor_area_m_sq",
            BldgExteriorArea => "bldg_exterior_area_m_sq",
            BldgVolume => "bldg_volume_m_cu",
            BldgStandardsTemplate => "bldg_standards_template",
            BldgStandardsBuildingType => "bldg_standards_building_type",
            BldgStandardsNumberOfStories => "bldg_standards_number_of_stories",
            BldgStandardsNumberOfAboveGroundStories => "bldg_standards_number_of_above_ground_stories",
            BldgNominalFloorToCeilingHeight => "bldg_nominal_floor_to_ceiling_height",
            BldgNominalFloorToFloorHeight => "bldg_nominal_floor_to_floor_height",
            BldgSurfaceToVolumeRatio => "bldg_surface_to_volume_ratio",
            BldgFdwr => "bldg_fdwr",
            BldgSrr => "bldg_srr",

            CostRsMeansProv => "cost_rs_means_prov",
            CostRsMeansCity => "cost_rs_means_city",
            CostEquipment(item) => return format!("cost_equipment_{}_total_cost_per_m_sq", item).into(),
            CostEquipmentTotal => "cost_equipment_total_cost_per_m_sq",

            LocationNecbHdd => "location_necb_hdd",
            LocationWeatherFile => "location_weather_file",
            LocationEpwCdd => "location_epw_cdd",
            LocationEpwHdd => "location_epw_hdd",
            LocationCity => "location_city",
            LocationStateProvinceRegion => "location_state_province_region",
            LocationCountry => "location_country",
            LocationLatitude => "location_latitude",
            LocationLongitude => "location_longitude",

            ShwTotalNominalOccupancy => "shw_total_nominal_occupancy",
            ShwElectricityPerYear => "shw_electricity_per_year",
            ShwElectricityPerDay => "shw_electricity_per_day",
            ShwElectricityPerDayPerOccupant => "shw_electricity_per_day_per_occupant",
            ShwNaturalGasPerYear => "shw_natural_gas_per_year",
            ShwAdditionalFuelPerYear => "shw_additional_fuel_per_year",
            ShwWaterPerYear => "shw_water_m_cu_per_year",
            ShwWaterPerDay => "shw_water_m_cu_per_day",
            ShwWaterPerDayPerOccupant => "shw_water_m_cu_per_day_per_occupant",

            Eui(slug) => return format!("energy_eui_{}_gj_per_m_sq", slug).into(),
            EuiTotal => "energy_eui_total_gj_per_m_sq",
            TotalSiteEui => "total_site_eui_gj_per_m_sq",
            NetSiteEui => "net_site_eui_gj_per_m_sq",
            OnsiteGeneration => "energy_onsite_generation_gj_per_m_sq",
            ElectricityNetOfGeneration => "energy_eui_electricity_net_of_generation_gj_per_m_sq",

            PrincipalHeatingSource => "energy_principal_heating_source",
            PeakElectric => "energy_peak_electric_w_per_m_sq",
            PeakNaturalGas => "energy_peak_natural_gas_w_per_m_sq",
            HeatingPeak => "heating_peak_w_per_m_sq",
            CoolingPeak => "cooling_peak_w_per_m_sq",

            UtilityCost(fuel) => return format!("cost_utility_neb_{}_cost_per_m_sq", fuel.slug()).into(),
            UtilityCostTotal => "cost_utility_neb_total_cost_per_m_sq",
            UtilityGhg(fuel) => return format!("cost_utility_ghg_{}_kg_per_m_sq", fuel.slug()).into(),
            UtilityGhgTotal => "cost_utility_ghg_total_kg_per_m_sq",

            UnmetHoursCoolingOccupied => "unmet_hours_cooling_during_occupied",
            UnmetHoursHeatingOccupied => "unmet_hours_heating_during_occupied",

            OutdoorAir(scope, component, measure) => {
                let scope = match scope {
                    AirScope::AirLoops => "airloops",
                    AirScope::Zones => "zones",
                };
                let component = normalize_field_name(component.column(), "");
                let measure = match measure {
                    AirMeasure::VolumeM3 => "m3",
                    AirMeasure::AirChangesPerHour => "ach_1_per_hr",
                    AirMeasure::PerConditionedArea => "flow_per_conditioned_floor_area_m3_per_s_m2",
                    AirMeasure::PerExteriorArea => "flow_per_exterior_area_m3_per_s_m2",
                };
                return format!("{}_total_outdoor_air_{}_{}", scope, component, measure).into();
            }

            Envelope(group, measure) => {
                let suffix = match measure {
                    EnvelopeMeasure::AreaM2 => "area_m_sq",
                    EnvelopeMeasure::AverageConductance => "average_conductance_w_per_m_sq_k",
                };
                return format!("envelope_{}_{}", group, suffix).into();
            }
            EnvelopeTotalOutdoorArea => "envelope_total_outdoor_area_m_sq",
            EnvelopeTotalGroundArea => "envelope_total_ground_area_m_sq",
            EnvelopeOutdoorAverageConductance => "envelope_outdoor_average_conductance_w_per_m_sq_k",
            EnvelopeGroundAverageConductance => "envelope_ground_average_conductance_w_per_m_sq_k",
            EnvelopeAverageConductance => "envelope_average_conductance_w_per_m_sq_k",

            PhiusAnnualHeatingDemand => "phius_annual_heating_demand_kwh_per_m_sq",
            PhiusAnnualCoolingDemand => "phius_annual_cooling_demand_kwh_per_m_sq",
            PhiusPeakHeatingLoad => "phius_peak_heating_load_w_per_m_sq",
            PhiusPeakCoolingLoad => "phius_peak_cooling_load_w_per_m_sq",
            PeakHeatingLoadNecb => "peak_heating_load_w_per_m_sq_necb",
            PeakCoolingLoadNecb => "peak_cooling_load_w_per_m_sq_necb",
            PhiusNecbMeetHeatingDemand => "phius_necb_meet_heating_demand",
            PhiusNecbMeetCoolingDemand => "phius_necb_meet_cooling_demand",
            PhiusNecbMeetHeatingPeakLoad => "phius_necb_meet_heating_peak_load",
            PhiusNecbMeetCoolingPeakLoad => "phius_necb_meet_cooling_peak_load",

            BcStepCodeTedi => "bc_step_code_tedi_kwh_per_m_sq",
            BcStepCodeMeui => "bc_step_code_meui_kwh_per_m_sq",

            Npv(fuel) => return format!("npv_{}_per_m_sq", fuel.slug()).into(),
            NpvTotal => "npv_total_per_m_sq",

            Custom(s) => return s.clone().into(),
        };
        Cow::Borrowed(s)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A metric value. `NotCalculated` marks a metric whose inputs were unusable
/// (zero area, missing data); it serializes as `"could not calculate"`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Empty,
    NotCalculated,
}

pub const NOT_CALCULATED: &str = "could not calculate";

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        if n.is_finite() {
            MetricValue::Number(n)
        } else {
            MetricValue::NotCalculated
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(n: Option<f64>) -> Self {
        n.map(MetricValue::from).unwrap_or(MetricValue::NotCalculated)
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        MetricValue::Text(s)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

impl From<bool> for MetricValue {
    fn from(b: bool) -> Self {
        MetricValue::Text(if b { "True" } else { "False" }.to_string())
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(n) => serializer.serialize_f64(*n),
            MetricValue::Text(s) => serializer.serialize_str(s),
            MetricValue::Empty => serializer.serialize_none(),
            MetricValue::NotCalculated => serializer.serialize_str(NOT_CALCULATED),
        }
    }
}

/// Flat metric name -> value map. Merging overwrites existing keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricRecord {
    values: BTreeMap<String, MetricValue>,
}

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: MetricKey, value: impl Into<MetricValue>) {
        self.values.insert(key.name().into_owned(), value.into());
    }

    /// `num / den`, or `NotCalculated` when the denominator is zero.
    pub fn set_ratio(&mut self, key: MetricKey, num: f64, den: f64) {
        self.set(key, safe_div(num, den));
    }

    pub fn get(&self, key: &MetricKey) -> Option<&MetricValue> {
        self.values.get(key.name().as_ref())
    }

    pub fn number(&self, key: &MetricKey) -> Option<f64> {
        self.get(key).and_then(MetricValue::as_f64)
    }

    /// Numeric value or zero.
    pub fn number_or_zero(&self, key: &MetricKey) -> f64 {
        self.number(key).unwrap_or(0.0)
    }

    pub fn text(&self, key: &MetricKey) -> Option<&str> {
        self.get(key).and_then(MetricValue::as_str)
    }

    pub fn merge(&mut self, other: MetricRecord) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn not_calculated(&self) -> usize {
        self.values
            .values()
            .filter(|v| **v == MetricValue::NotCalculated)
            .count()
    }
}

/// Run every calculator in pipeline order. Any error is fatal to the run.
pub fn compute_all(ctx: &MetricsContext<'_>) -> Result<MetricRecord> {
    let mut record = MetricRecord::new();

    record.merge(building::building_data(ctx));
    if let Some(costs) = ctx.costs {
        record.merge(economics::costing_data(ctx, costs));
    }
    record.merge(building::climate_data(ctx));
    record.merge(energy::service_water_heating(ctx));
    record.merge(energy::energy_eui(ctx)?);
    record.merge(energy::energy_peaks(ctx));
    record.merge(economics::utility(ctx)?);
    record.merge(energy::unmet_hours(ctx));
    record.merge(energy::outdoor_air(ctx));
    record.merge(envelope::envelope_conductance(ctx.building));
    let phius = performance::phius_indicators(ctx, &record)?;
    record.merge(phius);
    let step_code = performance::bc_step_code(ctx, &record)?;
    record.merge(step_code);
    if ctx.costs.is_some() {
        let npv = economics::net_present_value(ctx, &record)?;
        record.merge(npv);
    }

    debug!(not_calculated = record.not_calculated(), "metric pipeline complete");
    info!(metrics = record.len(), "computed metrics");
    Ok(record)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::store::{cell, CellStore};
    use crate::types::Selector;

    pub fn sample_prices() -> PriceTable {
        let csv = "building_type,province,fuel_type,2021,2022,2023,2024\n\
                   Commercial,Ontario,Electricity,29,30,31,32\n\
                   Commercial,Ontario,Natural Gas,10,10,10,10\n\
                   Commercial,Ontario,Oil,20,20,20,20\n";
        PriceTable::from_reader(csv.as_bytes()).expect("sample prices")
    }

    pub struct MetricsFixture {
        pub building: Building,
        pub store: CellStore,
        pub prices: PriceTable,
        pub costs: Option<CostResult>,
        pub config: AnalysisConfig,
    }

    impl MetricsFixture {
        pub fn new(building: Building) -> Self {
            Self {
                building,
                store: CellStore::new(),
                prices: PriceTable::default(),
                costs: None,
                config: AnalysisConfig::default(),
            }
        }

        pub fn insert(&mut self, selector: &Selector, row: &str, column: &str, unit: &str, value: &str) {
            self.store.insert(cell(selector, row, column, unit, value));
        }

        pub fn ctx(&self) -> MetricsContext<'_> {
            MetricsContext {
                building: &self.building,
                store: &self.store,
                prices: &self.prices,
                costs: self.costs.as_ref(),
                config: &self.config,
            }
        }
    }
}
