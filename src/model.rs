//! Read-only snapshot of the building model the simulation was run on.
//!
//! The snapshot is exported by the modelling tool as JSON; every collection
//! defaults to empty so partial exports still load.

use serde::{Deserialize, Serialize};

/// Setpoints at or above this (5 C / 41 F) count as heated.
pub const HEATED_SETPOINT_MIN_C: f64 = 5.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Building {
    pub name: String,
    pub standards_template: Option<String>,
    pub standards_building_type: Option<String>,
    pub standards_number_of_stories: Option<u32>,
    pub standards_number_of_above_ground_stories: Option<u32>,
    pub nominal_floor_to_ceiling_height_m: Option<f64>,
    pub nominal_floor_to_floor_height_m: Option<f64>,
    pub climate_zone: Option<String>,
    pub floor_area_m2: f64,
    pub conditioned_floor_area_m2: f64,
    pub exterior_area_m2: f64,
    pub volume_m3: f64,
    /// Fenestration-to-door-and-wall ratio, as a fraction.
    pub fdwr: Option<f64>,
    /// Skylight-to-roof ratio, as a fraction.
    pub srr: Option<f64>,
    pub weather: Weather,
    pub design_days: Vec<DesignDay>,
    pub run_periods: Vec<RunPeriod>,
    pub zones: Vec<ThermalZone>,
    pub spaces: Vec<Space>,
    pub space_types: Vec<SpaceType>,
    pub surfaces: Vec<Surface>,
    pub water_use_equipment: Vec<WaterUseEquipment>,
    pub air_loops: Vec<AirLoop>,
    pub plant_loops: Vec<PlantLoop>,
    pub part_load_equipment: Vec<PartLoadEquipment>,
}

impl Building {
    pub fn number_of_people(&self) -> f64 {
        self.zones
            .iter()
            .map(|z| z.number_of_people * z.multiplier)
            .sum()
    }

    /// A ground-source heat pump is modelled with a plant loop whose name
    /// carries the `GLHX` marker.
    pub fn has_ground_source_heat_pump(&self) -> bool {
        self.plant_loops
            .iter()
            .any(|p| p.name.to_uppercase().contains("GLHX"))
    }

    pub fn weather_run_period(&self) -> Option<&RunPeriod> {
        self.run_periods
            .iter()
            .find(|r| r.environment_type == "WeatherRunPeriod")
    }

    pub fn space_type(&self, name: &str) -> Option<&SpaceType> {
        self.space_types.iter().find(|st| st.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    pub file: String,
    pub city: String,
    pub state_province_region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub necb_hdd18: Option<f64>,
    pub hdd18: f64,
    pub cdd18: f64,
    pub cdd10: f64,
    pub dehumidification_degree_days: f64,
    pub annual_ghi_kwh_per_m2: f64,
    /// Colder of the two heating design conditions.
    pub heating_design_temp_c: Option<f64>,
    pub cooling_design_temp_c: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignDay {
    pub name: String,
    pub day_type: String,
    pub average_global_irradiance_w_per_m2: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPeriod {
    pub name: String,
    pub environment_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalZone {
    pub name: String,
    pub multiplier: f64,
    pub is_plenum: bool,
    pub number_of_people: f64,
    pub lighting_power_w: f64,
    pub thermostat: Option<Thermostat>,
    pub cooling_design_supply_air_temp_c: f64,
    pub heating_design_supply_air_temp_c: f64,
    pub exterior_area_m2: f64,
    pub terminal: Option<AirTerminal>,
}

impl Default for ThermalZone {
    fn default() -> Self {
        Self {
            name: String::new(),
            multiplier: 1.0,
            is_plenum: false,
            number_of_people: 0.0,
            lighting_power_w: 0.0,
            thermostat: None,
            cooling_design_supply_air_temp_c: 12.8,
            heating_design_supply_air_temp_c: 40.0,
            exterior_area_m2: 0.0,
            terminal: None,
        }
    }
}

impl ThermalZone {
    pub fn is_heated(&self) -> bool {
        self.thermostat
            .as_ref()
            .and_then(|t| t.heating_setpoint_max_c)
            .map(|sp| sp >= HEATED_SETPOINT_MIN_C)
            .unwrap_or(false)
    }
}

/// Air terminal serving a zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AirTerminal {
    pub name: String,
    /// `SingleDuctVAVReheat`, `SingleDuctConstantVolumeReheat`, ...
    pub terminal_type: String,
    /// Only set for terminal types that expose it.
    pub max_reheat_air_temp_c: Option<f64>,
    pub reheat_coil: Option<String>,
    /// Hourly reheat coil heating rate.
    pub reheat_rates_w: Option<Vec<f64>>,
    /// Hourly terminal sensible cooling rate.
    pub cooling_rates_w: Option<Vec<f64>>,
}

impl AirTerminal {
    pub fn has_reheat(&self) -> bool {
        matches!(
            self.terminal_type.as_str(),
            "SingleDuctConstantVolumeReheat"
                | "SingleDuctVAVHeatAndCoolReheat"
                | "SingleDuctVAVReheat"
                | "SingleDuctParallelPIUReheat"
                | "SingleDuctSeriesPIUReheat"
        )
    }

    pub fn is_vav_reheat(&self) -> bool {
        self.terminal_type == "SingleDuctVAVReheat"
    }
}

/// Dual-setpoint thermostat summary. A `None` extreme means the schedule
/// could not be inspected (not a ruleset or constant schedule).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Thermostat {
    pub heating_setpoint_max_c: Option<f64>,
    pub cooling_setpoint_min_c: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Space {
    pub name: String,
    pub space_type: Option<String>,
    pub standards_building_type: Option<String>,
    pub floor_area_m2: f64,
    pub multiplier: f64,
    pub is_plenum: bool,
    pub is_conditioned: bool,
}

impl Default for Space {
    fn default() -> Self {
        Self {
            name: String::new(),
            space_type: None,
            standards_building_type: None,
            floor_area_m2: 0.0,
            multiplier: 1.0,
            is_plenum: false,
            is_conditioned: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceType {
    pub name: String,
    pub standards_space_type: Option<String>,
    pub floor_area_m2: f64,
    pub people_per_m2: Option<f64>,
    pub lighting_w_per_m2: f64,
    pub electric_equipment_w_per_m2: f64,
    pub gas_equipment_w_per_m2: f64,
    pub loads: Vec<SpaceLoad>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadKind {
    Lighting,
    ElectricEquipment,
    GasEquipment,
    People,
}

impl LoadKind {
    pub fn label(&self) -> &'static str {
        match self {
            LoadKind::Lighting => "lighting",
            LoadKind::ElectricEquipment => "electric_equipment",
            LoadKind::GasEquipment => "gas_equipment",
            LoadKind::People => "occupancy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceLoad {
    pub name: String,
    pub kind: LoadKind,
    #[serde(default)]
    pub schedule: Option<ScheduleRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRef {
    pub name: String,
    /// `Ruleset`, `Constant`, `Compact`, `File`, ...
    pub schedule_type: String,
    pub equivalent_full_load_hours: Option<f64>,
}

impl ScheduleRef {
    /// Annual equivalent full-load hours, available only for ruleset and
    /// constant schedules.
    pub fn full_load_hours(&self) -> Option<f64> {
        match self.schedule_type.as_str() {
            "Ruleset" | "Constant" => self.equivalent_full_load_hours,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub name: String,
    pub space: Option<String>,
    pub surface_type: String,
    pub boundary_condition: String,
    pub net_area_m2: f64,
    pub space_multiplier: f64,
    pub construction: Option<String>,
    pub conductance_w_per_m2_k: Option<f64>,
    pub sub_surfaces: Vec<SubSurface>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            name: String::new(),
            space: None,
            surface_type: String::new(),
            boundary_condition: String::new(),
            net_area_m2: 0.0,
            space_multiplier: 1.0,
            construction: None,
            conductance_w_per_m2_k: None,
            sub_surfaces: Vec::new(),
        }
    }
}

impl Surface {
    pub fn is_outdoor(&self) -> bool {
        self.boundary_condition == "Outdoors"
    }

    pub fn is_ground(&self) -> bool {
        matches!(self.boundary_condition.as_str(), "Ground" | "Foundation")
    }

    pub fn weighted_area(&self) -> f64 {
        self.net_area_m2 * self.space_multiplier
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubSurface {
    pub name: String,
    pub sub_surface_type: String,
    pub net_area_m2: f64,
    pub multiplier: f64,
    pub construction: Option<String>,
    pub conductance_w_per_m2_k: Option<f64>,
}

impl Default for SubSurface {
    fn default() -> Self {
        Self {
            name: String::new(),
            sub_surface_type: String::new(),
            net_area_m2: 0.0,
            multiplier: 1.0,
            construction: None,
            conductance_w_per_m2_k: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterUseEquipment {
    pub name: String,
    pub peak_flow_rate_m3_per_s: f64,
    pub flow_schedule: Option<ScheduleRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AirLoop {
    pub name: String,
    pub thermal_zone_count: usize,
    /// Names of the thermal zones on the demand side.
    pub zones: Vec<String>,
    pub fans: Vec<Fan>,
    pub design_cooling_supply_air_temp_c: Option<f64>,
    pub design_heating_supply_air_temp_c: Option<f64>,
    /// Setpoint manager on the supply outlet node.
    pub setpoint_manager: Option<SetpointControl>,
    /// Unitary system on the supply side, if any; it then controls the supply temperature.
    pub unitary_system: Option<SetpointControl>,
    pub direct_evap: bool,
    pub supply_outlet: NodeSeries,
    /// Sizing system load type is `VentilationRequirement`.
    pub sized_for_ventilation: bool,
    pub floor_area_served_m2: f64,
    pub design_supply_air_flow_m3_per_s: Option<f64>,
    pub total_cooling_capacity_w: Option<f64>,
}

impl AirLoop {
    pub fn is_unitary(&self) -> bool {
        self.unitary_system.is_some() && !self.direct_evap
    }
}

/// A setpoint manager or unitary controller with the temperature range it can command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointControl {
    pub name: String,
    pub control_type: String,
    pub min_temp_c: Option<f64>,
    pub max_temp_c: Option<f64>,
}

/// Timestep series recorded at a supply outlet node over the annual run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSeries {
    pub temperatures_c: Option<Vec<f64>>,
    pub flow_rates_m3_per_s: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fan {
    pub name: String,
    pub fan_type: String,
    pub rated_w_per_cfm: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantLoop {
    pub name: String,
    /// `Heating`, `Cooling` or `Condenser`.
    pub loop_type: String,
    pub pumps: Vec<Pump>,
    pub design_exit_temp_c: Option<f64>,
    pub design_temp_difference_k: Option<f64>,
    pub setpoint_manager: Option<SetpointControl>,
    pub supply_outlet: NodeSeries,
    pub total_heating_capacity_w: f64,
    pub total_cooling_capacity_w: f64,
    /// Summed rated capacity of the water heating coils on the demand side.
    pub heating_coil_load_w: f64,
    /// Summed design load of the water cooling coils on the demand side.
    pub cooling_coil_load_w: f64,
    pub has_chillers: bool,
    pub maximum_flow_rate_m3_per_s: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pump {
    pub name: String,
    pub rated_w_per_gpm: f64,
}

/// Primary heating/cooling equipment with its hourly part-load series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartLoadEquipment {
    pub name: String,
    pub equipment_type: String,
    pub variable_name: String,
    /// Design power used to normalize the series; `1.0` for series that are
    /// already ratios.
    pub design_power: Option<f64>,
    pub units: String,
    pub expect_low_plr: bool,
    pub hourly_values: Option<Vec<f64>>,
}

/// Capital cost totals from the costing tool, in dollars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostResult {
    pub rs_means_prov: String,
    pub rs_means_city: String,
    pub totals: CostTotals,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTotals {
    pub envelope: f64,
    pub thermal_bridging: f64,
    pub lighting: f64,
    pub heating_and_cooling: f64,
    pub shw: f64,
    pub ventilation: f64,
    pub renewables: f64,
    pub grand_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_snapshot_loads_with_defaults() {
        let json = r#"{
            "name": "Office",
            "conditioned_floor_area_m2": 1000.0,
            "zones": [{"name": "Z1", "number_of_people": 10.0}],
            "plant_loops": [{"name": "Hot Water GLHX Loop"}]
        }"#;
        let b: Building = serde_json::from_str(json).unwrap();
        assert_eq!(b.zones[0].multiplier, 1.0);
        assert!((b.number_of_people() - 10.0).abs() < 1e-10);
        assert!(b.has_ground_source_heat_pump());
        assert!(b.weather_run_period().is_none());
    }

    #[test]
    fn test_zone_heated_threshold() {
        let mut z = ThermalZone {
            thermostat: Some(Thermostat {
                heating_setpoint_max_c: Some(4.9),
                cooling_setpoint_min_c: None,
            }),
            ..Default::default()
        };
        assert!(!z.is_heated());
        z.thermostat = Some(Thermostat {
            heating_setpoint_max_c: Some(5.0),
            cooling_setpoint_min_c: None,
        });
        assert!(z.is_heated());
        z.thermostat = None;
        assert!(!z.is_heated());
    }

    #[test]
    fn test_schedule_hours_only_for_inspectable_types() {
        let mut s = ScheduleRef {
            name: "Occ".into(),
            schedule_type: "Ruleset".into(),
            equivalent_full_load_hours: Some(3000.0),
        };
        assert_eq!(s.full_load_hours(), Some(3000.0));
        s.schedule_type = "Compact".into();
        assert_eq!(s.full_load_hours(), None);
    }
}
