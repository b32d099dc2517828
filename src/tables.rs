//! Selectors for the report tables the checks and metrics read.

use crate::types::Selector;

pub const ENTIRE_FACILITY: &str = "Entire Facility";

pub fn end_uses() -> Selector {
    Selector::new("AnnualBuildingUtilityPerformanceSummary", ENTIRE_FACILITY, "End Uses")
}

pub fn building_area() -> Selector {
    Selector::new("AnnualBuildingUtilityPerformanceSummary", ENTIRE_FACILITY, "Building Area")
}

pub fn site_and_source_energy() -> Selector {
    Selector::new("AnnualBuildingUtilityPerformanceSummary", ENTIRE_FACILITY, "Site and Source Energy")
}

pub fn setpoint_not_met() -> Selector {
    Selector::new(
        "AnnualBuildingUtilityPerformanceSummary",
        ENTIRE_FACILITY,
        "Comfort and Setpoint Not Met Summary",
    )
}

pub fn general_information() -> Selector {
    Selector::new("LEEDsummary", ENTIRE_FACILITY, "Sec1.1A-General Information")
}

/// `Annual and Peak Values - <suffix>` meter tables (`Electricity`, `Natural Gas`, `Other`).
pub fn energy_meters(suffix: &str) -> Selector {
    Selector::new("EnergyMeters", ENTIRE_FACILITY, format!("Annual and Peak Values - {}", suffix))
}

pub fn outdoor_air_by_air_loop() -> Selector {
    Selector::new("OutdoorAirDetails", ENTIRE_FACILITY, "Total Outdoor Air by AirLoop")
}

pub fn outdoor_air_by_zone() -> Selector {
    Selector::new("OutdoorAirDetails", ENTIRE_FACILITY, "Total Outdoor Air by Zone")
}

/// Design heating load per zone; rows are upper-case zone names.
pub fn zone_sensible_heating() -> Selector {
    Selector::new("HVACSizingSummary", ENTIRE_FACILITY, "Zone Sensible Heating")
}

/// End-use rows that are aggregates rather than end uses.
pub fn is_summary_row(name: &str) -> bool {
    name.contains("Total") || name.contains("Average")
}
