//! Energy-use metrics read from the simulation report: service water heating,
//! end-use intensities, peaks, unmet hours and outdoor air.

use tracing::debug;

use super::{AirComponent, AirMeasure, AirScope, MetricKey, MetricRecord, MetricsContext};
use crate::error::Result;
use crate::materialize::materialize_required;
use crate::tables::{self, is_summary_row};
use crate::units::convert;
use crate::util::safe_div;

const SECONDS_PER_YEAR: f64 = 31_536_000.0;
const HOURS_PER_YEAR: f64 = 8760.0;
const DAYS_PER_YEAR: f64 = 365.5;

/// End uses reported as zero when the simulation has no row for them.
const DEFAULT_END_USES: [&str; 9] = [
    "fans",
    "heating",
    "cooling",
    "interior_equipment",
    "natural_gas",
    "pumps",
    "total",
    "heat_recovery",
    "water_systems",
];

/// Materialized fuel columns summed into the total EUI.
pub const FUEL_COLUMNS: [&str; 5] = [
    "natural_gas_gj",
    "electricity_gj",
    "additional_fuel_gj",
    "district_cooling_gj",
    "district_heating_gj",
];

pub fn service_water_heating(ctx: &MetricsContext<'_>) -> MetricRecord {
    let sel = tables::end_uses();
    let value = |column: &str, unit: &str| ctx.store.value_f64(&sel, "Water Systems", column, unit);
    let occupancy = ctx.building.number_of_people();

    let mut r = MetricRecord::new();
    r.set(MetricKey::ShwTotalNominalOccupancy, occupancy);

    let electricity = value("Electricity", "GJ");
    let per_day = electricity.map(|e| e / DAYS_PER_YEAR);
    r.set(MetricKey::ShwElectricityPerYear, electricity);
    r.set(MetricKey::ShwElectricityPerDay, per_day);
    r.set(
        MetricKey::ShwElectricityPerDayPerOccupant,
        per_day.and_then(|d| safe_div(d, occupancy)),
    );
    r.set(MetricKey::ShwNaturalGasPerYear, value("Natural Gas", "GJ"));
    r.set(MetricKey::ShwAdditionalFuelPerYear, value("Additional Fuel", "GJ"));

    let water = value("Water", "m3");
    let water_per_day = water.map(|w| w / DAYS_PER_YEAR);
    r.set(MetricKey::ShwWaterPerYear, water);
    r.set(MetricKey::ShwWaterPerDay, water_per_day);
    r.set(
        MetricKey::ShwWaterPerDayPerOccupant,
        water_per_day.and_then(|d| safe_div(d, occupancy)),
    );
    r
}

/// End-use and fuel intensities in GJ/m^2, with the ground-source heat pump
/// adjustment and the on-site generation split.
pub fn energy_eui(ctx: &MetricsContext<'_>) -> Result<MetricRecord> {
    let table = materialize_required(ctx.store, &tables::end_uses())?;
    let area = ctx.conditioned_area_m2();
    let per_area = |gj: f64| safe_div(gj, area);
    let mut r = MetricRecord::new();

    for name in DEFAULT_END_USES {
        r.set(MetricKey::Eui(name.to_string()), 0.0);
    }

    let end_uses: Vec<_> = table.rows.iter().filter(|row| !is_summary_row(&row.name)).collect();
    for row in &end_uses {
        r.set(MetricKey::eui(&row.name), per_area(row.sum_with_suffix("_gj")));
    }

    let mut total = Some(0.0);
    for column in FUEL_COLUMNS {
        let sum: f64 = end_uses.iter().filter_map(|row| row.number(column)).sum();
        let eui = per_area(sum);
        total = total.zip(eui).map(|(t, e)| t + e);
        r.set(MetricKey::Eui(column.trim_end_matches("_gj").to_string()), eui);
    }

    if ctx.building.has_ground_source_heat_pump() {
        // The ground loop shows up as district energy; take it back out.
        let district_heating = r.number_or_zero(&MetricKey::eui("district_heating"));
        let district_cooling = r.number_or_zero(&MetricKey::eui("district_cooling"));
        let heating = r.number_or_zero(&MetricKey::eui("heating"));
        let cooling = r.number_or_zero(&MetricKey::eui("cooling"));
        r.set(MetricKey::eui("heating"), heating - district_heating);
        r.set(MetricKey::eui("cooling"), cooling - district_cooling);
        total = total.map(|t| t - district_heating - district_cooling);
        debug!(district_heating, district_cooling, "removed ground-source district energy from EUI");
    }

    r.set(MetricKey::EuiTotal, total);
    r.set(MetricKey::TotalSiteEui, total);

    let net_site = ctx
        .store
        .value_f64(
            &tables::site_and_source_energy(),
            "Net Site Energy",
            "Energy Per Conditioned Building Area",
            "MJ/m2",
        )
        .map(|mj| convert(mj, "MJ/m^2", "GJ/m^2"))
        .transpose()?;
    r.set(MetricKey::NetSiteEui, net_site);

    let electricity = r.number(&MetricKey::eui("electricity"));
    let onsite = total.zip(net_site).map(|(t, n)| t - n);
    r.set(MetricKey::OnsiteGeneration, onsite);
    let net_electricity = electricity.map(|e| match onsite {
        Some(g) if g > 0.0 => e - g,
        _ => e,
    });
    r.set(MetricKey::ElectricityNetOfGeneration, net_electricity);
    Ok(r)
}

pub fn energy_peaks(ctx: &MetricsContext<'_>) -> MetricRecord {
    let area = ctx.conditioned_area_m2();
    let electricity = tables::energy_meters("Electricity");
    let natural_gas = tables::energy_meters("Natural Gas");
    let elec_max = |row: &str| ctx.store.value_f64(&electricity, row, "Electricity Maximum Value", "W").unwrap_or(0.0);
    let gas_max = |row: &str| ctx.store.value_f64(&natural_gas, row, "Natural Gas Maximum Value", "W").unwrap_or(0.0);

    let mut r = MetricRecord::new();
    let source = ctx
        .store
        .get_cell(&tables::general_information(), "Principal Heating Source", "Data", "")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    r.set(MetricKey::PrincipalHeatingSource, source);
    r.set_ratio(MetricKey::PeakElectric, elec_max("Electricity:Facility"), area);
    r.set_ratio(MetricKey::PeakNaturalGas, gas_max("NaturalGas:Facility"), area);
    r.set_ratio(
        MetricKey::HeatingPeak,
        elec_max("Heating:Electricity").max(gas_max("Heating:NaturalGas")),
        area,
    );
    r.set_ratio(MetricKey::CoolingPeak, elec_max("Cooling:Electricity"), area);
    r
}

pub fn unmet_hours(ctx: &MetricsContext<'_>) -> MetricRecord {
    let sel = tables::setpoint_not_met();
    let hours = |row: &str| ctx.store.value_f64(&sel, row, "Facility", "Hours").unwrap_or(0.0);
    let mut r = MetricRecord::new();
    r.set(
        MetricKey::UnmetHoursCoolingOccupied,
        hours("Time Setpoint Not Met During Occupied Cooling"),
    );
    r.set(
        MetricKey::UnmetHoursHeatingOccupied,
        hours("Time Setpoint Not Met During Occupied Heating"),
    );
    r
}

/// Annual outdoor air volumes summed over air loops and zones, normalized by
/// volume (air changes per hour) and by floor and exterior area.
pub fn outdoor_air(ctx: &MetricsContext<'_>) -> MetricRecord {
    let b = ctx.building;
    let area = ctx.conditioned_area_m2();
    let mut r = MetricRecord::new();

    let loops: Vec<String> = b.air_loops.iter().map(|l| l.name.to_uppercase()).collect();
    let zones: Vec<String> = b.zones.iter().map(|z| z.name.to_uppercase()).collect();
    let scopes = [
        (
            AirScope::AirLoops,
            tables::outdoor_air_by_air_loop(),
            &loops,
            &[AirComponent::MechanicalVentilation, AirComponent::NaturalVentilation][..],
        ),
        (
            AirScope::Zones,
            tables::outdoor_air_by_zone(),
            &zones,
            &[
                AirComponent::MechanicalVentilation,
                AirComponent::NaturalVentilation,
                AirComponent::Infiltration,
            ][..],
        ),
    ];

    for (scope, sel, rows, components) in scopes {
        for &component in components {
            let m3: f64 = rows
                .iter()
                .filter_map(|row| ctx.store.value_f64(&sel, row, component.column(), "m3"))
                .sum();
            r.set(MetricKey::OutdoorAir(scope, component, AirMeasure::VolumeM3), m3);
            r.set_ratio(
                MetricKey::OutdoorAir(scope, component, AirMeasure::AirChangesPerHour),
                m3,
                b.volume_m3 * HOURS_PER_YEAR,
            );
            r.set_ratio(
                MetricKey::OutdoorAir(scope, component, AirMeasure::PerConditionedArea),
                m3,
                area * SECONDS_PER_YEAR,
            );
            r.set_ratio(
                MetricKey::OutdoorAir(scope, component, AirMeasure::PerExteriorArea),
                m3,
                b.exterior_area_m2 * SECONDS_PER_YEAR,
            );
        }
    }
    r
}

#[cfg(test)]
mod tests {
    use super::super::testing::MetricsFixture;
    use super::super::MetricValue;
    use super::*;
    use crate::model::{AirLoop, Building, PlantLoop, ThermalZone};

    fn office() -> MetricsFixture {
        let mut fx = MetricsFixture::new(Building {
            conditioned_floor_area_m2: 1000.0,
            exterior_area_m2: 2000.0,
            volume_m3: 3000.0,
            zones: vec![ThermalZone {
                name: "Core Zone".into(),
                number_of_people: 50.0,
                ..Default::default()
            }],
            air_loops: vec![AirLoop {
                name: "Sys 1".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let eu = tables::end_uses();
        fx.insert(&eu, "Heating", "Electricity", "GJ", "100.00");
        fx.insert(&eu, "Heating", "Natural Gas", "GJ", "300.00");
        fx.insert(&eu, "Interior Lighting", "Electricity", "GJ", "200.00");
        fx.insert(&eu, "Water Systems", "Electricity", "GJ", "36.55");
        fx.insert(&eu, "Water Systems", "Water", "m3", "731.00");
        fx.insert(&eu, "Total End Uses", "Electricity", "GJ", "336.55");
        fx.insert(&eu, "Total End Uses", "Natural Gas", "GJ", "300.00");
        fx
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_service_water_heating() {
        let fx = office();
        let r = service_water_heating(&fx.ctx());
        assert_eq!(r.number(&MetricKey::ShwTotalNominalOccupancy), Some(50.0));
        assert!(close(r.number(&MetricKey::ShwElectricityPerDay), 0.1));
        assert!(close(r.number(&MetricKey::ShwWaterPerDayPerOccupant), 0.04));
        assert_eq!(r.get(&MetricKey::ShwNaturalGasPerYear), Some(&MetricValue::NotCalculated));
    }

    #[test]
    fn test_eui_excludes_summary_rows() {
        let fx = office();
        let r = energy_eui(&fx.ctx()).unwrap();
        assert!(close(r.number(&MetricKey::eui("Heating")), 0.4));
        assert!(close(r.number(&MetricKey::eui("Interior Lighting")), 0.2));
        assert!(close(r.number(&MetricKey::eui("electricity")), 0.33655));
        assert!(close(r.number(&MetricKey::eui("natural_gas")), 0.3));
        assert!(close(r.number(&MetricKey::EuiTotal), 0.63655));
        assert_eq!(r.number(&MetricKey::eui("fans")), Some(0.0));
        assert!(r.get(&MetricKey::eui("Total End Uses")).is_none());
        assert_eq!(r.get(&MetricKey::NetSiteEui), Some(&MetricValue::NotCalculated));
    }

    #[test]
    fn test_eui_onsite_generation_and_gshp() {
        let mut fx = office();
        fx.insert(&tables::end_uses(), "Heating", "District Heating", "GJ", "50.00");
        fx.insert(
            &tables::site_and_source_energy(),
            "Net Site Energy",
            "Energy Per Conditioned Building Area",
            "MJ/m2",
            "586.55",
        );
        fx.building.plant_loops.push(PlantLoop {
            name: "GLHX Loop".into(),
            ..Default::default()
        });
        let r = energy_eui(&fx.ctx()).unwrap();
        assert!(close(r.number(&MetricKey::eui("heating")), 0.4));
        assert!(close(r.number(&MetricKey::EuiTotal), 0.63655));
        assert!(close(r.number(&MetricKey::NetSiteEui), 0.58655));
        assert!(close(r.number(&MetricKey::OnsiteGeneration), 0.05));
        assert!(close(r.number(&MetricKey::ElectricityNetOfGeneration), 0.28655));
    }

    #[test]
    fn test_eui_requires_end_uses() {
        let fx = MetricsFixture::new(Building::default());
        assert!(energy_eui(&fx.ctx()).is_err());
    }

    #[test]
    fn test_peaks_and_unmet_hours() {
        let mut fx = office();
        let elec = tables::energy_meters("Electricity");
        fx.insert(&elec, "Electricity:Facility", "Electricity Maximum Value", "W", "50000.00");
        fx.insert(&elec, "Heating:Electricity", "Electricity Maximum Value", "W", "10000.00");
        fx.insert(
            &tables::energy_meters("Natural Gas"),
            "Heating:NaturalGas",
            "Natural Gas Maximum Value",
            "W",
            "30000.00",
        );
        let r = energy_peaks(&fx.ctx());
        assert_eq!(r.number(&MetricKey::PeakElectric), Some(50.0));
        assert_eq!(r.number(&MetricKey::HeatingPeak), Some(30.0));
        assert_eq!(r.number(&MetricKey::CoolingPeak), Some(0.0));
        assert_eq!(r.text(&MetricKey::PrincipalHeatingSource), Some("unknown"));

        fx.insert(&tables::setpoint_not_met(), "Time Setpoint Not Met During Occupied Heating", "Facility", "Hours", "12.25");
        let r = unmet_hours(&fx.ctx());
        assert_eq!(r.number(&MetricKey::UnmetHoursHeatingOccupied), Some(12.25));
        assert_eq!(r.number(&MetricKey::UnmetHoursCoolingOccupied), Some(0.0));
    }

    #[test]
    fn test_outdoor_air() {
        let mut fx = office();
        fx.insert(&tables::outdoor_air_by_air_loop(), "SYS 1", "Mechanical Ventilation", "m3", "26280000.00");
        fx.insert(&tables::outdoor_air_by_zone(), "CORE ZONE", "Infiltration", "m3", "2628000.00");
        let r = outdoor_air(&fx.ctx());
        let key = |s, c, m| MetricKey::OutdoorAir(s, c, m);
        assert_eq!(
            r.number(&key(AirScope::AirLoops, AirComponent::MechanicalVentilation, AirMeasure::VolumeM3)),
            Some(26_280_000.0)
        );
        assert!(close(
            r.number(&key(AirScope::AirLoops, AirComponent::MechanicalVentilation, AirMeasure::AirChangesPerHour)),
            1.0
        ));
        assert!(close(
            r.number(&key(AirScope::Zones, AirComponent::Infiltration, AirMeasure::AirChangesPerHour)),
            0.1
        ));
        assert_eq!(
            r.number(&key(AirScope::Zones, AirComponent::NaturalVentilation, AirMeasure::VolumeM3)),
            Some(0.0)
        );
    }
}
