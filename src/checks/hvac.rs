use tracing::debug;

use crate::config::CheckCategories;
use crate::error::ReportError;
use crate::model::{NodeSeries, PartLoadEquipment, SetpointControl};
use crate::tables;
use crate::units::{convert, delta_c_to_f};
use crate::util::{format_int, format_number, format_pct, round_to, safe_div};

use super::{Check, CheckOutcome, EvaluationContext};

const SINGLE_ZONE_W_PER_CFM: f64 = 0.5;
const MULTI_ZONE_W_PER_CFM: f64 = 1.1;

const NO_RUN_PERIOD: &str = "Cannot find the annual simulation run period";
/// Air loops below 10 cfm are treated as off.
const AIR_FLOW_ON_CFM: f64 = 10.0;
const WATER_FLOW_ON_M3_PER_S: f64 = 1e-8;

/// `|expected - actual| / actual`; infinite when `actual` is zero.
fn relative_difference(expected: f64, actual: f64) -> f64 {
    ((expected - actual) / actual).abs()
}

pub struct FanPower;

impl Check for FanPower {
    fn name(&self) -> &'static str {
        "Fan Power"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that fan power vs flow makes sense.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let max_delta = ctx.config.tolerances.fan_power_max_pct_delta;
        for air_loop in &ctx.building.air_loops {
            let expected = if air_loop.thermal_zone_count == 1 {
                SINGLE_ZONE_W_PER_CFM
            } else {
                MULTI_ZONE_W_PER_CFM
            };
            for fan in &air_loop.fans {
                if relative_difference(expected, fan.rated_w_per_cfm) > max_delta {
                    flags.push(format!(
                        "For {} on {}, the actual fan power of {} W/cfm is more than {} different from the expected {} W/cfm.",
                        fan.name,
                        air_loop.name,
                        format_number(fan.rated_w_per_cfm, 1),
                        format_pct(max_delta),
                        expected
                    ));
                }
            }
        }
        Ok(())
    }
}

pub struct PumpPower;

impl PumpPower {
    fn expected_w_per_gpm(loop_type: &str) -> Option<f64> {
        match loop_type {
            "Heating" => Some(19.0),
            "Cooling" => Some(22.0),
            "Condenser" => Some(19.0),
            _ => None,
        }
    }
}

impl Check for PumpPower {
    fn name(&self) -> &'static str {
        "Pump Power"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that pump power vs flow makes sense.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let max_delta = ctx.config.tolerances.pump_power_max_pct_delta;
        for plant_loop in &ctx.building.plant_loops {
            let expected = match Self::expected_w_per_gpm(&plant_loop.loop_type) {
                Some(e) => e,
                None => continue,
            };
            // service water loops often run off mains pressure with a placeholder pump
            let service_water = plant_loop.name.to_lowercase().contains("service water loop");
            for pump in &plant_loop.pumps {
                if relative_difference(expected, pump.rated_w_per_gpm) <= max_delta {
                    continue;
                }
                if service_water {
                    flags.push(format!(
                        "Warning: For {} on {}, the pumping power is {} W/gpm.",
                        pump.name,
                        plant_loop.name,
                        format_number(pump.rated_w_per_gpm, 1)
                    ));
                } else {
                    flags.push(format!(
                        "For {} on {}, the actual pumping power of {} W/gpm is more than {} different from the expected {} W/gpm for a {} plant loop.",
                        pump.name,
                        plant_loop.name,
                        format_number(pump.rated_w_per_gpm, 1),
                        format_pct(max_delta),
                        expected,
                        plant_loop.loop_type
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Fraction of hours in each part-load bin: `<= 0`, then ten 10% bins, the
/// last of which also takes everything above 100%.
pub fn part_load_ratio_bins(ratios: &[f64]) -> [f64; 11] {
    let mut bins = [0.0; 11];
    if ratios.is_empty() {
        return bins;
    }
    for &plr in ratios {
        let idx = if plr <= 0.0 {
            0
        } else if plr > 0.9 {
            10
        } else {
            // (0, 0.1] -> 1, (0.1, 0.2] -> 2, ...
            (1..=9).find(|&k| plr <= k as f64 / 10.0).unwrap_or(9)
        };
        bins[idx] += 1.0;
    }
    let n = ratios.len() as f64;
    for b in bins.iter_mut() {
        *b /= n;
    }
    bins
}

/// The one message warranted by an equipment's part-load profile, if any.
pub fn part_load_message(equipment: &PartLoadEquipment, design_power: f64, ratios: &[f64]) -> Option<String> {
    let bins = part_load_ratio_bins(ratios);
    let above_90 = bins[10];
    let above_80 = above_90 + bins[9];
    let above_60 = above_80 + bins[8] + bins[7];
    let above_50 = above_60 + bins[6];
    let zero = bins[0];

    let pretty = bins
        .iter()
        .map(|b| format!("{:?}", round_to(b * 100.0, 2)))
        .collect::<Vec<_>>()
        .join(", ");
    let header = format!(
        "For {} with design size {} {}",
        equipment.name,
        format_number(design_power, 2),
        equipment.units
    );
    let pct = |f: f64| format_number(f * 100.0, 2);
    let tail = format!("Bins of PLR [0%,0%-10%,...]: [{}].", pretty);

    let msg = if equipment.expect_low_plr {
        format!("Warning: {} is expected to have a low part load ratio. {}", header, tail)
    } else if zero == 1.0 {
        format!("Warning: For {}, all hrs are zero; equipment never runs.", equipment.name)
    } else if above_50 < 0.01 {
        format!(
            "Major Error: {}, {}% of hrs are above 50% part load.  This indicates significantly oversized equipment.  {}",
            header,
            pct(above_50),
            tail
        )
    } else if above_60 < 0.01 {
        format!(
            "Minor Error: {}, {}% of hrs are above 60% part load.  This indicates significantly oversized equipment. {}",
            header,
            pct(above_60),
            tail
        )
    } else if above_80 < 0.01 {
        format!(
            "Warning: {}, {}% of hrs are above 80% part load.  This indicates oversized equipment. {}",
            header,
            pct(above_80),
            tail
        )
    } else if above_90 > 0.2 {
        format!(
            "Major Error: {}, {}% of hrs are above 90% part load.  This indicates significantly undersized equipment. {}",
            header,
            pct(above_90),
            tail
        )
    } else if above_90 > 0.1 {
        format!(
            "Minor Error: {}, {}% of hrs are above 90% part load.  This indicates significantly undersized equipment. {}",
            header,
            pct(above_90),
            tail
        )
    } else if above_90 > 0.05 {
        format!(
            "Warning: {}, {}% of hrs are above 90% part load.  This indicates undersized equipment. {}",
            header,
            pct(above_90),
            tail
        )
    } else {
        return None;
    };
    Some(msg)
}

pub struct PartLoad;

impl Check for PartLoad {
    fn name(&self) -> &'static str {
        "Part Load"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that equipment operates at reasonable part load ranges.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        if ctx.building.weather_run_period().is_none() {
            flags.push(
                "Cannot find the annual simulation run period, cannot check equipment part load ratios.".to_string(),
            );
            return Ok(());
        }

        for equipment in &ctx.building.part_load_equipment {
            let design_power = match equipment.design_power {
                Some(p) => p,
                None => {
                    flags.push(format!(
                        "Could not determine peak power for {}, cannot check part load ratios.",
                        equipment.name
                    ));
                    continue;
                }
            };
            let series = match equipment.hourly_values.as_deref() {
                Some(s) if !s.is_empty() => s,
                _ => {
                    flags.push(format!(
                        "Warning: {} Timeseries not found for {}.",
                        equipment.variable_name,
                        equipment.name.to_uppercase()
                    ));
                    continue;
                }
            };
            if design_power == 0.0 {
                continue;
            }
            let ratios: Vec<f64> = series.iter().map(|v| v / design_power).collect();
            if let Some(msg) = part_load_message(equipment, design_power, &ratios) {
                flags.push(msg);
            }
        }
        Ok(())
    }
}

fn c_to_f(c: f64) -> Result<f64, ReportError> {
    convert(c, "C", "F")
}

/// Min and max (F) a setpoint controller may command.
fn control_range_f(control: Option<&SetpointControl>) -> Result<(Option<f64>, Option<f64>), ReportError> {
    let Some(c) = control else {
        return Ok((None, None));
    };
    Ok((c.min_temp_c.map(c_to_f).transpose()?, c.max_temp_c.map(c_to_f).transpose()?))
}

fn setpoint_text(temp_f: Option<f64>) -> String {
    match temp_f {
        Some(t) => format!("{}F", format_number(t, 1)),
        None => "no".to_string(),
    }
}

/// Supply temperatures (F) for the timesteps whose flow exceeds `min_flow`.
fn operating_temperatures_f(temps_c: &[f64], flows: &[f64], min_flow: f64) -> Result<Vec<f64>, ReportError> {
    temps_c
        .iter()
        .zip(flows)
        .filter(|&(_, &flow)| flow > min_flow)
        .map(|(&t, _)| c_to_f(t))
        .collect()
}

/// `Out of 8/10 (80.0%) operating supply air temperatures 2/8 (25.0%) are out of bounds with ...`
fn excursion_summary(medium: &str, total: usize, operating: usize, out_of_bounds: &[f64]) -> String {
    let min = out_of_bounds.iter().copied().fold(f64::INFINITY, f64::min);
    let max = out_of_bounds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    format!(
        "Out of {}/{} ({}%) operating supply {} temperatures {}/{} ({}%) are out of bounds with {}F min and {}F max.",
        operating,
        total,
        format_number(operating as f64 / total as f64 * 100.0, 1),
        medium,
        out_of_bounds.len(),
        operating,
        format_number(out_of_bounds.len() as f64 / operating as f64 * 100.0, 1),
        format_number(min, 1),
        format_number(max, 1)
    )
}

/// Both supply node series, or the warning to raise when one is missing.
fn node_series<'s>(series: &'s NodeSeries, owner: &str) -> Result<(&'s [f64], &'s [f64]), String> {
    let temps = series
        .temperatures_c
        .as_deref()
        .ok_or_else(|| format!("Warning: No supply node temperature timeseries found for '{}'", owner))?;
    let flows = series
        .flow_rates_m3_per_s
        .as_deref()
        .ok_or_else(|| format!("Warning: No supply node flow rate timeseries found for '{}'", owner))?;
    Ok((temps, flows))
}

pub struct AirLoopTemperatures;

impl Check for AirLoopTemperatures {
    fn name(&self) -> &'static str {
        "Air System Temperatures"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that air system sizing and operation temperatures are coordinated.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let sizing_delta = ctx.config.tolerances.air_loop_max_sizing_temp_delta_f;
        let operating_delta = ctx.config.tolerances.air_loop_max_operating_temp_delta_f;
        if ctx.building.weather_run_period().is_none() {
            flags.push(format!("{}, cannot check air loop temperatures.", NO_RUN_PERIOD));
            return Ok(());
        }
        let flow_on = convert(AIR_FLOW_ON_CFM, "cfm", "m^3/s")?;

        for air_loop in &ctx.building.air_loops {
            let (Some(clg_c), Some(htg_c)) = (
                air_loop.design_cooling_supply_air_temp_c,
                air_loop.design_heating_supply_air_temp_c,
            ) else {
                debug!(air_loop = %air_loop.name, "no sizing temperatures");
                continue;
            };
            let design_clg = c_to_f(clg_c)?;
            let design_htg = c_to_f(htg_c)?;
            let unitary = air_loop.is_unitary();
            let control = if unitary {
                air_loop.unitary_system.as_ref()
            } else {
                air_loop.setpoint_manager.as_ref()
            };
            let (min_f, max_f) = control_range_f(control)?;

            if !unitary {
                if let Some(min) = min_f.filter(|m| (m - design_clg).abs() > sizing_delta) {
                    flags.push(format!(
                        "Minor Error: Air loop '{}' sizing uses a {}F design cooling supply air temperature, but the setpoint manager operates down to {}F.",
                        air_loop.name,
                        format_number(design_clg, 1),
                        format_number(min, 1)
                    ));
                }
                if let Some(max) = max_f.filter(|m| (m - design_htg).abs() > sizing_delta) {
                    flags.push(format!(
                        "Minor Error: Air loop '{}' sizing uses a {}F design heating supply air temperature, but the setpoint manager operates up to {}F.",
                        air_loop.name,
                        format_number(design_htg, 1),
                        format_number(max, 1)
                    ));
                }

                for zone in ctx.building.zones.iter().filter(|z| air_loop.zones.contains(&z.name)) {
                    let zone_clg = c_to_f(zone.cooling_design_supply_air_temp_c)?;
                    let zone_htg = c_to_f(zone.heating_design_supply_air_temp_c)?;
                    if (design_clg - zone_clg).abs() > sizing_delta {
                        flags.push(format!(
                            "Minor Error: Air loop '{}' sizing uses a {}F design cooling supply air temperature but the sizing for zone {} uses a cooling supply air temperature of {}F.",
                            air_loop.name,
                            format_number(design_clg, 1),
                            zone.name,
                            format_number(zone_clg, 1)
                        ));
                    }
                    match zone.terminal.as_ref().filter(|t| t.has_reheat()) {
                        Some(terminal) => {
                            // PIU terminals do not expose a reheat temperature
                            let Some(reheat_c) = terminal.max_reheat_air_temp_c else {
                                continue;
                            };
                            let reheat = c_to_f(reheat_c)?;
                            if (reheat - zone_htg).abs() > sizing_delta {
                                flags.push(format!(
                                    "Minor Error: For zone '{}', the reheat air temperature is set to {}F, but the sizing for the zone is done with a heating supply air temperature of {}F.",
                                    zone.name,
                                    format_number(reheat, 1),
                                    format_number(zone_htg, 1)
                                ));
                            }
                        }
                        None if (design_htg - zone_htg).abs() > sizing_delta => {
                            flags.push(format!(
                                "Minor Error: Air loop '{}' sizing uses a {}F design heating supply air temperature but the sizing for zone {} uses a heating supply air temperature of {}F.",
                                air_loop.name,
                                format_number(design_htg, 1),
                                zone.name,
                                format_number(zone_htg, 1)
                            ));
                        }
                        None => {}
                    }
                }
            }

            let expected_min = min_f.map_or(design_clg, |m| m.min(design_clg));
            let expected_max = max_f.map_or(design_htg, |m| m.max(design_htg));

            let (temps, flows) = match node_series(&air_loop.supply_outlet, &air_loop.name) {
                Ok(series) => series,
                Err(warning) => {
                    flags.push(warning);
                    continue;
                }
            };
            let operating = operating_temperatures_f(temps, flows, flow_on)?;
            if operating.is_empty() {
                continue;
            }
            let out_of_bounds: Vec<f64> = operating
                .iter()
                .copied()
                .filter(|&t| {
                    t < 40.0
                        || t > 110.0
                        || t + operating_delta < expected_min
                        || t - operating_delta > expected_max
                })
                .collect();
            if out_of_bounds.is_empty() {
                continue;
            }

            let label = if unitary { "Unitary system" } else { "Air loop setpoint manager" };
            flags.push(format!(
                "Major Error: Expected supply air temperatures out of bounds for air loop '{}' with {}F design cooling SAT and {}F design heating SAT. {} '{}' of type '{}' with {} minimum setpoint temperature and {} maximum setpoint temperature. {}",
                air_loop.name,
                format_number(design_clg, 1),
                format_number(design_htg, 1),
                label,
                control.map(|c| c.name.as_str()).unwrap_or(""),
                control.map(|c| c.control_type.as_str()).unwrap_or("<unspecified>"),
                setpoint_text(min_f),
                setpoint_text(max_f),
                excursion_summary("air", temps.len(), operating.len(), &out_of_bounds)
            ));
        }
        Ok(())
    }
}

/// Rule-of-thumb sizing range; outside the warning band is a warning,
/// outside the error band an error.
struct SizingBenchmark {
    label: &'static str,
    units: &'static str,
    min_error: f64,
    min_warning: f64,
    max_warning: f64,
    max_error: f64,
}

const CHILLER_FLOW: SizingBenchmark = SizingBenchmark {
    label: "Flow Rate",
    units: "gal/ton*min",
    min_error: 1.5,
    min_warning: 2.0,
    max_warning: 3.0,
    max_error: 3.5,
};

const AIR_LOOP_FLOW: SizingBenchmark = SizingBenchmark {
    label: "Flow Rate",
    units: "cfm/ft^2",
    min_error: 0.2,
    min_warning: 0.5,
    max_warning: 2.0,
    max_error: 4.0,
};

const AIR_LOOP_COOLING: SizingBenchmark = SizingBenchmark {
    label: "Cooling Capacity",
    units: "ft^2/ton",
    min_error: 200.0,
    min_warning: 300.0,
    max_warning: 1500.0,
    max_error: 2000.0,
};

const ZONE_HEATING: SizingBenchmark = SizingBenchmark {
    label: "Heating Capacity",
    units: "Btu/ft^2*h",
    min_error: 4.0,
    min_warning: 8.0,
    max_warning: 30.0,
    max_error: 60.0,
};

impl SizingBenchmark {
    fn flag(&self, value: f64, subject: &str) -> Option<String> {
        let (severity, direction, limit) = if value < self.min_error {
            ("Error", "below", self.min_error)
        } else if value < self.min_warning {
            ("Warning", "below", self.min_warning)
        } else if value > self.max_error {
            ("Error", "above", self.max_error)
        } else if value > self.max_warning {
            ("Warning", "above", self.max_warning)
        } else {
            return None;
        };
        Some(format!(
            "{}: {} of {} {} for {} is {} {} {}.",
            severity,
            self.label,
            format_number(value, 2),
            self.units,
            subject,
            direction,
            format_number(limit, 2),
            self.units
        ))
    }
}

pub struct MechanicalSystemCapacity;

impl Check for MechanicalSystemCapacity {
    fn name(&self) -> &'static str {
        "Mechanical System Capacity"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check HVAC capacity against ASHRAE rules of thumb for chiller max flow rate, air loop max flow rate, air loop cooling capacity, and zone heating capacity. Zone heating check will skip thermal zones without any exterior exposure, and thermal zones that are not conditioned.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        for plant_loop in ctx.building.plant_loops.iter().filter(|p| p.has_chillers) {
            let tons = convert(plant_loop.total_cooling_capacity_w, "W", "ton")?;
            let gpm = convert(plant_loop.maximum_flow_rate_m3_per_s, "m^3/s", "gal/min")?;
            if tons < 0.01 {
                flags.push(format!(
                    "Cooling capacity for {} is too small for flow rate {} gal/min.",
                    plant_loop.name,
                    format_number(gpm, 2)
                ));
                continue;
            }
            flags.extend(CHILLER_FLOW.flag(gpm / tons, &plant_loop.name));
        }

        for air_loop in ctx.building.air_loops.iter().filter(|a| !a.sized_for_ventilation) {
            if air_loop.floor_area_served_m2 <= 0.0 {
                flags.push(format!(
                    "Could not determine the floor area served by {}, cannot check its capacity.",
                    air_loop.name
                ));
                continue;
            }
            let area_ft2 = convert(air_loop.floor_area_served_m2, "m^2", "ft^2")?;
            if let Some(flow) = air_loop.design_supply_air_flow_m3_per_s {
                let per_area = convert(flow / air_loop.floor_area_served_m2, "m^3/s*m^2", "cfm/ft^2")?;
                flags.extend(AIR_LOOP_FLOW.flag(per_area, &air_loop.name));
            }
            if let Some(capacity_w) = air_loop.total_cooling_capacity_w {
                let tons = convert(capacity_w, "W", "ton")?;
                if let Some(ft2_per_ton) = safe_div(area_ft2, tons) {
                    flags.extend(AIR_LOOP_COOLING.flag(ft2_per_ton, &air_loop.name));
                }
            }
        }

        let sizing = tables::zone_sensible_heating();
        for zone in &ctx.building.zones {
            if zone.is_plenum || zone.exterior_area_m2 == 0.0 {
                continue;
            }
            let Some(load) = ctx.report_value(&sizing, &zone.name.to_uppercase(), "User Design Load per Area", "W/m2")
            else {
                flags.push(format!(
                    "Could not find the design heating load for {}, cannot check its heating capacity.",
                    zone.name
                ));
                continue;
            };
            let load_ip = convert(load, "W/m^2", "Btu/ft^2*h")?;
            flags.extend(ZONE_HEATING.flag(load_ip, &zone.name));
        }
        Ok(())
    }
}

pub struct PlantCapacity;

impl Check for PlantCapacity {
    fn name(&self) -> &'static str {
        "Plant Capacity"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that plant equipment capacity matches loads.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let max_delta = ctx.config.tolerances.plant_capacity_max_pct_delta;
        // loops without coil loads (service water, ...) cannot be checked this way
        for plant_loop in &ctx.building.plant_loops {
            let heating_cap = plant_loop.total_heating_capacity_w;
            let heating_load = plant_loop.heating_coil_load_w;
            if heating_load > 0.0 && relative_difference(heating_load, heating_cap) > max_delta {
                flags.push(format!(
                    "For {}, the total heating capacity of {} kBtu/hr is more than {} different from the combined coil load of {} kBtu/hr.  This could indicate significantly oversized or undersized equipment.",
                    plant_loop.name,
                    format_number(convert(heating_cap, "W", "kBtu/hr")?, 1),
                    format_pct(max_delta),
                    format_number(convert(heating_load, "W", "kBtu/hr")?, 1)
                ));
            }

            let cooling_cap = plant_loop.total_cooling_capacity_w;
            let cooling_load = plant_loop.cooling_coil_load_w;
            if cooling_load > 0.0 && relative_difference(cooling_load, cooling_cap) > max_delta {
                flags.push(format!(
                    "For {}, the total cooling capacity of {} tons is more than {} different from the combined coil load of {} tons.  This could indicate significantly oversized or undersized equipment.",
                    plant_loop.name,
                    format_number(convert(cooling_cap, "W", "ton")?, 1),
                    format_pct(max_delta),
                    format_number(convert(cooling_load, "W", "ton")?, 1)
                ));
            }
        }
        Ok(())
    }
}

pub struct PlantLoopTemperatures;

impl Check for PlantLoopTemperatures {
    fn name(&self) -> &'static str {
        "Plant Loop Temperatures"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that plant loop sizing and operation temperatures are coordinated.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let sizing_delta = ctx.config.tolerances.plant_loop_max_sizing_temp_delta_f;
        let operating_delta = ctx.config.tolerances.plant_loop_max_operating_temp_delta_f;
        if ctx.building.weather_run_period().is_none() {
            flags.push(format!("{}, cannot check plant loop temperatures.", NO_RUN_PERIOD));
            return Ok(());
        }

        for plant_loop in &ctx.building.plant_loops {
            let (Some(exit_c), Some(dt_k)) = (plant_loop.design_exit_temp_c, plant_loop.design_temp_difference_k) else {
                debug!(plant_loop = %plant_loop.name, "no sizing temperatures");
                continue;
            };
            let design_supply = c_to_f(exit_c)?;
            let design_dt = delta_c_to_f(dt_k);
            let control = plant_loop.setpoint_manager.as_ref();
            let (min_f, max_f) = control_range_f(control)?;
            let loop_type = plant_loop.loop_type.as_str();

            match (loop_type, min_f, max_f) {
                ("Heating", _, Some(max)) if (max - design_supply).abs() > sizing_delta => {
                    flags.push(format!(
                        "Minor Error: {} sizing uses a {}F supply water temperature, but the setpoint manager operates up to {}F.",
                        plant_loop.name,
                        format_number(design_supply, 1),
                        format_number(max, 1)
                    ));
                }
                ("Cooling", Some(min), _) if (min - design_supply).abs() > sizing_delta => {
                    flags.push(format!(
                        "Minor Error: {} sizing uses a {}F supply water temperature, but the setpoint manager operates down to {}F.",
                        plant_loop.name,
                        format_number(design_supply, 1),
                        format_number(min, 1)
                    ));
                }
                _ => {}
            }

            let (temps, flows) = match node_series(&plant_loop.supply_outlet, &plant_loop.name) {
                Ok(series) => series,
                Err(warning) => {
                    flags.push(warning);
                    continue;
                }
            };
            let operating = operating_temperatures_f(temps, flows, WATER_FLOW_ON_M3_PER_S)?;
            if operating.is_empty() {
                flags.push(format!(
                    "Warning: Flowrates are all zero in supply node timeseries for '{}'",
                    plant_loop.name
                ));
                continue;
            }

            let (design_return, out_of_bounds): (f64, Vec<f64>) = match loop_type {
                "Heating" => {
                    let design_return = design_supply - design_dt;
                    let expected_max = max_f.map_or(design_supply, |m| m.max(design_supply));
                    let expected_min = min_f.map_or(design_return, |m| m.min(design_return));
                    let out = operating
                        .iter()
                        .copied()
                        .filter(|&t| t + operating_delta < expected_min || t - operating_delta > expected_max)
                        .collect();
                    (design_return, out)
                }
                "Cooling" => {
                    let design_return = design_supply + design_dt;
                    let expected_max = max_f.map_or(design_return, |m| m.max(design_return));
                    let expected_min = min_f.map_or(design_supply, |m| m.min(design_supply));
                    let out = operating
                        .iter()
                        .copied()
                        .filter(|&t| t + operating_delta < expected_min || t - operating_delta > expected_max)
                        .collect();
                    (design_return, out)
                }
                "Condenser" => {
                    let design_return = design_supply + design_dt;
                    let expected_max = max_f.map_or(design_return, |m| m.max(design_return));
                    let out = operating
                        .iter()
                        .copied()
                        .filter(|&t| t < 35.0 || t > 100.0 || t - operating_delta > expected_max)
                        .collect();
                    (design_return, out)
                }
                _ => continue,
            };
            if out_of_bounds.is_empty() {
                continue;
            }

            flags.push(format!(
                "Major Error: Expected supply water temperatures out of bounds for {} plant loop '{}' with a {}F design supply temperature and {}F design return temperature and a setpoint manager '{}' of type '{}' with {} minimum setpoint temperature and {} maximum setpoint temperature. {}",
                loop_type,
                plant_loop.name,
                format_number(design_supply, 1),
                format_number(design_return, 1),
                control.map(|c| c.name.as_str()).unwrap_or(""),
                control.map(|c| c.control_type.as_str()).unwrap_or("<unspecified>"),
                setpoint_text(min_f),
                setpoint_text(max_f),
                excursion_summary("water", temps.len(), operating.len(), &out_of_bounds)
            ));
        }
        Ok(())
    }
}

/// Share of cooling hours spent reheating, as a percentage rounded to one
/// decimal, and the number of cooling hours. `None` when the terminal never cools.
pub fn overcool_reheat_pct(reheat_w: &[f64], cooling_w: &[f64]) -> Option<(f64, usize)> {
    let mut reheat_hours = 0.0;
    let mut cooling_hours = 0;
    for (&rht, &clg) in reheat_w.iter().zip(cooling_w) {
        if clg == 0.0 {
            continue;
        }
        reheat_hours += rht / (rht + clg);
        cooling_hours += 1;
    }
    let share = safe_div(reheat_hours, cooling_hours as f64)?;
    Some((round_to(share * 100.0, 1), cooling_hours))
}

pub struct SimultaneousHeatingCooling;

impl Check for SimultaneousHeatingCooling {
    fn name(&self) -> &'static str {
        "Simultaneous Heating and Cooling"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.hvac
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check for simultaneous heating and cooling by looping through all Single Duct VAV Reheat Air Terminals and analyzing hourly data when there is a cooling load.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let max_pct = ctx.config.tolerances.simultaneous_heating_cooling_max_pct;
        if ctx.building.weather_run_period().is_none() {
            flags.push(format!("{}, cannot determine simultaneous heating and cooling.", NO_RUN_PERIOD));
            return Ok(());
        }

        let terminals = ctx
            .building
            .zones
            .iter()
            .filter_map(|z| z.terminal.as_ref())
            .filter(|t| t.is_vav_reheat());
        for terminal in terminals {
            let Some(reheat) = terminal.reheat_rates_w.as_deref() else {
                let coil = terminal.reheat_coil.as_deref().unwrap_or(&terminal.name);
                flags.push(format!(
                    "Heating Coil (Air) Heating Rate Timeseries not found for {}.",
                    coil.to_uppercase()
                ));
                continue;
            };
            let Some(cooling) = terminal.cooling_rates_w.as_deref() else {
                flags.push(format!(
                    "Zone Air Terminal Sensible Cooling Rate Timeseries not found for ADU {}.",
                    terminal.name.to_uppercase()
                ));
                continue;
            };
            let Some((pct, cooling_hours)) = overcool_reheat_pct(reheat, cooling) else {
                continue;
            };
            if pct > max_pct * 100.0 {
                flags.push(format!(
                    "{} has {}% overcool-reheat, which is greater than the limit of {}. This terminal is in cooling mode for {} hours of the year.",
                    terminal.name,
                    format_number(pct, 1),
                    format_pct(max_pct),
                    format_int(cooling_hours)
                ));
            }
        }
        Ok(())
    }
}
