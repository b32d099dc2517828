use crate::config::CheckCategories;
use crate::tables;
use crate::units::convert;
use crate::util::{format_int, format_number};

use super::{Check, CheckOutcome, EvaluationContext};

/// Expected difference between the coldest cooling setpoint and the design supply-air temperature.
const EXPECTED_SUPPLY_AIR_DELTA_F: f64 = 20.0;

pub struct PlenumLoads;

impl Check for PlenumLoads {
    fn name(&self) -> &'static str {
        "Plenum Loads"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.zone_conditions
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that the plenums do not have people or lights.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        for zone in ctx.building.zones.iter().filter(|z| z.is_plenum) {
            if zone.number_of_people > 0.0 {
                flags.push(format!(
                    "{} is a plenum, but has {} people.  Plenums should not contain people.",
                    zone.name,
                    format_number(zone.number_of_people, 1)
                ));
            }
            if zone.lighting_power_w > 0.0 {
                flags.push(format!(
                    "{} is a plenum, but has {} W of lights.  Plenums should not contain lights.",
                    zone.name,
                    format_number(zone.lighting_power_w, 1)
                ));
            }
        }
        Ok(())
    }
}

pub struct ConditionedZones;

impl Check for ConditionedZones {
    fn name(&self) -> &'static str {
        "Conditioned Zones"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.zone_conditions
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check that all zones with people are conditioned (have a thermostat with setpoints)".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        for zone in &ctx.building.zones {
            if zone.number_of_people > 0.0 && !zone.is_heated() {
                flags.push(format!(
                    "{} has {} people but is not heated.  Zones containing people are expected to be conditioned, heated-only at a minimum.  Heating setpoint must be at least 41F to be considered heated.",
                    zone.name,
                    format_number(zone.number_of_people, 1)
                ));
            }
        }
        Ok(())
    }
}

pub struct SupplyAirTemperature;

impl Check for SupplyAirTemperature {
    fn name(&self) -> &'static str {
        "Supply and Zone Air Temperature"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.zone_conditions
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check if fans modeled correctly.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let max_delta = ctx.config.tolerances.supply_air_max_delta_f;
        for zone in ctx.building.zones.iter().filter(|z| !z.is_plenum) {
            let thermostat = match &zone.thermostat {
                Some(t) => t,
                None => continue,
            };
            let cooling_min_c = match thermostat.cooling_setpoint_min_c {
                Some(t) => t,
                None => {
                    flags.push(format!("Can't inspect thermostat schedules for {}", zone.name));
                    continue;
                }
            };
            let setpoint_f = convert(cooling_min_c, "C", "F")?;
            let supply_f = convert(zone.cooling_design_supply_air_temp_c, "C", "F")?;
            let delta = setpoint_f - supply_f;
            if delta > EXPECTED_SUPPLY_AIR_DELTA_F + max_delta {
                flags.push(format!(
                    "For {} the delta temp between the cooling supply air temp of {} (F) and the minimum thermostat cooling temp of {} (F) is much larger than the expected value of {} (F).",
                    zone.name,
                    format_number(supply_f, 2),
                    format_number(setpoint_f, 2),
                    format_number(EXPECTED_SUPPLY_AIR_DELTA_F, 2)
                ));
            } else if delta < EXPECTED_SUPPLY_AIR_DELTA_F - max_delta {
                flags.push(format!(
                    "For {} the delta temp between the cooling supply air temp of {} (F) and the minimum thermostat cooling temp of {} (F) is much smaller than the expected value of {} (F).",
                    zone.name,
                    format_number(supply_f, 2),
                    format_number(setpoint_f, 2),
                    format_number(EXPECTED_SUPPLY_AIR_DELTA_F, 2)
                ));
            }
        }
        Ok(())
    }
}

pub struct UnmetHours;

impl Check for UnmetHours {
    fn name(&self) -> &'static str {
        "Unmet Hours"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.zone_conditions
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check model unmet hours.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let selector = tables::setpoint_not_met();
        let heating = ctx.report_value(&selector, "Time Setpoint Not Met During Occupied Heating", "Facility", "Hours");
        let cooling = ctx.report_value(&selector, "Time Setpoint Not Met During Occupied Cooling", "Facility", "Hours");
        let (heating, cooling) = match (heating, cooling) {
            (Some(h), Some(c)) => (h, c),
            _ => {
                flags.push("Warning: Could not determine unmet hours; simulation may have failed.".to_string());
                return Ok(());
            }
        };

        let tol = &ctx.config.tolerances;
        let max = tol.max_unmet_hours;
        let total = heating + cooling;
        let hours = |h: f64| format_int(h.round() as i64);

        match (tol.expect_cooling_unmet_hours, tol.expect_heating_unmet_hours) {
            (true, true) => {
                if total == 0.0 {
                    flags.push("Warning: Unmet heating and cooling hours expected.  There were none.".to_string());
                }
            }
            (true, false) => {
                if cooling == 0.0 {
                    flags.push("Warning: Unmet cooling hours expected.  There were none.".to_string());
                }
                if heating > max {
                    flags.push(format!(
                        "Warning: There were {} unmet occupied heating hours, more than the limit of {}.",
                        hours(heating),
                        hours(max)
                    ));
                }
            }
            (false, true) => {
                if heating == 0.0 {
                    flags.push("Warning: Unmet heating hours expected.  There were none.".to_string());
                }
                if cooling > max {
                    flags.push(format!(
                        "Warning: There were {} unmet occupied cooling hours, more than the limit of {}.",
                        hours(cooling),
                        hours(max)
                    ));
                }
            }
            (false, false) => {
                if total > max {
                    flags.push(format!(
                        "Warning: There were {} unmet occupied heating and cooling hours total, more than the limit of {}.",
                        hours(total),
                        hours(max)
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::model::{Building, ThermalZone, Thermostat};
    use crate::store::cell;

    fn zone(name: &str, people: f64, lights: f64, plenum: bool, heat_c: Option<f64>, cool_c: Option<f64>) -> ThermalZone {
        ThermalZone {
            name: name.into(),
            number_of_people: people,
            lighting_power_w: lights,
            is_plenum: plenum,
            thermostat: Some(Thermostat {
                heating_setpoint_max_c: heat_c,
                cooling_setpoint_min_c: cool_c,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_plenum_loads() {
        let fx = Fixture::new(Building {
            zones: vec![
                zone("Plenum 1", 2.0, 100.0, true, None, None),
                zone("Office", 10.0, 500.0, false, Some(21.0), Some(24.0)),
            ],
            ..Default::default()
        });
        let flags = fx.run(&PlenumLoads);
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0], "Plenum 1 is a plenum, but has 2.0 people.  Plenums should not contain people.");
    }

    #[test]
    fn test_conditioned_zones() {
        let fx = Fixture::new(Building {
            zones: vec![
                zone("Cold Storage", 1.0, 0.0, false, Some(4.0), None),
                zone("Office", 10.0, 0.0, false, Some(21.0), Some(24.0)),
                zone("Attic", 0.0, 0.0, false, None, None),
            ],
            ..Default::default()
        });
        let flags = fx.run(&ConditionedZones);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("Cold Storage has 1.0 people but is not heated."));
    }

    #[test]
    fn test_supply_air_delta() {
        // 24 C = 75.2 F; 12.8 C = 55.04 F; delta 20.16 F
        let mut wide = zone("Wide", 0.0, 0.0, false, Some(21.0), Some(24.0));
        wide.cooling_design_supply_air_temp_c = 7.0;
        let fx = Fixture::new(Building {
            zones: vec![
                zone("Ok", 0.0, 0.0, false, Some(21.0), Some(24.0)),
                wide,
                zone("Unknown", 0.0, 0.0, false, Some(21.0), None),
                zone("Plenum", 0.0, 0.0, true, None, None),
            ],
            ..Default::default()
        });
        let flags = fx.run(&SupplyAirTemperature);
        assert_eq!(flags.len(), 2);
        assert!(flags[0].starts_with("For Wide the delta temp"));
        assert!(flags[0].contains("much larger"));
        assert_eq!(flags[1], "Can't inspect thermostat schedules for Unknown");
    }

    fn unmet(heating: &str, cooling: &str) -> Fixture {
        let mut fx = Fixture::new(Building::default());
        let s = tables::setpoint_not_met();
        fx.store.insert(cell(&s, "Time Setpoint Not Met During Occupied Heating", "Facility", "Hours", heating));
        fx.store.insert(cell(&s, "Time Setpoint Not Met During Occupied Cooling", "Facility", "Hours", cooling));
        fx
    }

    #[test]
    fn test_unmet_hours_total() {
        assert!(unmet("100.00", "200.00").run(&UnmetHours).is_empty());
        let flags = unmet("300.00", "400.00").run(&UnmetHours);
        assert_eq!(
            flags,
            vec!["Warning: There were 700 unmet occupied heating and cooling hours total, more than the limit of 550.".to_string()]
        );
    }

    #[test]
    fn test_unmet_hours_expected_cooling() {
        let mut fx = unmet("600.00", "0.00");
        fx.config.tolerances.expect_cooling_unmet_hours = true;
        let flags = fx.run(&UnmetHours);
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0], "Warning: Unmet cooling hours expected.  There were none.");

        let mut fx = unmet("600.00", "1.50");
        fx.config.tolerances.expect_cooling_unmet_hours = true;
        let flags = fx.run(&UnmetHours);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].contains("600 unmet occupied heating hours"));
    }

    #[test]
    fn test_unmet_hours_missing_table() {
        let fx = Fixture::new(Building::default());
        let flags = fx.run(&UnmetHours);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("Warning: Could not determine unmet hours"));
    }
}
