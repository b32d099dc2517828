use crate::config::CheckCategories;
use crate::targets::CATEGORY_HOT_WATER;
use crate::units::convert;
use crate::util::format_number;

use super::{Check, CheckOutcome, EvaluationContext};

pub struct DomesticHotWater;

impl Check for DomesticHotWater {
    fn name(&self) -> &'static str {
        "Domestic Hot Water"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.service_water_heating
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check against the 2011 ASHRAE Handbook - HVAC Applications, Table 7 section 50.14.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let building_type = ctx.building_type();
        let per_person = match ctx
            .targets
            .find(ctx.standard(), CATEGORY_HOT_WATER, &[("building_type", building_type)])
        {
            Some(v) => v,
            None => {
                flags.push(format!(
                    "No rule of thumb values exist for {}. Hot water consumption was not checked.",
                    building_type
                ));
                return Ok(());
            }
        };

        let mut gal_per_day = 0.0;
        for equipment in &ctx.building.water_use_equipment {
            let hours = match equipment.flow_schedule.as_ref().and_then(|s| s.full_load_hours()) {
                Some(h) => h,
                None => {
                    flags.push(format!(
                        "{} doesn't have a schedule. Can't identify hot water consumption.",
                        equipment.name
                    ));
                    continue;
                }
            };
            let gpm = convert(equipment.peak_flow_rate_m3_per_s, "m^3/s", "gal/min")?;
            gal_per_day += 60.0 * gpm * hours / 365.0;
        }

        let people = ctx.building.number_of_people();
        let target = per_person * people;
        if let Some(dev) = ctx.config.tolerances.hot_water.evaluate(gal_per_day, target) {
            flags.push(format!(
                "Annual average of {} gallons per day of hot water is {} the expected value of {} gallons per day for {} people.",
                format_number(gal_per_day, 1),
                dev.phrase(),
                format_number(target, 1),
                format_number(people, 0)
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::model::{Building, ScheduleRef, ThermalZone, WaterUseEquipment};
    use crate::targets::TargetTable;

    fn fixture(gpm: f64) -> Fixture {
        let mut fx = Fixture::new(Building {
            standards_building_type: Some("Office".into()),
            zones: vec![ThermalZone {
                name: "Z1".into(),
                number_of_people: 100.0,
                ..Default::default()
            }],
            water_use_equipment: vec![WaterUseEquipment {
                name: "Sinks".into(),
                peak_flow_rate_m3_per_s: convert(gpm, "gal/min", "m^3/s").unwrap(),
                flow_schedule: Some(ScheduleRef {
                    name: "SWH Sched".into(),
                    schedule_type: "Ruleset".into(),
                    equivalent_full_load_hours: Some(365.0),
                }),
            }],
            ..Default::default()
        });
        fx.targets = TargetTable::from_json_str(
            r#"[{"standard": "90.1-2013", "category": "hot_water_gal_per_person_day",
                 "criteria": {"building_type": "Office"}, "value": 1.0}]"#,
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_consumption_in_range() {
        // 60 * gpm * 365 / 365 = 60 * gpm gallons per day
        let fx = fixture(100.0 / 60.0);
        assert!(fx.run(&DomesticHotWater).is_empty());
    }

    #[test]
    fn test_consumption_too_high() {
        let fx = fixture(3.0);
        let flags = fx.run(&DomesticHotWater);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("Annual average of 180.0 gallons per day of hot water is more than 25% above"));
    }

    #[test]
    fn test_no_schedule_and_no_target() {
        let mut fx = fixture(1.0);
        fx.building.water_use_equipment[0].flow_schedule = None;
        let flags = fx.run(&DomesticHotWater);
        assert_eq!(flags[0], "Sinks doesn't have a schedule. Can't identify hot water consumption.");

        fx.building.standards_building_type = Some("Warehouse".into());
        let flags = fx.run(&DomesticHotWater);
        assert_eq!(
            flags,
            vec!["No rule of thumb values exist for Warehouse. Hot water consumption was not checked.".to_string()]
        );
    }
}
