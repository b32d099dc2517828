use crate::config::CheckCategories;
use crate::model::{LoadKind, SpaceType};
use crate::targets::{CATEGORY_SCHEDULE_HOURS, CATEGORY_SPACE_LOAD};
use crate::units::convert;
use crate::util::{format_int, format_number};

use super::{Check, CheckOutcome, EvaluationContext};

fn applicable_space_types<'a>(ctx: &'a EvaluationContext<'_>) -> impl Iterator<Item = &'a SpaceType> {
    ctx.building
        .space_types
        .iter()
        .filter(|st| st.floor_area_m2 > 0.0 && st.name != "Plenum")
}

pub struct InternalLoads;

struct LoadComparison {
    label: &'static str,
    kind: LoadKind,
    actual_si: f64,
    unit_si: &'static str,
    unit_ip: &'static str,
    scale_ip: f64,
    display_ip: &'static str,
}

impl InternalLoads {
    fn comparisons(space_type: &SpaceType) -> Vec<LoadComparison> {
        vec![
            LoadComparison {
                label: "LPD",
                kind: LoadKind::Lighting,
                actual_si: space_type.lighting_w_per_m2,
                unit_si: "W/m^2",
                unit_ip: "W/ft^2",
                scale_ip: 1.0,
                display_ip: "W/ft^2",
            },
            LoadComparison {
                label: "EPD",
                kind: LoadKind::ElectricEquipment,
                actual_si: space_type.electric_equipment_w_per_m2,
                unit_si: "W/m^2",
                unit_ip: "W/ft^2",
                scale_ip: 1.0,
                display_ip: "W/ft^2",
            },
            LoadComparison {
                label: "Gas equipment power density",
                kind: LoadKind::GasEquipment,
                actual_si: space_type.gas_equipment_w_per_m2,
                unit_si: "W/m^2",
                unit_ip: "Btu/ft^2*h",
                scale_ip: 1.0,
                display_ip: "Btu/h*ft^2",
            },
            LoadComparison {
                label: "Occupancy",
                kind: LoadKind::People,
                actual_si: space_type.people_per_m2.unwrap_or(0.0),
                unit_si: "1/m^2",
                unit_ip: "1/ft^2",
                scale_ip: 1000.0,
                display_ip: "People/1000 ft^2",
            },
        ]
    }
}

impl Check for InternalLoads {
    fn name(&self) -> &'static str {
        "Internal Loads"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.internal_loads
    }

    fn description(&self, ctx: &EvaluationContext<'_>) -> String {
        format!(
            "Check internal loads against {} rule-of-thumb values for each space type.",
            ctx.standard()
        )
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let band = ctx.config.tolerances.internal_loads;
        for space_type in applicable_space_types(ctx) {
            let standards_type = match space_type.standards_space_type.as_deref() {
                Some(s) => s,
                None => {
                    flags.push(format!(
                        "Unexpected standards type for {}, can't validate internal loads.",
                        space_type.name
                    ));
                    continue;
                }
            };

            for cmp in Self::comparisons(space_type) {
                let target = ctx
                    .targets
                    .find(
                        ctx.standard(),
                        CATEGORY_SPACE_LOAD,
                        &[("space_type", standards_type), ("load", cmp.kind.label())],
                    )
                    .unwrap_or(0.0);
                let actual = convert(cmp.actual_si, cmp.unit_si, cmp.unit_ip)? * cmp.scale_ip;
                if let Some(dev) = band.evaluate(actual, target) {
                    flags.push(format!(
                        "{} of {} ({}) for {} is {} the expected value of {} ({}).",
                        cmp.label,
                        format_number(actual, 2),
                        cmp.display_ip,
                        space_type.name,
                        dev.phrase(),
                        format_number(target, 2),
                        cmp.display_ip
                    ));
                }
            }
        }
        Ok(())
    }
}

pub struct Schedules;

impl Check for Schedules {
    fn name(&self) -> &'static str {
        "Schedules"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.internal_loads
    }

    fn description(&self, ctx: &EvaluationContext<'_>) -> String {
        format!(
            "Check schedules for lighting, ventilation, occupant density, plug loads, and equipment based on {} DOE reference building schedules in terms of full load hours per year.",
            ctx.standard()
        )
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let band = ctx.config.tolerances.schedules;
        for space_type in applicable_space_types(ctx) {
            let standards_type = match space_type.standards_space_type.as_deref() {
                Some(s) => s,
                None => {
                    flags.push(format!(
                        "Unexpected standards type for {}, can't validate schedules.",
                        space_type.name
                    ));
                    continue;
                }
            };

            for load in &space_type.loads {
                let expected = match ctx.targets.find(
                    ctx.standard(),
                    CATEGORY_SCHEDULE_HOURS,
                    &[("space_type", standards_type), ("load", load.kind.label())],
                ) {
                    Some(h) => h,
                    None => continue,
                };
                let schedule = match &load.schedule {
                    Some(s) => s,
                    None => {
                        flags.push(format!("{} in {} doesn't have a schedule assigned.", load.name, space_type.name));
                        continue;
                    }
                };
                let hours = match schedule.full_load_hours() {
                    Some(h) => h,
                    None => {
                        flags.push(format!(
                            "{} isn't a Ruleset or Constant schedule. Can't calculate annual equivalent full load hours.",
                            schedule.name
                        ));
                        continue;
                    }
                };
                if let Some(dev) = band.evaluate(hours, expected) {
                    flags.push(format!(
                        "{} annual equivalent full load hours for {} in {} is {} the typical value of {} hours from the DOE Prototype building.",
                        format_int(hours.round() as i64),
                        schedule.name,
                        space_type.name,
                        dev.phrase(),
                        format_int(expected.round() as i64)
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
    use crate::model::{Building, ScheduleRef, SpaceLoad};
    use crate::targets::TargetTable;

    fn office() -> SpaceType {
        SpaceType {
            name: "Office Space".into(),
            standards_space_type: Some("OpenOffice".into()),
            floor_area_m2: 500.0,
            people_per_m2: Some(0.0538),
            lighting_w_per_m2: 10.76,
            electric_equipment_w_per_m2: 10.76,
            gas_equipment_w_per_m2: 0.0,
            loads: vec![
                SpaceLoad {
                    name: "Office Lights".into(),
                    kind: LoadKind::Lighting,
                    schedule: Some(ScheduleRef {
                        name: "Office Lighting Sched".into(),
                        schedule_type: "Ruleset".into(),
                        equivalent_full_load_hours: Some(2000.0),
                    }),
                },
                SpaceLoad {
                    name: "Office Plugs".into(),
                    kind: LoadKind::ElectricEquipment,
                    schedule: None,
                },
                SpaceLoad {
                    name: "Office People".into(),
                    kind: LoadKind::People,
                    schedule: Some(ScheduleRef {
                        name: "Occ Compact".into(),
                        schedule_type: "Compact".into(),
                        equivalent_full_load_hours: None,
                    }),
                },
            ],
        }
    }

    fn fixture() -> Fixture {
        let mut fx = Fixture::new(Building {
            space_types: vec![office()],
            ..Default::default()
        });
        fx.targets = TargetTable::from_json_str(
            r#"[
                {"standard": "90.1-2013", "category": "space_load",
                 "criteria": {"space_type": "OpenOffice", "load": "lighting"}, "value": 0.98},
                {"standard": "90.1-2013", "category": "space_load",
                 "criteria": {"space_type": "OpenOffice", "load": "electric_equipment"}, "value": 0.5},
                {"standard": "90.1-2013", "category": "space_load",
                 "criteria": {"space_type": "OpenOffice", "load": "occupancy"}, "value": 5.0},
                {"standard": "90.1-2013", "category": "schedule_eflh",
                 "criteria": {"space_type": "OpenOffice", "load": "lighting"}, "value": 3000},
                {"standard": "90.1-2013", "category": "schedule_eflh",
                 "criteria": {"space_type": "OpenOffice", "load": "electric_equipment"}, "value": 4000},
                {"standard": "90.1-2013", "category": "schedule_eflh",
                 "criteria": {"space_type": "OpenOffice", "load": "occupancy"}, "value": 2500}
            ]"#,
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_internal_loads() {
        let flags = fixture().run(&InternalLoads);
        // 10.76 W/m^2 is 1.0 W/ft^2: lighting passes, plug load is double the target.
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("EPD of 1.00 (W/ft^2) for Office Space is more than 20% above"));
    }

    #[test]
    fn test_unknown_standards_type() {
        let mut fx = fixture();
        fx.building.space_types[0].standards_space_type = None;
        let flags = fx.run(&InternalLoads);
        assert_eq!(
            flags,
            vec!["Unexpected standards type for Office Space, can't validate internal loads.".to_string()]
        );
    }

    #[test]
    fn test_schedules() {
        let flags = fixture().run(&Schedules);
        assert_eq!(flags.len(), 3);
        assert_eq!(
            flags[0],
            "2,000 annual equivalent full load hours for Office Lighting Sched in Office Space is more than 20% below the typical value of 3,000 hours from the DOE Prototype building."
        );
        assert_eq!(flags[1], "Office Plugs in Office Space doesn't have a schedule assigned.");
        assert!(flags[2].starts_with("Occ Compact isn't a Ruleset or Constant schedule."));
    }

    #[test]
    fn test_plenum_and_empty_space_types_skipped() {
        let mut fx = fixture();
        fx.building.space_types[0].name = "Plenum".into();
        assert!(fx.run(&Schedules).is_empty());
    }
}
