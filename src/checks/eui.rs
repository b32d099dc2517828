use crate::config::CheckCategories;
use crate::error::EvaluationError;
use crate::materialize::materialize;
use crate::tables;
use crate::targets::{CATEGORY_END_USE_EUI, CATEGORY_EUI};
use crate::units::convert;
use crate::util::format_number;

use super::{Check, CheckOutcome, EvaluationContext};

/// Model areas closer than this to the simulation's reported area agree.
const AREA_MATCH_TOLERANCE_M2: f64 = 0.1;

/// End uses whose value and target both fall under this are not compared.
const NEGLIGIBLE_END_USE_GJ_PER_M2: f64 = 0.05;

fn to_kbtu_per_ft2(gj_per_m2: f64) -> Result<f64, EvaluationError> {
    Ok(convert(gj_per_m2, "GJ/m^2", "kBtu/ft^2")?)
}

/// Simulation-reported building area, checked against the model.
/// `None` means a flag was pushed and the caller should stop.
fn checked_area(ctx: &EvaluationContext<'_>, flags: &mut Vec<String>, what: &str) -> Option<f64> {
    let reported = match ctx.report_value(&tables::building_area(), "Total Building Area", "Area", "m2") {
        Some(a) => a,
        None => {
            flags.push(format!("Can't calculate {}, query for building area failed.", what));
            return None;
        }
    };
    let model = ctx.building.floor_area_m2;
    if (reported - model).abs() >= AREA_MATCH_TOLERANCE_M2 {
        flags.push(format!(
            "Simulation reported area is {} (m^2). Model reported area is {} (m^2).",
            format_number(reported, 2),
            format_number(model, 2)
        ));
    }
    if reported <= 0.0 {
        flags.push(format!("Can't calculate model {}, building doesn't have any floor area.", what));
        return None;
    }
    Some(reported)
}

pub struct EuiReasonableness;

impl Check for EuiReasonableness {
    fn name(&self) -> &'static str {
        "EUI Reasonableness"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.energy
    }

    fn description(&self, ctx: &EvaluationContext<'_>) -> String {
        format!("Check EUI for model against {} DOE prototype buildings.", ctx.standard())
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let area = match checked_area(ctx, flags, "EUI") {
            Some(a) => a,
            None => return Ok(()),
        };
        let net_site = ctx
            .report_value(&tables::site_and_source_energy(), "Net Site Energy", "Total Energy", "GJ")
            .ok_or_else(|| EvaluationError::missing("net site energy not reported"))?;
        let eui = net_site / area;

        let target = ctx.targets.find(
            ctx.standard(),
            CATEGORY_EUI,
            &[("building_type", ctx.building_type()), ("climate_zone", ctx.climate_zone())],
        );
        let target = match target {
            Some(t) => t,
            None => {
                flags.push(
                    "Can't calculate target EUI. Make sure model has expected climate zone and building type."
                        .to_string(),
                );
                return Ok(());
            }
        };

        if let Some(dev) = ctx.config.tolerances.eui.evaluate(eui, target) {
            flags.push(format!(
                "Model EUI of {} (kBtu/ft^2) is {} the expected EUI of {} (kBtu/ft^2) for {}.",
                format_number(to_kbtu_per_ft2(eui)?, 2),
                dev.phrase(),
                format_number(to_kbtu_per_ft2(target)?, 2),
                ctx.standard()
            ));
        }
        Ok(())
    }
}

pub struct EndUseByCategory;

impl Check for EndUseByCategory {
    fn name(&self) -> &'static str {
        "End Use by Category"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.energy
    }

    fn description(&self, ctx: &EvaluationContext<'_>) -> String {
        format!("Check end use by category against {} DOE prototype buildings.", ctx.standard())
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let area = match checked_area(ctx, flags, "EUI") {
            Some(a) => a,
            None => return Ok(()),
        };
        let end_uses = materialize(ctx.store, &tables::end_uses());
        if end_uses.rows.is_empty() {
            return Err(EvaluationError::missing("end use table not reported"));
        }

        let mut compared = 0;
        for row in end_uses.rows.iter().filter(|r| !tables::is_summary_row(&r.name)) {
            if row.name == "Exterior Equipment" {
                continue;
            }
            let target = ctx.targets.find(
                ctx.standard(),
                CATEGORY_END_USE_EUI,
                &[
                    ("building_type", ctx.building_type()),
                    ("climate_zone", ctx.climate_zone()),
                    ("end_use", row.name.as_str()),
                ],
            );
            let target = match target {
                Some(t) => t,
                None => continue,
            };
            compared += 1;

            let actual = row.sum_with_suffix("_gj") / area;
            if matches!(row.name.as_str(), "Heat Recovery" | "Pumps")
                && actual < NEGLIGIBLE_END_USE_GJ_PER_M2
                && target < NEGLIGIBLE_END_USE_GJ_PER_M2
            {
                continue;
            }
            if let Some(dev) = ctx.config.tolerances.end_use.evaluate(actual, target) {
                flags.push(format!(
                    "{} EUI of {} (kBtu/ft^2) is {} the expected {} EUI of {} (kBtu/ft^2) for {}.",
                    row.name,
                    format_number(to_kbtu_per_ft2(actual)?, 2),
                    dev.phrase(),
                    row.name,
                    format_number(to_kbtu_per_ft2(target)?, 2),
                    ctx.standard()
                ));
            }
        }

        if compared == 0 {
            flags.push(
                "Can't calculate target end use EUIs. Make sure model has expected climate zone and building type."
                    .to_string(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::model::Building;
    use crate::store::cell;
    use crate::targets::TargetTable;

    fn fixture(net_site_gj: &str) -> Fixture {
        let building = Building {
            floor_area_m2: 1000.0,
            standards_building_type: Some("SmallOffice".into()),
            climate_zone: Some("5A".into()),
            ..Default::default()
        };
        let mut fx = Fixture::new(building);
        fx.store
            .insert(cell(&tables::building_area(), "Total Building Area", "Area", "m2", "1000.00"));
        fx.store.insert(cell(
            &tables::site_and_source_energy(),
            "Net Site Energy",
            "Total Energy",
            "GJ",
            net_site_gj,
        ));
        fx.store
            .insert(cell(&tables::end_uses(), "Heating", "Natural Gas", "GJ", "300.00"));
        fx.store
            .insert(cell(&tables::end_uses(), "Pumps", "Electricity", "GJ", "1.00"));
        fx.store
            .insert(cell(&tables::end_uses(), "Total End Uses", "Electricity", "GJ", "9999.00"));
        fx.targets = TargetTable::from_json_str(
            r#"[
                {"standard": "90.1-2013", "category": "eui",
                 "criteria": {"building_type": "SmallOffice", "climate_zone": "5A"}, "value": 0.5},
                {"standard": "90.1-2013", "category": "end_use_eui",
                 "criteria": {"building_type": "SmallOffice", "climate_zone": "5A", "end_use": "Heating"}, "value": 0.2},
                {"standard": "90.1-2013", "category": "end_use_eui",
                 "criteria": {"building_type": "SmallOffice", "climate_zone": "5A", "end_use": "Pumps"}, "value": 0.01}
            ]"#,
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_eui_within_tolerance() {
        let fx = fixture("520.00");
        assert!(fx.run(&EuiReasonableness).is_empty());
    }

    #[test]
    fn test_eui_below_tolerance() {
        let fx = fixture("400.00");
        let flags = fx.run(&EuiReasonableness);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].contains("more than 10% below"), "{}", flags[0]);
    }

    #[test]
    fn test_missing_target_is_flagged() {
        let mut fx = fixture("500.00");
        fx.building.climate_zone = Some("7".into());
        let flags = fx.run(&EuiReasonableness);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("Can't calculate target EUI"));
    }

    #[test]
    fn test_area_mismatch_and_missing_area() {
        let mut fx = fixture("500.00");
        fx.building.floor_area_m2 = 900.0;
        let flags = fx.run(&EuiReasonableness);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("Simulation reported area is 1,000.00"));

        let fx = Fixture::new(Building::default());
        let flags = fx.run(&EuiReasonableness);
        assert_eq!(flags, vec!["Can't calculate EUI, query for building area failed.".to_string()]);
    }

    #[test]
    fn test_end_uses_compared_and_small_pumps_skipped() {
        let fx = fixture("500.00");
        let flags = fx.run(&EndUseByCategory);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("Heating EUI of"));
        assert!(flags[0].contains("more than 20% above"));
    }
}
