use std::collections::{BTreeMap, BTreeSet};

use crate::config::CheckCategories;
use crate::error::EvaluationError;
use crate::model::Surface;
use crate::targets::{CATEGORY_ENVELOPE_R_VALUE, CATEGORY_ENVELOPE_U_VALUE};
use crate::units::convert;
use crate::util::format_number;

use super::{Check, CheckOutcome, EvaluationContext};

const R_IP: &str = "ft^2*h*R/Btu";
const U_IP: &str = "Btu/ft^2*h*R";

/// `ExteriorWall`, `GroundContactFloor`, ... or `None` for interior surfaces.
fn envelope_class(surface: &Surface) -> Option<String> {
    let boundary = if surface.is_outdoor() {
        "Exterior"
    } else if surface.is_ground() {
        "GroundContact"
    } else {
        return None;
    };
    let kind = match surface.surface_type.as_str() {
        "Wall" => "Wall",
        "RoofCeiling" => "Roof",
        "Floor" => "Floor",
        _ => return None,
    };
    Some(format!("{}{}", boundary, kind))
}

fn sub_surface_class(sub_surface_type: &str) -> &'static str {
    match sub_surface_type {
        "Skylight" | "TubularDaylightDome" => "ExteriorSkylight",
        "Door" | "OverheadDoor" => "ExteriorDoor",
        _ => "ExteriorWindow",
    }
}

pub struct EnvelopeRValue;

impl EnvelopeRValue {
    fn target(&self, ctx: &EvaluationContext<'_>, category: &str, class: &str, missing: &mut BTreeSet<String>) -> Option<f64> {
        let target = ctx.targets.find(
            ctx.standard(),
            category,
            &[("surface_type", class), ("climate_zone", ctx.climate_zone())],
        );
        if target.is_none() {
            missing.insert(class.to_string());
        }
        target
    }
}

impl Check for EnvelopeRValue {
    fn name(&self) -> &'static str {
        "Envelope R-Value"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.envelope
    }

    fn description(&self, ctx: &EvaluationContext<'_>) -> String {
        format!(
            "Check envelope against {} reference constructions for the model's climate zone.",
            ctx.standard()
        )
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let band = ctx.config.tolerances.envelope;
        let mut missing_constructions: BTreeMap<&str, usize> = BTreeMap::new();
        let mut missing_targets = BTreeSet::new();
        let mut checked = BTreeSet::new();

        for surface in &ctx.building.surfaces {
            let class = match envelope_class(surface) {
                Some(c) => c,
                None => continue,
            };
            let space = surface.space.as_deref().unwrap_or("(no space)");

            match surface.construction.as_deref() {
                None => *missing_constructions.entry(space).or_default() += 1,
                Some(construction) if checked.insert((construction.to_string(), space.to_string())) => {
                    let conductance = match surface.conductance_w_per_m2_k {
                        Some(u) if u > 0.0 => u,
                        _ => {
                            flags.push(format!("Can't calculate R value for {}.", construction));
                            continue;
                        }
                    };
                    let target = match self.target(ctx, CATEGORY_ENVELOPE_R_VALUE, &class, &mut missing_targets) {
                        Some(t) => t,
                        None => continue,
                    };
                    let r_ip = convert(1.0 / conductance, "m^2*K/W", R_IP).map_err(EvaluationError::from)?;
                    if let Some(dev) = band.evaluate(r_ip, target) {
                        flags.push(format!(
                            "R value of {} ({}) for {} in {} is {} the expected value of {} ({}) for {} in {}.",
                            format_number(r_ip, 2),
                            R_IP,
                            construction,
                            space,
                            dev.phrase(),
                            format_number(target, 2),
                            R_IP,
                            class,
                            ctx.standard()
                        ));
                    }
                }
                Some(_) => {}
            }

            if !surface.is_outdoor() {
                continue;
            }
            for sub in &surface.sub_surfaces {
                let sub_class = sub_surface_class(&sub.sub_surface_type);
                let construction = match sub.construction.as_deref() {
                    Some(c) => c,
                    None => {
                        *missing_constructions.entry(space).or_default() += 1;
                        continue;
                    }
                };
                if !checked.insert((construction.to_string(), space.to_string())) {
                    continue;
                }
                let conductance = match sub.conductance_w_per_m2_k {
                    Some(u) if u > 0.0 => u,
                    _ => {
                        flags.push(format!("Can't calculate U value for {}.", construction));
                        continue;
                    }
                };
                let target = match self.target(ctx, CATEGORY_ENVELOPE_U_VALUE, sub_class, &mut missing_targets) {
                    Some(t) => t,
                    None => continue,
                };
                let u_ip = convert(conductance, "W/m^2*K", U_IP)?;
                if let Some(dev) = band.evaluate(u_ip, target) {
                    flags.push(format!(
                        "U value of {} ({}) for {} in {} is {} the expected value of {} ({}) for {} in {}.",
                        format_number(u_ip, 3),
                        U_IP,
                        construction,
                        space,
                        dev.phrase(),
                        format_number(target, 3),
                        U_IP,
                        sub_class,
                        ctx.standard()
                    ));
                }
            }
        }

        for (space, count) in missing_constructions {
            flags.push(format!(
                "{} surfaces are missing constructions in {}. Surfaces can't be checked.",
                count, space
            ));
        }
        for class in missing_targets {
            flags.push(format!(
                "Didn't find target construction values for {} in climate zone {}.",
                class,
                ctx.climate_zone()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::model::{Building, SubSurface};
    use crate::targets::TargetTable;

    fn wall(name: &str, construction: Option<&str>, u: f64) -> Surface {
        Surface {
            name: name.into(),
            space: Some("Office".into()),
            surface_type: "Wall".into(),
            boundary_condition: "Outdoors".into(),
            net_area_m2: 10.0,
            construction: construction.map(String::from),
            conductance_w_per_m2_k: Some(u),
            ..Default::default()
        }
    }

    fn fixture(surfaces: Vec<Surface>) -> Fixture {
        let mut fx = Fixture::new(Building {
            climate_zone: Some("5A".into()),
            surfaces,
            ..Default::default()
        });
        fx.targets = TargetTable::from_json_str(
            r#"[
                {"standard": "90.1-2013", "category": "envelope_r_value",
                 "criteria": {"surface_type": "ExteriorWall", "climate_zone": "5A"}, "value": 15.0},
                {"standard": "90.1-2013", "category": "envelope_u_value",
                 "criteria": {"surface_type": "ExteriorWindow", "climate_zone": "5A"}, "value": 0.42}
            ]"#,
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_r_value_in_range_passes() {
        // R-15 IP is about 2.64 m^2*K/W
        let fx = fixture(vec![wall("W1", Some("Wall R15"), 1.0 / 2.64)]);
        assert!(fx.run(&EnvelopeRValue).is_empty());
    }

    #[test]
    fn test_low_r_value_flagged_once_per_construction_and_space() {
        let fx = fixture(vec![
            wall("W1", Some("Thin Wall"), 1.0),
            wall("W2", Some("Thin Wall"), 1.0),
        ]);
        let flags = fx.run(&EnvelopeRValue);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("R value of 5.68 (ft^2*h*R/Btu) for Thin Wall in Office is more than 20% below"));
    }

    #[test]
    fn test_missing_constructions_counted_per_space() {
        let fx = fixture(vec![wall("W1", None, 1.0), wall("W2", None, 1.0)]);
        let flags = fx.run(&EnvelopeRValue);
        assert_eq!(flags, vec!["2 surfaces are missing constructions in Office. Surfaces can't be checked.".to_string()]);
    }

    #[test]
    fn test_window_u_value() {
        let mut w = wall("W1", Some("Wall R15"), 1.0 / 2.64);
        w.sub_surfaces.push(SubSurface {
            name: "Win".into(),
            sub_surface_type: "FixedWindow".into(),
            construction: Some("Single Pane".into()),
            conductance_w_per_m2_k: Some(5.8),
            ..Default::default()
        });
        let fx = fixture(vec![w]);
        let flags = fx.run(&EnvelopeRValue);
        assert_eq!(flags.len(), 1);
        assert!(flags[0].starts_with("U value of 1.021"));
    }

    #[test]
    fn test_missing_target_reported_once() {
        let mut roof = wall("R1", Some("Roof"), 0.2);
        roof.surface_type = "RoofCeiling".into();
        let fx = fixture(vec![roof]);
        let flags = fx.run(&EnvelopeRValue);
        assert_eq!(
            flags,
            vec!["Didn't find target construction values for ExteriorRoof in climate zone 5A.".to_string()]
        );
    }
}
