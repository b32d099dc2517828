use crate::config::CheckCategories;

use super::{Check, CheckOutcome, EvaluationContext};

/// File name of a weather file path or URL.
fn epw_name(file: &str) -> &str {
    file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file)
}

/// `ASHRAE 169-2013-5A` -> `5A`; bare zones pass through.
fn ashrae_zone(value: &str) -> &str {
    value.rsplit('-').next().unwrap_or(value).trim()
}

fn design_day_names<'b>(ctx: &EvaluationContext<'b>, day_type: &str) -> Vec<&'b str> {
    ctx.building
        .design_days
        .iter()
        .filter(|d| d.day_type == day_type)
        .map(|d| d.name.as_str())
        .collect()
}

pub struct WeatherFiles;

impl Check for WeatherFiles {
    fn name(&self) -> &'static str {
        "Weather Files"
    }

    fn category<'c>(&self, categories: &'c CheckCategories) -> &'c str {
        &categories.energy
    }

    fn description(&self, _ctx: &EvaluationContext<'_>) -> String {
        "Check weather file, design days, and climate zone against the list of allowable options.".to_string()
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>, flags: &mut Vec<String>) -> CheckOutcome {
        let options = &ctx.config.weather_files;
        if options.is_empty() {
            flags.push("No allowable weather files are configured, cannot check the weather file.".to_string());
            return Ok(());
        }
        let epw = epw_name(&ctx.building.weather.file);

        let valid_zones: Vec<&str> = match options.get(epw) {
            Some(option) => {
                let summer = design_day_names(ctx, "SummerDesignDay");
                let winter = design_day_names(ctx, "WinterDesignDay");
                for (season, required, present) in [("summer", &option.summer, &summer), ("winter", &option.winter, &winter)] {
                    if !required.is_empty() && !required.iter().any(|r| present.contains(&r.as_str())) {
                        flags.push(format!("Didn't find any of the expected {} design days for {}", season, epw));
                    }
                }
                vec![option.climate_zone.as_str()]
            }
            None => {
                flags.push(format!("{} is not a an expected weather file.", epw));
                flags.push("Model doesn't have expected epw file, as a result can't validate design days.".to_string());
                let mut zones: Vec<&str> = Vec::new();
                for option in options.values() {
                    if !zones.contains(&option.climate_zone.as_str()) {
                        zones.push(&option.climate_zone);
                    }
                }
                zones
            }
        };

        let expected = valid_zones.join(",");
        match ctx.building.climate_zone.as_deref().map(ashrae_zone).filter(|z| !z.is_empty()) {
            None => flags.push(format!(
                "The model's ASHRAE climate zone has not been defined. Expected climate zone was {}.",
                expected
            )),
            Some(zone) if !valid_zones.contains(&zone) => flags.push(format!(
                "The model's ASHRAE climate zone was {}. Expected climate zone was {}.",
                zone, expected
            )),
            Some(_) => {}
        }
        Ok(())
    }
}
