//! Passive-house (PHIUS) regression targets and BC Energy Step Code metrics.

use tracing::debug;

use super::{MetricKey, MetricRecord, MetricsContext};
use crate::error::Result;
use crate::model::Building;
use crate::tables;
use crate::units::convert;
use crate::util::safe_div;

/// Share of conditioned floor area that must be dwelling units before unit
/// density is taken from the units rather than the whole floor.
const RESIDENTIAL_AREA_SHARE: f64 = 0.4;

const RESIDENTIAL_BUILDING_TYPES: [&str; 11] = [
    "Dormitory",
    "Hospital",
    "Hotel",
    "Motel",
    "Multi-unit residential",
    "Penitentiary",
    "Health care clinic",
    "Hotel/Motel",
    "Long-term care - dwelling units",
    "Long-term care - other",
    "Multi-unit residential building",
];

const RESIDENTIAL_SPACE_TYPES: [&str; 11] = [
    "Dormitory - living quarters",
    "Dwelling Unit(s)",
    "Hotel/Motel - rooms",
    "Hway lodging - rooms",
    "Guest room",
    "Dormitory living quarters",
    "Dwelling units general",
    "Dwelling units long-term",
    "Fire station sleeping quarters",
    "Health care facility patient room",
    "Health care facility recovery room",
];

/// Regression inputs, all in IP units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiusInputs {
    /// Exterior envelope area over conditioned floor area.
    pub envelope_to_floor: f64,
    /// Dwelling units per ft^2.
    pub unit_density: f64,
    pub cdd50: f64,
    pub hdd65: f64,
    pub dehumidification_degree_days: f64,
    /// Annual global horizontal irradiance, kWh/m^2.
    pub ghi: f64,
    /// Heating design temperature, F.
    pub heating_design_temp: f64,
    /// Cooling design temperature, F.
    pub cooling_design_temp: f64,
    /// Winter design-day irradiance, Btu/ft^2*h.
    pub heating_irradiance: f64,
    /// Summer design-day irradiance, Btu/ft^2*h.
    pub cooling_irradiance: f64,
    /// People per ft^2.
    pub occupancy: f64,
    /// Electricity price, $/kWh.
    pub electricity_price: f64,
}

/// Regression results in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiusTargets {
    pub heating_demand_kwh_per_m2: f64,
    pub cooling_demand_kwh_per_m2: f64,
    pub peak_heating_w_per_m2: f64,
    pub peak_cooling_w_per_m2: f64,
}

impl PhiusInputs {
    /// Annual heating demand, kBtu/ft^2.
    pub fn heating_demand(&self) -> f64 {
        let e = self.envelope_to_floor;
        let ud = self.unit_density;
        let h = self.hdd65;
        let g = self.ghi;
        let p = self.electricity_price;
        3.2606827206 + 1.1634499236 * e + 904.39163818 * ud + 0.000604853 * h - 0.001645777 * g
            - 11.87299596 * p
            + (e - 1.766).powi(2) * 0.8314860529
            + (e - 1.766) * (h - 5860.0833333) * 0.0002310823
            + (h - 5860.0833333).powi(2) * -5.736435e-8
            + (h - 5860.0833333) * (g - 1451.0633333) * -3.260379e-7
            + (e - 1.766) * (p + 0.2029193333) * -3.851052937
            + (h - 5860.0833333) * (p + 0.2029193333) * -0.001897043
    }

    /// Annual cooling demand, kBtu/ft^2.
    pub fn cooling_demand(&self) -> f64 {
        let e = self.envelope_to_floor;
        let ud = self.unit_density;
        let c = self.cdd50;
        let g = self.ghi;
        let d = self.dehumidification_degree_days;
        let p = self.electricity_price;
        -6.510791255 - 0.749993351 * e + 0.0004550801 * c + 0.004990109 * g + 7.9460878688 * d
            + (e - 1.766).powi(2) * 1.6367059356
            + (c - 4104.8333333).powi(2) * 8.6952014e-8
            + (e - 1.766) * (g - 1451.0633333) * 0.001671947
            + (c - 4104.8333333) * (g - 1451.0633333) * 0.0000013639
            + (ud - 0.0008646735) * (d - 0.3233057481) * 5547.7542211
            + (d - 0.3233057481) * (p - 0.2029193333) * -15.67511944
            + 1624.6144639 * ud
    }

    /// Peak heating load, Btu/ft^2*h.
    pub fn peak_heating(&self) -> f64 {
        let e = self.envelope_to_floor;
        let ud = self.unit_density;
        let h = self.hdd65;
        let t = self.heating_design_temp;
        let occ = self.occupancy;
        let p = self.electricity_price;
        4.6700403241 + 0.6774809481 * e + 239.08369574 * occ + 596.681543 * ud - 0.000177742 * h
            - 0.076727655 * t
            - 0.03316804 * self.heating_irradiance
            - 4.140193817 * p
            + (e - 1.766).powi(2) * 0.8449921713
            + (h - 5860.0833333).powi(2) * 2.8376386e-8
            + (e - 1.766) * (t - 14.7102) * -0.013821021
            + (ud - 0.0008646735) * (t - 14.7102) * -20.10551451
            + (h - 5860.0833333) * (t - 14.7102) * 5.1870203e-6
            + (t - 14.7102) * (p - 0.2029193333) * 0.1264922802
    }

    /// Peak cooling load, Btu/ft^2*h.
    pub fn peak_cooling(&self) -> f64 {
        let e = self.envelope_to_floor;
        let ud = self.unit_density;
        let c = self.cdd50;
        let t = self.cooling_design_temp;
        let occ = self.occupancy;
        -7.289806442 + 98.245977611 * occ + 236.93351876 * ud + 0.0967328928 * t
            + 0.010777725 * self.cooling_irradiance
            + (c - 4104.8333333).powi(2) * 1.7699655e-8
            + (c - 4104.8333333) * (t - 78.127) * 6.5268802e-6
            + (t - 78.127) * (e - 1.766) * 0.0165401721
            + (t - 78.127) * (occ - 0.0027218) * 8.0465528305
            + (c - 4104.8333333) * (e - 1.766) * 0.0000322288
            + (e - 1.766).powi(2) * 0.6579032913
    }

    pub fn targets(&self) -> Result<PhiusTargets> {
        Ok(PhiusTargets {
            heating_demand_kwh_per_m2: convert(self.heating_demand(), "kBtu/ft^2", "kWh/m^2")?,
            cooling_demand_kwh_per_m2: convert(self.cooling_demand(), "kBtu/ft^2", "kWh/m^2")?,
            peak_heating_w_per_m2: convert(self.peak_heating(), "Btu/ft^2*h", "W/m^2")?,
            peak_cooling_w_per_m2: convert(self.peak_cooling(), "Btu/ft^2*h", "W/m^2")?,
        })
    }

    /// Gather inputs from the model and earlier metrics. `None` when a
    /// required input is unavailable.
    pub fn gather(ctx: &MetricsContext<'_>, record: &MetricRecord) -> Result<Option<Self>> {
        let b = ctx.building;
        let w = &b.weather;
        let area_m2 = ctx.conditioned_area_m2();
        if area_m2 <= 0.0 {
            debug!("no conditioned area; skipping PHIUS regressions");
            return Ok(None);
        }
        let (Some(heat_c), Some(cool_c)) = (w.heating_design_temp_c, w.cooling_design_temp_c) else {
            debug!("design temperatures unavailable; skipping PHIUS regressions");
            return Ok(None);
        };
        let winter = design_day_irradiance(b, "WinterDesignDay", f64::min);
        let summer = design_day_irradiance(b, "SummerDesignDay", f64::max);
        let (Some(winter), Some(summer)) = (winter, summer) else {
            debug!("design days unavailable; skipping PHIUS regressions");
            return Ok(None);
        };
        let price_per_gj = record
            .number(&MetricKey::UtilityCost(super::Fuel::Electricity))
            .zip(record.number(&MetricKey::eui("electricity")))
            .and_then(|(cost, eui)| safe_div(cost, eui));
        let Some(price_per_gj) = price_per_gj else {
            debug!("electricity price unavailable; skipping PHIUS regressions");
            return Ok(None);
        };

        let people: f64 = b
            .space_types
            .iter()
            .map(|st| st.floor_area_m2 * st.people_per_m2.unwrap_or(0.0))
            .sum();

        Ok(Some(Self {
            envelope_to_floor: b.exterior_area_m2 / area_m2,
            unit_density: unit_density(b, convert(area_m2, "m^2", "ft^2")?)?,
            cdd50: w.cdd10 * 9.0 / 5.0,
            hdd65: w.hdd18 * 9.0 / 5.0,
            dehumidification_degree_days: w.dehumidification_degree_days,
            ghi: w.annual_ghi_kwh_per_m2,
            heating_design_temp: convert(heat_c, "C", "F")?,
            cooling_design_temp: convert(cool_c, "C", "F")?,
            heating_irradiance: convert(winter, "W/m^2", "Btu/ft^2*h")?,
            cooling_irradiance: convert(summer, "W/m^2", "Btu/ft^2*h")?,
            occupancy: convert(people / area_m2, "1/m^2", "1/ft^2")?,
            electricity_price: convert(price_per_gj, "$/GJ", "$/kWh")?,
        }))
    }
}

fn design_day_irradiance(b: &Building, day_type: &str, pick: fn(f64, f64) -> f64) -> Option<f64> {
    b.design_days
        .iter()
        .filter(|d| d.day_type == day_type)
        .map(|d| d.average_global_irradiance_w_per_m2)
        .reduce(pick)
}

fn is_dwelling(b: &Building, space: &crate::model::Space) -> bool {
    if !space.is_conditioned {
        return false;
    }
    let Some(space_type) = space.space_type.as_deref() else {
        return false;
    };
    let standards_type = b
        .space_type(space_type)
        .and_then(|st| st.standards_space_type.as_deref())
        .unwrap_or(space_type);
    let standards_type = standards_type.trim_start_matches("Space Function ").trim();
    if RESIDENTIAL_SPACE_TYPES.contains(&standards_type) {
        return true;
    }
    if !space_type.contains("WholeBuilding") {
        return false;
    }
    let building_type = space
        .standards_building_type
        .as_deref()
        .or(b.standards_building_type.as_deref())
        .unwrap_or("");
    let building_type = building_type.replace("building", "");
    RESIDENTIAL_BUILDING_TYPES.contains(&building_type.trim())
}

/// Dwelling units per ft^2 when dwellings make up enough of the floor,
/// otherwise one unit over the whole conditioned floor.
pub fn unit_density(b: &Building, conditioned_ft2: f64) -> Result<f64> {
    let mut units = 0.0;
    let mut dwelling_m2 = 0.0;
    for space in b.spaces.iter().filter(|s| is_dwelling(b, s)) {
        units += space.multiplier;
        dwelling_m2 += space.floor_area_m2 * space.multiplier;
    }
    let dwelling_ft2 = convert(dwelling_m2, "m^2", "ft^2")?;
    let share = safe_div(dwelling_ft2, conditioned_ft2).unwrap_or(0.0);
    if share >= RESIDENTIAL_AREA_SHARE && units > 0.0 {
        Ok(units / dwelling_ft2)
    } else {
        Ok(safe_div(1.0, conditioned_ft2).unwrap_or(0.0))
    }
}

pub fn phius_indicators(ctx: &MetricsContext<'_>, record: &MetricRecord) -> Result<MetricRecord> {
    let mut r = MetricRecord::new();
    let necb_heating_peak = record.number(&MetricKey::HeatingPeak);
    let necb_cooling_peak = record.number(&MetricKey::CoolingPeak);
    r.set(MetricKey::PeakHeatingLoadNecb, necb_heating_peak);
    r.set(MetricKey::PeakCoolingLoadNecb, necb_cooling_peak);

    let Some(inputs) = PhiusInputs::gather(ctx, record)? else {
        for key in [
            MetricKey::PhiusAnnualHeatingDemand,
            MetricKey::PhiusAnnualCoolingDemand,
            MetricKey::PhiusPeakHeatingLoad,
            MetricKey::PhiusPeakCoolingLoad,
            MetricKey::PhiusNecbMeetHeatingDemand,
            MetricKey::PhiusNecbMeetCoolingDemand,
            MetricKey::PhiusNecbMeetHeatingPeakLoad,
            MetricKey::PhiusNecbMeetCoolingPeakLoad,
        ] {
            r.set(key, None::<f64>);
        }
        return Ok(r);
    };
    let targets = inputs.targets()?;
    debug!(?inputs, ?targets, "PHIUS regressions");

    r.set(MetricKey::PhiusAnnualHeatingDemand, targets.heating_demand_kwh_per_m2);
    r.set(MetricKey::PhiusAnnualCoolingDemand, targets.cooling_demand_kwh_per_m2);
    r.set(MetricKey::PhiusPeakHeatingLoad, targets.peak_heating_w_per_m2);
    r.set(MetricKey::PhiusPeakCoolingLoad, targets.peak_cooling_w_per_m2);

    let to_kwh = |gj: Option<f64>| gj.map(|v| convert(v, "GJ/m^2", "kWh/m^2")).transpose();
    let necb_heating = to_kwh(record.number(&MetricKey::eui("heating")))?;
    let necb_cooling = to_kwh(record.number(&MetricKey::eui("cooling")))?;
    let meets = |necb: Option<f64>, phius: f64| necb.map(|n| n <= phius);
    let pairs = [
        (MetricKey::PhiusNecbMeetHeatingDemand, meets(necb_heating, targets.heating_demand_kwh_per_m2)),
        (MetricKey::PhiusNecbMeetCoolingDemand, meets(necb_cooling, targets.cooling_demand_kwh_per_m2)),
        (MetricKey::PhiusNecbMeetHeatingPeakLoad, meets(necb_heating_peak, targets.peak_heating_w_per_m2)),
        (MetricKey::PhiusNecbMeetCoolingPeakLoad, meets(necb_cooling_peak, targets.peak_cooling_w_per_m2)),
    ];
    for (key, meet) in pairs {
        match meet {
            Some(m) => r.set(key, m),
            None => r.set(key, None::<f64>),
        }
    }
    Ok(r)
}

/// Thermal energy demand intensity and mechanical energy use intensity, kWh/m^2.
pub fn bc_step_code(ctx: &MetricsContext<'_>, record: &MetricRecord) -> Result<MetricRecord> {
    let other = tables::energy_meters("Other");
    let transfer = |row: &str| ctx.store.value_f64(&other, row, "Annual Value", "GJ").unwrap_or(0.0);
    let heating_gj = transfer("Baseboard:EnergyTransfer") + transfer("HeatingCoils:EnergyTransfer");
    let heating_kwh = convert(heating_gj, "GJ", "kWh")?;

    let mut r = MetricRecord::new();
    r.set_ratio(MetricKey::BcStepCodeTedi, heating_kwh, ctx.conditioned_area_m2());

    let mechanical = ["heating", "cooling", "fans", "pumps", "water_systems"]
        .iter()
        .map(|name| record.number(&MetricKey::eui(name)))
        .sum::<Option<f64>>();
    let meui = mechanical.map(|gj| convert(gj, "GJ/m^2", "kWh/m^2")).transpose()?;
    r.set(MetricKey::BcStepCodeMeui, meui);
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::super::testing::MetricsFixture;
    use super::super::{Fuel, MetricValue};
    use super::*;
    use crate::model::{DesignDay, Space, SpaceType};

    fn reference_inputs() -> PhiusInputs {
        // Centre point of the regressions: every centred term vanishes.
        PhiusInputs {
            envelope_to_floor: 1.766,
            unit_density: 0.0008646735,
            cdd50: 4104.8333333,
            hdd65: 5860.0833333,
            dehumidification_degree_days: 0.3233057481,
            ghi: 1451.0633333,
            heating_design_temp: 14.7102,
            cooling_design_temp: 78.127,
            heating_irradiance: 0.0,
            cooling_irradiance: 0.0,
            occupancy: 0.0027218,
            electricity_price: 0.2029193333,
        }
    }

    #[test]
    fn test_cooling_peak_at_centre() {
        let i = reference_inputs();
        let expected = -7.289806442 + 98.245977611 * 0.0027218 + 236.93351876 * 0.0008646735 + 0.0967328928 * 78.127;
        assert!((i.peak_cooling() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_heating_demand_grows_with_degree_days() {
        let base = reference_inputs();
        let colder = PhiusInputs {
            hdd65: base.hdd65 + 1000.0,
            ..base
        };
        assert!(colder.heating_demand() > base.heating_demand());
        let t = base.targets().unwrap();
        assert!((t.heating_demand_kwh_per_m2 - base.heating_demand() * 3.15459074506).abs() < 1e-6);
    }

    #[test]
    fn test_unit_density() {
        let mut b = Building {
            space_types: vec![SpaceType {
                name: "Apt".into(),
                standards_space_type: Some("Dwelling Unit(s)".into()),
                ..Default::default()
            }],
            spaces: vec![
                Space {
                    name: "Unit 1".into(),
                    space_type: Some("Apt".into()),
                    floor_area_m2: 92.90304,
                    multiplier: 4.0,
                    ..Default::default()
                },
                Space {
                    name: "Corridor".into(),
                    floor_area_m2: 92.90304,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        // 4 units over 4000 ft^2 of a 5000 ft^2 floor
        let ud = unit_density(&b, 5000.0).unwrap();
        assert!((ud - 0.001).abs() < 1e-9);

        b.spaces[0].multiplier = 1.0;
        let ud = unit_density(&b, 5000.0).unwrap();
        assert!((ud - 1.0 / 5000.0).abs() < 1e-12);
    }

    #[test]
    fn test_phius_missing_inputs_not_calculated() {
        let fx = MetricsFixture::new(Building {
            conditioned_floor_area_m2: 100.0,
            ..Default::default()
        });
        let mut record = MetricRecord::new();
        record.set(MetricKey::HeatingPeak, 40.0);
        let r = phius_indicators(&fx.ctx(), &record).unwrap();
        assert_eq!(r.number(&MetricKey::PeakHeatingLoadNecb), Some(40.0));
        assert_eq!(r.get(&MetricKey::PhiusAnnualHeatingDemand), Some(&MetricValue::NotCalculated));
    }

    #[test]
    fn test_phius_with_inputs() {
        let mut fx = MetricsFixture::new(Building {
            conditioned_floor_area_m2: 1000.0,
            exterior_area_m2: 1766.0,
            design_days: vec![
                DesignDay {
                    name: "Winter".into(),
                    day_type: "WinterDesignDay".into(),
                    average_global_irradiance_w_per_m2: 0.0,
                },
                DesignDay {
                    name: "Summer".into(),
                    day_type: "SummerDesignDay".into(),
                    average_global_irradiance_w_per_m2: 400.0,
                },
            ],
            ..Default::default()
        });
        fx.building.weather.heating_design_temp_c = Some(-20.0);
        fx.building.weather.cooling_design_temp_c = Some(30.0);
        fx.building.weather.hdd18 = 4000.0;
        let mut record = MetricRecord::new();
        record.set(MetricKey::UtilityCost(Fuel::Electricity), 10.0);
        record.set(MetricKey::eui("electricity"), 0.5);
        record.set(MetricKey::eui("heating"), 0.0);
        record.set(MetricKey::eui("cooling"), 10.0);
        let r = phius_indicators(&fx.ctx(), &record).unwrap();
        assert!(r.number(&MetricKey::PhiusAnnualHeatingDemand).is_some());
        assert!(r.number(&MetricKey::PhiusPeakCoolingLoad).is_some());
        assert_eq!(r.text(&MetricKey::PhiusNecbMeetCoolingDemand), Some("False"));
        assert_eq!(r.get(&MetricKey::PhiusNecbMeetHeatingPeakLoad), Some(&MetricValue::NotCalculated));
    }

    #[test]
    fn test_bc_step_code() {
        let mut fx = MetricsFixture::new(Building {
            conditioned_floor_area_m2: 100.0,
            ..Default::default()
        });
        let other = tables::energy_meters("Other");
        fx.insert(&other, "Baseboard:EnergyTransfer", "Annual Value", "GJ", "18.00");
        fx.insert(&other, "HeatingCoils:EnergyTransfer", "Annual Value", "GJ", "18.00");
        let mut record = MetricRecord::new();
        for (name, gj) in [("heating", 0.2), ("cooling", 0.1), ("fans", 0.05), ("pumps", 0.05), ("water_systems", 0.0)] {
            record.set(MetricKey::eui(name), gj);
        }
        let r = bc_step_code(&fx.ctx(), &record).unwrap();
        assert!((r.number(&MetricKey::BcStepCodeTedi).unwrap() - 100.0).abs() < 1e-9);
        assert!((r.number(&MetricKey::BcStepCodeMeui).unwrap() - 111.111111111).abs() < 1e-6);
    }
}
