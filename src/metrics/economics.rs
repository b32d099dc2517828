//! Utility costs, greenhouse-gas intensity, capital costs and net present value.
//!
//! Prices come from a CSV with one row per `(building_type, province,
//! fuel_type)` and one column per year, in $/GJ.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{MetricKey, MetricRecord, MetricsContext};
use crate::error::{ReportError, Result};
use crate::model::CostResult;
use crate::tables;
use crate::units::convert;
use crate::util::{parse_f64_safe, safe_div};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fuel {
    NaturalGas,
    Electricity,
    Oil,
}

/// Meter that reports a fuel's annual consumption.
struct Meter {
    table_suffix: &'static str,
    row: &'static str,
    column: &'static str,
}

impl Fuel {
    pub const ALL: [Fuel; 3] = [Fuel::NaturalGas, Fuel::Electricity, Fuel::Oil];

    /// `fuel_type` value in the price dataset.
    pub fn price_name(&self) -> &'static str {
        match self {
            Fuel::NaturalGas => "Natural Gas",
            Fuel::Electricity => "Electricity",
            Fuel::Oil => "Oil",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Fuel::NaturalGas => "natural_gas",
            Fuel::Electricity => "electricity",
            Fuel::Oil => "oil",
        }
    }

    /// Fuel name used by the emission factor table.
    pub fn emission_name(&self) -> &'static str {
        match self {
            Fuel::NaturalGas => "NaturalGas",
            Fuel::Electricity => "Electricity",
            Fuel::Oil => "FuelOilNo2",
        }
    }

    fn meter(&self) -> Meter {
        match self {
            Fuel::NaturalGas => Meter {
                table_suffix: "Natural Gas",
                row: "NaturalGas:Facility",
                column: "Natural Gas Annual Value",
            },
            Fuel::Electricity => Meter {
                table_suffix: "Electricity",
                row: "Electricity:Facility",
                column: "Electricity Annual Value",
            },
            Fuel::Oil => Meter {
                table_suffix: "Other",
                row: "FuelOilNo2:Facility",
                column: "Annual Value",
            },
        }
    }
}

const PROVINCES: [(&str, &str); 13] = [
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

/// Province abbreviation for either an abbreviation or a full name.
pub fn province_abbreviation(value: &str) -> Option<&'static str> {
    let value = value.trim();
    PROVINCES
        .iter()
        .find(|(abbr, name)| abbr.eq_ignore_ascii_case(value) || name.eq_ignore_ascii_case(value))
        .map(|(abbr, _)| *abbr)
}

pub fn province_name(abbreviation: &str) -> Option<&'static str> {
    PROVINCES
        .iter()
        .find(|(abbr, _)| *abbr == abbreviation)
        .map(|(_, name)| *name)
}

/// Emission factor in kg CO2e per MBtu.
fn ghg_kg_per_mbtu(province: &str, fuel: &str) -> Option<f64> {
    let factor = match (fuel, province) {
        ("FuelOilNo2", _) => 75.13,
        ("Propane", _) => 64.25,
        ("NaturalGas", "AB") => 53.24,
        ("NaturalGas", "BC") => 53.19,
        ("NaturalGas", "MB") => 52.09,
        ("NaturalGas", "ON") => 52.14,
        ("NaturalGas", "QC") => 52.12,
        ("NaturalGas", "SK") => 50.53,
        ("NaturalGas", "NB" | "NL" | "NT" | "NS" | "NU" | "PE" | "YT") => 52.50,
        ("Electricity", "AB") => 202.23,
        ("Electricity", "BC") => 3.84,
        ("Electricity", "MB") => 0.41,
        ("Electricity", "NB") => 84.99,
        ("Electricity", "NL") => 7.91,
        ("Electricity", "NT") => 46.89,
        ("Electricity", "NS") => 216.88,
        ("Electricity", "NU") => 260.84,
        ("Electricity", "ON") => 8.79,
        ("Electricity", "PE") => 84.99,
        ("Electricity", "QC") => 0.47,
        ("Electricity", "SK") => 219.81,
        ("Electricity", "YT") => 23.15,
        _ => return None,
    };
    Some(factor)
}

/// Emission factor in kg CO2e per GJ for a province abbreviation and an
/// emission fuel name (`NaturalGas`, `Electricity`, `FuelOilNo2`, `Propane`).
pub fn ghg_kg_per_gj(province: &str, fuel: &str) -> Result<f64> {
    let per_mbtu = ghg_kg_per_mbtu(province, fuel).ok_or_else(|| {
        ReportError::MissingPrerequisite(format!("no emission factor for {} in {}", fuel, province))
    })?;
    // kg/MBtu -> kg/GJ
    Ok(per_mbtu / convert(1.0, "MBtu", "GJ")?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub building_type: String,
    pub province: String,
    pub fuel_type: String,
    pub prices: BTreeMap<i32, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
    years: Vec<i32>,
}

const KEY_COLUMNS: [&str; 3] = ["building_type", "province", "fuel_type"];

impl PriceTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        info!(path = %path.as_ref().display(), rows = table.len(), "loaded price table");
        Ok(table)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ReportError::InvalidInput(format!("price table has no '{}' column", name)))
        };
        let (bt_idx, prov_idx, fuel_idx) = (position(KEY_COLUMNS[0])?, position(KEY_COLUMNS[1])?, position(KEY_COLUMNS[2])?);
        let year_columns: Vec<(usize, i32)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !KEY_COLUMNS.contains(&h.trim()))
            .filter_map(|(i, h)| h.trim().parse::<i32>().ok().map(|y| (i, y)))
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            let prices = year_columns
                .iter()
                .filter_map(|&(i, year)| parse_f64_safe(record.get(i)).map(|p| (year, p)))
                .collect();
            rows.push(PriceRow {
                building_type: field(bt_idx),
                province: field(prov_idx),
                fuel_type: field(fuel_idx),
                prices,
            });
        }

        let mut years: Vec<i32> = year_columns.into_iter().map(|(_, y)| y).collect();
        years.sort_unstable();
        Ok(Self { rows, years })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest year column in the dataset.
    pub fn max_year(&self) -> Option<i32> {
        self.years.last().copied()
    }

    pub fn find(&self, building_type: &str, province: &str, fuel: Fuel) -> Option<&PriceRow> {
        self.rows.iter().find(|r| {
            r.building_type == building_type && r.province == province && r.fuel_type == fuel.price_name()
        })
    }

    /// Price in $/GJ; absent rows or years are an error.
    pub fn price(&self, building_type: &str, province: &str, fuel: Fuel, year: i32) -> Result<f64> {
        self.find(building_type, province, fuel)
            .and_then(|r| r.prices.get(&year).copied())
            .ok_or_else(|| ReportError::MissingPrice {
                fuel: fuel.price_name().to_string(),
                province: province.to_string(),
                year,
            })
    }
}

/// Province of the weather file, as `(abbreviation, full name)`.
fn weather_province(ctx: &MetricsContext<'_>) -> Result<(&'static str, &'static str)> {
    let raw = &ctx.building.weather.state_province_region;
    let abbr = province_abbreviation(raw)
        .ok_or_else(|| ReportError::MissingPrerequisite(format!("unknown province '{}'", raw)))?;
    let name = province_name(abbr).unwrap_or(abbr);
    Ok((abbr, name))
}

pub fn costing_data(ctx: &MetricsContext<'_>, costs: &CostResult) -> MetricRecord {
    let area = ctx.conditioned_area_m2();
    let t = &costs.totals;
    let mut r = MetricRecord::new();
    r.set(MetricKey::CostRsMeansProv, costs.rs_means_prov.as_str());
    r.set(MetricKey::CostRsMeansCity, costs.rs_means_city.as_str());
    let items = [
        ("envelope", t.envelope),
        ("thermal_bridging", t.thermal_bridging),
        ("lighting", t.lighting),
        ("heating_and_cooling", t.heating_and_cooling),
        ("shw", t.shw),
        ("ventilation", t.ventilation),
        ("renewables", t.renewables),
    ];
    for (item, cost) in items {
        r.set_ratio(MetricKey::CostEquipment(item), cost, area);
    }
    r.set_ratio(MetricKey::CostEquipmentTotal, t.grand_total, area);
    r
}

/// Annual utility cost and emissions per m^2, priced at the configured year.
pub fn utility(ctx: &MetricsContext<'_>) -> Result<MetricRecord> {
    let (abbr, province) = weather_province(ctx)?;
    let building_type = ctx.config.building_type_for_prices.as_str();
    let year = ctx.config.utility_price_year;
    let area = ctx.conditioned_area_m2();

    let mut r = MetricRecord::new();
    let mut cost_total = Some(0.0);
    let mut ghg_total = Some(0.0);
    for fuel in Fuel::ALL {
        let meter = fuel.meter();
        let gj = ctx
            .store
            .value_f64(&tables::energy_meters(meter.table_suffix), meter.row, meter.column, "GJ")
            .unwrap_or(0.0);
        let price = ctx.prices.price(building_type, province, fuel, year)?;
        let factor = ghg_kg_per_gj(abbr, fuel.emission_name())?;

        let cost = safe_div(gj * price, area);
        let ghg = safe_div(gj * factor, area);
        cost_total = cost_total.zip(cost).map(|(t, c)| t + c);
        ghg_total = ghg_total.zip(ghg).map(|(t, g)| t + g);
        r.set(MetricKey::UtilityCost(fuel), cost);
        r.set(MetricKey::UtilityGhg(fuel), ghg);
        debug!(fuel = fuel.price_name(), gj, price, factor, "utility metrics");
    }
    r.set(MetricKey::UtilityCostTotal, cost_total);
    r.set(MetricKey::UtilityGhgTotal, ghg_total);
    Ok(r)
}

/// Sum of `eui * price[i] / (1 + rate)^(i + 1)`; the first price is
/// discounted by one period.
pub fn discounted_sum(eui: f64, prices: &[f64], rate: f64) -> f64 {
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| eui * price / (1.0 + rate).powi(i as i32 + 1))
        .sum()
}

/// Capital cost plus discounted energy cost per m^2 over the configured
/// horizon. The end year is clamped to the last year of the price dataset.
pub fn net_present_value(ctx: &MetricsContext<'_>, record: &MetricRecord) -> Result<MetricRecord> {
    let (_, province) = weather_province(ctx)?;
    let building_type = ctx.config.building_type_for_prices.as_str();
    let params = ctx.config.npv.resolve();
    let year_max = ctx
        .prices
        .max_year()
        .ok_or_else(|| ReportError::MissingPrerequisite("price table has no year columns".to_string()))?;
    let end_year = if params.end_year > year_max {
        warn!(
            requested = params.end_year,
            year_max, "NPV end year is past the last price year; clamping"
        );
        year_max
    } else {
        params.end_year
    };

    let mut r = MetricRecord::new();
    if params.start_year > end_year {
        warn!(
            start_year = params.start_year,
            end_year, "NPV start year is after the last usable price year; NPV not calculated"
        );
        for fuel in [Fuel::Electricity, Fuel::NaturalGas, Fuel::Oil] {
            r.set(MetricKey::Npv(fuel), None::<f64>);
        }
        r.set(MetricKey::NpvTotal, None::<f64>);
        return Ok(r);
    }

    let euis = [
        (
            Fuel::Electricity,
            record
                .number(&MetricKey::ElectricityNetOfGeneration)
                .map(|e| e.max(0.0)),
        ),
        (Fuel::NaturalGas, record.number(&MetricKey::eui("natural_gas"))),
        (Fuel::Oil, record.number(&MetricKey::eui("additional_fuel"))),
    ];

    let mut total = record.number(&MetricKey::CostEquipmentTotal);
    for (fuel, eui) in euis {
        let npv = match eui {
            Some(e) if e == 0.0 => Some(0.0),
            Some(e) => {
                let prices = (params.start_year..=end_year)
                    .map(|year| ctx.prices.price(building_type, province, fuel, year))
                    .collect::<Result<Vec<_>>>()?;
                Some(discounted_sum(e, &prices, params.discount_rate))
            }
            None => None,
        };
        total = total.zip(npv).map(|(t, n)| t + n);
        r.set(MetricKey::Npv(fuel), npv);
    }
    r.set(MetricKey::NpvTotal, total);
    info!(
        start_year = params.start_year,
        end_year,
        discount_rate = params.discount_rate,
        "computed net present value"
    );
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{sample_prices, MetricsFixture};
    use super::super::MetricValue;
    use super::*;
    use crate::model::{Building, CostTotals};

    #[test]
    fn test_price_table_parse() {
        let prices = sample_prices();
        assert_eq!(prices.len(), 3);
        assert_eq!(prices.max_year(), Some(2024));
        assert_eq!(prices.price("Commercial", "Ontario", Fuel::Electricity, 2022).unwrap(), 30.0);
        let err = prices.price("Commercial", "Ontario", Fuel::Oil, 2030).unwrap_err();
        assert!(matches!(err, ReportError::MissingPrice { year: 2030, .. }));
        assert!(PriceTable::from_reader("province,2021\nON,1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_province_lookup() {
        assert_eq!(province_abbreviation("ON"), Some("ON"));
        assert_eq!(province_abbreviation("British Columbia"), Some("BC"));
        assert_eq!(province_abbreviation("Texas"), None);
        assert_eq!(province_name("NL"), Some("Newfoundland and Labrador"));
    }

    #[test]
    fn test_ghg_factors() {
        let on = ghg_kg_per_gj("ON", "Electricity").unwrap();
        assert!((on - 8.79 / 1.05505585262).abs() < 1e-9);
        assert!((ghg_kg_per_gj("YT", "NaturalGas").unwrap() - 52.50 / 1.05505585262).abs() < 1e-9);
        assert!(ghg_kg_per_gj("ON", "Coal").is_err());
        assert!(ghg_kg_per_gj("WA", "Electricity").is_err());
    }

    #[test]
    fn test_discounted_sum() {
        assert!((discounted_sum(1.0, &[10.0, 10.0], 0.0) - 20.0).abs() < 1e-12);
        let v = discounted_sum(2.0, &[11.0], 0.1);
        assert!((v - 20.0).abs() < 1e-9);
        assert_eq!(discounted_sum(5.0, &[], 0.03), 0.0);
        assert!(discounted_sum(1.0, &[10.0; 20], 0.05) < discounted_sum(1.0, &[10.0; 20], 0.03));
    }

    fn fixture() -> MetricsFixture {
        let mut fx = MetricsFixture::new(Building {
            conditioned_floor_area_m2: 100.0,
            ..Default::default()
        });
        fx.building.weather.state_province_region = "ON".into();
        fx.prices = sample_prices();
        fx.config.utility_price_year = 2022;
        fx
    }

    #[test]
    fn test_utility_costs_and_ghg() {
        let mut fx = fixture();
        fx.insert(
            &tables::energy_meters("Electricity"),
            "Electricity:Facility",
            "Electricity Annual Value",
            "GJ",
            "100.00",
        );
        fx.insert(
            &tables::energy_meters("Natural Gas"),
            "NaturalGas:Facility",
            "Natural Gas Annual Value",
            "GJ",
            "50.00",
        );
        let r = utility(&fx.ctx()).unwrap();
        assert_eq!(r.number(&MetricKey::UtilityCost(Fuel::Electricity)), Some(30.0));
        assert_eq!(r.number(&MetricKey::UtilityCost(Fuel::NaturalGas)), Some(5.0));
        assert_eq!(r.number(&MetricKey::UtilityCost(Fuel::Oil)), Some(0.0));
        assert_eq!(r.number(&MetricKey::UtilityCostTotal), Some(35.0));
        let ghg = r.number(&MetricKey::UtilityGhgTotal).unwrap();
        assert!(ghg > 0.0);

        fx.building.weather.state_province_region = "Nowhere".into();
        assert!(utility(&fx.ctx()).is_err());
    }

    #[test]
    fn test_costing_data() {
        let fx = fixture();
        let costs = CostResult {
            rs_means_prov: "Ontario".into(),
            rs_means_city: "Toronto".into(),
            totals: CostTotals {
                envelope: 1000.0,
                grand_total: 5000.0,
                ..Default::default()
            },
        };
        let r = costing_data(&fx.ctx(), &costs);
        assert_eq!(r.number(&MetricKey::CostEquipment("envelope")), Some(10.0));
        assert_eq!(r.number(&MetricKey::CostEquipmentTotal), Some(50.0));
        assert_eq!(r.text(&MetricKey::CostRsMeansCity), Some("Toronto"));
    }

    #[test]
    fn test_npv_clamps_end_year_and_sums_fuels() {
        let mut fx = fixture();
        fx.config.npv.start_year = Some(crate::config::NpvParam::Number(2022.0));
        fx.config.npv.end_year = Some(crate::config::NpvParam::Number(2050.0));
        fx.config.npv.discount_rate = Some(crate::config::NpvParam::Number(0.0));
        let mut record = MetricRecord::new();
        record.set(MetricKey::CostEquipmentTotal, 100.0);
        record.set(MetricKey::ElectricityNetOfGeneration, 1.0);
        record.set(MetricKey::eui("natural_gas"), 0.5);
        record.set(MetricKey::eui("additional_fuel"), 0.0);

        let r = net_present_value(&fx.ctx(), &record).unwrap();
        // electricity 30 + 31 + 32, gas (10 + 10 + 10) * 0.5
        assert_eq!(r.number(&MetricKey::Npv(Fuel::Electricity)), Some(93.0));
        assert_eq!(r.number(&MetricKey::Npv(Fuel::NaturalGas)), Some(15.0));
        assert_eq!(r.number(&MetricKey::Npv(Fuel::Oil)), Some(0.0));
        assert_eq!(r.number(&MetricKey::NpvTotal), Some(208.0));
    }

    #[test]
    fn test_npv_start_year_past_price_data_is_not_calculated() {
        let mut fx = fixture();
        fx.config.npv.start_year = Some(crate::config::NpvParam::Number(2030.0));
        let mut record = MetricRecord::new();
        record.set(MetricKey::CostEquipmentTotal, 100.0);
        record.set(MetricKey::ElectricityNetOfGeneration, 1.0);
        record.set(MetricKey::eui("natural_gas"), 0.5);
        record.set(MetricKey::eui("additional_fuel"), 0.0);

        let r = net_present_value(&fx.ctx(), &record).unwrap();
        for fuel in [Fuel::Electricity, Fuel::NaturalGas, Fuel::Oil] {
            assert_eq!(r.get(&MetricKey::Npv(fuel)), Some(&MetricValue::NotCalculated));
        }
        // capital cost alone is not reported as the NPV
        assert_eq!(r.get(&MetricKey::NpvTotal), Some(&MetricValue::NotCalculated));
    }

    #[test]
    fn test_npv_without_equipment_cost_is_not_calculated() {
        let fx = fixture();
        let mut record = MetricRecord::new();
        record.set(MetricKey::ElectricityNetOfGeneration, 0.0);
        record.set(MetricKey::eui("natural_gas"), 0.0);
        record.set(MetricKey::eui("additional_fuel"), 0.0);
        let r = net_present_value(&fx.ctx(), &record).unwrap();
        assert_eq!(r.get(&MetricKey::NpvTotal), Some(&MetricValue::NotCalculated));
    }
}
