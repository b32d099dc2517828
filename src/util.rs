// Cell coercion and small numeric helpers.
//
// Everything that turns a raw report string into a typed value lives here so
// the materializer and the metric functions can work with `CellValue`s only.
use chrono::{Duration, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::CellValue;

static SCIENTIFIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d*\.\d*E[+-]\d*").expect("static regex"));
static REPORT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d\d)-(\D\D\D)-(\d\d):(\d\d)").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Report dates carry no year; they are anchored to a leap year so 29-FEB parses.
const REFERENCE_YEAR: i32 = 2000;

/// Outcome of classifying one raw report value.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
    Skip,
}

impl Coerced {
    pub fn into_value(self) -> Option<CellValue> {
        match self {
            Coerced::Number(n) => Some(CellValue::Number(n)),
            Coerced::Date(d) => Some(CellValue::Date(d)),
            Coerced::Text(s) => Some(CellValue::Text(s)),
            Coerced::Skip => None,
        }
    }
}

/// Classify a raw cell value. `unit` is the cell's unit label; only unitless
/// cells are considered for date parsing.
///
/// A value is a number when it parses as a finite float and is either
/// non-zero or written in the `d.dE±d` layout the report writer emits, so a
/// plain `"0"` stays text. The literal `"0.00"` and blank text are skipped.
pub fn coerce(raw: &str, unit: &str) -> Coerced {
    let value = raw.trim();
    if value.is_empty() {
        return Coerced::Skip;
    }

    if let Some(n) = parse_report_number(value) {
        return Coerced::Number(n);
    }

    if unit.is_empty() && REPORT_DATE.is_match(value) {
        return match parse_report_date(value) {
            Some(d) => Coerced::Date(d),
            None => Coerced::Text(value.to_string()),
        };
    }

    if value == "0.00" {
        return Coerced::Skip;
    }
    Coerced::Text(value.to_string())
}

fn parse_report_number(value: &str) -> Option<f64> {
    let n = value.parse::<f64>().ok().filter(|n| n.is_finite())?;
    (n != 0.0 || SCIENTIFIC.is_match(value)).then_some(n)
}

/// Parse `DD-MMM-HH:MM` (e.g. `15-JAN-10:30`). Hour 24 rolls into the next day.
pub fn parse_report_date(value: &str) -> Option<NaiveDateTime> {
    let caps = REPORT_DATE.captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_from_abbrev(&caps[2])?;
    let hour: u32 = caps[3].parse().ok()?;
    let minute: u32 = caps[4].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, day)?;
    if hour == 24 && minute == 0 {
        return Some(date.and_hms_opt(0, 0, 0)? + Duration::days(1));
    }
    date.and_hms_opt(hour, minute, 0)
}

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    let m = match abbrev.to_ascii_uppercase().as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    Some(m)
}

/// `"Electricity Annual Value"` + `"GJ"` -> `electricity_annual_value_gj`.
pub fn normalize_field_name(column: &str, unit: &str) -> String {
    let mut name = WHITESPACE.replace_all(column, "_").to_lowercase();
    if !unit.is_empty() {
        name.push('_');
        name.push_str(&WHITESPACE.replace_all(unit, "_").to_lowercase());
    }
    name
}

/// Forgiving float parse for configuration and reference CSV cells
/// (trims, strips thousands separators, rejects text).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Divide, returning `None` when the denominator is zero or the result is not finite.
pub fn safe_div(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    r.is_finite().then_some(r)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// `0.1` -> `"10%"`, `0.125` -> `"12.5%"`.
pub fn format_pct(fraction: f64) -> String {
    let pct = round_to(fraction * 100.0, 2);
    if pct.fract() == 0.0 {
        format!("{}%", pct as i64)
    } else {
        format!("{}%", pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_coerce_skips_blank_and_two_decimal_zero() {
        assert_eq!(coerce("", "GJ"), Coerced::Skip);
        assert_eq!(coerce("   ", ""), Coerced::Skip);
        assert_eq!(coerce("0.00", "kWh"), Coerced::Skip);
        assert_eq!(coerce(" 0.00 ", ""), Coerced::Skip);
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce("12.5", "kWh"), Coerced::Number(12.5));
        assert_eq!(coerce("  -3.25 ", "C"), Coerced::Number(-3.25));
        match coerce("1.23E-05", "") {
            Coerced::Number(n) => assert!((n - 1.23e-5).abs() < 1e-15),
            other => panic!("expected number, got {:?}", other),
        }
        assert_eq!(coerce("4.5E+02", "W"), Coerced::Number(450.0));
    }

    #[test]
    fn test_coerce_nonzero_exponent_forms() {
        assert_eq!(coerce("1E5", ""), Coerced::Number(100000.0));
        assert_eq!(coerce("1.5e-3", ""), Coerced::Number(0.0015));
    }

    #[test]
    fn test_coerce_zero_only_in_scientific_layout() {
        assert_eq!(coerce("0", "GJ"), Coerced::Text("0".into()));
        assert_eq!(coerce("0.0", ""), Coerced::Text("0.0".into()));
        assert_eq!(coerce("0.000E+00", ""), Coerced::Number(0.0));
        assert_eq!(coerce("0e0", ""), Coerced::Text("0e0".into()));
    }

    #[test]
    fn test_coerce_non_finite_is_text() {
        assert_eq!(coerce("inf", ""), Coerced::Text("inf".into()));
        assert_eq!(coerce("NaN", "W"), Coerced::Text("NaN".into()));
    }

    #[test]
    fn test_coerce_dates() {
        match coerce("15-JAN-10:30", "") {
            Coerced::Date(d) => {
                assert_eq!((d.month(), d.day()), (1, 15));
                assert_eq!((d.hour(), d.minute()), (10, 30));
            }
            other => panic!("expected date, got {:?}", other),
        }
        match coerce("31-DEC-24:00", "") {
            Coerced::Date(d) => assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2001, 1, 1, 0)),
            other => panic!("expected date, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_date_needs_unitless_cell() {
        assert_eq!(coerce("15-JAN-10:30", "W"), Coerced::Text("15-JAN-10:30".into()));
    }

    #[test]
    fn test_coerce_malformed_date_falls_back_to_text() {
        assert_eq!(coerce("45-XYZ-10:30", ""), Coerced::Text("45-XYZ-10:30".into()));
        assert_eq!(coerce("30-FEB-01:00", ""), Coerced::Text("30-FEB-01:00".into()));
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce(" Natural Gas ", ""), Coerced::Text("Natural Gas".into()));
    }

    #[test]
    fn test_normalize_field_name() {
        assert_eq!(normalize_field_name("Val", "kWh"), "val_kwh");
        assert_eq!(normalize_field_name("Electricity  Annual Value", "GJ"), "electricity_annual_value_gj");
        assert_eq!(normalize_field_name("Time of Peak", ""), "time_of_peak");
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.5, 1), "-0.5");
        assert_eq!(format_int(9855), "9,855");
        assert_eq!(format_pct(0.1), "10%");
        assert_eq!(format_pct(0.125), "12.5%");
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 0.0), None);
        assert_eq!(safe_div(3.0, 2.0), Some(1.5));
    }
}
