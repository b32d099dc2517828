//! Unit conversion between the SI labels the report store uses and the IP
//! labels used by rule-of-thumb targets and regression formulas.

use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Energy,
    Area,
    Length,
    Volume,
    VolumeFlow,
    FlowPerArea,
    Power,
    EnergyPerArea,
    PowerPerArea,
    PerArea,
    PricePerEnergy,
    Conductance,
    Resistance,
    Temperature,
}

const BTU_J: f64 = 1055.05585262;
const FT2_M2: f64 = 0.09290304;
const BTU_PER_H_W: f64 = 0.29307107017;

/// Dimension and the factor that brings one unit of `label` into SI.
fn lookup(label: &str) -> Option<(Dimension, f64)> {
    use Dimension::*;
    let entry = match label {
        "J" => (Energy, 1.0),
        "kJ" => (Energy, 1e3),
        "MJ" => (Energy, 1e6),
        "GJ" => (Energy, 1e9),
        "Wh" => (Energy, 3600.0),
        "kWh" => (Energy, 3.6e6),
        "MWh" => (Energy, 3.6e9),
        "Btu" => (Energy, BTU_J),
        "kBtu" => (Energy, BTU_J * 1e3),
        "MBtu" => (Energy, BTU_J * 1e6),
        "therm" => (Energy, BTU_J * 1e5),

        "m^2" | "m2" => (Area, 1.0),
        "ft^2" | "ft2" => (Area, FT2_M2),

        "m" => (Length, 1.0),
        "ft" => (Length, 0.3048),

        "m^3" | "m3" => (Volume, 1.0),
        "L" => (Volume, 1e-3),
        "ft^3" => (Volume, 0.028316846592),
        "gal" => (Volume, 0.003785411784),

        "m^3/s" | "m3/s" => (VolumeFlow, 1.0),
        "L/s" => (VolumeFlow, 1e-3),
        "gal/min" => (VolumeFlow, 0.003785411784 / 60.0),
        "cfm" | "ft^3/min" => (VolumeFlow, 0.028316846592 / 60.0),

        "m^3/s*m^2" | "m^3/m^2*s" => (FlowPerArea, 1.0),
        "cfm/ft^2" => (FlowPerArea, 0.028316846592 / 60.0 / FT2_M2),

        "W" => (Power, 1.0),
        "kW" => (Power, 1e3),
        "Btu/h" | "Btu/hr" => (Power, BTU_PER_H_W),
        "kBtu/h" | "kBtu/hr" => (Power, BTU_PER_H_W * 1e3),
        "ton" => (Power, BTU_PER_H_W * 12_000.0),

        "J/m^2" => (EnergyPerArea, 1.0),
        "MJ/m^2" | "MJ/m2" => (EnergyPerArea, 1e6),
        "GJ/m^2" | "GJ/m2" => (EnergyPerArea, 1e9),
        "kWh/m^2" | "kWh/m2" => (EnergyPerArea, 3.6e6),
        "kBtu/ft^2" | "kBtu/ft2" => (EnergyPerArea, BTU_J * 1e3 / FT2_M2),

        "W/m^2" | "W/m2" => (PowerPerArea, 1.0),
        "W/ft^2" => (PowerPerArea, 1.0 / FT2_M2),
        "Btu/ft^2*h" | "Btu/h*ft^2" => (PowerPerArea, BTU_PER_H_W / FT2_M2),

        "1/m^2" | "people/m^2" => (PerArea, 1.0),
        "1/ft^2" | "people/ft^2" => (PerArea, 1.0 / FT2_M2),

        "$/J" => (PricePerEnergy, 1.0),
        "$/MJ" => (PricePerEnergy, 1e-6),
        "$/GJ" => (PricePerEnergy, 1e-9),
        "$/kWh" => (PricePerEnergy, 1.0 / 3.6e6),
        "$/MBtu" => (PricePerEnergy, 1.0 / (BTU_J * 1e6)),

        "W/m^2*K" | "W/m2-K" => (Conductance, 1.0),
        "Btu/ft^2*h*R" => (Conductance, BTU_PER_H_W / FT2_M2 * 1.8),

        "m^2*K/W" | "m2-K/W" => (Resistance, 1.0),
        "ft^2*h*R/Btu" => (Resistance, FT2_M2 / BTU_PER_H_W / 1.8),

        "C" | "F" | "K" | "R" => (Temperature, 1.0),
        _ => return None,
    };
    Some(entry)
}

fn to_kelvin(value: f64, label: &str) -> f64 {
    match label {
        "C" => value + 273.15,
        "F" => (value - 32.0) * 5.0 / 9.0 + 273.15,
        "R" => value * 5.0 / 9.0,
        _ => value,
    }
}

fn from_kelvin(value: f64, label: &str) -> f64 {
    match label {
        "C" => value - 273.15,
        "F" => (value - 273.15) * 9.0 / 5.0 + 32.0,
        "R" => value * 9.0 / 5.0,
        _ => value,
    }
}

/// Convert `value` from unit `from` to unit `to`.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64> {
    if from == to {
        return Ok(value);
    }
    let unknown = || ReportError::UnknownUnitConversion {
        from: from.to_string(),
        to: to.to_string(),
    };
    let (from_dim, from_factor) = lookup(from).ok_or_else(unknown)?;
    let (to_dim, to_factor) = lookup(to).ok_or_else(unknown)?;
    if from_dim != to_dim {
        return Err(unknown());
    }
    if from_dim == Dimension::Temperature {
        return Ok(from_kelvin(to_kelvin(value, from), to));
    }
    Ok(value * from_factor / to_factor)
}

/// Temperature difference (not absolute temperature) from C to F.
pub fn delta_c_to_f(delta: f64) -> f64 {
    delta * 1.8
}
