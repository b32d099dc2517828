//! Envelope conductance, grouped by component and weighted by area.

use std::collections::BTreeMap;

use super::{EnvelopeMeasure, MetricKey, MetricRecord};
use crate::model::Building;
use crate::util::average;

const OUTDOOR_GROUPS: [&str; 7] = [
    "outdoor_walls",
    "outdoor_roofs",
    "outdoor_floors",
    "outdoor_windows",
    "outdoor_skylights",
    "outdoor_doors",
    "outdoor_overhead_doors",
];
const GROUND_GROUPS: [&str; 3] = ["ground_walls", "ground_roofs", "ground_floors"];

#[derive(Debug, Default, Clone)]
struct ComponentGroup {
    area_m2: f64,
    conductances: Vec<f64>,
}

impl ComponentGroup {
    fn add(&mut self, area_m2: f64, conductance: Option<f64>) {
        self.area_m2 += area_m2;
        if let Some(u) = conductance {
            self.conductances.push(u);
        }
    }

    /// Simple average over members; `None` for a group with no rated member.
    fn average_conductance(&self) -> Option<f64> {
        (!self.conductances.is_empty()).then(|| average(&self.conductances))
    }
}

fn surface_group(surface_type: &str, outdoor: bool) -> Option<&'static str> {
    let group = match (outdoor, surface_type) {
        (true, "Wall") => "outdoor_walls",
        (true, "RoofCeiling") => "outdoor_roofs",
        (true, "Floor") => "outdoor_floors",
        (false, "Wall") => "ground_walls",
        (false, "RoofCeiling") => "ground_roofs",
        (false, "Floor") => "ground_floors",
        _ => return None,
    };
    Some(group)
}

fn sub_surface_group(sub_surface_type: &str) -> Option<&'static str> {
    let group = match sub_surface_type {
        "FixedWindow" | "OperableWindow" | "GlassDoor" => "outdoor_windows",
        "Skylight" | "TubularDaylightDome" | "TubularDaylightDiffuser" => "outdoor_skylights",
        "Door" => "outdoor_doors",
        "OverheadDoor" => "outdoor_overhead_doors",
        _ => return None,
    };
    Some(group)
}

/// Area-weighted mean of group averages; groups without an average are skipped.
pub fn area_weighted_conductance(groups: &[(f64, Option<f64>)]) -> Option<f64> {
    let (weighted, area) = groups
        .iter()
        .filter_map(|(area, u)| u.map(|u| (u * area, *area)))
        .fold((0.0, 0.0), |(w, a), (uw, ua)| (w + uw, a + ua));
    (area > 0.0).then(|| weighted / area)
}

pub fn envelope_conductance(building: &Building) -> MetricRecord {
    let mut groups: BTreeMap<&'static str, ComponentGroup> = BTreeMap::new();

    for surface in &building.surfaces {
        let outdoor = surface.is_outdoor();
        if !outdoor && !surface.is_ground() {
            continue;
        }
        if let Some(group) = surface_group(&surface.surface_type, outdoor) {
            groups
                .entry(group)
                .or_default()
                .add(surface.weighted_area(), surface.conductance_w_per_m2_k);
        }
        if !outdoor {
            continue;
        }
        for sub in &surface.sub_surfaces {
            if let Some(group) = sub_surface_group(&sub.sub_surface_type) {
                let area = sub.net_area_m2 * sub.multiplier * surface.space_multiplier;
                groups.entry(group).or_default().add(area, sub.conductance_w_per_m2_k);
            }
        }
    }

    let mut r = MetricRecord::new();
    let mut summarize = |names: &[&'static str]| -> Vec<(f64, Option<f64>)> {
        names
            .iter()
            .map(|&name| {
                let group = groups.remove(name).unwrap_or_default();
                let avg = group.average_conductance();
                r.set(MetricKey::Envelope(name, EnvelopeMeasure::AreaM2), group.area_m2);
                r.set(MetricKey::Envelope(name, EnvelopeMeasure::AverageConductance), avg);
                (group.area_m2, avg)
            })
            .collect()
    };
    let outdoor = summarize(&OUTDOOR_GROUPS);
    let ground = summarize(&GROUND_GROUPS);

    let total_area = |g: &[(f64, Option<f64>)]| g.iter().map(|(a, _)| a).sum::<f64>();
    r.set(MetricKey::EnvelopeTotalOutdoorArea, total_area(&outdoor));
    r.set(MetricKey::EnvelopeTotalGroundArea, total_area(&ground));
    r.set(MetricKey::EnvelopeOutdoorAverageConductance, area_weighted_conductance(&outdoor));
    r.set(MetricKey::EnvelopeGroundAverageConductance, area_weighted_conductance(&ground));
    let all: Vec<_> = outdoor.into_iter().chain(ground).collect();
    r.set(MetricKey::EnvelopeAverageConductance, area_weighted_conductance(&all));
    r
}
