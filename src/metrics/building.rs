//! Building geometry and location metrics.

use super::{MetricKey, MetricRecord, MetricValue, MetricsContext};
use crate::util::round_to;

fn optional_text(value: &Option<String>) -> MetricValue {
    value.as_deref().map(MetricValue::from).unwrap_or(MetricValue::Empty)
}

fn optional_number(value: Option<f64>) -> MetricValue {
    value.map(MetricValue::from).unwrap_or(MetricValue::Empty)
}

/// Fraction to percent, one decimal.
fn ratio_pct(fraction: Option<f64>) -> MetricValue {
    optional_number(fraction.map(|f| round_to(f * 100.0, 1)))
}

pub fn building_data(ctx: &MetricsContext<'_>) -> MetricRecord {
    let b = ctx.building;
    let mut r = MetricRecord::new();
    r.set(MetricKey::BldgName, b.name.as_str());
    r.set(MetricKey::BldgConditionedFloorArea, ctx.conditioned_area_m2());
    r.set(MetricKey::BldgExteriorArea, b.exterior_area_m2);
    r.set(MetricKey::BldgVolume, b.volume_m3);
    r.set(MetricKey::BldgStandardsTemplate, optional_text(&b.standards_template));
    r.set(MetricKey::BldgStandardsBuildingType, optional_text(&b.standards_building_type));
    r.set(
        MetricKey::BldgStandardsNumberOfStories,
        optional_number(b.standards_number_of_stories.map(f64::from)),
    );
    r.set(
        MetricKey::BldgStandardsNumberOfAboveGroundStories,
        optional_number(b.standards_number_of_above_ground_stories.map(f64::from)),
    );
    r.set(
        MetricKey::BldgNominalFloorToCeilingHeight,
        optional_number(b.nominal_floor_to_ceiling_height_m),
    );
    r.set(
        MetricKey::BldgNominalFloorToFloorHeight,
        optional_number(b.nominal_floor_to_floor_height_m),
    );
    r.set_ratio(MetricKey::BldgSurfaceToVolumeRatio, b.exterior_area_m2, b.volume_m3);
    r.set(MetricKey::BldgFdwr, ratio_pct(b.fdwr));
    r.set(MetricKey::BldgSrr, ratio_pct(b.srr));
    r
}

pub fn climate_data(ctx: &MetricsContext<'_>) -> MetricRecord {
    let w = &ctx.building.weather;
    let mut r = MetricRecord::new();
    r.set(MetricKey::LocationNecbHdd, optional_number(w.necb_hdd18));
    r.set(MetricKey::LocationWeatherFile, w.file.as_str());
    r.set(MetricKey::LocationEpwCdd, w.cdd18);
    r.set(MetricKey::LocationEpwHdd, w.hdd18);
    r.set(MetricKey::LocationCity, w.city.as_str());
    r.set(MetricKey::LocationStateProvinceRegion, w.state_province_region.as_str());
    r.set(MetricKey::LocationCountry, w.country.as_str());
    r.set(MetricKey::LocationLatitude, w.latitude);
    r.set(MetricKey::LocationLongitude, w.longitude);
    r
}
