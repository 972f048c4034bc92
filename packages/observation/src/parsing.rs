//! Record-level parsing shared by observation providers.
//!
//! Every function here returns `None` instead of an error: an incomplete
//! citizen-science record is expected input, and the spatial join is the
//! place that drops and counts it.

use chrono::NaiveDate;
use species_hotspots_observation_models::Location;

/// Parses an observation date. Accepts `YYYY-MM-DD` and any ISO 8601
/// datetime whose first ten characters are a date.
#[must_use]
pub fn parse_observed_on(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parses a `"lat,lng"` string into a WGS84 location.
///
/// Returns `None` if either part is missing, unparseable, non-finite, or
/// outside the valid degree ranges.
#[must_use]
pub fn parse_lat_lng_pair(s: &str) -> Option<Location> {
    let (lat, lng) = s.split_once(',')?;
    let latitude = lat.trim().parse::<f64>().ok()?;
    let longitude = lng.trim().parse::<f64>().ok()?;
    validated_wgs84(longitude, latitude)
}

/// Extracts a WGS84 location from a `GeoJSON` point object
/// (`{"type": "Point", "coordinates": [lng, lat]}`).
#[must_use]
pub fn parse_geojson_point(value: &serde_json::Value) -> Option<Location> {
    if value.get("type").and_then(serde_json::Value::as_str) != Some("Point") {
        return None;
    }
    let coords = value.get("coordinates")?.as_array()?;
    let longitude = coords.first()?.as_f64()?;
    let latitude = coords.get(1)?.as_f64()?;
    validated_wgs84(longitude, latitude)
}

fn validated_wgs84(longitude: f64, latitude: f64) -> Option<Location> {
    if !longitude.is_finite() || !latitude.is_finite() {
        return None;
    }
    if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
        return None;
    }
    Some(Location::wgs84(longitude, latitude))
}
