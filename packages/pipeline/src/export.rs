//! `GeoJSON` and JSON renderings of pipeline results.
//!
//! Output coordinates stay in the analysis CRS. When that is not WGS84 the
//! collection carries the legacy `crs` member so desktop GIS tools place
//! it correctly.

use geojson::{Geometry, JsonObject};
use serde_json::json;
use species_hotspots_hotspot_models::HotspotSurface;
use species_hotspots_observation_models::Crs;
use species_hotspots_spatial::{JoinedObservation, RegionTally};

fn geometry_value(value: geojson::Value) -> serde_json::Value {
    serde_json::Value::Object(JsonObject::from(&Geometry::new(value)))
}

fn feature_collection(features: Vec<serde_json::Value>, crs: Crs) -> serde_json::Value {
    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if crs != Crs::Wgs84
        && let Some(object) = collection.as_object_mut()
    {
        let urn = format!("urn:ogc:def:crs:{}", crs.as_ref().replacen(':', "::", 1));
        object.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": urn } }),
        );
    }
    collection
}

/// Renders a surface as a `FeatureCollection` with one polygon feature per
/// cell.
#[must_use]
pub fn surface_to_geojson(surface: &HotspotSurface, crs: Crs) -> String {
    let features = surface
        .results
        .iter()
        .map(|result| {
            json!({
                "type": "Feature",
                "geometry": geometry_value(geojson::Value::from(&result.cell.polygon)),
                "properties": {
                    "window": surface.label,
                    "aggregation": surface.aggregation.as_ref(),
                    "cell": result.cell.index,
                    "row": result.cell.row,
                    "col": result.cell.col,
                    "count": result.cell.count,
                    "value": result.cell.value,
                    "giZScore": result.statistic,
                    "pValue": result.p_value,
                    "pAdjustment": surface.adjustment.as_ref(),
                    "isSignificant": result.is_significant,
                    "isHot": result.is_hot,
                    "isCold": result.is_cold(),
                },
            })
        })
        .collect();

    feature_collection(features, crs).to_string()
}

/// Renders joined observations as a `FeatureCollection` of points.
#[must_use]
pub fn observations_to_geojson(observations: &[JoinedObservation], crs: Crs) -> String {
    let features = observations
        .iter()
        .map(|joined| {
            let observation = &joined.observation;
            json!({
                "type": "Feature",
                "id": observation.id,
                "geometry": geometry_value(geojson::Value::from(&joined.point)),
                "properties": {
                    "region": joined.region,
                    "observedOn": joined.observed_on().map(|d| d.format("%Y-%m-%d").to_string()),
                    "quality": observation.quality.as_ref(),
                    "taxonName": observation.taxon_name,
                    "placeGuess": observation.place_guess,
                },
            })
        })
        .collect();

    feature_collection(features, crs).to_string()
}

/// Pretty-printed JSON array of region tallies.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn tallies_to_json(tallies: &[RegionTally]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tallies)
}
