//! Normalizes raw `GeoJSON` / Esri features into [`Region`] values.
//!
//! Features with a missing name or a non-polygonal geometry are skipped
//! with a warning. An entirely unusable collection is a
//! [`BoundaryError::Geometry`], since the join cannot run on it.

use geo::{Geometry, MultiPolygon};
use species_hotspots_boundary_models::Region;

use crate::BoundaryError;

/// Normalizes a list of raw features, reading each region's name from
/// `name_property`.
///
/// # Errors
///
/// Returns [`BoundaryError::Geometry`] if no feature yields a region.
pub fn normalize_features(
    features: &[serde_json::Value],
    name_property: &str,
) -> Result<Vec<Region>, BoundaryError> {
    let regions: Vec<Region> = features
        .iter()
        .filter_map(|feature| normalize_feature(feature, name_property))
        .collect();

    if regions.is_empty() {
        return Err(BoundaryError::Geometry {
            message: format!(
                "none of {} features had a '{name_property}' name and polygon geometry",
                features.len()
            ),
        });
    }

    if regions.len() < features.len() {
        log::warn!(
            "Skipped {} of {} boundary features without a name or polygon geometry",
            features.len() - regions.len(),
            features.len()
        );
    }

    Ok(regions)
}

/// Extracts the `features` array of a `FeatureCollection` body.
///
/// # Errors
///
/// Returns [`BoundaryError::Geometry`] if the body has no features array.
pub fn feature_array(body: &serde_json::Value) -> Result<Vec<serde_json::Value>, BoundaryError> {
    body["features"]
        .as_array()
        .cloned()
        .ok_or_else(|| BoundaryError::Geometry {
            message: "no features array in boundary response".to_string(),
        })
}

/// Normalizes a single feature. `properties` (GeoJSON) and `attributes`
/// (Esri JSON) are both accepted.
fn normalize_feature(feature: &serde_json::Value, name_property: &str) -> Option<Region> {
    let props = feature
        .get("properties")
        .filter(|p| p.is_object())
        .or_else(|| feature.get("attributes"))?;

    let name = props
        .get(name_property)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let geometry = feature.get("geometry").filter(|g| !g.is_null())?;
    let Some(multi_polygon) = parse_multipolygon(geometry) else {
        log::warn!("Boundary feature '{name}' has no usable polygon geometry");
        return None;
    };

    Some(Region {
        name,
        geometry: multi_polygon,
    })
}

/// Parses a geometry object into a [`MultiPolygon`]. Handles `GeoJSON`
/// `Polygon`/`MultiPolygon` and Esri `{ "rings": [...] }`.
#[must_use]
pub fn parse_multipolygon(geometry: &serde_json::Value) -> Option<MultiPolygon<f64>> {
    let geometry = if geometry.get("rings").is_some() {
        esri_to_geojson(geometry)?
    } else {
        geometry.clone()
    };

    let geojson_geometry: geojson::Geometry = serde_json::from_value(geometry).ok()?;
    let geo_geometry: Geometry<f64> = geojson_geometry.try_into().ok()?;

    let multi_polygon = match geo_geometry {
        Geometry::MultiPolygon(mp) => mp,
        Geometry::Polygon(p) => MultiPolygon(vec![p]),
        _ => return None,
    };

    if multi_polygon.0.is_empty() || multi_polygon.0.iter().all(|p| p.exterior().0.len() < 4) {
        return None;
    }

    Some(multi_polygon)
}

/// Converts Esri JSON rings to a `GeoJSON` geometry. Each ring becomes its
/// own polygon; administrative boundaries rarely carry holes.
fn esri_to_geojson(esri_geom: &serde_json::Value) -> Option<serde_json::Value> {
    let rings = esri_geom.get("rings")?.as_array()?;

    match rings.len() {
        0 => None,
        1 => Some(serde_json::json!({
            "type": "Polygon",
            "coordinates": rings,
        })),
        _ => {
            let polygons: Vec<serde_json::Value> =
                rings.iter().map(|ring| serde_json::json!([ring])).collect();
            Some(serde_json::json!({
                "type": "MultiPolygon",
                "coordinates": polygons,
            }))
        }
    }
}
