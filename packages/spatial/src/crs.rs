//! Reprojection between WGS84 and spherical Web Mercator.
//!
//! These are the only two CRSs the pipeline accepts, so the closed-form
//! spherical Mercator equations are enough; no projection library is
//! needed.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Coord, MapCoords as _, MultiPolygon, Point};
use species_hotspots_observation_models::Crs;
use thiserror::Error;

/// WGS84 semi-major axis in metres, used as the sphere radius.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude at which Web Mercator becomes a square world.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Half the projected world width in metres.
const MAX_MERCATOR_COORD: f64 = 20_037_508.342_789_244;

/// A coordinate could not be moved from one CRS to another.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot reproject ({x}, {y}) from {from} to {to}: {reason}")]
pub struct ReprojectionError {
    /// Source CRS.
    pub from: Crs,
    /// Target CRS.
    pub to: Crs,
    /// Offending x coordinate.
    pub x: f64,
    /// Offending y coordinate.
    pub y: f64,
    /// Why the coordinate is outside the target's domain.
    pub reason: &'static str,
}

/// Reprojects a single coordinate.
///
/// # Errors
///
/// Returns [`ReprojectionError`] if the coordinate is non-finite or outside
/// the valid domain of either CRS.
pub fn reproject_coord(coord: Coord<f64>, from: Crs, to: Crs) -> Result<Coord<f64>, ReprojectionError> {
    let fail = |reason| ReprojectionError {
        from,
        to,
        x: coord.x,
        y: coord.y,
        reason,
    };

    if !coord.x.is_finite() || !coord.y.is_finite() {
        return Err(fail("non-finite coordinate"));
    }

    match (from, to) {
        (Crs::Wgs84, Crs::Wgs84) | (Crs::WebMercator, Crs::WebMercator) => Ok(coord),
        (Crs::Wgs84, Crs::WebMercator) => {
            if !(-180.0..=180.0).contains(&coord.x) {
                return Err(fail("longitude outside [-180, 180]"));
            }
            if coord.y.abs() > MAX_MERCATOR_LAT {
                return Err(fail("latitude outside the Web Mercator domain"));
            }
            let x = EARTH_RADIUS_M * coord.x.to_radians();
            let y = EARTH_RADIUS_M * (FRAC_PI_4 + coord.y.to_radians() / 2.0).tan().ln();
            Ok(Coord { x, y })
        }
        (Crs::WebMercator, Crs::Wgs84) => {
            // Small tolerance for round-off at the projected edge.
            let limit = MAX_MERCATOR_COORD * (1.0 + 1e-9);
            if coord.x.abs() > limit || coord.y.abs() > limit {
                return Err(fail("outside the projected Web Mercator extent"));
            }
            let lng = (coord.x / EARTH_RADIUS_M).to_degrees();
            let lat = (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
            Ok(Coord { x: lng, y: lat })
        }
    }
}

/// Reprojects a point.
///
/// # Errors
///
/// See [`reproject_coord`].
pub fn reproject_point(point: Point<f64>, from: Crs, to: Crs) -> Result<Point<f64>, ReprojectionError> {
    reproject_coord(point.0, from, to).map(Point)
}

/// Reprojects every vertex of a multipolygon. Fails on the first vertex
/// that cannot be reprojected.
///
/// # Errors
///
/// See [`reproject_coord`].
pub fn reproject_multipolygon(
    geometry: &MultiPolygon<f64>,
    from: Crs,
    to: Crs,
) -> Result<MultiPolygon<f64>, ReprojectionError> {
    if from == to {
        return Ok(geometry.clone());
    }
    geometry.try_map_coords(|coord| reproject_coord(coord, from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn origin_maps_to_origin() {
        let c = reproject_coord(Coord { x: 0.0, y: 0.0 }, Crs::Wgs84, Crs::WebMercator).unwrap();
        assert!(close(c.x, 0.0, 1e-9));
        assert!(close(c.y, 0.0, 1e-9));
    }

    #[test]
    fn known_mercator_values() {
        let c =
            reproject_coord(Coord { x: 180.0, y: 0.0 }, Crs::Wgs84, Crs::WebMercator).unwrap();
        assert!(close(c.x, MAX_MERCATOR_COORD, 1e-6));

        // Harrisburg, PA
        let c = reproject_coord(
            Coord {
                x: -76.8867,
                y: 40.2732,
            },
            Crs::Wgs84,
            Crs::WebMercator,
        )
        .unwrap();
        assert!(close(c.x, -8_558_988.3, 1.0));
        assert!(close(c.y, 4_905_722.7, 1.0));
    }

    #[test]
    fn round_trip_is_stable() {
        let original = Coord {
            x: -75.1652,
            y: 39.9526,
        };
        let projected = reproject_coord(original, Crs::Wgs84, Crs::WebMercator).unwrap();
        let back = reproject_coord(projected, Crs::WebMercator, Crs::Wgs84).unwrap();
        assert!(close(back.x, original.x, 1e-9));
        assert!(close(back.y, original.y, 1e-9));
    }

    #[test]
    fn polar_latitudes_fail() {
        let err = reproject_coord(Coord { x: 10.0, y: 89.0 }, Crs::Wgs84, Crs::WebMercator)
            .unwrap_err();
        assert_eq!(err.from, Crs::Wgs84);
        assert_eq!(err.to, Crs::WebMercator);
    }

    #[test]
    fn non_finite_fails_even_without_conversion() {
        assert!(
            reproject_coord(
                Coord {
                    x: f64::NAN,
                    y: 0.0
                },
                Crs::Wgs84,
                Crs::Wgs84
            )
            .is_err()
        );
    }

    #[test]
    fn multipolygon_reprojection_fails_on_any_bad_vertex() {
        let mp = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 89.9),
        ]]);
        assert!(reproject_multipolygon(&mp, Crs::Wgs84, Crs::WebMercator).is_err());
        assert_eq!(
            reproject_multipolygon(&mp, Crs::Wgs84, Crs::Wgs84).unwrap(),
            mp
        );
    }
}
