#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Species observation record types.
//!
//! Every observation provider (iNaturalist, in-memory fixtures, etc.)
//! produces [`Observation`] records. Records are immutable once loaded and
//! may be incomplete: a missing location or date is carried as `None` and
//! handled by the spatial join, never rejected at load time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coordinate reference system of a location or geometry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Crs {
    /// Geographic longitude/latitude in degrees (WGS84).
    #[default]
    #[serde(rename = "EPSG:4326")]
    #[strum(serialize = "EPSG:4326")]
    Wgs84,
    /// Spherical Web Mercator in metres.
    #[serde(rename = "EPSG:3857")]
    #[strum(serialize = "EPSG:3857")]
    WebMercator,
}

/// Provider quality flag, retained as-is and never filtered by the core.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QualityGrade {
    /// Community-verified identification.
    Research,
    /// Identification still under review.
    NeedsId,
    /// Missing media, date, or location; not eligible for research grade.
    Casual,
    /// Provider returned a grade this crate does not know.
    Unknown,
}

impl QualityGrade {
    /// Parses a provider grade string, mapping anything unrecognized to
    /// [`QualityGrade::Unknown`].
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        value.trim().parse().unwrap_or(Self::Unknown)
    }
}

/// A point location in a named CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude (geographic CRS) or easting (projected CRS).
    pub x: f64,
    /// Latitude (geographic CRS) or northing (projected CRS).
    pub y: f64,
    /// CRS the coordinates are expressed in.
    pub crs: Crs,
}

impl Location {
    /// Creates a WGS84 longitude/latitude location.
    #[must_use]
    pub const fn wgs84(longitude: f64, latitude: f64) -> Self {
        Self {
            x: longitude,
            y: latitude,
            crs: Crs::Wgs84,
        }
    }
}

/// One species sighting as returned by an observation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Provider identifier (opaque).
    pub id: String,
    /// Where the organism was seen. `None` if the provider record has
    /// missing or unparseable coordinates.
    pub location: Option<Location>,
    /// Calendar date of the sighting. `None` if missing or unparseable.
    pub observed_on: Option<NaiveDate>,
    /// Provider quality flag.
    pub quality: QualityGrade,
    /// Scientific name as reported by the provider.
    pub taxon_name: Option<String>,
    /// Free-text place description as reported by the provider.
    pub place_guess: Option<String>,
}

/// Geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Western edge (minimum longitude).
    pub min_lng: f64,
    /// Southern edge (minimum latitude).
    pub min_lat: f64,
    /// Eastern edge (maximum longitude).
    pub max_lng: f64,
    /// Northern edge (maximum latitude).
    pub max_lat: f64,
}

impl BoundingBox {
    /// Returns `true` if the longitude/latitude lies inside the box
    /// (edges included).
    #[must_use]
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        (self.min_lng..=self.max_lng).contains(&lng) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

/// Parameters for a single observation fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationQuery {
    /// Scientific or common taxon name to search for.
    pub taxon: String,
    /// Optional spatial restriction.
    pub bounds: Option<BoundingBox>,
    /// Quality grades to request. Empty means all grades.
    pub quality: Vec<QualityGrade>,
    /// Upper bound on returned records. Fewer is not an error.
    pub max_results: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crs_parses_epsg_codes() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("EPSG:3857".parse::<Crs>().unwrap(), Crs::WebMercator);
        assert!("EPSG:27700".parse::<Crs>().is_err());
        assert_eq!(Crs::WebMercator.to_string(), "EPSG:3857");
    }

    #[test]
    fn crs_serde_uses_epsg_codes() {
        let json = serde_json::to_string(&Crs::Wgs84).unwrap();
        assert_eq!(json, "\"EPSG:4326\"");
    }

    #[test]
    fn quality_grade_from_provider() {
        assert_eq!(QualityGrade::from_provider("research"), QualityGrade::Research);
        assert_eq!(QualityGrade::from_provider("needs_id"), QualityGrade::NeedsId);
        assert_eq!(QualityGrade::from_provider(" casual "), QualityGrade::Casual);
        assert_eq!(QualityGrade::from_provider("verifiable"), QualityGrade::Unknown);
    }

    #[test]
    fn bounding_box_contains_edges() {
        let bbox = BoundingBox {
            min_lng: -80.5,
            min_lat: 39.7,
            max_lng: -74.7,
            max_lat: 42.3,
        };
        assert!(bbox.contains(-77.0, 40.0));
        assert!(bbox.contains(-80.5, 42.3));
        assert!(!bbox.contains(-81.0, 40.0));
    }
}
