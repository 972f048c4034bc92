#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary types.
//!
//! A [`RegionLayer`] is the read-only reference data for the spatial join:
//! an ordered set of named polygons (counties of a state) in one CRS. The
//! layer's input order is significant, since it decides which region wins
//! when a point sits exactly on a shared edge.

pub mod fips;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use species_hotspots_observation_models::Crs;

/// A named area with a polygon or multipolygon boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Region name, unique within its layer.
    pub name: String,
    /// Boundary geometry. Single polygons are stored as a one-element
    /// multipolygon.
    pub geometry: MultiPolygon<f64>,
}

/// An ordered set of regions sharing one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLayer {
    /// CRS of every region geometry in this layer.
    pub crs: Crs,
    /// Regions in stable input order.
    pub regions: Vec<Region>,
}

impl RegionLayer {
    /// Returns the first region with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Returns the first name that occurs more than once, if any.
    #[must_use]
    pub fn duplicate_name(&self) -> Option<&str> {
        let mut seen = std::collections::BTreeSet::new();
        self.regions
            .iter()
            .map(|r| r.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

/// The outer study-area boundary (a state outline) and its CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct OuterBoundary {
    /// CRS of the boundary geometry.
    pub crs: Crs,
    /// The boundary region itself.
    pub region: Region,
}

/// How to obtain the outer boundary and its sub-regions, deserialized from
/// the `[boundary]` table of a run file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundarySourceConfig {
    /// Census Bureau `TIGERweb`: state outline plus its counties.
    Tigerweb {
        /// Full state name (e.g. `"Pennsylvania"`).
        state: String,
    },
    /// `GeoJSON` `FeatureCollection`s from local files or URLs.
    Geojson {
        /// Path or `http(s)://` URL of the outer boundary collection.
        outer: String,
        /// Path or `http(s)://` URL of the sub-region collection.
        subregions: String,
        /// Feature property holding the region name.
        name_property: String,
        /// Value of `name_property` on the outer boundary feature.
        outer_name: String,
        /// CRS of both collections (defaults to `EPSG:4326`).
        #[serde(default)]
        crs: Crs,
    },
}

impl BoundarySourceConfig {
    /// Returns the name of the outer region this config selects.
    #[must_use]
    pub fn outer_name(&self) -> &str {
        match self {
            Self::Tigerweb { state } => state,
            Self::Geojson { outer_name, .. } => outer_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(name: &str, x0: f64) -> Region {
        Region {
            name: name.to_string(),
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: 0.0),
                (x: x0 + 1.0, y: 0.0),
                (x: x0 + 1.0, y: 1.0),
                (x: x0, y: 1.0),
            ]]),
        }
    }

    #[test]
    fn finds_regions_by_name() {
        let layer = RegionLayer {
            crs: Crs::Wgs84,
            regions: vec![square("Adams", 0.0), square("Berks", 1.0)],
        };
        assert_eq!(layer.get("Berks").unwrap().name, "Berks");
        assert!(layer.get("Centre").is_none());
        assert!(layer.duplicate_name().is_none());
    }

    #[test]
    fn detects_duplicate_names() {
        let layer = RegionLayer {
            crs: Crs::Wgs84,
            regions: vec![square("Adams", 0.0), square("Adams", 1.0)],
        };
        assert_eq!(layer.duplicate_name(), Some("Adams"));
    }

    #[test]
    fn parses_tigerweb_config() {
        let config: BoundarySourceConfig =
            toml::from_str("type = \"tigerweb\"\nstate = \"Pennsylvania\"").unwrap();
        assert_eq!(
            config,
            BoundarySourceConfig::Tigerweb {
                state: "Pennsylvania".to_string()
            }
        );
        assert_eq!(config.outer_name(), "Pennsylvania");
    }

    #[test]
    fn parses_geojson_config_with_default_crs() {
        let config: BoundarySourceConfig = toml::from_str(
            "type = \"geojson\"\n\
             outer = \"data/state.geojson\"\n\
             subregions = \"data/counties.geojson\"\n\
             name_property = \"NAME\"\n\
             outer_name = \"Pennsylvania\"",
        )
        .unwrap();
        match config {
            BoundarySourceConfig::Geojson {
                crs, outer_name, ..
            } => {
                assert_eq!(crs, Crs::Wgs84);
                assert_eq!(outer_name, "Pennsylvania");
            }
            BoundarySourceConfig::Tigerweb { .. } => panic!("expected geojson config"),
        }
    }
}
