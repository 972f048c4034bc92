#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary sources.
//!
//! A [`BoundarySource`] supplies the outer study-area outline (a state) and
//! its sub-regions (counties). Sources are fetched once at pipeline start;
//! any failure here is fatal to the run since nothing downstream can work
//! without boundaries.

pub mod fetchers;
pub mod geojson_source;
pub mod normalize;
pub mod tigerweb;

use async_trait::async_trait;
use species_hotspots_boundary_models::{BoundarySourceConfig, OuterBoundary, RegionLayer};
use thiserror::Error;

pub use geojson_source::GeoJsonBoundarySource;
pub use tigerweb::TigerwebBoundarySource;

/// Errors that can occur while loading boundaries.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a local boundary file failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The requested region does not exist in the source.
    #[error("Unknown region: {name}")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The source returned missing, empty, or malformed geometry.
    #[error("Geometry error: {message}")]
    Geometry {
        /// Description of what went wrong.
        message: String,
    },
}

/// Trait that all boundary providers must implement.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    /// Returns the outer boundary named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the source is unavailable, the name is
    /// unknown, or the geometry is empty or malformed.
    async fn get_region_boundary(&self, name: &str) -> Result<OuterBoundary, BoundaryError>;

    /// Returns the sub-regions of `parent_name` in stable order.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the source is unavailable, the parent is
    /// unknown, no sub-regions are returned, or region names collide.
    async fn get_subregions(&self, parent_name: &str) -> Result<RegionLayer, BoundaryError>;
}

/// Builds the boundary source described by a run file's `[boundary]`
/// table.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the HTTP client cannot be built.
pub fn from_config(config: &BoundarySourceConfig) -> Result<Box<dyn BoundarySource>, BoundaryError> {
    Ok(match config {
        BoundarySourceConfig::Tigerweb { .. } => Box::new(TigerwebBoundarySource::new()?),
        BoundarySourceConfig::Geojson {
            outer,
            subregions,
            name_property,
            crs,
            ..
        } => Box::new(GeoJsonBoundarySource::new(
            outer,
            subregions,
            name_property,
            *crs,
        )?),
    })
}

/// Boundary source backed by in-memory geometry.
pub struct StaticBoundarySource {
    outer: OuterBoundary,
    layer: RegionLayer,
}

impl StaticBoundarySource {
    /// Creates a source that serves `outer` and, as its sub-regions,
    /// `layer`.
    #[must_use]
    pub const fn new(outer: OuterBoundary, layer: RegionLayer) -> Self {
        Self { outer, layer }
    }
}

#[async_trait]
impl BoundarySource for StaticBoundarySource {
    async fn get_region_boundary(&self, name: &str) -> Result<OuterBoundary, BoundaryError> {
        if self.outer.region.name == name {
            Ok(self.outer.clone())
        } else {
            Err(BoundaryError::NotFound {
                name: name.to_string(),
            })
        }
    }

    async fn get_subregions(&self, parent_name: &str) -> Result<RegionLayer, BoundaryError> {
        if self.outer.region.name != parent_name {
            return Err(BoundaryError::NotFound {
                name: parent_name.to_string(),
            });
        }
        validate_layer(&self.layer)?;
        Ok(self.layer.clone())
    }
}

/// Checks that a layer is usable as join reference data: at least one
/// region, unique names, no empty geometries.
///
/// # Errors
///
/// Returns [`BoundaryError::Geometry`] describing the first problem found.
pub fn validate_layer(layer: &RegionLayer) -> Result<(), BoundaryError> {
    if layer.regions.is_empty() {
        return Err(BoundaryError::Geometry {
            message: "sub-region layer is empty".to_string(),
        });
    }
    if let Some(name) = layer.duplicate_name() {
        return Err(BoundaryError::Geometry {
            message: format!("duplicate region name '{name}'"),
        });
    }
    if let Some(region) = layer.regions.iter().find(|r| r.geometry.0.is_empty()) {
        return Err(BoundaryError::Geometry {
            message: format!("region '{}' has empty geometry", region.name),
        });
    }
    Ok(())
}
