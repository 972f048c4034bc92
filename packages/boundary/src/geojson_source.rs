//! Boundary source backed by `GeoJSON` `FeatureCollection`s.
//!
//! The outer outline and the sub-regions live in two collections (files or
//! URLs). The sub-region collection is taken to belong to whatever outer
//! region was requested, so `parent_name` is only checked against the
//! outer collection.

use async_trait::async_trait;
use species_hotspots_boundary_models::{OuterBoundary, RegionLayer};
use species_hotspots_observation_models::Crs;

use crate::fetchers::geojson_url;
use crate::normalize::normalize_features;
use crate::{BoundaryError, BoundarySource, validate_layer};

/// Boundary source reading two `GeoJSON` collections.
pub struct GeoJsonBoundarySource {
    client: reqwest::Client,
    outer: String,
    subregions: String,
    name_property: String,
    crs: Crs,
}

impl GeoJsonBoundarySource {
    /// Creates a source over the given file paths or URLs.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the HTTP client cannot be built.
    pub fn new(
        outer: &str,
        subregions: &str,
        name_property: &str,
        crs: Crs,
    ) -> Result<Self, BoundaryError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            outer: outer.to_string(),
            subregions: subregions.to_string(),
            name_property: name_property.to_string(),
            crs,
        })
    }
}

#[async_trait]
impl BoundarySource for GeoJsonBoundarySource {
    async fn get_region_boundary(&self, name: &str) -> Result<OuterBoundary, BoundaryError> {
        log::info!("Loading outer boundary '{name}' from {}", self.outer);
        let features = geojson_url::fetch(&self.client, &self.outer).await?;
        let regions = normalize_features(&features, &self.name_property)?;

        let region = regions
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| BoundaryError::NotFound {
                name: name.to_string(),
            })?;

        Ok(OuterBoundary {
            crs: self.crs,
            region,
        })
    }

    async fn get_subregions(&self, parent_name: &str) -> Result<RegionLayer, BoundaryError> {
        log::info!(
            "Loading sub-regions of '{parent_name}' from {}",
            self.subregions
        );
        let features = geojson_url::fetch(&self.client, &self.subregions).await?;

        let layer = RegionLayer {
            crs: self.crs,
            regions: normalize_features(&features, &self.name_property)?,
        };
        validate_layer(&layer)?;

        Ok(layer)
    }
}
