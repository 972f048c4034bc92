#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end species hotspot pipeline.
//!
//! Validates a run file, loads the study-area boundary and its
//! sub-regions, fetches observations, joins them to the sub-regions,
//! partitions them into time windows, and computes one hotspot surface per
//! window and aggregation mode. The pipeline holds everything in memory
//! and writes nothing; [`export`] turns the results into `GeoJSON` strings
//! for the caller to persist.

pub mod config;
pub mod export;

use std::collections::BTreeMap;

use geo::BoundingRect as _;
use species_hotspots_boundary::{BoundaryError, BoundarySource};
use species_hotspots_boundary_models::{OuterBoundary, Region, RegionLayer};
use species_hotspots_hotspot::{HotspotEngine, HotspotError, compute_windows};
use species_hotspots_hotspot_models::{AggregationMode, HotspotPoint, HotspotSurface};
use species_hotspots_observation::{ObservationError, ObservationLoader};
use species_hotspots_observation_models::{BoundingBox, Crs, ObservationQuery};
use species_hotspots_spatial::crs::reproject_multipolygon;
use species_hotspots_spatial::{
    JoinOutput, JoinedObservation, RegionTally, ReprojectionError, SpatialError,
    density_by_region, join_observations, partition_by_window, tally_by_region,
};
use thiserror::Error;

pub use config::{PipelineConfig, RunPlan};

/// A collaborator failed to supply input data.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The boundary source failed.
    #[error("boundary source: {0}")]
    Boundary(#[from] BoundaryError),
    /// The observation loader failed.
    #[error("observation loader: {0}")]
    Observations(#[from] ObservationError),
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run file is invalid. Raised before anything is loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong.
        message: String,
    },
    /// Boundaries or observations could not be loaded.
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    /// Boundary geometry could not be moved into the analysis CRS.
    #[error("reprojection error: {0}")]
    Reprojection(#[from] ReprojectionError),
    /// The hotspot engine failed.
    #[error("hotspot error: {0}")]
    Hotspot(#[from] HotspotError),
}

impl PipelineError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<BoundaryError> for PipelineError {
    fn from(e: BoundaryError) -> Self {
        Self::Load(LoadError::Boundary(e))
    }
}

impl From<ObservationError> for PipelineError {
    fn from(e: ObservationError) -> Self {
        Self::Load(LoadError::Observations(e))
    }
}

impl From<SpatialError> for PipelineError {
    fn from(e: SpatialError) -> Self {
        match e {
            SpatialError::Reprojection(e) => Self::Reprojection(e),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The outer boundary as supplied by the source.
    pub outer: OuterBoundary,
    /// The sub-region layer in the analysis CRS.
    pub layer: RegionLayer,
    /// The query sent to the observation loader.
    pub query: ObservationQuery,
    /// Number of records the loader returned.
    pub fetched: usize,
    /// Joined observations and per-record outcome counts.
    pub join: JoinOutput,
    /// Per-region counts in layer order.
    pub tallies: Vec<RegionTally>,
    /// Observation count per window, in window order.
    pub window_counts: Vec<(String, usize)>,
    /// Joined observations without a date.
    pub missing_date: usize,
    /// Dated joined observations outside every window.
    pub outside_windows: usize,
    /// Surfaces by aggregation mode, then window label.
    pub surfaces: BTreeMap<AggregationMode, BTreeMap<String, HotspotSurface>>,
}

impl PipelineReport {
    /// CRS of the joined points and the hotspot grids.
    #[must_use]
    pub const fn analysis_crs(&self) -> Crs {
        self.layer.crs
    }
}

/// Validates `config` and runs it.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] before any I/O if the run file
/// is invalid, and otherwise see [`execute`].
pub async fn run(
    config: &PipelineConfig,
    boundaries: &dyn BoundarySource,
    loader: &dyn ObservationLoader,
) -> Result<PipelineReport, PipelineError> {
    let plan = config.validate()?;
    execute(&plan, boundaries, loader).await
}

/// Runs a validated plan.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if a collaborator fails,
/// [`PipelineError::Reprojection`] if boundary geometry cannot be moved
/// into the analysis CRS, and [`PipelineError::Hotspot`] if a surface
/// cannot be computed. No partial report is returned.
pub async fn execute(
    plan: &RunPlan,
    boundaries: &dyn BoundarySource,
    loader: &dyn ObservationLoader,
) -> Result<PipelineReport, PipelineError> {
    let name = plan.boundary.outer_name();

    let outer = boundaries.get_region_boundary(name).await?;
    let layer = boundaries.get_subregions(name).await?;
    log::info!(
        "Loaded outer boundary '{}' and {} sub-regions ({})",
        outer.region.name,
        layer.regions.len(),
        layer.crs
    );

    let layer = match plan.analysis_crs {
        Some(crs) if crs != layer.crs => {
            log::info!("Reprojecting sub-regions from {} to {crs}", layer.crs);
            reproject_layer(&layer, crs)?
        }
        _ => layer,
    };

    let mut query = plan.query.clone();
    if query.bounds.is_none() {
        query.bounds = wgs84_bounds(&outer)?;
    }

    let observations = loader.fetch_observations(&query).await?;
    log::info!(
        "Fetched {} '{}' observations from {}",
        observations.len(),
        query.taxon,
        loader.id()
    );

    let join = join_observations(&observations, &layer, &outer)?;
    let tallies = tally_by_region(&join.observations, &layer);
    let densities = density_by_region(&tallies);
    let partition = partition_by_window(&join.observations, &plan.windows);

    let extent = reproject_multipolygon(&outer.region.geometry, outer.crs, layer.crs)?
        .bounding_rect();

    let mut surfaces = BTreeMap::new();
    for config in &plan.hotspots {
        let engine = HotspotEngine::new(*config)?;
        let windows = partition
            .windows
            .iter()
            .map(|(window, observations)| {
                (
                    window.label.clone(),
                    hotspot_points(observations, config.aggregation, &densities),
                )
            })
            .collect();
        surfaces.insert(
            config.aggregation,
            compute_windows(engine, windows, extent).await?,
        );
    }

    Ok(PipelineReport {
        outer,
        layer,
        query,
        fetched: observations.len(),
        window_counts: partition
            .windows
            .iter()
            .map(|(window, observations)| (window.label.clone(), observations.len()))
            .collect(),
        missing_date: partition.missing_date,
        outside_windows: partition.outside_windows,
        join,
        tallies,
        surfaces,
    })
}

/// Engine input for one window. In weighted mode each point carries the
/// record density of its region, so points in heavily reported regions
/// count for more; points in no region weigh nothing.
fn hotspot_points(
    observations: &[JoinedObservation],
    mode: AggregationMode,
    densities: &BTreeMap<String, f64>,
) -> Vec<HotspotPoint> {
    observations
        .iter()
        .map(|joined| {
            let weight = match mode {
                AggregationMode::Count => 1.0,
                AggregationMode::Weighted => joined
                    .region
                    .as_ref()
                    .and_then(|name| densities.get(name))
                    .copied()
                    .unwrap_or(0.0),
            };
            HotspotPoint {
                point: joined.point,
                weight,
            }
        })
        .collect()
}

fn reproject_layer(layer: &RegionLayer, to: Crs) -> Result<RegionLayer, ReprojectionError> {
    let regions = layer
        .regions
        .iter()
        .map(|region| {
            Ok(Region {
                name: region.name.clone(),
                geometry: reproject_multipolygon(&region.geometry, layer.crs, to)?,
            })
        })
        .collect::<Result<Vec<_>, ReprojectionError>>()?;

    Ok(RegionLayer { crs: to, regions })
}

/// Bounding box of the outer boundary in WGS84, for narrowing the
/// observation query.
fn wgs84_bounds(outer: &OuterBoundary) -> Result<Option<BoundingBox>, ReprojectionError> {
    let geometry = reproject_multipolygon(&outer.region.geometry, outer.crs, Crs::Wgs84)?;
    Ok(geometry.bounding_rect().map(|rect| BoundingBox {
        min_lng: rect.min().x,
        min_lat: rect.min().y,
        max_lng: rect.max().x,
        max_lat: rect.max().y,
    }))
}
