//! TOML run files and their validation.
//!
//! A run file names the species, the study area, the grid, and the time
//! windows. [`PipelineConfig::validate`] checks all of it up front and
//! turns it into a [`RunPlan`], so a bad file fails before any boundary or
//! observation is fetched.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use species_hotspots_boundary_models::BoundarySourceConfig;
use species_hotspots_hotspot_models::{
    AggregationMode, DEFAULT_SIGNIFICANCE, GridType, HotspotConfig, PValueAdjustment,
};
use species_hotspots_observation_models::{BoundingBox, Crs, ObservationQuery, QualityGrade};
use species_hotspots_spatial::{TimeWindow, windows_overlap};

use crate::PipelineError;

/// Run files bundled with the crate, by name.
const PRESETS: &[(&str, &str)] = &[
    (
        "spotted_lanternfly_pa",
        include_str!("../runs/spotted_lanternfly_pa.toml"),
    ),
    (
        "spotted_lanternfly_nj_mercator",
        include_str!("../runs/spotted_lanternfly_nj_mercator.toml"),
    ),
];

/// Names of the bundled run files.
#[must_use]
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

/// Loads a bundled run file by name.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] if no preset has that name or
/// it fails to parse.
pub fn preset(name: &str) -> Result<PipelineConfig, PipelineError> {
    let (_, toml) = PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .ok_or_else(|| PipelineError::configuration(format!("unknown preset '{name}'")))?;
    PipelineConfig::from_toml_str(toml)
}

/// A parsed, not yet validated, run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// What to fetch.
    pub observations: ObservationSettings,
    /// Where the study area comes from.
    pub boundary: BoundarySourceConfig,
    /// Grid and statistic settings.
    pub hotspot: HotspotSettings,
    /// Time windows, in output order.
    #[serde(default)]
    pub windows: Vec<TimeWindow>,
}

/// The `[observations]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSettings {
    /// Scientific name of the taxon.
    pub taxon: String,
    /// Quality grades to request; empty means all.
    #[serde(default)]
    pub quality: Vec<String>,
    /// Upper bound on records fetched.
    #[serde(default = "default_max_results")]
    pub max_results: u64,
    /// `[min_lng, min_lat, max_lng, max_lat]` in WGS84. Defaults to the
    /// bounding box of the outer boundary.
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
}

const fn default_max_results() -> u64 {
    10_000
}

/// The `[hotspot]` table. Enum-valued settings stay strings here so that
/// unknown values are reported by [`PipelineConfig::validate`] with the
/// offending value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotSettings {
    /// `"hexagonal"` or `"square"`.
    #[serde(default = "default_grid_type")]
    pub grid_type: String,
    /// Cell size in units of the analysis CRS.
    pub cell_size: f64,
    /// p-value threshold.
    #[serde(default = "default_significance")]
    pub significance: f64,
    /// Neighbourhood radius in cell steps.
    #[serde(default = "default_neighbor_lag")]
    pub neighbor_lag: u32,
    /// p-value correction: `"false_discovery_rate"`, `"bonferroni"` or
    /// `"none"`.
    #[serde(default = "default_adjustment")]
    pub adjustment: String,
    /// Aggregation modes to run (`"count"`, `"weighted"`).
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
    /// CRS the join and grid are computed in (`"EPSG:4326"` or
    /// `"EPSG:3857"`). Defaults to the boundary layer's own CRS.
    #[serde(default)]
    pub crs: Option<String>,
}

fn default_grid_type() -> String {
    GridType::default().to_string()
}

const fn default_significance() -> f64 {
    DEFAULT_SIGNIFICANCE
}

const fn default_neighbor_lag() -> u32 {
    1
}

fn default_adjustment() -> String {
    PValueAdjustment::default().to_string()
}

fn default_modes() -> Vec<String> {
    vec![AggregationMode::Count.to_string()]
}

/// A validated run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    /// Boundary source settings.
    pub boundary: BoundarySourceConfig,
    /// Observation query. `bounds` is `None` when it should be taken from
    /// the outer boundary.
    pub query: ObservationQuery,
    /// One engine configuration per aggregation mode, in file order.
    pub hotspots: Vec<HotspotConfig>,
    /// CRS to join and grid in, if different from the layer's.
    pub analysis_crs: Option<Crs>,
    /// Time windows, in file order.
    pub windows: Vec<TimeWindow>,
}

impl PipelineConfig {
    /// Parses a run file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the TOML is malformed
    /// or a required key is missing.
    pub fn from_toml_str(toml: &str) -> Result<Self, PipelineError> {
        toml::from_str(toml)
            .map_err(|e| PipelineError::configuration(format!("invalid run file: {e}")))
    }

    /// Reads and parses a run file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the file cannot be read
    /// or parsed.
    pub fn from_path(path: &std::path::Path) -> Result<Self, PipelineError> {
        let toml = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&toml)
    }

    /// Checks every setting and builds the run plan.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for the first problem found:
    /// an empty, inverted, duplicated, or overlapping time window, a
    /// non-positive cell size, an unknown grid type, aggregation mode,
    /// quality grade, or CRS, a significance outside `(0, 1)`, or an
    /// unusable observation query.
    pub fn validate(&self) -> Result<RunPlan, PipelineError> {
        let windows = validate_windows(&self.windows)?;
        let hotspots = self.validate_hotspot()?;
        let analysis_crs = self
            .hotspot
            .crs
            .as_deref()
            .map(|crs| parse_enum::<Crs>("CRS", crs))
            .transpose()?;
        let query = self.validate_query()?;

        if self.boundary.outer_name().trim().is_empty() {
            return Err(PipelineError::configuration(
                "boundary must name an outer region",
            ));
        }

        Ok(RunPlan {
            boundary: self.boundary.clone(),
            query,
            hotspots,
            analysis_crs,
            windows,
        })
    }

    fn validate_hotspot(&self) -> Result<Vec<HotspotConfig>, PipelineError> {
        let settings = &self.hotspot;
        let grid_type = parse_enum::<GridType>("grid type", &settings.grid_type)?;
        let adjustment =
            parse_enum::<PValueAdjustment>("p-value adjustment", &settings.adjustment)?;

        if !settings.cell_size.is_finite() || settings.cell_size <= 0.0 {
            return Err(PipelineError::configuration(format!(
                "cell_size must be positive, got {}",
                settings.cell_size
            )));
        }
        if !(settings.significance > 0.0 && settings.significance < 1.0) {
            return Err(PipelineError::configuration(format!(
                "significance must be in (0, 1), got {}",
                settings.significance
            )));
        }
        if settings.neighbor_lag == 0 {
            return Err(PipelineError::configuration(
                "neighbor_lag must be at least 1",
            ));
        }
        if settings.modes.is_empty() {
            return Err(PipelineError::configuration(
                "at least one aggregation mode is required",
            ));
        }

        let mut seen = BTreeSet::new();
        settings
            .modes
            .iter()
            .map(|mode| {
                let aggregation = parse_enum::<AggregationMode>("aggregation mode", mode)?;
                if !seen.insert(aggregation) {
                    return Err(PipelineError::configuration(format!(
                        "aggregation mode '{mode}' listed twice"
                    )));
                }
                Ok(HotspotConfig {
                    cell_size: settings.cell_size,
                    grid_type,
                    significance: settings.significance,
                    neighbor_lag: settings.neighbor_lag,
                    aggregation,
                    adjustment,
                })
            })
            .collect()
    }

    fn validate_query(&self) -> Result<ObservationQuery, PipelineError> {
        let settings = &self.observations;
        if settings.taxon.trim().is_empty() {
            return Err(PipelineError::configuration("taxon must not be empty"));
        }
        if settings.max_results == 0 {
            return Err(PipelineError::configuration(
                "max_results must be at least 1",
            ));
        }

        let quality = settings
            .quality
            .iter()
            .map(|grade| parse_enum::<QualityGrade>("quality grade", grade))
            .collect::<Result<Vec<_>, _>>()?;

        let bounds = settings
            .bounds
            .map(|[min_lng, min_lat, max_lng, max_lat]| {
                let valid = min_lng < max_lng
                    && min_lat < max_lat
                    && (-180.0..=180.0).contains(&min_lng)
                    && (-180.0..=180.0).contains(&max_lng)
                    && (-90.0..=90.0).contains(&min_lat)
                    && (-90.0..=90.0).contains(&max_lat);
                if valid {
                    Ok(BoundingBox {
                        min_lng,
                        min_lat,
                        max_lng,
                        max_lat,
                    })
                } else {
                    Err(PipelineError::configuration(format!(
                        "bounds must be [min_lng, min_lat, max_lng, max_lat] in degrees, got {:?}",
                        [min_lng, min_lat, max_lng, max_lat]
                    )))
                }
            })
            .transpose()?;

        Ok(ObservationQuery {
            taxon: settings.taxon.trim().to_string(),
            bounds,
            quality,
            max_results: settings.max_results,
        })
    }
}

fn validate_windows(windows: &[TimeWindow]) -> Result<Vec<TimeWindow>, PipelineError> {
    if windows.is_empty() {
        return Err(PipelineError::configuration(
            "at least one [[windows]] entry is required",
        ));
    }

    let mut labels = BTreeSet::new();
    for window in windows {
        if window.label.trim().is_empty() {
            return Err(PipelineError::configuration("window labels must not be empty"));
        }
        if !labels.insert(window.label.as_str()) {
            return Err(PipelineError::configuration(format!(
                "duplicate window label '{}'",
                window.label
            )));
        }
        if window.is_empty() {
            return Err(PipelineError::configuration(format!(
                "window '{}' ends ({}) on or before it starts ({})",
                window.label, window.end, window.start
            )));
        }
    }

    if let Some((a, b)) = windows_overlap(windows) {
        return Err(PipelineError::configuration(format!(
            "windows '{a}' and '{b}' overlap"
        )));
    }

    Ok(windows.to_vec())
}

fn parse_enum<T: FromStr>(what: &str, value: &str) -> Result<T, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::configuration(format!("unknown {what} '{value}'")))
}
