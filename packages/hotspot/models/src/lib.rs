#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot surface types.
//!
//! A [`HotspotSurface`] is the per-window output of the hotspot engine: one
//! [`HotspotResult`] per grid cell, in the grid's row-major order, carrying
//! the aggregated value, the Getis-Ord Gi* z-score, its two-sided p-value,
//! and the significance flags derived from them.

use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default significance threshold for classifying a cell.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Shape of the tessellation cells.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GridType {
    /// Pointy-top hexagons; `cell_size` is the distance between adjacent
    /// cell centres.
    #[default]
    Hexagonal,
    /// Axis-aligned squares; `cell_size` is the side length.
    Square,
}

/// What each cell's value is built from.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum AggregationMode {
    /// Number of points in the cell.
    #[default]
    Count,
    /// Sum of point weights in the cell.
    Weighted,
}

/// Multiple-comparison correction applied to the per-cell p-values before
/// they are compared with the significance threshold.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PValueAdjustment {
    /// Raw p-values. Expect about `significance * cells` false positives
    /// on a surface with no real clustering.
    None,
    /// `min(1, p * n)`. Controls the chance of any false positive.
    Bonferroni,
    /// Benjamini-Hochberg step-up. Controls the expected share of false
    /// positives among flagged cells.
    #[default]
    FalseDiscoveryRate,
}

/// Parameters of one hotspot run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HotspotConfig {
    /// Cell size in the units of the input coordinates.
    pub cell_size: f64,
    /// Cell shape.
    #[serde(default)]
    pub grid_type: GridType,
    /// A cell is significant when its p-value is below this.
    #[serde(default = "default_significance")]
    pub significance: f64,
    /// Neighbourhood radius in cell steps (1 = immediate neighbours).
    #[serde(default = "default_neighbor_lag")]
    pub neighbor_lag: u32,
    /// Aggregation applied to points before the statistic.
    #[serde(default)]
    pub aggregation: AggregationMode,
    /// Correction applied to p-values across the cells of one surface.
    #[serde(default)]
    pub adjustment: PValueAdjustment,
}

const fn default_significance() -> f64 {
    DEFAULT_SIGNIFICANCE
}

const fn default_neighbor_lag() -> u32 {
    1
}

impl HotspotConfig {
    /// Creates a configuration with the default significance, lag,
    /// adjustment and count aggregation.
    #[must_use]
    pub const fn new(cell_size: f64, grid_type: GridType) -> Self {
        Self {
            cell_size,
            grid_type,
            significance: DEFAULT_SIGNIFICANCE,
            neighbor_lag: 1,
            aggregation: AggregationMode::Count,
            adjustment: PValueAdjustment::FalseDiscoveryRate,
        }
    }

    /// Returns a copy with a different aggregation mode.
    #[must_use]
    pub const fn with_aggregation(mut self, aggregation: AggregationMode) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Returns a copy with a different p-value adjustment.
    #[must_use]
    pub const fn with_adjustment(mut self, adjustment: PValueAdjustment) -> Self {
        self.adjustment = adjustment;
        self
    }
}

/// A point fed to the engine, with the weight used in weighted mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotPoint {
    /// Location, in the same units as the grid.
    pub point: Point<f64>,
    /// Contribution in [`AggregationMode::Weighted`].
    pub weight: f64,
}

impl HotspotPoint {
    /// A point with weight 1.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
            weight: 1.0,
        }
    }

    /// A point with an explicit weight.
    #[must_use]
    pub fn weighted(x: f64, y: f64, weight: f64) -> Self {
        Self {
            point: Point::new(x, y),
            weight,
        }
    }
}

/// One cell of the tessellation and its aggregated value.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// Position in the grid's row-major order.
    pub index: usize,
    /// Row, counted from the extent's southern edge. May be `-1` for
    /// hexagons that poke in from outside.
    pub row: i64,
    /// Column, counted from the extent's western edge.
    pub col: i64,
    /// Cell centre `(x, y)`.
    pub center: (f64, f64),
    /// Cell outline.
    pub polygon: Polygon<f64>,
    /// Number of points aggregated into the cell.
    pub count: u64,
    /// Value the statistic is computed on: `count` in count mode, the sum
    /// of point weights in weighted mode.
    pub value: f64,
}

/// Gi* outcome for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotResult {
    /// The cell.
    pub cell: GridCell,
    /// Gi* z-score. Positive means the neighbourhood is above the mean.
    pub statistic: f64,
    /// Two-sided p-value of `statistic` under the standard normal, after
    /// the configured adjustment.
    pub p_value: f64,
    /// `p_value < significance`.
    pub is_significant: bool,
    /// `statistic > 0 && is_significant`.
    pub is_hot: bool,
}

impl HotspotResult {
    /// Significant cold spot: `statistic < 0 && is_significant`.
    #[must_use]
    pub fn is_cold(&self) -> bool {
        self.is_significant && self.statistic < 0.0
    }
}

/// The hotspot surface of one time window.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotSurface {
    /// Window label.
    pub label: String,
    /// Cell shape used.
    pub grid_type: GridType,
    /// Cell size used.
    pub cell_size: f64,
    /// Aggregation used.
    pub aggregation: AggregationMode,
    /// Significance threshold used.
    pub significance: f64,
    /// p-value adjustment used.
    pub adjustment: PValueAdjustment,
    /// One result per cell, in row-major grid order.
    pub results: Vec<HotspotResult>,
    /// Points aggregated into some cell.
    pub points_used: usize,
    /// Points that fell outside every cell.
    pub points_outside_grid: usize,
}

impl HotspotSurface {
    /// Results flagged hot.
    pub fn hot_cells(&self) -> impl Iterator<Item = &HotspotResult> {
        self.results.iter().filter(|r| r.is_hot)
    }

    /// Number of hot cells.
    #[must_use]
    pub fn hot_count(&self) -> usize {
        self.hot_cells().count()
    }

    /// Number of significant cells (hot or cold).
    #[must_use]
    pub fn significant_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_significant).count()
    }
}
