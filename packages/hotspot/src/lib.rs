#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Getis-Ord Gi* hotspot surfaces over uniform grids.
//!
//! [`HotspotEngine::compute`] tessellates an extent, aggregates points into
//! cells, scores every cell with Gi* over a distance-band neighbourhood,
//! adjusts the two-sided p-values for the number of cells tested, and flags
//! cells whose adjusted p-value falls under the significance threshold. [`compute_windows`] runs one surface per time
//! window on the blocking thread pool.

pub mod aggregate;
pub mod gi_star;
pub mod grid;
pub mod neighbors;
pub mod stats;
mod windows;

use geo::{BoundingRect as _, MultiPoint, Rect};
use species_hotspots_hotspot_models::{
    GridCell, HotspotConfig, HotspotPoint, HotspotResult, HotspotSurface,
};
use thiserror::Error;

pub use windows::compute_windows;

/// Most cells a single surface may have. Guards against a cell size given
/// in the wrong units (degrees on a metre grid).
pub const MAX_CELLS: usize = 2_000_000;

/// Errors from the hotspot engine.
#[derive(Debug, Error)]
pub enum HotspotError {
    /// The engine configuration is unusable.
    #[error("invalid hotspot configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },
    /// The extent and cell size would produce an unreasonable grid.
    #[error("grid for '{label}' would have about {cells} cells (limit {limit})")]
    TooManyCells {
        /// Window label.
        label: String,
        /// Estimated cell count.
        cells: f64,
        /// The cell limit.
        limit: usize,
    },
    /// A per-window task panicked or was cancelled.
    #[error("hotspot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Computes hotspot surfaces for one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotEngine {
    config: HotspotConfig,
}

impl HotspotEngine {
    /// Creates an engine after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HotspotError::InvalidConfig`] if the cell size is not a
    /// positive finite number, the significance is outside `(0, 1)`, or the
    /// neighbour lag is zero.
    pub fn new(config: HotspotConfig) -> Result<Self, HotspotError> {
        if !config.cell_size.is_finite() || config.cell_size <= 0.0 {
            return Err(HotspotError::InvalidConfig {
                message: format!("cell size must be positive, got {}", config.cell_size),
            });
        }
        if !(config.significance > 0.0 && config.significance < 1.0) {
            return Err(HotspotError::InvalidConfig {
                message: format!(
                    "significance must be in (0, 1), got {}",
                    config.significance
                ),
            });
        }
        if config.neighbor_lag == 0 {
            return Err(HotspotError::InvalidConfig {
                message: "neighbor lag must be at least 1".to_string(),
            });
        }

        Ok(Self { config })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &HotspotConfig {
        &self.config
    }

    /// Computes the hotspot surface of one window.
    ///
    /// The grid covers `extent`, or the bounding box of the points when
    /// `extent` is `None`. With no points and no extent there is nothing to
    /// tessellate and the surface has no cells. Every cell of the grid is
    /// scored, empty ones included.
    ///
    /// # Errors
    ///
    /// Returns [`HotspotError::TooManyCells`] if the grid would exceed
    /// [`MAX_CELLS`].
    pub fn compute(
        &self,
        label: &str,
        points: &[HotspotPoint],
        extent: Option<Rect<f64>>,
    ) -> Result<HotspotSurface, HotspotError> {
        let config = &self.config;
        let extent = extent.or_else(|| points_extent(points));

        let Some(extent) = extent.filter(rect_is_finite) else {
            log::warn!("'{label}': no points and no extent, producing an empty surface");
            return Ok(self.surface(label, Vec::new(), 0, points.len()));
        };
        let extent = grid::pad_degenerate(extent, config.cell_size);

        let estimate = grid::cell_estimate(extent, config.cell_size, config.grid_type);
        #[allow(clippy::cast_precision_loss)]
        let limit = MAX_CELLS as f64;
        if estimate > limit {
            return Err(HotspotError::TooManyCells {
                label: label.to_string(),
                cells: estimate,
                limit: MAX_CELLS,
            });
        }

        let tessellation = grid::Tessellation::build(extent, config.cell_size, config.grid_type);
        let centers = tessellation.center_index();
        let aggregation =
            aggregate::aggregate(&tessellation, &centers, points, config.aggregation);
        let neighborhoods = neighbors::distance_band(&tessellation, &centers, config.neighbor_lag);
        let scores = gi_star::gi_star(&aggregation.values, &neighborhoods);
        let raw: Vec<f64> = scores.iter().copied().map(stats::two_sided_p).collect();
        let p_values = stats::adjust(&raw, config.adjustment);

        let results: Vec<HotspotResult> = tessellation
            .into_cells()
            .into_iter()
            .enumerate()
            .map(|(index, cell)| {
                let statistic = scores[index];
                let p_value = p_values[index];
                let is_significant = p_value < config.significance;
                HotspotResult {
                    cell: GridCell {
                        index,
                        row: cell.row,
                        col: cell.col,
                        center: (cell.center.x, cell.center.y),
                        polygon: cell.polygon,
                        count: aggregation.counts[index],
                        value: aggregation.values[index],
                    },
                    statistic,
                    p_value,
                    is_significant,
                    is_hot: is_significant && statistic > 0.0,
                }
            })
            .collect();

        let surface = self.surface(
            label,
            results,
            aggregation.points_used,
            aggregation.points_outside_grid,
        );
        log::info!(
            "'{label}' ({} {}, {} adjustment): {} cells, {} points, {} hot, {} significant",
            surface.grid_type,
            surface.aggregation,
            surface.adjustment,
            surface.results.len(),
            surface.points_used,
            surface.hot_count(),
            surface.significant_count(),
        );

        Ok(surface)
    }

    fn surface(
        &self,
        label: &str,
        results: Vec<HotspotResult>,
        points_used: usize,
        points_outside_grid: usize,
    ) -> HotspotSurface {
        HotspotSurface {
            label: label.to_string(),
            grid_type: self.config.grid_type,
            cell_size: self.config.cell_size,
            aggregation: self.config.aggregation,
            significance: self.config.significance,
            adjustment: self.config.adjustment,
            results,
            points_used,
            points_outside_grid,
        }
    }
}

/// Bounding box of the finite points, if there are any.
fn points_extent(points: &[HotspotPoint]) -> Option<Rect<f64>> {
    points
        .iter()
        .map(|p| p.point)
        .filter(|p| p.x().is_finite() && p.y().is_finite())
        .collect::<MultiPoint<f64>>()
        .bounding_rect()
}

fn rect_is_finite(rect: &Rect<f64>) -> bool {
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
        .iter()
        .all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use species_hotspots_hotspot_models::{AggregationMode, GridType, PValueAdjustment};

    fn unit_extent() -> Rect<f64> {
        Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 })
    }

    fn engine(grid_type: GridType) -> HotspotEngine {
        HotspotEngine::new(HotspotConfig::new(0.1, grid_type)).unwrap()
    }

    #[test]
    fn rejects_bad_configuration() {
        for cell_size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(HotspotEngine::new(HotspotConfig::new(cell_size, GridType::Square)).is_err());
        }
        for significance in [0.0, 1.0, 1.5, f64::NAN] {
            let config = HotspotConfig {
                significance,
                ..HotspotConfig::new(0.1, GridType::Square)
            };
            assert!(HotspotEngine::new(config).is_err());
        }
        let config = HotspotConfig {
            neighbor_lag: 0,
            ..HotspotConfig::new(0.1, GridType::Square)
        };
        assert!(HotspotEngine::new(config).is_err());
    }

    #[test]
    fn empty_input_yields_full_zero_grid() {
        for grid_type in [GridType::Hexagonal, GridType::Square] {
            let surface = engine(grid_type).compute("empty", &[], Some(unit_extent())).unwrap();
            let expected = grid::Tessellation::build(unit_extent(), 0.1, grid_type).len();

            assert_eq!(surface.results.len(), expected);
            for result in &surface.results {
                assert_eq!(result.cell.count, 0);
                assert!(result.statistic.abs() < f64::EPSILON);
                assert!((result.p_value - 1.0).abs() < f64::EPSILON);
                assert!(!result.is_significant);
                assert!(!result.is_hot);
            }
        }
    }

    #[test]
    fn no_points_and_no_extent_is_an_empty_surface() {
        let surface = engine(GridType::Hexagonal).compute("nothing", &[], None).unwrap();
        assert!(surface.results.is_empty());
        assert_eq!(surface.points_used, 0);
    }

    /// Deterministic uniform draws in `[0, 1)` (`SplitMix64`).
    struct Draws(u64);

    impl Draws {
        #[allow(clippy::cast_precision_loss)]
        fn uniform(&mut self) -> f64 {
            self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = self.0;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^= z >> 31;
            (z >> 11) as f64 / (1_u64 << 53) as f64
        }
    }

    /// 100 points, one dropped at random inside each tenth of the unit
    /// square. Even coverage with cell-to-cell noise.
    fn scattered_points(seed: u64) -> Vec<HotspotPoint> {
        let mut draws = Draws(seed);
        (0..10)
            .flat_map(|i| (0..10).map(move |j| (i, j)))
            .map(|(i, j)| {
                let x = (f64::from(i) + draws.uniform()) / 10.0;
                let y = (f64::from(j) + draws.uniform()) / 10.0;
                HotspotPoint::new(x, y)
            })
            .collect()
    }

    #[test]
    fn evenly_scattered_points_have_no_hot_cells() {
        for seed in 0..12 {
            let points = scattered_points(seed);
            let surface = engine(GridType::Hexagonal)
                .compute("uniform", &points, Some(unit_extent()))
                .unwrap();

            assert_eq!(surface.points_used, 100, "seed {seed}");
            assert!(surface.results.iter().all(|r| r.cell.count <= 3), "seed {seed}");
            assert!(
                surface.results.iter().any(|r| r.statistic.abs() > 1.0),
                "seed {seed}: statistic never moved"
            );
            assert_eq!(surface.hot_count(), 0, "seed {seed}");

            let strict = HotspotEngine::new(
                HotspotConfig::new(0.1, GridType::Hexagonal)
                    .with_adjustment(PValueAdjustment::Bonferroni),
            )
            .unwrap()
            .compute("uniform", &points, Some(unit_extent()))
            .unwrap();
            assert_eq!(strict.hot_count(), 0, "seed {seed}");
        }
    }

    #[test]
    fn raw_p_values_flag_noise_as_hot() {
        let points = scattered_points(4);
        let config = HotspotConfig::new(0.1, GridType::Hexagonal)
            .with_adjustment(PValueAdjustment::None);
        let raw = HotspotEngine::new(config)
            .unwrap()
            .compute("uniform", &points, Some(unit_extent()))
            .unwrap();
        let adjusted = engine(GridType::Hexagonal)
            .compute("uniform", &points, Some(unit_extent()))
            .unwrap();

        assert!(raw.hot_count() > 0);
        assert_eq!(adjusted.hot_count(), 0);
        for (a, b) in raw.results.iter().zip(&adjusted.results) {
            assert!((a.statistic - b.statistic).abs() < f64::EPSILON);
            assert!(b.p_value >= a.p_value);
        }
    }

    #[test]
    fn scattered_square_grid_has_no_hot_cells() {
        for seed in 0..12 {
            let mut draws = Draws(seed);
            let mut jitter = |i: i32| {
                1.5f64
                    .mul_add(draws.uniform() - 0.5, f64::from(i) + 0.5)
                    .clamp(0.0, 10.0)
                    / 10.0
            };
            let mut points = Vec::new();
            for i in 0..10 {
                for j in 0..10 {
                    let x = jitter(i);
                    let y = jitter(j);
                    points.push(HotspotPoint::new(x, y));
                }
            }

            let surface = engine(GridType::Square)
                .compute("uniform", &points, Some(unit_extent()))
                .unwrap();
            assert_eq!(surface.results.len(), 100);
            assert_eq!(surface.points_used, 100);
            assert_eq!(surface.hot_count(), 0, "seed {seed}");
        }
    }

    #[test]
    fn corner_cluster_is_hot_and_far_scatter_is_not() {
        let grid = grid::Tessellation::build(unit_extent(), 0.1, GridType::Hexagonal);
        let centers = grid.center_index();
        let neighborhoods = neighbors::distance_band(&grid, &centers, 1);

        let cluster = centers.nearest_neighbor(&[0.15, 0.09]).unwrap().data;
        let mut points = Vec::new();
        for &index in &neighborhoods[cluster] {
            let c = grid.cells()[index].center;
            let n = if index == cluster { 20 } else { 10 };
            points.extend(std::iter::repeat_n(HotspotPoint::new(c.x, c.y), n));
        }
        assert_eq!(points.len(), 80);
        for i in 0..5 {
            for j in 0..4 {
                points.push(HotspotPoint::new(
                    0.1f64.mul_add(f64::from(i), 0.55),
                    0.1f64.mul_add(f64::from(j), 0.55),
                ));
            }
        }

        for adjustment in [PValueAdjustment::FalseDiscoveryRate, PValueAdjustment::Bonferroni] {
            let config = HotspotConfig::new(0.1, GridType::Hexagonal).with_adjustment(adjustment);
            let surface = HotspotEngine::new(config)
                .unwrap()
                .compute("corner", &points, Some(unit_extent()))
                .unwrap();
            assert_eq!(surface.points_used, 100);

            let origin = surface.results[cluster].cell.center;
            for &index in &neighborhoods[cluster] {
                assert!(surface.results[index].is_hot, "{adjustment}: cell {index}");
            }
            for r in &surface.results {
                let (x, y) = r.cell.center;
                if x > 0.5 && y > 0.5 {
                    assert!(!r.is_hot, "{adjustment}: scattered cell {} hot", r.cell.index);
                }
                if r.is_hot {
                    let distance = (x - origin.0).hypot(y - origin.1);
                    assert!(distance < 0.2 + 1e-6, "{adjustment}: cell {} hot", r.cell.index);
                }
            }
        }

        let strict = HotspotEngine::new(
            HotspotConfig::new(0.1, GridType::Hexagonal)
                .with_adjustment(PValueAdjustment::Bonferroni),
        )
        .unwrap()
        .compute("corner", &points, Some(unit_extent()))
        .unwrap();
        let mut hot: Vec<usize> = strict.hot_cells().map(|r| r.cell.index).collect();
        let mut expected = neighborhoods[cluster].clone();
        hot.sort_unstable();
        expected.sort_unstable();
        assert_eq!(hot, expected);
    }

    /// A dense cluster around (0.3, 0.3) and isolated single sightings in
    /// the north-east corner.
    fn clustered_points() -> (Vec<HotspotPoint>, usize, Vec<usize>) {
        let grid = grid::Tessellation::build(unit_extent(), 0.1, GridType::Hexagonal);
        let centers = grid.center_index();
        let neighborhoods = neighbors::distance_band(&grid, &centers, 1);

        let cluster = centers.nearest_neighbor(&[0.3, 0.3]).unwrap().data;
        let mut points = Vec::new();
        let mut push = |index: usize, n: usize| {
            let c = grid.cells()[index].center;
            points.extend(std::iter::repeat_n(HotspotPoint::new(c.x, c.y), n));
        };

        push(cluster, 20);
        for &n in &neighborhoods[cluster] {
            if n != cluster {
                push(n, 10);
            }
        }

        let mut isolated: Vec<usize> = Vec::new();
        for (i, cell) in grid.cells().iter().enumerate() {
            let inside = (0.6..=1.0).contains(&cell.center.x) && (0.6..=1.0).contains(&cell.center.y);
            if inside && isolated.iter().all(|&o| !neighborhoods[o].contains(&i)) {
                isolated.push(i);
            }
        }
        for &i in &isolated {
            push(i, 1);
        }

        (points, cluster, isolated)
    }

    #[test]
    fn clustered_scenario_flags_the_cluster_only() {
        let (points, cluster, isolated) = clustered_points();
        assert!(isolated.len() >= 5);

        let surface = engine(GridType::Hexagonal)
            .compute("clustered", &points, Some(unit_extent()))
            .unwrap();
        let result = |i: usize| &surface.results[i];

        assert!(result(cluster).is_hot);
        assert!(result(cluster).statistic > 5.0);

        let cluster_center = result(cluster).cell.center;
        for r in &surface.results {
            let dx = r.cell.center.0 - cluster_center.0;
            let dy = r.cell.center.1 - cluster_center.1;
            let distance = dx.hypot(dy);
            if distance < 0.1 + 1e-6 {
                assert!(r.is_hot, "cluster neighbour {} not hot", r.cell.index);
            }
            if r.is_hot {
                assert!(distance < 0.2 + 1e-6, "cell {} hot but far away", r.cell.index);
            }
        }

        for &i in &isolated {
            assert!(!result(i).is_hot, "isolated cell {i} flagged hot");
        }
    }

    #[test]
    fn hot_implies_significant_implies_small_p() {
        let (points, _, _) = clustered_points();
        for grid_type in [GridType::Hexagonal, GridType::Square] {
            let surface = engine(grid_type)
                .compute("clustered", &points, Some(unit_extent()))
                .unwrap();
            for r in &surface.results {
                if r.is_hot {
                    assert!(r.is_significant);
                    assert!(r.statistic > 0.0);
                }
                if r.is_significant {
                    assert!(r.p_value < 0.05);
                }
                assert!(r.statistic.is_finite());
                assert!((0.0..=1.0).contains(&r.p_value));
            }
        }
    }

    #[test]
    fn identical_input_gives_identical_surfaces() {
        let (points, _, _) = clustered_points();
        let engine = engine(GridType::Hexagonal);
        let a = engine.compute("a", &points, None).unwrap();
        let b = engine.compute("a", &points, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn weighted_mode_uses_weights() {
        let config = HotspotConfig::new(0.1, GridType::Square)
            .with_aggregation(AggregationMode::Weighted);
        let engine = HotspotEngine::new(config).unwrap();
        let points = vec![
            HotspotPoint::weighted(0.05, 0.05, 4.0),
            HotspotPoint::weighted(0.95, 0.95, 0.5),
        ];

        let surface = engine.compute("weighted", &points, Some(unit_extent())).unwrap();
        assert!((surface.results[0].cell.value - 4.0).abs() < f64::EPSILON);
        assert_eq!(surface.results[0].cell.count, 1);
        assert!((surface.results[99].cell.value - 0.5).abs() < f64::EPSILON);
        assert_eq!(surface.aggregation, AggregationMode::Weighted);
    }

    #[test]
    fn single_point_without_extent_gets_one_cell() {
        let surface = engine(GridType::Square)
            .compute("single", &[HotspotPoint::new(3.0, 4.0)], None)
            .unwrap();
        assert_eq!(surface.results.len(), 1);
        assert_eq!(surface.results[0].cell.count, 1);
        assert!(surface.results[0].statistic.abs() < f64::EPSILON);
    }

    #[test]
    fn runaway_grid_is_rejected() {
        let extent = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0e6, y: 1.0e6 });
        let result = engine(GridType::Square).compute("huge", &[], Some(extent));
        assert!(matches!(result, Err(HotspotError::TooManyCells { .. })));
    }
}
