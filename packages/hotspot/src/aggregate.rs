//! Point-to-cell aggregation.

use geo::Intersects as _;
use rstar::RTree;
use species_hotspots_hotspot_models::{AggregationMode, HotspotPoint};

use crate::grid::{CenterEntry, Tessellation};

/// Per-cell totals, indexed like the tessellation's cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Points per cell.
    pub counts: Vec<u64>,
    /// Value per cell under the requested mode.
    pub values: Vec<f64>,
    /// Points assigned to a cell.
    pub points_used: usize,
    /// Points that fell in no cell (or had non-finite coordinates).
    pub points_outside_grid: usize,
}

/// Assigns every point to the cell whose centre is nearest, provided the
/// point actually lies in that cell (boundary inclusive). Points on a shared
/// edge go to whichever adjacent centre the index returns first, which is
/// stable for a given grid.
#[must_use]
pub fn aggregate(
    grid: &Tessellation,
    centers: &RTree<CenterEntry>,
    points: &[HotspotPoint],
    mode: AggregationMode,
) -> Aggregation {
    let mut counts = vec![0u64; grid.len()];
    let mut weights = vec![0.0f64; grid.len()];
    let mut points_used = 0;
    let mut points_outside_grid = 0;

    for p in points {
        let (x, y) = (p.point.x(), p.point.y());
        if !x.is_finite() || !y.is_finite() {
            points_outside_grid += 1;
            continue;
        }

        let Some(nearest) = centers.nearest_neighbor(&[x, y]) else {
            points_outside_grid += 1;
            continue;
        };

        let index = nearest.data;
        if grid.cells()[index].polygon.intersects(&p.point) {
            counts[index] += 1;
            weights[index] += p.weight;
            points_used += 1;
        } else {
            points_outside_grid += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let values = match mode {
        AggregationMode::Count => counts.iter().map(|&c| c as f64).collect(),
        AggregationMode::Weighted => weights,
    };

    if points_outside_grid > 0 {
        log::debug!("{points_outside_grid} points fell outside the grid");
    }

    Aggregation {
        counts,
        values,
        points_used,
        points_outside_grid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};
    use species_hotspots_hotspot_models::GridType;

    fn grid(grid_type: GridType) -> Tessellation {
        Tessellation::build(
            Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }),
            0.1,
            grid_type,
        )
    }

    #[test]
    fn counts_points_per_square_cell() {
        let grid = grid(GridType::Square);
        let centers = grid.center_index();
        let points = vec![
            HotspotPoint::new(0.05, 0.05),
            HotspotPoint::new(0.01, 0.09),
            HotspotPoint::new(0.95, 0.95),
        ];

        let agg = aggregate(&grid, &centers, &points, AggregationMode::Count);
        assert_eq!(agg.counts[0], 2);
        assert_eq!(agg.counts[99], 1);
        assert_eq!(agg.counts.iter().sum::<u64>(), 3);
        assert!((agg.values[0] - 2.0).abs() < f64::EPSILON);
        assert_eq!(agg.points_used, 3);
        assert_eq!(agg.points_outside_grid, 0);
    }

    #[test]
    fn weighted_mode_sums_weights_but_keeps_counts() {
        let grid = grid(GridType::Square);
        let centers = grid.center_index();
        let points = vec![
            HotspotPoint::weighted(0.05, 0.05, 2.5),
            HotspotPoint::weighted(0.06, 0.04, 0.5),
        ];

        let agg = aggregate(&grid, &centers, &points, AggregationMode::Weighted);
        assert_eq!(agg.counts[0], 2);
        assert!((agg.values[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn points_beyond_the_grid_are_counted_separately() {
        let grid = grid(GridType::Hexagonal);
        let centers = grid.center_index();
        let points = vec![
            HotspotPoint::new(0.5, 0.5),
            HotspotPoint::new(5.0, 5.0),
            HotspotPoint::new(f64::NAN, 0.5),
        ];

        let agg = aggregate(&grid, &centers, &points, AggregationMode::Count);
        assert_eq!(agg.points_used, 1);
        assert_eq!(agg.points_outside_grid, 2);
    }

    #[test]
    fn hexagon_points_land_in_the_hexagon_containing_them() {
        let grid = grid(GridType::Hexagonal);
        let centers = grid.center_index();
        let points: Vec<HotspotPoint> = grid
            .cells()
            .iter()
            .map(|c| HotspotPoint::new(c.center.x + 0.01, c.center.y - 0.01))
            .collect();

        let agg = aggregate(&grid, &centers, &points, AggregationMode::Count);
        assert!(agg.counts.iter().all(|&c| c == 1));
    }
}
