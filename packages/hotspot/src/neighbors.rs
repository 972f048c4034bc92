//! Distance-band neighbourhoods over cell centres.

use rstar::RTree;
use species_hotspots_hotspot_models::GridType;

use crate::grid::{CenterEntry, Tessellation};

/// Slack on the band radius so centres exactly `lag` steps away are not lost
/// to round-off.
const BAND_TOLERANCE: f64 = 1e-6;

/// Neighbourhood radius for a grid: `lag` centre spacings for hexagons,
/// `lag` diagonals for squares (queen contiguity at lag 1).
#[must_use]
pub fn band_radius(grid_type: GridType, cell_size: f64, lag: u32) -> f64 {
    let step = match grid_type {
        GridType::Hexagonal => cell_size,
        GridType::Square => cell_size * std::f64::consts::SQRT_2,
    };
    f64::from(lag) * step * (1.0 + BAND_TOLERANCE)
}

/// For every cell, the sorted indices of the cells whose centres lie within
/// the band radius, the cell itself included. The relation is symmetric.
#[must_use]
pub fn distance_band(grid: &Tessellation, centers: &RTree<CenterEntry>, lag: u32) -> Vec<Vec<usize>> {
    let radius = band_radius(grid.grid_type(), grid.cell_size(), lag);
    let radius_2 = radius * radius;

    grid.cells()
        .iter()
        .map(|cell| {
            let mut neighbors: Vec<usize> = centers
                .locate_within_distance([cell.center.x, cell.center.y], radius_2)
                .map(|entry| entry.data)
                .collect();
            neighbors.sort_unstable();
            neighbors
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};

    fn build(grid_type: GridType) -> (Tessellation, Vec<Vec<usize>>) {
        let grid = Tessellation::build(
            Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }),
            0.1,
            grid_type,
        );
        let neighbors = distance_band(&grid, &grid.center_index(), 1);
        (grid, neighbors)
    }

    #[test]
    fn interior_hexagon_has_six_neighbours_plus_itself() {
        let (grid, neighbors) = build(GridType::Hexagonal);
        assert!(neighbors.iter().all(|n| n.len() <= 7));
        assert_eq!(neighbors.iter().map(Vec::len).max(), Some(7));

        let interior = grid
            .cells()
            .iter()
            .position(|c| (c.center.x - 0.5).abs() < 0.06 && (c.center.y - 0.5).abs() < 0.06)
            .unwrap();
        assert_eq!(neighbors[interior].len(), 7);
    }

    #[test]
    fn square_lag_one_is_queen_contiguity() {
        let (_, neighbors) = build(GridType::Square);
        // Row-major 10x10: cell 0 is a corner, cell 55 is interior.
        assert_eq!(neighbors[0], vec![0, 1, 10, 11]);
        assert_eq!(neighbors[55].len(), 9);
        assert_eq!(neighbors[5].len(), 6);
    }

    #[test]
    fn neighbourhoods_are_symmetric_and_reflexive() {
        for grid_type in [GridType::Hexagonal, GridType::Square] {
            let (_, neighbors) = build(grid_type);
            for (i, list) in neighbors.iter().enumerate() {
                assert!(list.contains(&i));
                for &j in list {
                    assert!(neighbors[j].contains(&i), "{grid_type}: {i} -> {j}");
                }
            }
        }
    }

    #[test]
    fn larger_lag_widens_the_band() {
        let grid = Tessellation::build(
            Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }),
            0.1,
            GridType::Hexagonal,
        );
        let centers = grid.center_index();
        let lag1 = distance_band(&grid, &centers, 1);
        let lag2 = distance_band(&grid, &centers, 2);
        assert_eq!(lag2.iter().map(Vec::len).max(), Some(19));
        assert!(lag1.iter().zip(&lag2).all(|(a, b)| a.len() <= b.len()));
    }
}
