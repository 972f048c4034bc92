//! Uniform square and hexagonal tessellations of a rectangular extent.
//!
//! Cells are emitted row-major (south to north, west to east within a
//! row), so the same extent, size, and shape always give the same cells in
//! the same order.

use geo::{Coord, Intersects as _, LineString, Polygon, Rect, coord};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use species_hotspots_hotspot_models::GridType;

/// `√3`, which `std` only has as an unstable constant.
const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// A cell centre in the R-tree, tagged with its cell index.
pub type CenterEntry = GeomWithData<[f64; 2], usize>;

/// One cell of a tessellation.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Row number, relative to the extent's southern edge.
    pub row: i64,
    /// Column number, relative to the extent's western edge.
    pub col: i64,
    /// Cell centre.
    pub center: Coord<f64>,
    /// Closed cell outline.
    pub polygon: Polygon<f64>,
}

/// Cells covering an extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Tessellation {
    grid_type: GridType,
    cell_size: f64,
    cells: Vec<Cell>,
}

impl Tessellation {
    /// Tessellates `extent`.
    ///
    /// Square cells have side `cell_size` and are anchored at the extent's
    /// min corner; the last row and column may overhang the extent.
    /// Hexagons are pointy-top with adjacent centres `cell_size` apart;
    /// every hexagon touching the extent is kept.
    ///
    /// `cell_size` must be finite and positive; the engine validates it.
    #[must_use]
    pub fn build(extent: Rect<f64>, cell_size: f64, grid_type: GridType) -> Self {
        let cells = match grid_type {
            GridType::Square => square_cells(extent, cell_size),
            GridType::Hexagonal => hexagon_cells(extent, cell_size),
        };

        Self {
            grid_type,
            cell_size,
            cells,
        }
    }

    /// Cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if there are no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell shape.
    #[must_use]
    pub const fn grid_type(&self) -> GridType {
        self.grid_type
    }

    /// Cell size.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Consumes the tessellation, returning its cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    /// R-tree over the cell centres, for nearest-cell and distance-band
    /// queries.
    #[must_use]
    pub fn center_index(&self) -> RTree<CenterEntry> {
        RTree::bulk_load(
            self.cells
                .iter()
                .enumerate()
                .map(|(i, cell)| GeomWithData::new([cell.center.x, cell.center.y], i))
                .collect(),
        )
    }
}

/// Grows a zero-width or zero-height extent by half a cell on each side of
/// the flat dimension, so a single point or a line of points still gets a
/// grid.
#[must_use]
pub fn pad_degenerate(extent: Rect<f64>, cell_size: f64) -> Rect<f64> {
    let half = cell_size / 2.0;
    let (mut min, mut max) = (extent.min(), extent.max());
    if extent.width() <= 0.0 {
        min.x -= half;
        max.x += half;
    }
    if extent.height() <= 0.0 {
        min.y -= half;
        max.y += half;
    }
    Rect::new(min, max)
}

/// Upper bound on the number of cells [`Tessellation::build`] would
/// enumerate, computed without building anything.
#[must_use]
pub fn cell_estimate(extent: Rect<f64>, cell_size: f64, grid_type: GridType) -> f64 {
    match grid_type {
        GridType::Square => {
            span_count(extent.width(), cell_size) * span_count(extent.height(), cell_size)
        }
        GridType::Hexagonal => {
            let row_step = cell_size * SQRT_3 / 2.0;
            ((extent.width() / cell_size).ceil() + 3.0)
                * ((extent.height() / row_step).ceil() + 3.0)
        }
    }
}

/// Number of `size` steps needed to cover `span`, at least one. The small
/// tolerance keeps an extent that is an exact multiple of the size from
/// picking up an extra row through round-off.
fn span_count(span: f64, size: f64) -> f64 {
    (span / size - 1e-9).ceil().max(1.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn square_cells(extent: Rect<f64>, size: f64) -> Vec<Cell> {
    let origin = extent.min();
    let columns = span_count(extent.width(), size) as i64;
    let rows = span_count(extent.height(), size) as i64;

    let mut cells = Vec::with_capacity(usize::try_from(columns * rows).unwrap_or(0));
    for row in 0..rows {
        for col in 0..columns {
            let x0 = (col as f64).mul_add(size, origin.x);
            let y0 = (row as f64).mul_add(size, origin.y);
            let polygon = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x0 + size, y: y0 + size })
                .to_polygon();
            cells.push(Cell {
                row,
                col,
                center: coord! { x: x0 + size / 2.0, y: y0 + size / 2.0 },
                polygon,
            });
        }
    }
    cells
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn hexagon_cells(extent: Rect<f64>, spacing: f64) -> Vec<Cell> {
    let origin = extent.min();
    let row_step = spacing * SQRT_3 / 2.0;
    let radius = spacing / SQRT_3;
    let last_col = (extent.width() / spacing).ceil() as i64 + 1;
    let last_row = (extent.height() / row_step).ceil() as i64 + 1;

    let mut cells = Vec::new();
    for row in -1..=last_row {
        let shift = if row.rem_euclid(2) == 1 { spacing / 2.0 } else { 0.0 };
        let cy = (row as f64).mul_add(row_step, origin.y);
        for col in -1..=last_col {
            let cx = (col as f64).mul_add(spacing, origin.x) + shift;
            let polygon = hexagon(cx, cy, radius);
            if polygon.intersects(&extent) {
                cells.push(Cell {
                    row,
                    col,
                    center: coord! { x: cx, y: cy },
                    polygon,
                });
            }
        }
    }
    cells
}

/// Pointy-top hexagon with circumradius `radius`.
fn hexagon(cx: f64, cy: f64, radius: f64) -> Polygon<f64> {
    let ring = (0..6)
        .map(|k| {
            let angle = 60.0f64.mul_add(f64::from(k), 30.0).to_radians();
            coord! {
                x: radius.mul_add(angle.cos(), cx),
                y: radius.mul_add(angle.sin(), cy)
            }
        })
        .collect::<Vec<_>>();
    Polygon::new(LineString::new(ring), vec![])
}
