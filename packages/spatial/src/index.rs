//! R-tree index over a region layer for point attribution.

use geo::{BoundingRect as _, Intersects as _, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use species_hotspots_boundary_models::{Region, RegionLayer};

/// A region's envelope stored in the R-tree, pointing back at the layer.
struct RegionEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-in-polygon lookup over one [`RegionLayer`].
///
/// Points on a shared edge intersect several regions; the region that
/// appears first in the layer wins, so attribution is stable across runs.
pub struct RegionIndex<'a> {
    layer: &'a RegionLayer,
    tree: RTree<RegionEntry>,
}

impl<'a> RegionIndex<'a> {
    /// Builds the index. Regions with empty geometry are never matched.
    #[must_use]
    pub fn new(layer: &'a RegionLayer) -> Self {
        let entries = layer
            .regions
            .iter()
            .enumerate()
            .filter_map(|(position, region)| {
                envelope_of(&region.geometry).map(|envelope| RegionEntry { position, envelope })
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Indexed {} of {} regions",
            entries.len(),
            layer.regions.len()
        );

        Self {
            layer,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Returns the first region (in layer order) whose geometry intersects
    /// the point, boundary included.
    #[must_use]
    pub fn lookup(&self, point: Point<f64>) -> Option<&'a Region> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| self.layer.regions[entry.position].geometry.intersects(&point))
            .map(|entry| entry.position)
            .min()
            .map(|position| &self.layer.regions[position])
    }

    /// Number of indexed regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if no region could be indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

fn envelope_of(geometry: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    geometry.bounding_rect().map(|rect| {
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    })
}
