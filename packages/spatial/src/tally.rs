//! Per-region observation counts and densities.

use std::collections::BTreeMap;

use geo::Area as _;
use serde::Serialize;
use species_hotspots_boundary_models::RegionLayer;

use crate::JoinedObservation;

/// Observation count for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTally {
    /// Region name.
    pub name: String,
    /// Observations attributed to the region.
    pub count: u64,
    /// Planar area in squared layer-CRS units.
    pub area: f64,
    /// `count / area`, or `0.0` for a region with no area.
    pub density: f64,
}

/// Counts observations per region, returning one entry for every region
/// in layer order (zero-count regions included). Unmatched observations
/// are not tallied.
#[must_use]
pub fn tally_by_region(observations: &[JoinedObservation], layer: &RegionLayer) -> Vec<RegionTally> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for joined in observations {
        if let Some(name) = &joined.region {
            *counts.entry(name.as_str()).or_default() += 1;
        }
    }

    layer
        .regions
        .iter()
        .map(|region| {
            let count = counts.get(region.name.as_str()).copied().unwrap_or(0);
            let area = region.geometry.unsigned_area();
            #[allow(clippy::cast_precision_loss)]
            let density = if area > 0.0 { count as f64 / area } else { 0.0 };
            RegionTally {
                name: region.name.clone(),
                count,
                area,
                density,
            }
        })
        .collect()
}

/// Region name to record density, for weighting points by the density of
/// the region they fall in.
#[must_use]
pub fn density_by_region(tallies: &[RegionTally]) -> BTreeMap<String, f64> {
    tallies
        .iter()
        .map(|t| (t.name.clone(), t.density))
        .collect()
}
