//! Point-in-polygon join of observations against a region layer.

use geo::{Intersects as _, Point};
use serde::Serialize;
use species_hotspots_boundary_models::{OuterBoundary, RegionLayer};
use species_hotspots_observation_models::Observation;

use crate::crs::{reproject_multipolygon, reproject_point};
use crate::index::RegionIndex;
use crate::{JoinedObservation, RecordIssue, SpatialError};

/// Per-record outcome counts of a join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSummary {
    /// Records offered to the join.
    pub input: usize,
    /// Dropped: no coordinates.
    pub missing_location: usize,
    /// Dropped: coordinates could not be moved into the layer CRS.
    pub reprojection_failed: usize,
    /// Dropped: outside the outer boundary.
    pub outside_boundary: usize,
    /// Kept and attributed to a region.
    pub matched: usize,
    /// Kept, inside the outer boundary but in no region.
    pub unmatched: usize,
}

impl JoinSummary {
    /// Number of records kept by the join.
    #[must_use]
    pub const fn kept(&self) -> usize {
        self.matched + self.unmatched
    }
}

/// Result of [`join_observations`].
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutput {
    /// Kept observations in input order.
    pub observations: Vec<JoinedObservation>,
    /// Outcome counts.
    pub summary: JoinSummary,
}

/// Joins observations to the regions of `layer`.
///
/// Every located observation is reprojected into the layer CRS. Records
/// with no location, with coordinates that cannot be reprojected, or that
/// fall outside `outer` are dropped and counted. Kept records carry the
/// name of the first region (in layer order) that contains them, boundary
/// included, or `None` if no region does.
///
/// # Errors
///
/// Returns [`SpatialError::Reprojection`] if the outer boundary cannot be
/// reprojected into the layer CRS.
pub fn join_observations(
    observations: &[Observation],
    layer: &RegionLayer,
    outer: &OuterBoundary,
) -> Result<JoinOutput, SpatialError> {
    let outer_geometry = reproject_multipolygon(&outer.region.geometry, outer.crs, layer.crs)?;
    let index = RegionIndex::new(layer);

    let mut summary = JoinSummary {
        input: observations.len(),
        ..JoinSummary::default()
    };
    let mut joined = Vec::with_capacity(observations.len());

    for observation in observations {
        let Some(location) = observation.location else {
            log::debug!("Dropping {}: {}", observation.id, RecordIssue::MissingLocation);
            summary.missing_location += 1;
            continue;
        };

        let point = match reproject_point(Point::new(location.x, location.y), location.crs, layer.crs)
        {
            Ok(point) => point,
            Err(e) => {
                let issue = RecordIssue::Reprojection(e.to_string());
                log::debug!("Dropping {}: {issue}", observation.id);
                summary.reprojection_failed += 1;
                continue;
            }
        };

        if !outer_geometry.intersects(&point) {
            summary.outside_boundary += 1;
            continue;
        }

        let region = index.lookup(point).map(|r| r.name.clone());
        if region.is_some() {
            summary.matched += 1;
        } else {
            summary.unmatched += 1;
        }

        joined.push(JoinedObservation {
            observation: observation.clone(),
            point,
            region,
        });
    }

    log::info!(
        "Joined {} observations to {}: {} matched, {} unmatched, dropped {} without location, {} unprojectable, {} outside boundary",
        summary.input,
        outer.region.name,
        summary.matched,
        summary.unmatched,
        summary.missing_location,
        summary.reprojection_failed,
        summary.outside_boundary,
    );
    if summary.missing_location + summary.reprojection_failed > 0 {
        log::warn!(
            "{} observations could not be placed on the map",
            summary.missing_location + summary.reprojection_failed
        );
    }

    Ok(JoinOutput {
        observations: joined,
        summary,
    })
}
