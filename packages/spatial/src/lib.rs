#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial join and temporal partitioning of species observations.
//!
//! Takes raw [`Observation`]s plus a boundary layer, reprojects every point
//! into the layer's CRS, drops records that cannot be placed inside the
//! outer study-area boundary, attributes the containing region via an
//! R-tree, and splits the survivors into disjoint time windows.
//!
//! Nothing in this crate performs I/O. Per-record problems are counted and
//! logged, never returned as errors.

pub mod crs;
pub mod index;
pub mod join;
pub mod tally;
pub mod window;

use chrono::NaiveDate;
use geo::Point;
use species_hotspots_observation_models::Observation;
use thiserror::Error;

pub use crs::ReprojectionError;
pub use index::RegionIndex;
pub use join::{JoinOutput, JoinSummary, join_observations};
pub use tally::{RegionTally, density_by_region, tally_by_region};
pub use window::{TimeWindow, WindowPartition, partition_by_window, windows_overlap};

/// Errors that abort a spatial join.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The outer boundary could not be expressed in the layer CRS.
    #[error("outer boundary reprojection failed: {0}")]
    Reprojection(#[from] ReprojectionError),
}

/// A problem with a single observation record. Never fatal; each
/// occurrence is counted in a [`JoinSummary`] or [`WindowPartition`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordIssue {
    /// The record has no usable coordinates.
    #[error("missing location")]
    MissingLocation,
    /// The record has no observation date.
    #[error("missing observation date")]
    MissingDate,
    /// The record's coordinates could not be reprojected.
    #[error("reprojection failed: {0}")]
    Reprojection(String),
}

/// An observation that survived the join, with its location expressed in
/// the region layer's CRS and the name of the containing region.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedObservation {
    /// The original record, unchanged.
    pub observation: Observation,
    /// Location in the layer CRS.
    pub point: Point<f64>,
    /// Containing region, or `None` if the point is inside the outer
    /// boundary but in no sub-region.
    pub region: Option<String>,
}

impl JoinedObservation {
    /// Observation date, if the record has one.
    #[must_use]
    pub const fn observed_on(&self) -> Option<NaiveDate> {
        self.observation.observed_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_issues_describe_themselves() {
        assert_eq!(RecordIssue::MissingLocation.to_string(), "missing location");
        assert_eq!(
            RecordIssue::MissingDate.to_string(),
            "missing observation date"
        );

        let issue = RecordIssue::Reprojection("latitude 91 out of range".to_string());
        assert_eq!(
            issue.to_string(),
            "reprojection failed: latitude 91 out of range"
        );
        let boxed: Box<dyn std::error::Error> = Box::new(issue);
        assert!(boxed.source().is_none());
    }
}
