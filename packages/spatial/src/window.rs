//! Temporal partitioning of joined observations into labelled windows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{JoinedObservation, RecordIssue};

/// A labelled half-open date range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window label, used as the key for per-window results.
    pub label: String,
    /// First day in the window.
    pub start: NaiveDate,
    /// First day after the window.
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Creates a window.
    #[must_use]
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Returns `true` if `date` falls in `[start, end)`.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Returns `true` if the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if the window contains no days.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Returns the labels of the first pair of overlapping windows, if any.
#[must_use]
pub fn windows_overlap(windows: &[TimeWindow]) -> Option<(&str, &str)> {
    windows.iter().enumerate().find_map(|(i, a)| {
        windows[i + 1..]
            .iter()
            .find(|b| a.overlaps(b))
            .map(|b| (a.label.as_str(), b.label.as_str()))
    })
}

/// Observations split by window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPartition {
    /// One entry per window, in the order the windows were given.
    pub windows: Vec<(TimeWindow, Vec<JoinedObservation>)>,
    /// Observations with no date; excluded from every window.
    pub missing_date: usize,
    /// Dated observations that fall in no window.
    pub outside_windows: usize,
}

impl WindowPartition {
    /// Returns the observations of the window with the given label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&[JoinedObservation]> {
        self.windows
            .iter()
            .find(|(window, _)| window.label == label)
            .map(|(_, observations)| observations.as_slice())
    }
}

/// Splits observations into the given windows.
///
/// Each dated observation goes to the first window (in the given order)
/// whose range contains its date, so the partitions are disjoint even if
/// the windows overlap. Callers are expected to reject overlapping windows
/// up front with [`windows_overlap`].
#[must_use]
pub fn partition_by_window(
    observations: &[JoinedObservation],
    windows: &[TimeWindow],
) -> WindowPartition {
    let mut buckets: Vec<Vec<JoinedObservation>> = vec![Vec::new(); windows.len()];
    let mut missing_date = 0;
    let mut outside_windows = 0;

    for joined in observations {
        let Some(date) = joined.observed_on() else {
            log::debug!(
                "Excluding {} from windows: {}",
                joined.observation.id,
                RecordIssue::MissingDate
            );
            missing_date += 1;
            continue;
        };

        match windows.iter().position(|w| w.contains(date)) {
            Some(i) => buckets[i].push(joined.clone()),
            None => outside_windows += 1,
        }
    }

    for (window, bucket) in windows.iter().zip(&buckets) {
        log::info!(
            "Window '{}' [{}, {}): {} observations",
            window.label,
            window.start,
            window.end,
            bucket.len()
        );
    }
    if missing_date > 0 {
        log::warn!("{missing_date} observations have no date and were excluded from all windows");
    }
    if outside_windows > 0 {
        log::info!("{outside_windows} dated observations fall outside every window");
    }

    WindowPartition {
        windows: windows.iter().cloned().zip(buckets).collect(),
        missing_date,
        outside_windows,
    }
}
