#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Species observation loaders.
//!
//! Each provider implements the [`ObservationLoader`] trait and returns
//! [`Observation`] records. Loaders never reject incomplete records:
//! missing coordinates or dates are surfaced as `None` fields so the
//! spatial join can drop and count them.

pub mod inaturalist;
pub mod parsing;
pub mod progress;
pub mod retry;

use async_trait::async_trait;
use species_hotspots_observation_models::{Observation, ObservationQuery};

/// Errors that can occur while loading observations.
#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider returned something that is not a usable response.
    #[error("Provider response error: {message}")]
    Response {
        /// Description of what went wrong.
        message: String,
    },
}

/// Trait that all observation providers must implement.
///
/// Returning fewer than `query.max_results` records is a valid, partial
/// result and not an error.
#[async_trait]
pub trait ObservationLoader: Send + Sync {
    /// Returns a short identifier for this provider (e.g. `"inaturalist"`).
    fn id(&self) -> &str;

    /// Fetches observations matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`ObservationError`] if the provider is unavailable or
    /// returns an unusable response.
    async fn fetch_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, ObservationError>;
}

/// Loader backed by an in-memory list, for tests and library callers that
/// already hold their records.
///
/// Applies the query's bounds and quality filter, then truncates to
/// `max_results`. Records without a location are kept regardless of
/// bounds since the provider cannot know where they are.
pub struct StaticObservationLoader {
    observations: Vec<Observation>,
}

impl StaticObservationLoader {
    /// Creates a loader over the given records.
    #[must_use]
    pub const fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }
}

#[async_trait]
impl ObservationLoader for StaticObservationLoader {
    fn id(&self) -> &'static str {
        "static"
    }

    async fn fetch_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, ObservationError> {
        let limit = usize::try_from(query.max_results).unwrap_or(usize::MAX);

        Ok(self
            .observations
            .iter()
            .filter(|obs| query.quality.is_empty() || query.quality.contains(&obs.quality))
            .filter(|obs| match (query.bounds, obs.location) {
                (Some(bounds), Some(location)) => bounds.contains(location.x, location.y),
                _ => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}
