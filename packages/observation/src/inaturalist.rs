//! iNaturalist observation loader.
//!
//! Pages through `GET /v1/observations` ordered by ascending id, using the
//! `id_above` cursor rather than page numbers (the API caps page-number
//! pagination at 10,000 records). Stops at `max_results` or the first
//! empty page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use species_hotspots_observation_models::{Observation, ObservationQuery, QualityGrade};

use crate::progress::{ProgressCallback, null_progress};
use crate::{ObservationError, ObservationLoader, parsing, retry};

/// Public iNaturalist API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.inaturalist.org/v1";

/// Largest page the API will return.
const MAX_PER_PAGE: u64 = 200;

/// Courtesy delay between pages. iNaturalist asks clients to stay around
/// one request per second.
const PAGE_DELAY: Duration = Duration::from_millis(1000);

const USER_AGENT: &str = "species-hotspots/0.1 (+https://github.com/BSteffaniak/species-hotspots)";

/// Loader backed by the public iNaturalist API.
pub struct INaturalistLoader {
    client: reqwest::Client,
    base_url: String,
    progress: Arc<dyn ProgressCallback>,
}

impl INaturalistLoader {
    /// Creates a loader against [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`ObservationError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ObservationError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a loader against a custom API base URL (mirrors, tests).
    ///
    /// # Errors
    ///
    /// Returns [`ObservationError`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, ObservationError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            progress: null_progress(),
        })
    }

    /// Reports page progress through the given callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }
}

#[async_trait]
impl ObservationLoader for INaturalistLoader {
    fn id(&self) -> &'static str {
        "inaturalist"
    }

    async fn fetch_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, ObservationError> {
        let url = format!("{}/observations", self.base_url);
        let mut observations: Vec<Observation> = Vec::new();
        let mut id_above: u64 = 0;
        let mut total_reported = false;

        log::info!(
            "[inaturalist] Fetching up to {} observations of '{}'",
            query.max_results,
            query.taxon
        );
        self.progress.set_message(format!("iNaturalist: {}", query.taxon));

        while (observations.len() as u64) < query.max_results {
            let remaining = query.max_results - observations.len() as u64;
            let params = page_params(query, id_above, remaining.min(MAX_PER_PAGE));

            let body = retry::send_json(|| self.client.get(&url).query(&params)).await?;

            if !total_reported {
                let total = body["total_results"].as_u64().unwrap_or(0);
                self.progress.set_total(total.min(query.max_results));
                log::info!("[inaturalist] {total} matching observations reported");
                total_reported = true;
            }

            let results = body["results"]
                .as_array()
                .ok_or_else(|| ObservationError::Response {
                    message: "No results array in iNaturalist response".to_string(),
                })?;

            if results.is_empty() {
                break;
            }

            let Some(last_id) = results.iter().filter_map(|r| r["id"].as_u64()).max() else {
                return Err(ObservationError::Response {
                    message: "iNaturalist page has no record ids".to_string(),
                });
            };
            if last_id <= id_above {
                return Err(ObservationError::Response {
                    message: format!("iNaturalist cursor did not advance past id {id_above}"),
                });
            }
            id_above = last_id;

            let page: Vec<Observation> = results.iter().filter_map(parse_record).collect();
            self.progress.inc(page.len() as u64);
            log::debug!(
                "[inaturalist] page of {} records (total: {})",
                page.len(),
                observations.len() + page.len()
            );
            observations.extend(page);

            tokio::time::sleep(PAGE_DELAY).await;
        }

        observations.truncate(usize::try_from(query.max_results).unwrap_or(usize::MAX));
        self.progress
            .finish(format!("iNaturalist: {} observations", observations.len()));
        log::info!("[inaturalist] Loaded {} observations", observations.len());

        Ok(observations)
    }
}

/// Builds the query-string parameters for one page.
fn page_params(query: &ObservationQuery, id_above: u64, per_page: u64) -> Vec<(String, String)> {
    let mut params = vec![
        ("taxon_name".to_string(), query.taxon.clone()),
        ("order_by".to_string(), "id".to_string()),
        ("order".to_string(), "asc".to_string()),
        ("per_page".to_string(), per_page.to_string()),
        ("id_above".to_string(), id_above.to_string()),
    ];

    if let Some(bounds) = query.bounds {
        params.push(("swlat".to_string(), bounds.min_lat.to_string()));
        params.push(("swlng".to_string(), bounds.min_lng.to_string()));
        params.push(("nelat".to_string(), bounds.max_lat.to_string()));
        params.push(("nelng".to_string(), bounds.max_lng.to_string()));
    }

    if !query.quality.is_empty() {
        let grades: Vec<&str> = query
            .quality
            .iter()
            .filter(|q| **q != QualityGrade::Unknown)
            .map(AsRef::<str>::as_ref)
            .collect();
        if !grades.is_empty() {
            params.push(("quality_grade".to_string(), grades.join(",")));
        }
    }

    params
}

/// Converts one iNaturalist result object into an [`Observation`].
///
/// Only a missing id makes the record unusable; everything else degrades
/// to `None`.
fn parse_record(record: &serde_json::Value) -> Option<Observation> {
    let id = record["id"].as_u64()?.to_string();

    let location = parsing::parse_geojson_point(&record["geojson"]).or_else(|| {
        record["location"]
            .as_str()
            .and_then(parsing::parse_lat_lng_pair)
    });

    let observed_on = record["observed_on"]
        .as_str()
        .and_then(parsing::parse_observed_on);

    let quality = record["quality_grade"]
        .as_str()
        .map_or(QualityGrade::Unknown, QualityGrade::from_provider);

    let taxon_name = record["taxon"]["name"].as_str().map(str::to_string);
    let place_guess = record["place_guess"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if location.is_none() {
        log::debug!("[inaturalist] observation {id} has no usable location");
    }

    Some(Observation {
        id,
        location,
        observed_on,
        quality,
        taxon_name,
        place_guess,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use species_hotspots_observation_models::BoundingBox;

    #[test]
    fn parses_complete_record() {
        let record = serde_json::json!({
            "id": 98765,
            "observed_on": "2022-08-03",
            "quality_grade": "research",
            "geojson": {"type": "Point", "coordinates": [-75.5, 40.6]},
            "location": "40.6,-75.5",
            "taxon": {"name": "Lycorma delicatula"},
            "place_guess": "Allentown, PA"
        });
        let obs = parse_record(&record).unwrap();
        assert_eq!(obs.id, "98765");
        assert_eq!(obs.quality, QualityGrade::Research);
        assert_eq!(obs.observed_on.unwrap().to_string(), "2022-08-03");
        let loc = obs.location.unwrap();
        assert!((loc.x - -75.5).abs() < f64::EPSILON);
        assert_eq!(obs.taxon_name.as_deref(), Some("Lycorma delicatula"));
        assert_eq!(obs.place_guess.as_deref(), Some("Allentown, PA"));
    }

    #[test]
    fn falls_back_to_location_string() {
        let record = serde_json::json!({
            "id": 1,
            "geojson": null,
            "location": "40.0,-76.0",
            "quality_grade": "needs_id"
        });
        let obs = parse_record(&record).unwrap();
        let loc = obs.location.unwrap();
        assert!((loc.y - 40.0).abs() < f64::EPSILON);
        assert_eq!(obs.quality, QualityGrade::NeedsId);
    }

    #[test]
    fn incomplete_record_keeps_none_fields() {
        let record = serde_json::json!({"id": 7, "observed_on": "sometime", "place_guess": "  "});
        let obs = parse_record(&record).unwrap();
        assert!(obs.location.is_none());
        assert!(obs.observed_on.is_none());
        assert_eq!(obs.quality, QualityGrade::Unknown);
        assert!(obs.place_guess.is_none());
    }

    #[test]
    fn record_without_id_is_skipped() {
        assert!(parse_record(&serde_json::json!({"observed_on": "2022-01-01"})).is_none());
    }

    #[test]
    fn page_params_include_bounds_and_grades() {
        let query = ObservationQuery {
            taxon: "Lycorma delicatula".to_string(),
            bounds: Some(BoundingBox {
                min_lng: -80.5,
                min_lat: 39.7,
                max_lng: -74.7,
                max_lat: 42.3,
            }),
            quality: vec![QualityGrade::Research, QualityGrade::NeedsId],
            max_results: 500,
        };
        let params = page_params(&query, 42, 200);
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("taxon_name"), Some("Lycorma delicatula"));
        assert_eq!(get("id_above"), Some("42"));
        assert_eq!(get("per_page"), Some("200"));
        assert_eq!(get("swlat"), Some("39.7"));
        assert_eq!(get("nelng"), Some("-74.7"));
        assert_eq!(get("quality_grade"), Some("research,needs_id"));
    }

    #[test]
    fn page_params_omit_empty_filters() {
        let query = ObservationQuery {
            taxon: "x".to_string(),
            bounds: None,
            quality: Vec::new(),
            max_results: 10,
        };
        let params = page_params(&query, 0, 10);
        assert!(params.iter().all(|(k, _)| k != "swlat" && k != "quality_grade"));
    }
}
