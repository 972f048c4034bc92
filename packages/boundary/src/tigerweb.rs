//! Census Bureau `TIGERweb` boundary source.
//!
//! Serves state outlines (ACS 2023 vintage, layer 84) and their counties
//! (layer 82) as WGS84 `GeoJSON`. States are addressed by full name or
//! abbreviation and resolved to FIPS codes locally.

use async_trait::async_trait;
use species_hotspots_boundary_models::fips::{state_fips, state_name};
use species_hotspots_boundary_models::{OuterBoundary, Region, RegionLayer};
use species_hotspots_observation_models::Crs;

use crate::fetchers::arcgis::{self, LayerQuery};
use crate::normalize::normalize_features;
use crate::{BoundaryError, BoundarySource, validate_layer};

const STATES_LAYER_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/tigerWMS_ACS2023/MapServer/84/query";

const COUNTIES_LAYER_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/tigerWMS_ACS2023/MapServer/82/query";

/// Browser-like User-Agent; `TIGERweb`'s WAF rejects bare clients.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; SpeciesHotspots/0.1; +https://github.com)";

/// Boundary source backed by the `TIGERweb` REST API.
pub struct TigerwebBoundarySource {
    client: reqwest::Client,
}

impl TigerwebBoundarySource {
    /// Creates a new source with a `TIGERweb`-friendly HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the client cannot be built.
    pub fn new() -> Result<Self, BoundaryError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self { client })
    }
}

/// Resolves a state name or abbreviation to `(fips, canonical name)`.
fn resolve_state(name: &str) -> Result<(&'static str, &'static str), BoundaryError> {
    state_fips(name)
        .and_then(|fips| state_name(fips).map(|canonical| (fips, canonical)))
        .ok_or_else(|| BoundaryError::NotFound {
            name: name.to_string(),
        })
}

#[async_trait]
impl BoundarySource for TigerwebBoundarySource {
    async fn get_region_boundary(&self, name: &str) -> Result<OuterBoundary, BoundaryError> {
        let (fips, canonical) = resolve_state(name)?;
        log::info!("Fetching {canonical} state outline from TIGERweb...");

        let where_clause = format!("STATE='{fips}'");
        let features = arcgis::fetch(
            &self.client,
            &LayerQuery {
                url: STATES_LAYER_URL,
                where_clause: &where_clause,
                out_fields: "GEOID,STATE,BASENAME,NAME",
                order_by: "STATE",
            },
        )
        .await?;

        let regions = normalize_features(&features, "BASENAME")?;
        let Some(first) = regions.into_iter().next() else {
            return Err(BoundaryError::NotFound {
                name: canonical.to_string(),
            });
        };

        Ok(OuterBoundary {
            crs: Crs::Wgs84,
            region: Region {
                name: canonical.to_string(),
                geometry: first.geometry,
            },
        })
    }

    async fn get_subregions(&self, parent_name: &str) -> Result<RegionLayer, BoundaryError> {
        let (fips, canonical) = resolve_state(parent_name)?;
        log::info!("Fetching {canonical} county boundaries from TIGERweb...");

        let where_clause = format!("STATE='{fips}'");
        let features = arcgis::fetch(
            &self.client,
            &LayerQuery {
                url: COUNTIES_LAYER_URL,
                where_clause: &where_clause,
                out_fields: "GEOID,STATE,COUNTY,BASENAME,NAME",
                order_by: "COUNTY",
            },
        )
        .await?;

        let layer = RegionLayer {
            crs: Crs::Wgs84,
            regions: normalize_features(&features, "BASENAME")?,
        };
        validate_layer(&layer)?;
        log::info!("Loaded {} counties for {canonical}", layer.regions.len());

        Ok(layer)
    }
}
