//! `ArcGIS` `MapServer` query fetcher (used for Census `TIGERweb`).
//!
//! Requests `f=geojson` in WGS84 and pages with `resultOffset` while the
//! server reports `exceededTransferLimit`. Each page is retried with
//! exponential backoff because `TIGERweb` intermittently answers large
//! geometry requests with 5xx pages or WAF blocks.

use std::time::Duration;

use crate::BoundaryError;
use crate::normalize::feature_array;

/// Records requested per page. Kept low; county polygons are large.
const PAGE_SIZE: u32 = 100;

/// Attempts per page before giving up.
const MAX_ATTEMPTS: u32 = 4;

/// Query parameters for one layer request.
pub struct LayerQuery<'a> {
    /// Layer query URL (up to and including `/query`).
    pub url: &'a str,
    /// SQL-ish `where` clause, unencoded.
    pub where_clause: &'a str,
    /// Comma-separated list of attribute fields to return.
    pub out_fields: &'a str,
    /// Field to order by, so page boundaries and region order are stable.
    pub order_by: &'a str,
}

/// Fetches every feature matching the query.
///
/// # Errors
///
/// Returns [`BoundaryError`] if a page still fails after all attempts or
/// the service answers with an `ArcGIS` error envelope.
pub async fn fetch(
    client: &reqwest::Client,
    query: &LayerQuery<'_>,
) -> Result<Vec<serde_json::Value>, BoundaryError> {
    let mut all_features = Vec::new();
    let mut offset = 0u32;

    loop {
        let params = [
            ("where", query.where_clause.to_string()),
            ("outFields", query.out_fields.to_string()),
            ("orderByFields", query.order_by.to_string()),
            ("outSR", "4326".to_string()),
            ("f", "geojson".to_string()),
            ("returnGeometry", "true".to_string()),
            ("resultRecordCount", PAGE_SIZE.to_string()),
            ("resultOffset", offset.to_string()),
        ];

        let json = fetch_page_with_retry(client, query.url, &params).await?;
        let features = feature_array(&json)?;

        if features.is_empty() {
            break;
        }

        #[allow(clippy::cast_possible_truncation)]
        let page_len = features.len() as u32;
        all_features.extend(features);

        let exceeded = json
            .get("exceededTransferLimit")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if !exceeded {
            break;
        }

        offset += page_len;
        log::debug!("ArcGIS: {} features so far, fetching next page", all_features.len());
    }

    Ok(all_features)
}

async fn fetch_page_with_retry(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<serde_json::Value, BoundaryError> {
    let mut last_error = String::new();

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("ArcGIS retry {attempt}/{MAX_ATTEMPTS} in {delay:?}: {last_error}");
            tokio::time::sleep(delay).await;
        }

        let resp = match client.get(url).query(params).send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = format!("request error: {e}");
                continue;
            }
        };

        let status = resp.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BoundaryError::Geometry {
                message: format!("ArcGIS request failed with status {status}"),
            });
        }
        if !status.is_success() {
            last_error = format!("HTTP {status}");
            continue;
        }

        let json: serde_json::Value = match resp.json().await {
            Ok(j) => j,
            Err(e) => {
                last_error = format!("unreadable body: {e}");
                continue;
            }
        };

        if let Some(error) = json.get("error") {
            last_error = format!(
                "ArcGIS error {}: {}",
                error["code"].as_i64().unwrap_or(0),
                error["message"].as_str().unwrap_or("unknown")
            );
            continue;
        }

        return Ok(json);
    }

    Err(BoundaryError::Geometry {
        message: format!("ArcGIS request failed after {MAX_ATTEMPTS} attempts: {last_error}"),
    })
}
