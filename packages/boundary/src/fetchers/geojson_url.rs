//! `GeoJSON` `FeatureCollection` loader for URLs and local files.

use crate::BoundaryError;
use crate::normalize::feature_array;

/// Returns `true` if `location` should be fetched over HTTP.
#[must_use]
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Loads all features from a `GeoJSON` `FeatureCollection` at a URL or
/// file path.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the request or file read fails or the
/// body is not a `FeatureCollection`.
pub async fn fetch(
    client: &reqwest::Client,
    location: &str,
) -> Result<Vec<serde_json::Value>, BoundaryError> {
    let body = if is_url(location) {
        let resp = client.get(location).send().await?;
        if !resp.status().is_success() {
            return Err(BoundaryError::Geometry {
                message: format!(
                    "GeoJSON request for {location} failed with status {}",
                    resp.status()
                ),
            });
        }
        resp.text().await?
    } else {
        std::fs::read_to_string(location).map_err(|source| BoundaryError::Io {
            path: location.to_string(),
            source,
        })?
    };

    parse_collection(&body)
}

/// Parses a `FeatureCollection` body into its features.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the body is not JSON or has no features
/// array.
pub fn parse_collection(body: &str) -> Result<Vec<serde_json::Value>, BoundaryError> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    feature_array(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_urls() {
        assert!(is_url("https://example.com/counties.geojson"));
        assert!(is_url("http://localhost/x.geojson"));
        assert!(!is_url("data/counties.geojson"));
    }

    #[test]
    fn parses_feature_collections() {
        let body = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":null}]}"#;
        assert_eq!(parse_collection(body).unwrap().len(), 1);
        assert!(parse_collection("not json").is_err());
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let client = reqwest::Client::new();
        let result = fetch(&client, "/nonexistent/boundaries.geojson").await;
        assert!(matches!(result, Err(BoundaryError::Io { .. })));
    }
}
