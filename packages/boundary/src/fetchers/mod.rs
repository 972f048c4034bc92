//! Raw feature fetchers for the boundary sources.
//!
//! Each fetcher returns the `features` array of a `GeoJSON` (or Esri JSON)
//! response; turning features into regions is the job of
//! [`crate::normalize`].

pub mod arcgis;
pub mod geojson_url;
