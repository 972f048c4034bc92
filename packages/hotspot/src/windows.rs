use std::collections::BTreeMap;

use geo::Rect;
use species_hotspots_hotspot_models::{HotspotPoint, HotspotSurface};

use crate::{HotspotEngine, HotspotError};

/// Computes one surface per window, each on its own blocking task.
///
/// Windows are independent, so they run concurrently; the result is keyed
/// by window label regardless of completion order. Every window shares the
/// same `extent` so their grids line up.
///
/// # Errors
///
/// Returns the first window's error in label order, or
/// [`HotspotError::Task`] if a task panicked. No partial map is returned.
pub async fn compute_windows(
    engine: HotspotEngine,
    windows: Vec<(String, Vec<HotspotPoint>)>,
    extent: Option<Rect<f64>>,
) -> Result<BTreeMap<String, HotspotSurface>, HotspotError> {
    log::info!(
        "Computing {} hotspot surfaces ({} grid, {})",
        windows.len(),
        engine.config().grid_type,
        engine.config().aggregation,
    );

    let tasks = windows.into_iter().map(|(label, points)| {
        tokio::task::spawn_blocking(move || {
            let surface = engine.compute(&label, &points, extent);
            (label, surface)
        })
    });

    let mut completed = futures::future::join_all(tasks)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    completed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut surfaces = BTreeMap::new();
    for (label, surface) in completed {
        surfaces.insert(label, surface?);
    }

    Ok(surfaces)
}
