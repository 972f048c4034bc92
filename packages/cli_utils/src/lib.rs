#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `species_hotspots` binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines are suspended while bars redraw. [`FetchProgress`] renders
//! observation paging behind the loader's [`ProgressCallback`] seam and
//! [`OutputProgress`] counts written result files.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use species_hotspots_observation::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Observation download progress.
///
/// Starts as a spinner because the provider only reports how many records
/// match once the first page arrives; the loader then calls
/// [`ProgressCallback::set_total`] and the spinner becomes a bar.
pub struct FetchProgress {
    bar: ProgressBar,
    taxon: String,
}

impl FetchProgress {
    /// Adds a fetch spinner for `taxon` to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, taxon: &str) -> Arc<Self> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Fetching {taxon} observations"));

        Arc::new(Self {
            bar,
            taxon: taxon.to_string(),
        })
    }
}

impl ProgressCallback for FetchProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(
            ProgressStyle::with_template(
                "  {msg} {wide_bar:.cyan/dim} {pos}/{len} records {percent}% [{eta}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(format!("{}: {msg}", self.taxon));
    }
}

/// Progress over the files a run writes.
pub struct OutputProgress {
    bar: ProgressBar,
}

impl OutputProgress {
    /// Adds a bar for `files` outputs to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, files: usize) -> Self {
        let bar = multi.add(ProgressBar::new(u64::try_from(files).unwrap_or(u64::MAX)));
        bar.set_style(
            ProgressStyle::with_template(
                "{msg:<32} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        bar.set_message("Writing outputs");
        Self { bar }
    }

    /// Records that `path` has been written.
    pub fn wrote(&self, path: &Path) {
        if let Some(name) = path.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        self.bar.inc(1);
    }

    /// Closes the bar with the number of files written.
    pub fn finish(&self, dir: &Path) {
        self.bar.finish_with_message(format!(
            "Wrote {} files to {}",
            self.bar.position(),
            dir.display()
        ));
    }
}

/// Filter string for the logger: `RUST_LOG` when set and non-empty,
/// otherwise [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn log_filter(env: Option<&str>) -> &str {
    env.map(str::trim)
        .filter(|filter| !filter.is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER)
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that every bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let env = std::env::var("RUST_LOG").ok();
    let logger = pretty_env_logger::formatted_builder()
        .parse_filters(log_filter(env.as_deref()))
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already set in tests

    log::set_max_level(level);

    multi
}
