#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the species hotspot pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`species_hotspots_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use species_hotspots_boundary_models::fips::STATES;
use species_hotspots_cli_utils::{FetchProgress, MultiProgress, OutputProgress};
use species_hotspots_observation::inaturalist::INaturalistLoader;
use species_hotspots_pipeline::config::{preset, preset_names};
use species_hotspots_pipeline::{PipelineConfig, PipelineReport, export};

#[derive(Parser)]
#[command(name = "species_hotspots", about = "Species observation hotspot analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch observations, join them to sub-regions, and write hotspot surfaces
    Run {
        #[command(flatten)]
        source: ConfigSource,
        /// Directory the `GeoJSON` and JSON outputs are written to
        #[arg(long, default_value = "output")]
        output: PathBuf,
        /// Override the run file's maximum number of observations
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Parse and validate a run file without fetching anything
    Validate {
        #[command(flatten)]
        source: ConfigSource,
    },
    /// List the bundled run files
    Presets,
    /// List state names accepted by the `tigerweb` boundary source
    States,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ConfigSource {
    /// Path to a TOML run file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name of a bundled run file (see `presets`)
    #[arg(long)]
    preset: Option<String>,
}

impl ConfigSource {
    fn load(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let config = match (&self.config, &self.preset) {
            (Some(path), _) => PipelineConfig::from_path(path)?,
            (None, Some(name)) => preset(name)?,
            (None, None) => return Err("one of --config or --preset is required".into()),
        };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = species_hotspots_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            output,
            limit,
        } => {
            let mut config = source.load()?;
            if let Some(limit) = limit {
                config.observations.max_results = limit;
            }
            run(&multi, &config, &output).await?;
        }
        Commands::Validate { source } => {
            let plan = source.load()?.validate()?;
            println!("Run file is valid.");
            println!("  taxon:    {}", plan.query.taxon);
            println!("  boundary: {}", plan.boundary.outer_name());
            for config in &plan.hotspots {
                println!(
                    "  surface:  {} grid, cell size {}, {} aggregation, {} adjustment",
                    config.grid_type, config.cell_size, config.aggregation, config.adjustment
                );
            }
            for window in &plan.windows {
                println!(
                    "  window:   {} [{}, {})",
                    window.label, window.start, window.end
                );
            }
        }
        Commands::Presets => {
            for name in preset_names() {
                println!("{name}");
            }
        }
        Commands::States => {
            println!("{:<6} {:<6} NAME", "FIPS", "ABBR");
            println!("{}", "-".repeat(40));
            for (fips, abbr, name) in STATES {
                println!("{fips:<6} {abbr:<6} {name}");
            }
        }
    }

    Ok(())
}

async fn run(
    multi: &MultiProgress,
    config: &PipelineConfig,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let boundaries = species_hotspots_boundary::from_config(&config.boundary)?;
    let loader = INaturalistLoader::new()?
        .with_progress(FetchProgress::new(multi, &config.observations.taxon));

    let report = species_hotspots_pipeline::run(config, boundaries.as_ref(), &loader).await?;
    print_summary(&report);
    write_outputs(multi, &report, output)?;

    log::info!(
        "Finished in {:.1}s; outputs in {}",
        start.elapsed().as_secs_f64(),
        output.display()
    );
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    let summary = &report.join.summary;
    println!();
    println!("Observations fetched:        {}", report.fetched);
    println!("  missing location:          {}", summary.missing_location);
    println!("  failed reprojection:       {}", summary.reprojection_failed);
    println!("  outside {}: {}", report.outer.region.name, summary.outside_boundary);
    println!("  matched to a sub-region:   {}", summary.matched);
    println!("  inside but unmatched:      {}", summary.unmatched);
    println!("  missing date:              {}", report.missing_date);
    println!("  outside every window:      {}", report.outside_windows);
    for (label, count) in &report.window_counts {
        println!("  window {label}: {count}");
    }

    println!();
    println!("{:<10} {:<20} {:>6} {:>6} {:>6}", "MODE", "WINDOW", "CELLS", "HOT", "COLD");
    for (mode, surfaces) in &report.surfaces {
        for (label, surface) in surfaces {
            let cold = surface.results.iter().filter(|r| r.is_cold()).count();
            println!(
                "{:<10} {:<20} {:>6} {:>6} {:>6}",
                mode.as_ref(),
                label,
                surface.results.len(),
                surface.hot_count(),
                cold
            );
        }
    }
    println!();
}

fn write_outputs(
    multi: &MultiProgress,
    report: &PipelineReport,
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let crs = report.analysis_crs();

    let surface_count: usize = report.surfaces.values().map(std::collections::BTreeMap::len).sum();
    let progress = OutputProgress::new(multi, surface_count + 2);

    let path = dir.join("observations.geojson");
    write_file(
        &path,
        &export::observations_to_geojson(&report.join.observations, crs),
    )?;
    progress.wrote(&path);

    let path = dir.join("region_tallies.json");
    write_file(&path, &export::tallies_to_json(&report.tallies)?)?;
    progress.wrote(&path);

    for (mode, surfaces) in &report.surfaces {
        for (label, surface) in surfaces {
            let path = dir.join(format!(
                "hotspots_{}_{}.geojson",
                file_stem(label),
                mode.as_ref()
            ));
            write_file(&path, &export::surface_to_geojson(surface, crs))?;
            progress.wrote(&path);
        }
    }

    progress.finish(dir);
    Ok(())
}

/// Writes via a temporary file so a crash never leaves a truncated output.
fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Window labels are free text; keep file names portable.
fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
