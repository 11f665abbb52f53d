//! Tellus Run - drives a climate scenario from a synchronous frame loop
//!
//! Builds a lattice world, wires up the executor/orchestrator/recorder, runs
//! the requested number of orbits, then prints a per-latitude-band summary
//! of the last complete orbit.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tellus_runtime::executor::Executor;
use tellus_runtime::fields::FieldSet;
use tellus_runtime::grid::GridTopology;
use tellus_runtime::orchestrator::Orchestrator;
use tellus_runtime::recorder::Recorder;
use tellus_runtime::SimConfig;

#[derive(Parser, Debug)]
#[command(name = "tellus-run")]
#[command(about = "Run a Tellus climate scenario")]
struct Cli {
    /// Path to a JSON scenario config (defaults to the built-in demo)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Orbits to simulate
    #[arg(long, default_value = "2")]
    orbits: u64,

    /// Physics steps per host frame
    #[arg(long, default_value = "64")]
    steps_per_frame: u32,

    /// Latitude bands in the demo grid
    #[arg(long, default_value = "6")]
    rows: usize,

    /// Cells per latitude band in the demo grid
    #[arg(long, default_value = "12")]
    cols: usize,
}

/// Hourly steps over a short year keep the demo quick.
fn demo_config() -> SimConfig {
    SimConfig {
        dt: 3_600.0,
        year_length: 1_440.0 * 3_600.0,
        rotations_per_year: 60.0,
        steps_per_orbit: 1_440,
        samples_per_orbit: 96,
        layers: 3,
        ..SimConfig::default()
    }
}

fn load_config(cli: &Cli) -> Result<SimConfig, String> {
    let config = match &cli.scenario {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("cannot parse {}: {e}", path.display()))?
        }
        None => demo_config(),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tellus_run=info,tellus_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load scenario: {e}");
            std::process::exit(1);
        }
    };

    info!(
        steps_per_orbit = config.steps_per_orbit,
        samples_per_orbit = config.samples_per_orbit,
        layers = config.layers,
        "scenario loaded"
    );

    let grid = GridTopology::lattice(cli.rows, cli.cols);
    let mut fields = FieldSet::new(grid.cell_count(), config.layers);
    // Uniform shallow ocean so hydrology and clouds participate
    fields.water.set_initial(&vec![25.0; grid.cell_count()]);

    let mut executor = Executor::standard();
    executor.set_error_callback(Box::new(|err| {
        error!(%err, "kernel dispatch failed");
    }));

    let mut orchestrator = Orchestrator::new(executor);
    orchestrator.on_milestone(Box::new(|m| {
        info!(orbit = m.orbit, kind = ?m.kind, "milestone");
    }));

    let mut recorder = Recorder::new(&config, grid.cell_count());
    recorder.track(
        "surface_temperature",
        Box::new(|f: &FieldSet| f.surface_temp.current()),
    );
    recorder.track("surface_water", Box::new(|f: &FieldSet| f.water.current()));

    info!(cells = grid.cell_count(), orbits = cli.orbits, "starting run");
    orchestrator.play();

    while orchestrator.orbit() < cli.orbits {
        let done = orchestrator.tick(
            &grid,
            &config,
            &mut fields,
            Some(&mut recorder),
            cli.steps_per_frame,
        );
        if done == 0 {
            error!(
                orbit = orchestrator.orbit(),
                physics_step = orchestrator.physics_step(),
                "run halted before completion"
            );
            std::process::exit(1);
        }
    }
    orchestrator.complete();

    print_band_summary(&cli, &grid, &recorder);
}

/// Mean/min/max surface temperature per latitude band over the last
/// complete orbit.
fn print_band_summary(cli: &Cli, grid: &GridTopology, recorder: &Recorder) {
    if !recorder.has_complete_orbit() {
        info!("no complete orbit recorded");
        return;
    }
    for row in 0..cli.rows {
        let lat_deg = grid.latitude(row * cli.cols).to_degrees();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut count = 0usize;
        for col in 0..cli.cols {
            let cell = row * cli.cols + col;
            if let Some(samples) = recorder.orbit_samples("surface_temperature", cell) {
                for v in samples {
                    sum += v;
                    min = min.min(v);
                    max = max.max(v);
                    count += 1;
                }
            }
        }
        if count > 0 {
            info!(
                "band {row} ({lat_deg:+.1} deg): mean {:.1} K, min {:.1} K, max {:.1} K",
                sum / count as f64,
                min,
                max
            );
        }
    }
}
