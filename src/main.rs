/// Command line driver for the fluid simulation
///
/// ```text
/// fluid-engine [--p-type=T] [--v-type=T] [--v-flow-type=T] [--ticks=N]
///              [--quiet=true|false] [--threads=N] [--seed=N]
///              [--snapshot-every=N] [--snapshot-dir=DIR] [--config=FILE]
///              <scenario>
/// ```

use anyhow::{Context, Result};
use fluid_engine::{run_simulation, ParsedArgs, SimulationConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ParsedArgs::parse(std::env::args().skip(1)).context("Failed to parse command line")?;
    let config = SimulationConfig::from_args(&args).context("Invalid configuration")?;
    let scenario = args.scenario_path()?;

    log::info!(
        "Simulating {} for {} ticks on {} worker threads",
        scenario.display(),
        config.ticks,
        config.worker_threads
    );

    let summary = run_simulation(&config, &scenario)
        .with_context(|| format!("Simulation of {} failed", scenario.display()))?;

    if summary.snapshots_written > 0 {
        log::info!(
            "Wrote {} snapshots to {}",
            summary.snapshots_written,
            config.snapshot_dir.display()
        );
    }
    println!("Executed {} ticks in {:?}", summary.ticks, summary.elapsed);
    Ok(())
}
