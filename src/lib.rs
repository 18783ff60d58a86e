pub mod cli;
pub mod config;
pub mod error;
pub mod fluid;
pub mod grid;
pub mod numeric;
pub mod scenario;
pub mod thread_pool;

use std::path::{Path, PathBuf};

pub use cli::ParsedArgs;
pub use config::SimulationConfig;
pub use error::{EngineError, EngineResult};
pub use fluid::{EngineConfig, FluidEngine, RunOptions, RunSummary, TickReport};
pub use numeric::{dispatch, EngineVisitor, NumericType, Scalar};
pub use scenario::Scenario;
pub use thread_pool::TaskPool;

/// Runs the scenario at `scenario` with the numeric types named in `config`.
///
/// Prints the selected types, then every rendered tick, to stdout.
pub fn run_simulation(config: &SimulationConfig, scenario: impl AsRef<Path>) -> EngineResult<RunSummary> {
    let (p, v, v_flow) = config.numeric_types()?;
    log::info!("Numeric types: p = {}, v = {}, v_flow = {}", p, v, v_flow);
    println!("Using following types:");
    println!("p-type:      {}", p);
    println!("v-type:      {}", v);
    println!("v-flow-type: {}", v_flow);

    dispatch(
        p,
        v,
        v_flow,
        RunSimulation {
            config,
            scenario: scenario.as_ref().to_path_buf(),
        },
    )?
}

struct RunSimulation<'a> {
    config: &'a SimulationConfig,
    scenario: PathBuf,
}

impl EngineVisitor for RunSimulation<'_> {
    type Output = EngineResult<RunSummary>;

    fn visit<P, V, VF>(self) -> Self::Output
    where
        P: Scalar,
        V: Scalar + numeric::CommonType<VF>,
        VF: Scalar,
    {
        let mut engine = FluidEngine::<P, V, VF>::from_path(&self.scenario, &self.config.engine_config())?;
        engine.run(&self.config.run_options())
    }
}
