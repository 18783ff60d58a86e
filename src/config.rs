//! Simulation settings
//!
//! Defaults, optionally overlaid by a TOML file (`--config=<path>`), then by
//! individual command line options.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::{ParsedArgs, KNOWN_OPTIONS};
use crate::error::{EngineError, EngineResult};
use crate::fluid::{EngineConfig, RunOptions};
use crate::numeric::NumericType;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub ticks: u64,
    /// Print the grid after ticks in which a parcel moved
    pub render: bool,
    pub snapshot_interval: Option<u64>,
    pub snapshot_dir: PathBuf,
    pub worker_threads: usize,
    pub seed: u64,
    pub p_type: String,
    pub v_type: String,
    pub v_flow_type: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 1_000_000,
            render: true,
            snapshot_interval: None,
            snapshot_dir: PathBuf::from("snapshots"),
            worker_threads: num_cpus::get(),
            seed: 1337,
            p_type: "fixed(32,16)".to_string(),
            v_type: "fixed(32,16)".to_string(),
            v_flow_type: "fixed(32,16)".to_string(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::io(path, source))?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Builds the configuration for a command line.
    pub fn from_args(args: &ParsedArgs) -> EngineResult<Self> {
        args.reject_unknown(KNOWN_OPTIONS)?;

        let mut config = match args.get("config") {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(p_type) = args.get("p-type") {
            config.p_type = p_type.to_string();
        }
        if let Some(v_type) = args.get("v-type") {
            config.v_type = v_type.to_string();
        }
        if let Some(v_flow_type) = args.get("v-flow-type") {
            config.v_flow_type = v_flow_type.to_string();
        }
        if let Some(ticks) = args.get_parsed("ticks")? {
            config.ticks = ticks;
        }
        if let Some(quiet) = args.get("quiet") {
            config.render = match quiet {
                "true" => false,
                "false" => true,
                other => {
                    return Err(EngineError::InvalidArgument(format!(
                        "--quiet expects `true` or `false`, got `{other}`"
                    )))
                }
            };
        }
        if let Some(threads) = args.get_parsed("threads")? {
            config.worker_threads = threads;
        }
        if let Some(seed) = args.get_parsed("seed")? {
            config.seed = seed;
        }
        if let Some(every) = args.get_parsed("snapshot-every")? {
            config.snapshot_interval = Some(every);
        }
        if let Some(dir) = args.get("snapshot-dir") {
            config.snapshot_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.snapshot_interval == Some(0) {
            return Err(EngineError::Config("snapshot interval must be positive".into()));
        }
        Ok(())
    }

    /// Pressure, velocity and flow representations
    pub fn numeric_types(&self) -> EngineResult<(NumericType, NumericType, NumericType)> {
        Ok((
            NumericType::parse(&self.p_type)?,
            NumericType::parse(&self.v_type)?,
            NumericType::parse(&self.v_flow_type)?,
        ))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            ticks: self.ticks,
            render: self.render,
            snapshot_interval: self.snapshot_interval,
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            worker_threads: self.worker_threads,
            seed: self.seed,
        }
    }
}
