//! Command line grammar
//!
//! Arguments starting with `--` are named options and must look like
//! `--name=value`; everything else is positional. Each option may appear
//! once.

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::error::{EngineError, EngineResult};

/// Options understood by the simulation driver
pub const KNOWN_OPTIONS: &[&str] = &[
    "p-type",
    "v-type",
    "v-flow-type",
    "ticks",
    "quiet",
    "threads",
    "seed",
    "snapshot-every",
    "snapshot-dir",
    "config",
];

#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    named: FxHashMap<String, String>,
}

impl ParsedArgs {
    /// Parses arguments without the program name.
    pub fn parse<I, S>(args: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = ParsedArgs::default();

        for arg in args {
            let arg = arg.into();
            let Some(option) = arg.strip_prefix("--") else {
                parsed.positional.push(arg);
                continue;
            };
            let (name, value) = option
                .split_once('=')
                .ok_or_else(|| EngineError::InvalidArgument(format!("expected `--name=value`, got `{arg}`")))?;
            if parsed.named.contains_key(name) {
                return Err(EngineError::InvalidArgument(format!("option --{name} given more than once")));
            }
            parsed.named.insert(name.to_string(), value.to_string());
        }

        Ok(parsed)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Value of `name` parsed with `FromStr`, if present
    pub fn get_parsed<T: std::str::FromStr>(&self, name: &str) -> EngineResult<Option<T>> {
        self.get(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| EngineError::InvalidArgument(format!("invalid value `{value}` for --{name}")))
            })
            .transpose()
    }

    pub fn reject_unknown(&self, known: &[&str]) -> EngineResult<()> {
        let mut unknown: Vec<&str> = self
            .named
            .keys()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();
        unknown.sort_unstable();
        match unknown.first() {
            Some(name) => Err(EngineError::InvalidArgument(format!("unknown option --{name}"))),
            None => Ok(()),
        }
    }

    /// The single positional argument, the scenario file
    pub fn scenario_path(&self) -> EngineResult<PathBuf> {
        match self.positional.as_slice() {
            [path] => Ok(PathBuf::from(path)),
            other => Err(EngineError::InvalidArgument(format!(
                "exactly one positional argument (the scenario file) expected, got {}",
                other.len()
            ))),
        }
    }
}
