use std::fs;
use std::path::{Path, PathBuf};

use crate::numeric::Scalar;

use super::error::{IoPathContext, ScenarioResult};
use super::Scenario;

/// `<dir>/tick_<tick>.txt`
pub fn snapshot_path(dir: &Path, tick: u64) -> PathBuf {
    dir.join(format!("tick_{tick}.txt"))
}

/// Writes `scenario` as the snapshot for `tick`.
///
/// The text goes to a temporary file first and is renamed over the target,
/// so readers never observe a half-written snapshot.
pub fn write_snapshot<P: Scalar, V: Scalar>(
    scenario: &Scenario<P, V>,
    dir: &Path,
    tick: u64,
) -> ScenarioResult<PathBuf> {
    fs::create_dir_all(dir).with_path(dir)?;

    let path = snapshot_path(dir, tick);
    let temp_path = path.with_extension("tmp");

    let mut text = format!("// snapshot after tick {tick}\n");
    text.push_str(&scenario.to_text());

    fs::write(&temp_path, text).with_path(&temp_path)?;
    fs::rename(&temp_path, &path).with_path(&path)?;

    log::info!("Wrote snapshot {}", path.display());
    Ok(path)
}
