/// Textual scenario format
///
/// ```text
/// // comments start with two slashes
/// N M
/// <N rows of exactly M characters, '#' is a wall>
/// G
/// <medium> <density>
/// ...
/// ```
///
/// The density list ends at the first blank line or at end of input.
/// Snapshots are written in the same grammar, so they load as scenarios.

pub mod error;
pub mod snapshot;

use std::fmt::Write as _;
use std::path::Path;

use crate::numeric::Scalar;

pub use error::{IoPathContext, ScenarioResult};
pub use snapshot::{snapshot_path, write_snapshot};

use error::{format_error, missing_density, unexpected_end};

/// Medium character marking an impassable cell
pub const WALL: u8 = b'#';

/// Obstacle map, gravity and densities of one simulation setup
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario<P, V> {
    pub rows: usize,
    pub cols: usize,
    /// `rows` rows of `cols` medium bytes each
    pub field: Vec<Vec<u8>>,
    pub gravity: V,
    /// Density per medium, in file order
    pub densities: Vec<(u8, P)>,
}

/// Non-comment lines with their 1-based line numbers
struct ScenarioLines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> ScenarioLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
            last: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for (index, line) in self.inner.by_ref() {
            self.last = index + 1;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with("//") {
                continue;
            }
            return Some((index + 1, line));
        }
        None
    }

    fn expect(&mut self, what: &str) -> ScenarioResult<(usize, &'a str)> {
        let after = self.last + 1;
        self.next_line().ok_or_else(|| unexpected_end(after, what))
    }
}

impl<P: Scalar, V: Scalar> Scenario<P, V> {
    pub fn parse(text: &str) -> ScenarioResult<Self> {
        let mut lines = ScenarioLines::new(text);

        let (line_no, header) = lines.expect("grid dimensions `N M`")?;
        let (rows, cols) = parse_dimensions(line_no, header)?;

        let mut field = Vec::with_capacity(rows);
        let mut row_lines = Vec::with_capacity(rows);
        for row in 0..rows {
            let (line_no, line) = lines.expect(&format!("grid row {}", row + 1))?;
            if !line.is_ascii() {
                return Err(format_error(line_no, "grid rows must be ASCII"));
            }
            if line.len() != cols {
                return Err(format_error(
                    line_no,
                    format!("grid row has {} characters, expected {}", line.len(), cols),
                ));
            }
            field.push(line.as_bytes().to_vec());
            row_lines.push(line_no);
        }

        let (line_no, line) = lines.expect("gravity constant")?;
        let gravity = V::parse_literal(line)
            .ok_or_else(|| format_error(line_no, format!("invalid gravity literal `{}`", line.trim())))?;

        let mut densities: Vec<(u8, P)> = Vec::new();
        while let Some((line_no, line)) = lines.next_line() {
            if line.trim_matches(' ').is_empty() {
                break;
            }
            let (medium, value) = parse_density(line_no, line)?;
            if densities.iter().any(|&(known, _)| known == medium) {
                return Err(format_error(
                    line_no,
                    format!("duplicate density for medium '{}'", medium as char),
                ));
            }
            densities.push((medium, value));
        }

        for (row, &line_no) in field.iter().zip(&row_lines) {
            if let Some(&medium) = row
                .iter()
                .find(|&&medium| medium != WALL && !densities.iter().any(|&(known, _)| known == medium))
            {
                return Err(missing_density(line_no, medium));
            }
        }

        Ok(Scenario {
            rows,
            cols,
            field,
            gravity,
            densities,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> ScenarioResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_path(path)?;
        let scenario = Self::parse(&text)?;
        log::info!(
            "Loaded scenario {} ({}x{}, {} media)",
            path.display(),
            scenario.rows,
            scenario.cols,
            scenario.densities.len()
        );
        Ok(scenario)
    }

    /// Renders the scenario in the grammar accepted by `parse`.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.rows * (self.cols + 1) + 64);
        // writing into a String cannot fail
        let _ = writeln!(text, "{} {}", self.rows, self.cols);
        for row in &self.field {
            text.extend(row.iter().map(|&medium| medium as char));
            text.push('\n');
        }
        let _ = writeln!(text, "{}", self.gravity);
        for (medium, density) in &self.densities {
            let _ = writeln!(text, "{} {}", *medium as char, density);
        }
        text
    }

    pub fn density_of(&self, medium: u8) -> Option<P> {
        self.densities
            .iter()
            .find(|&&(known, _)| known == medium)
            .map(|&(_, density)| density)
    }
}

fn parse_dimensions(line_no: usize, line: &str) -> ScenarioResult<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let mut next_dim = |name: &str| -> ScenarioResult<usize> {
        let token = parts
            .next()
            .ok_or_else(|| format_error(line_no, format!("missing {name}")))?;
        let value: usize = token
            .parse()
            .map_err(|_| format_error(line_no, format!("invalid {name} `{token}`")))?;
        if value == 0 {
            return Err(format_error(line_no, format!("{name} must be positive")));
        }
        Ok(value)
    };

    let rows = next_dim("row count N")?;
    let cols = next_dim("column count M")?;
    if parts.next().is_some() {
        return Err(format_error(line_no, "expected exactly two numbers `N M`"));
    }
    Ok((rows, cols))
}

fn parse_density<P: Scalar>(line_no: usize, line: &str) -> ScenarioResult<(u8, P)> {
    let medium = line.as_bytes()[0];
    if !medium.is_ascii() {
        return Err(format_error(line_no, "medium must be an ASCII character"));
    }
    if medium == WALL {
        return Err(format_error(line_no, "walls cannot have a density"));
    }
    let value = &line[1..];
    let density = P::parse_literal(value)
        .ok_or_else(|| format_error(line_no, format!("invalid density literal `{}`", value.trim())))?;
    Ok((medium, density))
}
