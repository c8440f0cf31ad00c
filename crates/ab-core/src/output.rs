//! Writing solve results: plain text matrices for downstream plotting, a
//! one-line summary on stdout, optional JSON.

use crate::solver::ValueTable;
use crate::wealth::DualWealthGrid;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whitespace-delimited text matrix, one table row per line.
pub fn write_table(path: impl AsRef<Path>, table: &ValueTable) -> Result<(), OutputError> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    for row in table.row_slices() {
        let mut sep = "";
        for v in row {
            write!(out, "{sep}{v:.8}")?;
            sep = " ";
        }
        writeln!(out)?;
    }
    out.flush()?;
    tracing::debug!(path = %path.display(), rows = table.rows(), "wrote table");
    Ok(())
}

/// Wealth grid rows for diagnostics: `index wealth bid` per line.
pub fn write_grid(path: impl AsRef<Path>, grid: &DualWealthGrid) -> Result<(), OutputError> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# {} zero_index={} omega={}", grid.name(), grid.zero_index(), grid.omega())?;
    for k in 0..grid.len() {
        writeln!(out, "{k} {:.8} {:.8}", grid.wealth(k), grid.bid(k))?;
    }
    out.flush()?;
    Ok(())
}

/// Terminal summary of a solve: the value triple at the starting state.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub identifier: String,
    pub omega: f64,
    pub rounds: usize,
    pub objective: f64,
    pub oracle: f64,
    pub bidder: f64,
}

impl Summary {
    pub fn to_json(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:.8} {:.8} {:.8}",
            self.identifier, self.omega, self.rounds, self.objective, self.oracle, self.bidder
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spending::SpendingRule;

    #[test]
    fn table_round_trips_through_text() {
        let mut t = ValueTable::zeros(2, 3);
        t.set(0, 1, 1.5);
        t.set(1, 2, -0.25);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.txt");
        write_table(&path, &t).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<Vec<f64>> = text
            .lines()
            .map(|l| l.split_whitespace().map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], 1.5);
        assert_eq!(rows[1][2], -0.25);
    }

    #[test]
    fn grid_dump_lists_every_row() {
        let grid =
            DualWealthGrid::new(5.0, 0.5, 0.5, SpendingRule::geometric(0.1).unwrap(), 5).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wealth.txt");
        write_grid(&path, &grid).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), grid.len() + 1);
        assert!(text.starts_with("# geom"));
    }

    #[test]
    fn summary_line_and_json() {
        let s = Summary {
            identifier: "45".into(),
            omega: 0.5,
            rounds: 20,
            objective: 1.25,
            oracle: 1.0,
            bidder: 0.75,
        };
        assert_eq!(s.to_string(), "45 0.5 20 1.25000000 1.00000000 0.75000000");
        let json = s.to_json().unwrap();
        assert!(json.contains("\"rounds\":20"));
    }
}
