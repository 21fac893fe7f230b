//! JSON report export.
//!
//! Wraps whatever a CLI mode produced with the parameters needed to replay it.

use crate::monte_carlo::{MonteCarloOutput, ScalingAnalysis, TopologyComparison};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Result body of a report, tagged by mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "result", rename_all = "snake_case")]
pub enum ReportBody {
    /// One Monte Carlo batch (single or quick mode)
    Batch(Box<MonteCarloOutput>),
    Comparison(TopologyComparison),
    Scaling(ScalingAnalysis),
}

/// Complete report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportExport {
    /// Base seed every run was derived from
    pub seed: u64,

    /// Runs per batch
    pub runs: usize,

    /// Wall time of the whole command
    pub wall_time_ms: u64,

    #[serde(flatten)]
    pub body: ReportBody,
}

impl ReportExport {
    pub fn new(seed: u64, runs: usize, body: ReportBody) -> Self {
        Self {
            seed,
            runs,
            wall_time_ms: 0,
            body,
        }
    }

    /// Records the wall time.
    pub fn finalize(&mut self, wall_time_ms: u64) {
        self.wall_time_ms = wall_time_ms;
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
