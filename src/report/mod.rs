//! @ai:module:intent Persist benchmark results for external renderers
//! @ai:module:layer infrastructure
//! @ai:module:public_api ReportGenerator, JsonReporter

pub mod json_report;

pub use json_report::{JsonReporter, JsonReporterTrait};

use crate::harness::BenchmarkResults;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// @ai:intent Writes every report format for a run
pub struct ReportGenerator {
    json: JsonReporter,
}

impl ReportGenerator {
    /// @ai:intent Create a new report generator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            json: JsonReporter::new(),
        }
    }

    /// @ai:intent Write all reports into `output_dir`, returning the JSON path
    /// @ai:effects fs:write
    pub fn generate_all(&self, results: &BenchmarkResults, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let json_path = output_dir.join("results.json");
        self.json.generate(results, &json_path)?;

        tracing::info!("Reports generated in {}", output_dir.display());
        Ok(json_path)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
