//! Run history
//!
//! Read access to persisted run aggregates, plus export to JSON or CSV.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::models::{RunAggregate, RunInfo};
use crate::orchestrator::OrchestratorError;
use crate::store::Store;

/// History view over a store
pub struct History<'a> {
    store: &'a dyn Store,
}

impl<'a> History<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Run summaries without per-test results, newest first
    ///
    /// Runs with the same timestamp list the later-recorded one first.
    pub fn list_runs(&self, project_id: Option<&str>) -> Result<Vec<RunInfo>, OrchestratorError> {
        let mut runs: Vec<RunInfo> = self
            .store
            .list_runs()?
            .iter()
            .rev()
            .filter(|run| project_id.is_none() || run.project_id.as_deref() == project_id)
            .map(RunAggregate::info)
            .collect();
        runs.sort_by(|a, b| b.run_at.cmp(&a.run_at));
        Ok(runs)
    }

    /// Full run, including every result
    pub fn get_run(&self, id: &str) -> Result<RunAggregate, OrchestratorError> {
        self.store
            .get_run(id)?
            .ok_or_else(|| OrchestratorError::RunNotFound(id.to_string()))
    }

    /// Most recent run, if any
    pub fn latest(&self) -> Result<Option<RunAggregate>, OrchestratorError> {
        let latest = self.list_runs(None)?.into_iter().next();
        match latest {
            Some(info) => self.get_run(&info.id).map(Some),
            None => Ok(None),
        }
    }
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("Unknown export format '{s}'. Use json or csv.")),
        }
    }
}

impl ExportFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

/// Write a run in the given format
///
/// CSV has one row per result, in execution order.
pub fn write_run<W: Write>(run: &RunAggregate, format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, run)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(writer);
            writer.write_record([
                "run_id",
                "order_index",
                "test_id",
                "test_name",
                "status",
                "duration_ms",
                "risk_score",
                "execution_mode",
                "runner_type",
                "run_at",
            ])?;
            for result in &run.results {
                writer.write_record([
                    run.id.clone(),
                    result.order_index.to_string(),
                    result.test_id.clone().unwrap_or_default(),
                    result.test_name.clone(),
                    result.status.to_string(),
                    result.duration.to_string(),
                    format!("{:.2}", result.risk_score),
                    run.execution_mode.clone(),
                    run.runner_type.clone(),
                    run.run_at.to_rfc3339(),
                ])?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

/// Export a run to a file
pub fn export(run: &RunAggregate, path: &Path, format: ExportFormat) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    write_run(run, format, BufWriter::new(file))?;
    info!("Exported run {} to {}", run.id, path.display());
    Ok(())
}
