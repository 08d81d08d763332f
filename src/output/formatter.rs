//! Output formatters for runs, history and registry listings
//!
//! Provides table, JSON, CSV and one-line summary output formats.

use serde::Serialize;
use std::str::FromStr;

use crate::models::{
    ExecutionResult, Project, ProjectStatus, RunAggregate, RunInfo, RunSummary, TestCase, TestStatus,
};
use crate::risk::PlannedTest;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            "summary" => Ok(OutputFormat::Summary),
            _ => Err(format!(
                "Unknown output format '{s}'. Use table, json, json-pretty, csv or summary."
            )),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    fn status(&self, status: TestStatus) -> String {
        match (status, self.colorize) {
            (TestStatus::Passed, true) => "\x1b[32m✓ PASS\x1b[0m".to_string(),
            (TestStatus::Failed, true) => "\x1b[31m✗ FAIL\x1b[0m".to_string(),
            (TestStatus::Passed, false) => "✓ PASS".to_string(),
            (TestStatus::Failed, false) => "✗ FAIL".to_string(),
        }
    }

    fn project_status(&self, status: ProjectStatus) -> String {
        let text = format!("{:7}", status.as_str());
        let color = match status {
            ProjectStatus::Never => return text,
            ProjectStatus::Passed => 32,
            ProjectStatus::Failed => 31,
        };
        if self.colorize {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text
        }
    }

    fn rate(&self, rate: f64) -> String {
        let text = format!("{rate:5.1}%");
        if !self.colorize {
            return text;
        }
        let color = if rate >= 90.0 {
            32
        } else if rate >= 50.0 {
            33
        } else {
            31
        };
        format!("\x1b[{color}m{text}\x1b[0m")
    }

    fn result_row(&self, result: &ExecutionResult) -> String {
        format!(
            "{:3}. {:40} {} [{:>6}ms] risk {:4.1}",
            result.order_index,
            truncate(&result.test_name, 40),
            self.status(result.status),
            result.duration,
            result.risk_score
        )
    }

    /// Format the response of one orchestration run
    pub fn format_run_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut output = String::new();
                output.push_str("\n══════════════════════════════════════════════════════════════════════\n");
                output.push_str(&format!(" {}\n", summary.summary));
                output.push_str(&format!(" Run: {}\n", summary.run_id));
                output.push_str("──────────────────────────────────────────────────────────────────────\n");
                for result in &summary.details {
                    output.push_str(&format!(" {}\n", self.result_row(result)));
                }
                output.push_str("──────────────────────────────────────────────────────────────────────\n");
                let total = summary.passed + summary.failed;
                let rate = if total == 0 {
                    0.0
                } else {
                    summary.passed as f64 / total as f64 * 100.0
                };
                output.push_str(&format!(
                    " Passed: {} | Failed: {} | Pass Rate: {} | Duration: {}\n",
                    summary.passed,
                    summary.failed,
                    self.rate(rate),
                    summary.total_duration
                ));
                output.push_str("══════════════════════════════════════════════════════════════════════\n");
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(summary),
            OutputFormat::Csv => results_csv(&summary.details),
            OutputFormat::Summary => format!(
                "{} {}/{} passed in {} (run {})",
                summary.summary,
                summary.passed,
                summary.passed + summary.failed,
                summary.total_duration,
                summary.run_id
            ),
        }
    }

    /// Format a full run from history
    pub fn format_run(&self, run: &RunAggregate) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut output = String::new();
                output.push_str(&format!(
                    "\nRun {} | {} ({}) | {}\n",
                    run.id,
                    run.execution_mode,
                    run.runner_type,
                    run.run_at.format("%Y-%m-%d %H:%M:%S")
                ));
                if let Some(project) = &run.project_id {
                    output.push_str(&format!(
                        "Project {} | branch {} | commit {}\n",
                        project,
                        run.branch.as_deref().unwrap_or("-"),
                        run.commit_id.as_deref().unwrap_or("-")
                    ));
                }
                output.push_str("──────────────────────────────────────────────────────────────────────\n");
                for result in &run.results {
                    output.push_str(&format!(" {}\n", self.result_row(result)));
                    for line in result.logs.lines() {
                        output.push_str(&format!("        {line}\n"));
                    }
                }
                output.push_str("──────────────────────────────────────────────────────────────────────\n");
                output.push_str(&format!(
                    " Total: {} | Passed: {} | Failed: {} | Pass Rate: {} | Duration: {}ms\n",
                    run.total_tests,
                    run.passed_count,
                    run.failed_count,
                    self.rate(run.pass_rate()),
                    run.duration
                ));
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(run),
            OutputFormat::Csv => results_csv(&run.results),
            OutputFormat::Summary => run_line(&run.info()),
        }
    }

    /// Format run history
    pub fn format_runs(&self, runs: &[RunInfo]) -> String {
        match self.format {
            OutputFormat::Table => {
                if runs.is_empty() {
                    return "No runs recorded yet.".to_string();
                }
                let mut output = String::new();
                output.push_str(&format!(
                    "{:32} {:19} {:16} {:18} {:>5} {:>5} {:>5} {:>9}\n",
                    "ID", "WHEN", "MODE", "RUNNER", "TOTAL", "PASS", "FAIL", "DURATION"
                ));
                for run in runs {
                    output.push_str(&format!(
                        "{:32} {:19} {:16} {:18} {:>5} {:>5} {:>5} {:>7}ms\n",
                        run.id,
                        run.run_at.format("%Y-%m-%d %H:%M:%S"),
                        run.execution_mode,
                        run.runner_type,
                        run.total_tests,
                        run.passed_count,
                        run.failed_count,
                        run.duration
                    ));
                }
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(runs),
            OutputFormat::Csv => csv_rows(
                &[
                    "id", "run_at", "execution_mode", "runner_type", "total", "passed", "failed",
                    "duration_ms", "project_id",
                ],
                runs.iter().map(|run| {
                    vec![
                        run.id.clone(),
                        run.run_at.to_rfc3339(),
                        run.execution_mode.clone(),
                        run.runner_type.clone(),
                        run.total_tests.to_string(),
                        run.passed_count.to_string(),
                        run.failed_count.to_string(),
                        run.duration.to_string(),
                        run.project_id.clone().unwrap_or_default(),
                    ]
                }),
            ),
            OutputFormat::Summary => runs.iter().map(run_line).collect::<Vec<_>>().join("\n"),
        }
    }

    /// Format the test registry
    pub fn format_tests(&self, tests: &[TestCase]) -> String {
        match self.format {
            OutputFormat::Table => {
                if tests.is_empty() {
                    return "No tests registered.".to_string();
                }
                let mut output = String::new();
                output.push_str(&format!(
                    "{:32} {:32} {:>5} {:>5} {:>6} {:>8} {:>9} {:6}\n",
                    "ID", "NAME", "RISK", "RUNS", "FAIL%", "PRIORITY", "LAST RISK", "LAST"
                ));
                for test in tests {
                    output.push_str(&format!(
                        "{:32} {:32} {:>5.1} {:>5} {:>5.0}% {:>8.2} {:>9.2} {:6}\n",
                        test.id,
                        truncate(&test.test_name, 32),
                        test.base_risk,
                        test.learning.total_runs(),
                        test.failure_rate() * 100.0,
                        test.priority(),
                        test.learning.risk_score(),
                        test.learning
                            .last_run_status()
                            .map(|s| s.as_str())
                            .unwrap_or("never")
                    ));
                }
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(tests),
            OutputFormat::Csv => csv_rows(
                &[
                    "id", "test_name", "file_path", "base_risk", "total_runs", "total_failures",
                    "failure_rate", "priority", "last_risk_score", "project_id",
                ],
                tests.iter().map(|test| {
                    vec![
                        test.id.clone(),
                        test.test_name.clone(),
                        test.file_path.clone(),
                        test.base_risk.to_string(),
                        test.learning.total_runs().to_string(),
                        test.learning.total_failures().to_string(),
                        format!("{:.4}", test.failure_rate()),
                        format!("{:.2}", test.priority()),
                        format!("{:.2}", test.learning.risk_score()),
                        test.project_id.clone().unwrap_or_default(),
                    ]
                }),
            ),
            OutputFormat::Summary => tests
                .iter()
                .map(|t| format!("{} ({}) priority {:.2}", t, t.id, t.priority()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Format the project registry
    pub fn format_projects(&self, projects: &[Project]) -> String {
        match self.format {
            OutputFormat::Table => {
                if projects.is_empty() {
                    return "No projects registered.".to_string();
                }
                let mut output = String::new();
                output.push_str(&format!(
                    "{:32} {:24} {:12} {:7} {:>7} {}\n",
                    "ID", "NAME", "BRANCH", "STATUS", "QUALITY", "SOURCE"
                ));
                for project in projects {
                    output.push_str(&format!(
                        "{:32} {:24} {:12} {} {:>6}% {}\n",
                        project.id,
                        truncate(&project.name, 24),
                        truncate(&project.branch, 12),
                        self.project_status(project.last_run_status),
                        project.quality_score,
                        project.source()
                    ));
                }
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(projects),
            OutputFormat::Csv => csv_rows(
                &["id", "name", "branch", "source", "last_run_status", "quality_score"],
                projects.iter().map(|p| {
                    vec![
                        p.id.clone(),
                        p.name.clone(),
                        p.branch.clone(),
                        p.source().to_string(),
                        p.last_run_status.to_string(),
                        p.quality_score.to_string(),
                    ]
                }),
            ),
            OutputFormat::Summary => projects
                .iter()
                .map(|p| format!("{} ({}) {} {}%", p, p.id, p.last_run_status, p.quality_score))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Format a dry-run execution plan
    pub fn format_plan(&self, planned: &[PlannedTest]) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PlanEntry<'a> {
            order_index: usize,
            id: &'a str,
            test_name: &'a str,
            priority: f64,
        }

        let entries: Vec<PlanEntry> = planned
            .iter()
            .enumerate()
            .map(|(idx, p)| PlanEntry {
                order_index: idx + 1,
                id: &p.test.id,
                test_name: &p.test.test_name,
                priority: p.priority,
            })
            .collect();

        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(&entries),
            OutputFormat::Csv => csv_rows(
                &["order_index", "id", "test_name", "priority"],
                entries.iter().map(|e| {
                    vec![
                        e.order_index.to_string(),
                        e.id.to_string(),
                        e.test_name.to_string(),
                        format!("{:.2}", e.priority),
                    ]
                }),
            ),
            OutputFormat::Table | OutputFormat::Summary => entries
                .iter()
                .map(|e| format!("{:3}. {:40} priority {:5.2}", e.order_index, e.test_name, e.priority))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Banner printed at the end of a CI run
pub fn format_ci_banner(summary: &RunSummary) -> String {
    let mut output = String::new();
    output.push_str("\n================ CI EXECUTION SUMMARY ================\n");
    output.push_str("Status: COMPLETED\n");
    output.push_str(&format!("Total Tests: {}\n", summary.passed + summary.failed));
    output.push_str(&format!("Passed: {}\n", summary.passed));
    output.push_str(&format!("Failed: {}\n", summary.failed));
    output.push_str(&format!("Duration: {}\n", summary.total_duration));
    output.push_str(&format!("Run: {}\n", summary.run_id));
    output.push_str("======================================================\n");
    if summary.all_passed() {
        output.push_str("Pipeline SUCCESS.\n");
    } else {
        output.push_str("Pipeline FAILED due to test failures.\n");
    }
    output
}

fn run_line(run: &RunInfo) -> String {
    format!(
        "{} {} {}/{} passed ({}, {}ms)",
        run.id,
        run.run_at.format("%Y-%m-%d %H:%M:%S"),
        run.passed_count,
        run.total_tests,
        run.execution_mode,
        run.duration
    )
}

fn results_csv(results: &[ExecutionResult]) -> String {
    csv_rows(
        &["order_index", "test_id", "test_name", "status", "duration_ms", "risk_score"],
        results.iter().map(|r| {
            vec![
                r.order_index.to_string(),
                r.test_id.clone().unwrap_or_default(),
                r.test_name.clone(),
                r.status.to_string(),
                r.duration.to_string(),
                format!("{:.2}", r.risk_score),
            ]
        }),
    )
}

fn csv_rows<I>(header: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    let _ = writer.write_record(header);
    for row in rows {
        let _ = writer.write_record(&row);
    }
    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
