//! Run aggregate models
//!
//! A run aggregate is the immutable record of one orchestration cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{generate_id, ExecutionResult};

/// Strategy labels recorded on a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLabel {
    pub execution_mode: String,
    pub runner_type: String,
}

impl RunLabel {
    /// Registry run ranked by the prioritization engine
    pub fn ai_priority(runner_type: impl Into<String>) -> Self {
        Self {
            execution_mode: "AI-Priority".to_string(),
            runner_type: runner_type.into(),
        }
    }

    /// Project-scoped run through the integrator
    pub fn external_project() -> Self {
        Self {
            execution_mode: "External Project".to_string(),
            runner_type: "custom-integrator".to_string(),
        }
    }
}

/// Summary record of one orchestration cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAggregate {
    pub id: String,
    pub total_tests: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    /// Sum of result durations in milliseconds
    pub duration: u64,
    pub execution_mode: String,
    #[serde(default)]
    pub runner_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub results: Vec<ExecutionResult>,
    pub run_at: DateTime<Utc>,
}

/// Sum of result durations, saturating at `u64::MAX`
fn total_duration(results: &[ExecutionResult]) -> u64 {
    results.iter().map(|r| r.duration).fold(0, u64::saturating_add)
}

impl RunAggregate {
    /// Build an aggregate whose totals are derived from `results`
    pub fn new(label: RunLabel, results: Vec<ExecutionResult>) -> Self {
        let passed_count = results.iter().filter(|r| r.passed()).count();
        let duration = total_duration(&results);

        Self {
            id: generate_id("run"),
            total_tests: results.len(),
            passed_count,
            failed_count: results.len() - passed_count,
            duration,
            execution_mode: label.execution_mode,
            runner_type: label.runner_type,
            project_id: None,
            commit_id: None,
            branch: None,
            results,
            run_at: Utc::now(),
        }
    }

    /// Link the run to a project, commit and branch
    pub fn with_project(
        mut self,
        project_id: impl Into<String>,
        commit_id: Option<String>,
        branch: Option<String>,
    ) -> Self {
        self.project_id = Some(project_id.into());
        self.commit_id = Some(commit_id.unwrap_or_else(|| "manual".to_string()));
        self.branch = Some(branch.unwrap_or_else(|| "unknown".to_string()));
        self
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            (self.passed_count as f64 / self.total_tests as f64) * 100.0
        }
    }

    /// Totals agree with the contained results
    pub fn is_consistent(&self) -> bool {
        self.passed_count + self.failed_count == self.total_tests
            && self.total_tests == self.results.len()
            && self.duration == total_duration(&self.results)
    }

    /// Summary projection without per-test results
    pub fn info(&self) -> RunInfo {
        RunInfo {
            id: self.id.clone(),
            total_tests: self.total_tests,
            passed_count: self.passed_count,
            failed_count: self.failed_count,
            duration: self.duration,
            execution_mode: self.execution_mode.clone(),
            runner_type: self.runner_type.clone(),
            project_id: self.project_id.clone(),
            commit_id: self.commit_id.clone(),
            branch: self.branch.clone(),
            run_at: self.run_at,
        }
    }
}

impl fmt::Display for RunAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} - {} ({})", self.id, self.execution_mode, self.runner_type)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Passed: {} | Failed: {}",
            self.total_tests, self.passed_count, self.failed_count
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.duration
        )
    }
}

/// Run summary fields, as listed in history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub id: String,
    pub total_tests: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub duration: u64,
    pub execution_mode: String,
    pub runner_type: String,
    pub project_id: Option<String>,
    pub commit_id: Option<String>,
    pub branch: Option<String>,
    pub run_at: DateTime<Utc>,
}

/// Response of an orchestration request
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub summary: String,
    pub passed: usize,
    pub failed: usize,
    /// Total duration rendered as `<ms>ms`
    pub total_duration: String,
    pub details: Vec<ExecutionResult>,
    pub run_id: String,
}

impl RunSummary {
    pub fn new(summary: impl Into<String>, run: &RunAggregate) -> Self {
        Self {
            summary: summary.into(),
            passed: run.passed_count,
            failed: run.failed_count,
            total_duration: format!("{}ms", run.duration),
            details: run.results.clone(),
            run_id: run.id.clone(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestStatus;
    use serde_json::Map;

    fn result(name: &str, status: TestStatus, duration: u64, order_index: u32) -> ExecutionResult {
        ExecutionResult {
            test_id: None,
            test_name: name.to_string(),
            status,
            duration,
            order_index,
            risk_score: 5.0,
            logs: String::new(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_aggregate_totals() {
        let run = RunAggregate::new(
            RunLabel::ai_priority("local"),
            vec![
                result("a", TestStatus::Passed, 100, 1),
                result("b", TestStatus::Failed, 250, 2),
                result("c", TestStatus::Passed, 50, 3),
            ],
        );

        assert_eq!(run.total_tests, 3);
        assert_eq!(run.passed_count, 2);
        assert_eq!(run.failed_count, 1);
        assert_eq!(run.duration, 400);
        assert_eq!(run.execution_mode, "AI-Priority");
        assert_eq!(run.runner_type, "local");
        assert!(run.is_consistent());
    }

    #[test]
    fn test_empty_aggregate() {
        let run = RunAggregate::new(RunLabel::ai_priority("docker"), Vec::new());
        assert_eq!(run.total_tests, 0);
        assert_eq!(run.pass_rate(), 0.0);
        assert!(run.is_consistent());
    }

    #[test]
    fn test_duration_saturates() {
        let run = RunAggregate::new(
            RunLabel::ai_priority("local"),
            vec![
                result("a", TestStatus::Passed, u64::MAX, 1),
                result("b", TestStatus::Failed, u64::MAX, 2),
                result("c", TestStatus::Passed, 10, 3),
            ],
        );
        assert_eq!(run.duration, u64::MAX);
        assert_eq!(run.total_tests, 3);
        assert!(run.is_consistent());
    }

    #[test]
    fn test_project_linkage_defaults() {
        let run = RunAggregate::new(RunLabel::external_project(), Vec::new())
            .with_project("proj_1", None, Some("feature/x".to_string()));
        assert_eq!(run.project_id.as_deref(), Some("proj_1"));
        assert_eq!(run.commit_id.as_deref(), Some("manual"));
        assert_eq!(run.branch.as_deref(), Some("feature/x"));
        assert_eq!(run.execution_mode, "External Project");
    }

    #[test]
    fn test_summary_response() {
        let run = RunAggregate::new(
            RunLabel::ai_priority("local"),
            vec![result("a", TestStatus::Failed, 1200, 1)],
        );
        let summary = RunSummary::new("Executed 1 test", &run);
        assert_eq!(summary.total_duration, "1200ms");
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.run_id, run.id);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalDuration"], "1200ms");
        assert!(json["details"].is_array());
    }

    #[test]
    fn test_info_drops_results() {
        let run = RunAggregate::new(
            RunLabel::ai_priority("local"),
            vec![result("a", TestStatus::Passed, 10, 1)],
        );
        let info = run.info();
        assert_eq!(info.id, run.id);
        assert_eq!(info.total_tests, 1);
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("results").is_none());
    }
}
