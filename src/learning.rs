//! Learning loop
//!
//! Folds each execution outcome back into a test's historical counters.
//! [`LearningState::record`] is the only way to advance run counters,
//! failure rate, last status, last duration and the cached risk score.

use serde::{Deserialize, Serialize};

use crate::models::{ExecutionResult, TestCase, TestStatus};

/// Historical execution state of a test case
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningState {
    #[serde(default)]
    total_runs: u32,
    #[serde(default)]
    total_failures: u32,
    #[serde(default)]
    failure_rate: f64,
    #[serde(default)]
    last_run_status: Option<TestStatus>,
    #[serde(default, alias = "executionTime")]
    last_execution_duration: u64,
    #[serde(default)]
    risk_score: f64,
}

/// One observed execution, as fed to the learning loop
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub status: TestStatus,
    pub duration_ms: u64,
    /// Priority computed at dispatch time
    pub risk_score: f64,
}

impl Observation {
    pub fn new(status: TestStatus, duration_ms: u64, risk_score: f64) -> Self {
        Self {
            status,
            duration_ms,
            risk_score,
        }
    }
}

impl From<&ExecutionResult> for Observation {
    fn from(result: &ExecutionResult) -> Self {
        Self::new(result.status, result.duration, result.risk_score)
    }
}

impl LearningState {
    /// Fresh state for a test that has never run
    pub fn new(initial_risk: f64) -> Self {
        Self {
            risk_score: initial_risk,
            ..Default::default()
        }
    }

    /// Rebuild state from raw counters, keeping the failure rate consistent
    #[cfg(test)]
    pub fn from_counts(total_runs: u32, total_failures: u32) -> Self {
        let total_failures = total_failures.min(total_runs);
        Self {
            total_runs,
            total_failures,
            failure_rate: rate(total_failures, total_runs),
            ..Default::default()
        }
    }

    /// Apply one execution outcome
    pub fn record(&mut self, observation: Observation) {
        self.total_runs += 1;
        if observation.status == TestStatus::Failed {
            self.total_failures += 1;
        }
        self.failure_rate = rate(self.total_failures, self.total_runs);
        self.last_run_status = Some(observation.status);
        self.last_execution_duration = observation.duration_ms;
        self.risk_score = observation.risk_score;
    }

    pub fn total_runs(&self) -> u32 {
        self.total_runs
    }

    pub fn total_failures(&self) -> u32 {
        self.total_failures
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    pub fn last_run_status(&self) -> Option<TestStatus> {
        self.last_run_status
    }

    pub fn last_execution_duration(&self) -> u64 {
        self.last_execution_duration
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }
}

fn rate(failures: u32, runs: u32) -> f64 {
    if runs == 0 {
        0.0
    } else {
        failures as f64 / runs as f64
    }
}

/// Apply a single outcome to a test case record
pub fn update(test: &mut TestCase, observation: Observation) {
    test.learning.record(observation);
}

/// Fold a sequence of outcomes, in execution order, into a test case
pub fn replay<I>(test: TestCase, observations: I) -> TestCase
where
    I: IntoIterator<Item = Observation>,
{
    observations.into_iter().fold(test, |mut acc, observation| {
        update(&mut acc, observation);
        acc
    })
}
