//! Execution result models
//!
//! Defines the canonical per-test result shape and the closed status domain.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Test execution status
///
/// Closed two-value domain: anything that is not a pass is a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    /// Map a raw status literal; only the exact literal `passed` is a pass
    pub fn from_literal(s: &str) -> Self {
        if s == "passed" {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        }
    }

    pub fn from_outcome(passed: bool) -> Self {
        if passed {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Passed => "✓",
            TestStatus::Failed => "✗",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical result of a single test execution within a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub test_id: Option<String>,
    pub test_name: String,
    pub status: TestStatus,
    /// Duration in milliseconds
    pub duration: u64,
    /// 1-based position in the executed sequence
    pub order_index: u32,
    /// Priority score at dispatch time
    pub risk_score: f64,
    #[serde(default)]
    pub logs: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExecutionResult {
    pub fn passed(&self) -> bool {
        self.status.is_success()
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {} [{}ms, risk {:.1}]",
            self.status.symbol(),
            self.order_index,
            self.test_name,
            self.duration,
            self.risk_score
        )
    }
}
