//! Test case registry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::generate_id;
use crate::learning::LearningState;
use crate::risk;

/// A registered test case
///
/// The historical counters live in [`LearningState`], which only the
/// learning loop can advance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub test_name: String,
    pub file_path: String,

    /// Static risk attribute on the 0-10 scale
    #[serde(default)]
    pub base_risk: f64,

    /// Owning project for project-scoped tests
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(flatten)]
    pub learning: LearningState,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    /// Create a test with no run history
    pub fn new(test_name: impl Into<String>, file_path: impl Into<String>, base_risk: f64) -> Self {
        let base_risk = risk::clamp_score(base_risk);
        Self {
            id: generate_id("test"),
            test_name: test_name.into(),
            file_path: file_path.into(),
            base_risk,
            project_id: None,
            learning: LearningState::new(base_risk),
            created_at: Utc::now(),
        }
    }

    /// Scope the test to a project
    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Current priority under the risk model
    pub fn priority(&self) -> f64 {
        risk::priority(self.base_risk, self.learning.failure_rate())
    }

    pub fn failure_rate(&self) -> f64 {
        self.learning.failure_rate()
    }

    pub fn belongs_to(&self, project_id: &str) -> bool {
        self.project_id.as_deref() == Some(project_id)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.test_name, self.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_test_case() {
        let test = TestCase::new("Login Authentication", "tests/login.js", 8.5);
        assert!(test.id.starts_with("test_"));
        assert_eq!(test.base_risk, 8.5);
        assert_eq!(test.learning.total_runs(), 0);
        assert_eq!(test.failure_rate(), 0.0);
        assert_eq!(test.learning.risk_score(), 8.5);
        assert!(test.project_id.is_none());
    }

    #[test]
    fn test_base_risk_is_clamped() {
        assert_eq!(TestCase::new("a", "a.js", 42.0).base_risk, 10.0);
        assert_eq!(TestCase::new("b", "b.js", -1.0).base_risk, 0.0);
    }

    #[test]
    fn test_project_scope() {
        let test = TestCase::new("API Security Scans", "tests/security.js", 8.5).in_project("proj_1");
        assert!(test.belongs_to("proj_1"));
        assert!(!test.belongs_to("proj_2"));
    }

    #[test]
    fn test_narrow_record_deserializes() {
        // Records written without project linkage or history still load
        let json = r#"{
            "id": "test_legacy",
            "testName": "Search Functionality",
            "filePath": "tests/search.js",
            "baseRisk": 6.3
        }"#;
        let test: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(test.test_name, "Search Functionality");
        assert_eq!(test.learning.total_runs(), 0);
        assert_eq!(test.failure_rate(), 0.0);
        assert!(test.learning.last_run_status().is_none());
    }
}
