//! Project models
//!
//! A project scopes a discovered test suite to an external source tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::generate_id;

/// Outcome of a project's most recent run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Never,
    Passed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Never => "never",
            ProjectStatus::Passed => "passed",
            ProjectStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An external project whose tests are discovered and run as a suite
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,

    /// Repository to synchronize from
    #[serde(default)]
    pub repo_url: Option<String>,

    /// Local checkout, when not cloned from a repository
    #[serde(default)]
    pub local_path: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub last_run_status: ProjectStatus,

    #[serde(default)]
    pub last_run_time: Option<DateTime<Utc>>,

    /// Pass percentage of the most recent run (0-100)
    #[serde(default)]
    pub quality_score: u8,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id("proj"),
            name: name.into(),
            repo_url: None,
            local_path: None,
            branch: default_branch(),
            last_run_status: ProjectStatus::Never,
            last_run_time: None,
            quality_score: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_repo(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    pub fn with_local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Human-readable source reference
    pub fn source(&self) -> &str {
        self.repo_url
            .as_deref()
            .or(self.local_path.as_deref())
            .unwrap_or("Local Source")
    }

    /// Record the outcome of a completed run
    pub fn record_run(&mut self, passed: usize, failed: usize, total: usize, at: DateTime<Utc>) {
        self.last_run_status = if failed > 0 {
            ProjectStatus::Failed
        } else {
            ProjectStatus::Passed
        };
        self.last_run_time = Some(at);
        self.quality_score = quality_score(passed, total);
    }
}

/// `round(passed / total * 100)`, or 0 for an empty run
pub fn quality_score(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project() {
        let project = Project::new("storefront");
        assert!(project.id.starts_with("proj_"));
        assert_eq!(project.branch, "main");
        assert_eq!(project.last_run_status, ProjectStatus::Never);
        assert_eq!(project.source(), "Local Source");
    }

    #[test]
    fn test_source_preference() {
        let project = Project::new("p")
            .with_local_path("/srv/p")
            .with_repo("https://example.com/p.git");
        assert_eq!(project.source(), "https://example.com/p.git");
    }

    #[test]
    fn test_record_run() {
        let mut project = Project::new("storefront");
        let now = Utc::now();

        project.record_run(2, 1, 3, now);
        assert_eq!(project.last_run_status, ProjectStatus::Failed);
        assert_eq!(project.quality_score, 67);
        assert_eq!(project.last_run_time, Some(now));

        project.record_run(5, 0, 5, now);
        assert_eq!(project.last_run_status, ProjectStatus::Passed);
        assert_eq!(project.quality_score, 100);
    }

    #[test]
    fn test_quality_score_empty_run() {
        assert_eq!(quality_score(0, 0), 0);
        assert_eq!(quality_score(1, 8), 13);
    }
}
