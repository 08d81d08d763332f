//! Data models for test orchestration
//!
//! Test cases, projects, per-test execution results and run aggregates.

mod project;
mod run;
mod test_case;
mod test_result;

pub use project::{Project, ProjectStatus};
pub use run::{RunAggregate, RunInfo, RunLabel, RunSummary};
pub use test_case::TestCase;
pub use test_result::{ExecutionResult, TestStatus};

use chrono::Utc;

/// Generate a unique identifier for a stored entity
pub fn generate_id(prefix: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let random: u32 = rand::random::<u32>() % 1_000_000;
    format!("{prefix}_{timestamp}_{random:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let id1 = generate_id("run");
        let id2 = generate_id("run");
        assert!(id1.starts_with("run_"));
        assert_ne!(id1, id2);
    }
}
