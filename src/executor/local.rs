//! Local simulated runner

use rand::Rng;
use serde_json::{json, Value};
use tracing::debug;

use super::raw_result;
use crate::risk::PlannedTest;

const PASS_PROBABILITY: f64 = 0.9;
const MIN_DURATION_MS: u64 = 500;
const MAX_DURATION_MS: u64 = 2500;

/// Synthesizes outcomes in-process; no external execution happens
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn run<R: Rng + ?Sized>(&self, tests: &[PlannedTest], rng: &mut R) -> Vec<Value> {
        tests
            .iter()
            .enumerate()
            .map(|(idx, planned)| {
                let duration = rng.random_range(MIN_DURATION_MS..MAX_DURATION_MS);
                let passed = rng.random_bool(PASS_PROBABILITY);
                let status = if passed { "PASSED" } else { "FAILED" };
                debug!("[local] {} {} in {}ms", planned.test.test_name, status, duration);

                let logs = format!(
                    "[LOCAL] Executing {}\n[LOCAL] {} {} in {}ms",
                    planned.test.file_path, planned.test.test_name, status, duration
                );
                raw_result(
                    planned,
                    &planned.test.test_name,
                    passed,
                    duration,
                    idx,
                    logs,
                    json!({ "runner": "local" }),
                )
            })
            .collect()
    }
}
