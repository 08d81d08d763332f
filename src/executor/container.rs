//! Containerized runner
//!
//! Two mutually exclusive policies, chosen by [`ContainerStrategy`]:
//! a simulated container lifecycle with random outcomes, or one real
//! process per test whose exit status decides the outcome.

use futures::future::join_all;
use rand::Rng;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::raw_result;
use crate::config::{ContainerConfig, ContainerStrategy};
use crate::risk::PlannedTest;

const PASS_PROBABILITY: f64 = 0.95;
const OVERHEAD_MS: std::ops::Range<u64> = 200..800;
const WORK_MS: std::ops::Range<u64> = 300..1800;

/// Runs each test in its own container
pub struct ContainerRunner {
    config: ContainerConfig,
}

impl ContainerRunner {
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn strategy(&self) -> ContainerStrategy {
        self.config.strategy
    }

    pub async fn run<R: Rng + ?Sized>(&self, tests: &[PlannedTest], rng: &mut R) -> Vec<Value> {
        match self.strategy() {
            ContainerStrategy::Simulated => tests
                .iter()
                .enumerate()
                .map(|(idx, planned)| self.simulate(planned, idx, rng))
                .collect(),
            ContainerStrategy::Process => self.run_processes(tests).await,
        }
    }

    fn simulate<R: Rng + ?Sized>(&self, planned: &PlannedTest, idx: usize, rng: &mut R) -> Value {
        let overhead = rng.random_range(OVERHEAD_MS);
        let work = rng.random_range(WORK_MS);
        let passed = rng.random_bool(PASS_PROBABILITY);
        let container_id = format!("atx-{:08x}", rng.random::<u32>());

        let test = &planned.test;
        let image = &self.config.image;
        let status = if passed { "PASSED" } else { "FAILED" };
        debug!("[docker] {} {} in {}ms ({})", test.test_name, status, overhead + work, container_id);

        let logs = [
            format!("[DOCKER] Starting container {container_id}"),
            format!("[DOCKER] Pulling image {image}... done ({overhead}ms)"),
            format!("[DOCKER] Copying {} to /workspace", test.file_path),
            format!("[DOCKER] Running {}", test.test_name),
            format!("[DOCKER] Result: {status} in {work}ms"),
            format!("[DOCKER] Removing container {container_id}"),
        ]
        .join("\n");

        raw_result(
            planned,
            &test.test_name,
            passed,
            overhead + work,
            idx,
            logs,
            json!({
                "runner": "docker",
                "strategy": "simulated",
                "containerId": container_id,
                "image": image,
                "containerOverheadMs": overhead,
                "workDurationMs": work,
            }),
        )
    }

    /// Spawn one process per test, at most `max_concurrent` at a time
    ///
    /// Results come back in input order whatever order the processes finish in.
    async fn run_processes(&self, tests: &[PlannedTest]) -> Vec<Value> {
        let semaphore = Semaphore::new(self.config.max_concurrent.max(1));
        info!(
            "Spawning {} test processes with '{}' (max {} concurrent)",
            tests.len(),
            self.config.command,
            self.config.max_concurrent
        );

        let runs = tests.iter().enumerate().map(|(idx, planned)| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.spawn_one(planned, idx).await
            }
        });

        join_all(runs).await
    }

    async fn spawn_one(&self, planned: &PlannedTest, idx: usize) -> Value {
        let test = &planned.test;
        let start = Instant::now();

        let output = Command::new(&self.config.command)
            .args(&self.config.args)
            .env("TEST_NAME", &test.test_name)
            .env("FILE_PATH", &test.file_path)
            .env("FAILURE_RATE", test.failure_rate().to_string())
            .stdin(Stdio::null())
            .output()
            .await;
        let duration = start.elapsed().as_millis() as u64;

        match output {
            Ok(output) => {
                let passed = output.status.success();
                let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    if !logs.is_empty() && !logs.ends_with('\n') {
                        logs.push('\n');
                    }
                    logs.push_str(&stderr);
                }
                debug!("[docker] {} exited with {}", test.test_name, output.status);

                raw_result(
                    planned,
                    &test.test_name,
                    passed,
                    duration,
                    idx,
                    logs,
                    json!({
                        "runner": "docker",
                        "strategy": "process",
                        "exitCode": output.status.code(),
                    }),
                )
            }
            Err(e) => {
                warn!("Failed to start '{}' for {}: {}", self.config.command, test.test_name, e);
                raw_result(
                    planned,
                    &test.test_name,
                    false,
                    duration,
                    idx,
                    format!("[DOCKER] Failed to start {}: {}", self.config.command, e),
                    json!({
                        "runner": "docker",
                        "strategy": "process",
                        "error": e.to_string(),
                    }),
                )
            }
        }
    }
}
