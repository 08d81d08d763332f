//! External project integrator
//!
//! Runs a project's suite in four phases: sync, discovery, risk analysis
//! and sequential execution. Each test's record is updated through the
//! learning loop before the next test starts.

use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::raw_result;
use crate::config::IntegratorConfig;
use crate::learning::{self, Observation};
use crate::models::{Project, TestCase, TestStatus};
use crate::risk::{rank, PlannedTest};
use crate::store::{Store, StoreResult};
use crate::utils::Stopwatch;

/// A discoverable test in every project's catalog
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Template {
    pub name: &'static str,
    pub base_risk: f64,
    pub file_path: &'static str,
}

pub const TEMPLATES: [Template; 5] = [
    Template {
        name: "API Security Scans",
        base_risk: 8.5,
        file_path: "tests/security.js",
    },
    Template {
        name: "Core Transaction Flow",
        base_risk: 9.5,
        file_path: "tests/transactions.js",
    },
    Template {
        name: "Frontend Unit Components",
        base_risk: 3.0,
        file_path: "src/components/*.test.js",
    },
    Template {
        name: "Database Migration Integrity",
        base_risk: 7.5,
        file_path: "migrations/verify.js",
    },
    Template {
        name: "Performance Benchmarks",
        base_risk: 4.0,
        file_path: "tests/perf.js",
    },
];

const BASE_FAILURE_CHANCE: f64 = 0.1;
const FLAKINESS_WEIGHT: f64 = 0.5;
const MIN_DURATION_MS: u64 = 200;
const MAX_DURATION_MS: u64 = 1200;

/// Pass probability for a test with the given historical failure rate
pub fn pass_probability(failure_rate: f64) -> f64 {
    let rate = if failure_rate.is_finite() {
        failure_rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (1.0 - (BASE_FAILURE_CHANCE + FLAKINESS_WEIGHT * rate)).clamp(0.0, 1.0)
}

/// Integrator bound to one project
pub struct ProjectIntegrator {
    project: Project,
    config: IntegratorConfig,
}

impl ProjectIntegrator {
    pub fn new(project: Project, config: IntegratorConfig) -> Self {
        Self { project, config }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Sync, discover and rank the project's tests
    pub async fn prepare(&self, store: &dyn Store) -> StoreResult<Vec<PlannedTest>> {
        let mut stopwatch = Stopwatch::new();

        self.sync().await;
        stopwatch.lap("sync");

        let discovered = self.discover(store)?;
        stopwatch.lap("discovery");

        let planned = rank(discovered);
        stopwatch.lap("analysis");
        for (idx, p) in planned.iter().enumerate() {
            debug!(
                "  {}. {} priority {:.2} (failure rate {:.0}%)",
                idx + 1,
                p.test.test_name,
                p.priority,
                p.test.failure_rate() * 100.0
            );
        }

        debug!("Project {} prepared: {}", self.project.name, stopwatch.format());
        Ok(planned)
    }

    /// Stand-in for cloning or pulling the project's source
    async fn sync(&self) {
        info!(
            "Syncing {} from {} ({})",
            self.project.name,
            self.project.source(),
            self.project.branch
        );
        if self.config.sync_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.sync_delay_ms)).await;
        }
    }

    /// Look up or create one test per template, scoped to the project
    pub fn discover(&self, store: &dyn Store) -> StoreResult<Vec<TestCase>> {
        let mut tests = Vec::with_capacity(TEMPLATES.len());
        let mut created = 0;

        for template in &TEMPLATES {
            let draft = TestCase::new(template.name, template.file_path, template.base_risk)
                .in_project(&self.project.id);
            let (test, is_new) = store.find_or_create_test(draft)?;
            if is_new {
                created += 1;
            }
            tests.push(test);
        }

        info!(
            "Discovered {} tests in {} ({} new)",
            tests.len(),
            self.project.name,
            created
        );
        Ok(tests)
    }

    /// Run the ranked tests one at a time, learning after each
    pub async fn execute<R: Rng + ?Sized>(
        &self,
        tests: &[PlannedTest],
        store: &dyn Store,
        rng: &mut R,
    ) -> StoreResult<Vec<Value>> {
        let mut results = Vec::with_capacity(tests.len());

        for (idx, planned) in tests.iter().enumerate() {
            let failure_rate = store
                .get_test(&planned.test.id)?
                .map(|t| t.failure_rate())
                .unwrap_or_else(|| planned.test.failure_rate());

            let passed = rng.random_bool(pass_probability(failure_rate));
            let duration = rng.random_range(MIN_DURATION_MS..MAX_DURATION_MS);
            let observation = Observation::new(TestStatus::from_outcome(passed), duration, planned.priority);

            let updated = store.update_test(&planned.test.id, &mut |test| {
                learning::update(test, observation)
            })?;
            if updated.is_none() {
                warn!("Test {} vanished from the registry mid-run", planned.test.id);
            }

            let status = observation.status.as_str().to_uppercase();
            debug!(
                "[integrator] {} {} in {}ms",
                planned.test.test_name, status, duration
            );

            let logs = format!(
                "[INTEGRATOR] Running {} for {}\n[INTEGRATOR] Historical failure rate: {:.1}%\n[INTEGRATOR] {} in {}ms",
                planned.test.file_path,
                self.project.name,
                failure_rate * 100.0,
                status,
                duration
            );
            results.push(raw_result(
                planned,
                &format!("{}: {}", self.project.name, planned.test.test_name),
                passed,
                duration,
                idx,
                logs,
                json!({
                    "runner": "custom-integrator",
                    "projectId": self.project.id,
                    "source": self.project.source(),
                    "branch": self.project.branch,
                    "failureRateBefore": failure_rate,
                }),
            ));

            if self.config.step_delay_ms > 0 && idx + 1 < tests.len() {
                tokio::time::sleep(Duration::from_millis(self.config.step_delay_ms)).await;
            }
        }

        Ok(results)
    }
}
