//! Orchestrator
//!
//! Coordinates one run: resolve tests, prioritize, dispatch to a runner,
//! normalize, learn, aggregate and persist.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::executor::{ProjectIntegrator, Runner};
use crate::http::RiskServiceClient;
use crate::learning::{self, Observation};
use crate::models::{ExecutionResult, RunAggregate, RunLabel, RunSummary, TestCase};
use crate::normalizer::normalize_batch;
use crate::risk::{PlannedTest, Prioritizer};
use crate::store::{Store, StoreError};
use crate::utils::Timer;

/// Orchestration errors
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("No tests available to run")]
    NoTestsAvailable,

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Test not found: {0}")]
    TestNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Failed to execute tests: {0}")]
    Execution(#[from] StoreError),
}

impl OrchestratorError {
    /// HTTP-style classification: 4xx for input errors, 500 otherwise
    pub fn http_status(&self) -> u16 {
        match self {
            OrchestratorError::NoTestsAvailable => 400,
            OrchestratorError::ProjectNotFound(_)
            | OrchestratorError::TestNotFound(_)
            | OrchestratorError::RunNotFound(_) => 404,
            OrchestratorError::Execution(_) => 500,
        }
    }

    /// Process exit code: 2 for input errors, 1 for execution failures
    pub fn exit_code(&self) -> i32 {
        if self.http_status() < 500 {
            2
        } else {
            1
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// One orchestration request
#[derive(Clone, Debug, Default)]
pub struct ExecuteRequest {
    /// Run a project's discovered suite instead of the registry
    pub project_id: Option<String>,
    pub commit_id: Option<String>,
    pub branch: Option<String>,
    /// Explicit registry selection; empty means every registered test
    pub test_ids: Vec<String>,
}

impl ExecuteRequest {
    pub fn registry() -> Self {
        Self::default()
    }

    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    pub fn with_commit(mut self, commit_id: Option<String>, branch: Option<String>) -> Self {
        self.commit_id = commit_id;
        self.branch = branch;
        self
    }

    pub fn with_tests(mut self, test_ids: Vec<String>) -> Self {
        self.test_ids = test_ids;
        self
    }
}

/// Synthetic tests substituted for an empty registry in demo mode
pub fn demo_tests() -> Vec<TestCase> {
    [
        ("Login Authentication", "tests/login.js", 8.5),
        ("Payment Gateway", "tests/payment.js", 9.2),
        ("User Profile Update", "tests/profile.js", 4.1),
        ("Search Functionality", "tests/search.js", 6.3),
        ("Checkout Flow", "tests/checkout.js", 7.8),
    ]
    .into_iter()
    .map(|(name, path, risk)| TestCase::new(name, path, risk))
    .collect()
}

/// Top-level coordinator over a store
pub struct Orchestrator<S> {
    store: S,
}

impl<S: Store> Orchestrator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute one orchestration cycle
    ///
    /// `config` is the snapshot for this run. On a persistence error no
    /// summary is returned, though learning updates already applied stay.
    pub async fn execute<R: Rng + ?Sized>(
        &self,
        request: &ExecuteRequest,
        config: &AppConfig,
        rng: &mut R,
    ) -> Result<RunSummary> {
        let timer = Timer::start("orchestration");

        let summary = match &request.project_id {
            Some(project_id) => self.execute_project(project_id, request, config, rng).await?,
            None => self.execute_registry(request, config, rng).await?,
        };

        info!(
            "Run {} finished: {} passed, {} failed, {} test time ({}ms wall clock)",
            summary.run_id,
            summary.passed,
            summary.failed,
            summary.total_duration,
            timer.elapsed_ms()
        );
        timer.stop();
        Ok(summary)
    }

    async fn execute_registry<R: Rng + ?Sized>(
        &self,
        request: &ExecuteRequest,
        config: &AppConfig,
        rng: &mut R,
    ) -> Result<RunSummary> {
        let mut tests = self.resolve_tests(&request.test_ids)?;

        if tests.is_empty() {
            if !config.demo_mode {
                return Err(OrchestratorError::NoTestsAvailable);
            }
            info!("Demo mode on: substituting sample tests");
            tests = demo_tests();
        }

        let prioritizer = self.prioritizer(config);
        debug!(
            "Ranking {} tests with the {}",
            tests.len(),
            if prioritizer.has_service() { "risk service" } else { "local risk model" }
        );
        let planned = prioritizer.prioritize(tests).await;
        let runner = Runner::for_config(config);
        let raw = runner.run(&planned, &self.store, rng).await?;
        let results = normalize_batch(&raw);

        if config.demo_mode {
            debug!("Demo mode on: skipping learning updates");
        } else {
            self.learn(&results)?;
        }

        let run = RunAggregate::new(RunLabel::ai_priority(runner.runner_type()), results);
        debug_assert!(run.is_consistent());
        self.store.insert_run(run.clone())?;

        Ok(RunSummary::new(
            format!(
                "Successfully executed {} tests in AI-prioritized order.",
                run.total_tests
            ),
            &run,
        ))
    }

    async fn execute_project<R: Rng + ?Sized>(
        &self,
        project_id: &str,
        request: &ExecuteRequest,
        config: &AppConfig,
        rng: &mut R,
    ) -> Result<RunSummary> {
        let project = self
            .store
            .get_project(project_id)?
            .ok_or_else(|| OrchestratorError::ProjectNotFound(project_id.to_string()))?;

        info!(
            "Running project {} | branch: {} | commit: {}",
            project.name,
            request.branch.as_deref().unwrap_or("N/A"),
            request.commit_id.as_deref().unwrap_or("N/A")
        );

        let integrator = ProjectIntegrator::new(project.clone(), config.integrator.clone());
        let planned = integrator.prepare(&self.store).await?;
        let runner = Runner::ExternalProject(integrator);
        let raw = runner.run(&planned, &self.store, rng).await?;
        let results = normalize_batch(&raw);

        let run = RunAggregate::new(RunLabel::external_project(), results).with_project(
            &project.id,
            request.commit_id.clone(),
            request.branch.clone(),
        );
        self.store.insert_run(run.clone())?;

        let (passed, failed, total, at) = (run.passed_count, run.failed_count, run.total_tests, run.run_at);
        self.store
            .update_project(&project.id, &mut |p| p.record_run(passed, failed, total, at))?;

        Ok(RunSummary::new(
            format!("Successfully executed project suite for {}.", project.name),
            &run,
        ))
    }

    /// Execution order a registry run would use, without running anything
    pub async fn plan(&self, request: &ExecuteRequest, config: &AppConfig) -> Result<Vec<PlannedTest>> {
        let mut tests = self.resolve_tests(&request.test_ids)?;
        if tests.is_empty() {
            if !config.demo_mode {
                return Err(OrchestratorError::NoTestsAvailable);
            }
            tests = demo_tests();
        }
        Ok(self.prioritizer(config).prioritize(tests).await)
    }

    /// Explicit selection, or every registered test
    fn resolve_tests(&self, test_ids: &[String]) -> Result<Vec<TestCase>> {
        if test_ids.is_empty() {
            return Ok(self.store.list_tests()?);
        }
        test_ids
            .iter()
            .map(|id| {
                self.store
                    .get_test(id)?
                    .ok_or_else(|| OrchestratorError::TestNotFound(id.clone()))
            })
            .collect()
    }

    fn prioritizer(&self, config: &AppConfig) -> Prioritizer {
        if config.demo_mode {
            return Prioritizer::local();
        }
        let Some(url) = &config.risk_service.url else {
            return Prioritizer::local();
        };
        match RiskServiceClient::new(url.as_str(), config.risk_service.timeout_secs) {
            Ok(client) => Prioritizer::with_service(client),
            Err(e) => {
                warn!("Cannot build risk service client, ranking locally: {}", e);
                Prioritizer::local()
            }
        }
    }

    /// Apply the learning loop once per result, in execution order
    ///
    /// Outcomes for the same test are folded in order and written in one
    /// atomic update.
    fn learn(&self, results: &[ExecutionResult]) -> Result<()> {
        let mut batches: Vec<(&str, Vec<Observation>)> = Vec::new();
        for result in results {
            let Some(id) = result.test_id.as_deref() else {
                continue;
            };
            let observation = Observation::from(result);
            match batches.iter_mut().find(|(batch_id, _)| *batch_id == id) {
                Some((_, observations)) => observations.push(observation),
                None => batches.push((id, vec![observation])),
            }
        }

        for (id, observations) in batches {
            let updated = self.store.update_test(id, &mut |test| {
                *test = learning::replay(test.clone(), observations.iter().copied());
            })?;
            if updated.is_none() {
                debug!("Skipping learning for unregistered test {}", id);
            }
        }
        Ok(())
    }
}
