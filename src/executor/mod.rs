//! Execution runners
//!
//! Three interchangeable strategies behind one dispatch signature. Every
//! runner emits one raw JSON result per planned test, in the order given;
//! the normalizer turns those into [`ExecutionResult`](crate::models::ExecutionResult)s.

mod container;
mod integrator;
mod local;

pub use container::ContainerRunner;
pub use integrator::ProjectIntegrator;
pub use local::LocalRunner;

use rand::Rng;
use serde_json::Value;
use tracing::info;

use crate::config::{AppConfig, ExecutionMode};
use crate::risk::PlannedTest;
use crate::store::{Store, StoreResult};

/// Execution strategy for one run
pub enum Runner {
    Local(LocalRunner),
    Docker(ContainerRunner),
    ExternalProject(ProjectIntegrator),
}

impl Runner {
    /// Runner for a registry run under the configured execution mode
    pub fn for_config(config: &AppConfig) -> Self {
        match config.execution_mode {
            ExecutionMode::Local => Runner::Local(LocalRunner),
            ExecutionMode::Docker => Runner::Docker(ContainerRunner::new(config.container.clone())),
        }
    }

    /// Label recorded as the run's `runnerType`
    pub fn runner_type(&self) -> &'static str {
        match self {
            Runner::Local(_) => "local",
            Runner::Docker(_) => "docker",
            Runner::ExternalProject(_) => "custom-integrator",
        }
    }

    /// Execute an ordered batch
    ///
    /// Only the project integrator touches the store; the other runners
    /// ignore it.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        tests: &[PlannedTest],
        store: &dyn Store,
        rng: &mut R,
    ) -> StoreResult<Vec<Value>> {
        info!("Dispatching {} tests to the {} runner", tests.len(), self.runner_type());
        match self {
            Runner::Local(runner) => Ok(runner.run(tests, rng)),
            Runner::Docker(runner) => Ok(runner.run(tests, rng).await),
            Runner::ExternalProject(integrator) => {
                info!("Executing suite of project {}", integrator.project().name);
                integrator.execute(tests, store, rng).await
            }
        }
    }
}

/// Raw result shape shared by every runner
pub(crate) fn raw_result(
    planned: &PlannedTest,
    test_name: &str,
    passed: bool,
    duration: u64,
    order_index: usize,
    logs: String,
    metadata: Value,
) -> Value {
    serde_json::json!({
        "testId": planned.test.id,
        "testName": test_name,
        "status": if passed { "passed" } else { "failed" },
        "duration": duration,
        "orderIndex": order_index + 1,
        "riskScore": planned.priority,
        "logs": logs,
        "metadata": metadata,
    })
}

/// Deterministic random source for runner tests
#[cfg(test)]
pub(crate) mod testing {
    use rand::RngCore;

    /// Returns the same word forever
    ///
    /// `Constant(0)` makes every draw pass and pick the low end of each range;
    /// `Constant(u64::MAX)` makes every draw fail and pick the high end.
    pub struct Constant(pub u64);

    impl RngCore for Constant {
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for (i, byte) in dest.iter_mut().enumerate() {
                *byte = self.0.to_le_bytes()[i % 8];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Constant;
    use super::*;
    use crate::models::TestCase;
    use crate::normalizer::normalize_batch;
    use crate::risk::rank;
    use crate::store::JsonStore;

    fn planned() -> Vec<PlannedTest> {
        rank(vec![
            TestCase::new("Login Authentication", "tests/login.js", 8.5),
            TestCase::new("Payment Gateway", "tests/payment.js", 9.2),
        ])
    }

    #[test]
    fn test_runner_for_config() {
        let mut config = AppConfig::default();
        assert_eq!(Runner::for_config(&config).runner_type(), "local");

        config.execution_mode = ExecutionMode::Docker;
        assert_eq!(Runner::for_config(&config).runner_type(), "docker");
    }

    #[tokio::test]
    async fn test_every_runner_preserves_order() {
        let store = JsonStore::in_memory();
        let tests = planned();

        for runner in [
            Runner::Local(LocalRunner),
            Runner::Docker(ContainerRunner::new(Default::default())),
        ] {
            let raw = runner.run(&tests, &store, &mut Constant(0)).await.unwrap();
            let results = normalize_batch(&raw);
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].test_name, "Payment Gateway");
            assert_eq!(results[0].order_index, 1);
            assert_eq!(results[1].order_index, 2);
            assert_eq!(results[0].risk_score, 9.2);
        }
    }
}
