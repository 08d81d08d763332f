//! Prioritization engine
//!
//! Orders a batch of tests by descending priority. Ties keep their input
//! order. When a remote risk service is configured but unreachable, the
//! batch runs in its original order instead.

use tracing::{info, warn};

use crate::http::{RankedItem, RiskServiceClient, RiskServiceError};
use crate::models::TestCase;

/// A test paired with the priority it was dispatched with
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedTest {
    pub test: TestCase,
    pub priority: f64,
}

impl PlannedTest {
    pub fn new(test: TestCase) -> Self {
        let priority = test.priority();
        Self { test, priority }
    }
}

/// Stable descending sort by risk-model priority
pub fn rank(tests: Vec<TestCase>) -> Vec<PlannedTest> {
    let mut planned: Vec<PlannedTest> = tests.into_iter().map(PlannedTest::new).collect();
    // `sort_by` is stable, equal scores keep their relative order
    planned.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    planned
}

/// Prioritization engine with an optional remote ranking service
#[derive(Clone, Default)]
pub struct Prioritizer {
    service: Option<RiskServiceClient>,
}

impl Prioritizer {
    /// Rank with the local risk model only
    pub fn local() -> Self {
        Self { service: None }
    }

    /// Delegate ranking to a remote service
    pub fn with_service(client: RiskServiceClient) -> Self {
        Self {
            service: Some(client),
        }
    }

    pub fn has_service(&self) -> bool {
        self.service.is_some()
    }

    /// Order a batch for execution
    ///
    /// Never fails: a service error degrades to the unmodified input order.
    pub async fn prioritize(&self, tests: Vec<TestCase>) -> Vec<PlannedTest> {
        let Some(client) = &self.service else {
            let planned = rank(tests);
            info!("Prioritized {} tests with the local risk model", planned.len());
            return planned;
        };

        if tests.is_empty() {
            return Vec::new();
        }

        let ordering = match client.prioritize(&tests).await {
            Ok(ranked) => match_ranking(&tests, &ranked),
            Err(e) => Err(e),
        };

        match ordering {
            Ok(order) => {
                info!(
                    "Prioritized {} tests via risk service at {}",
                    order.len(),
                    client.base_url()
                );
                let mut slots: Vec<Option<TestCase>> = tests.into_iter().map(Some).collect();
                order
                    .into_iter()
                    .filter_map(|idx| slots[idx].take())
                    .map(PlannedTest::new)
                    .collect()
            }
            Err(e) => {
                warn!("Risk service unavailable, falling back to registry order: {}", e);
                tests.into_iter().map(PlannedTest::new).collect()
            }
        }
    }
}

/// Map a remote ranking onto indexes of the submitted batch
///
/// The ranking must be a permutation of the batch. Entries match by id when
/// present, otherwise by the first unclaimed test with the same name.
fn match_ranking(tests: &[TestCase], ranked: &[RankedItem]) -> Result<Vec<usize>, RiskServiceError> {
    if ranked.len() != tests.len() {
        return Err(RiskServiceError::MalformedRanking(format!(
            "expected {} entries, got {}",
            tests.len(),
            ranked.len()
        )));
    }

    let mut claimed = vec![false; tests.len()];
    let mut order = Vec::with_capacity(tests.len());

    for item in ranked {
        let found = tests.iter().enumerate().position(|(idx, test)| {
            !claimed[idx]
                && match &item.id {
                    Some(id) => &test.id == id,
                    None => test.test_name == item.test_name,
                }
        });

        match found {
            Some(idx) => {
                claimed[idx] = true;
                order.push(idx);
            }
            None => {
                return Err(RiskServiceError::MalformedRanking(format!(
                    "unknown test '{}'",
                    item.test_name
                )))
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::LearningState;
    use proptest::prelude::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with `status` and a JSON `body`
    ///
    /// Returns the base URL and a handle yielding the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let body_start = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
            let length: usize = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while buf.len() < body_start + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });

        (url, handle)
    }

    fn low_high_mid() -> Vec<TestCase> {
        vec![
            TestCase::new("low", "low.js", 1.0),
            TestCase::new("high", "high.js", 9.0),
            TestCase::new("mid", "mid.js", 5.0),
        ]
    }

    fn names(planned: &[PlannedTest]) -> Vec<&str> {
        planned.iter().map(|p| p.test.test_name.as_str()).collect()
    }

    #[test]
    fn test_fresh_tests_order_by_base_risk() {
        let tests = vec![
            TestCase::new("Login Authentication", "tests/login.js", 8.5),
            TestCase::new("Payment Gateway", "tests/payment.js", 9.2),
            TestCase::new("User Profile Update", "tests/profile.js", 4.1),
        ];
        let planned = rank(tests);
        let scores: Vec<f64> = planned.iter().map(|p| p.priority).collect();
        assert_eq!(scores, vec![9.2, 8.5, 4.1]);
    }

    #[test]
    fn test_history_raises_priority() {
        let mut flaky = TestCase::new("Flaky", "flaky.js", 4.0);
        flaky.learning = LearningState::from_counts(4, 2);
        let stable = TestCase::new("Stable", "stable.js", 7.0);

        let planned = rank(vec![stable, flaky]);
        assert_eq!(names(&planned), vec!["Flaky", "Stable"]);
        assert_eq!(planned[0].priority, 8.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let tests = vec![
            TestCase::new("first", "a.js", 5.0),
            TestCase::new("high", "b.js", 9.0),
            TestCase::new("second", "c.js", 5.0),
            TestCase::new("third", "d.js", 5.0),
        ];
        let planned = rank(tests);
        assert_eq!(names(&planned), vec!["high", "first", "second", "third"]);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(rank(Vec::new()).is_empty());

        let only = TestCase::new("only", "only.js", 3.3);
        let planned = rank(vec![only.clone()]);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].test, only);
    }

    #[tokio::test]
    async fn test_local_prioritizer() {
        let prioritizer = Prioritizer::local();
        assert!(!prioritizer.has_service());
        let planned = prioritizer
            .prioritize(vec![
                TestCase::new("low", "low.js", 1.0),
                TestCase::new("high", "high.js", 9.0),
            ])
            .await;
        assert_eq!(names(&planned), vec!["high", "low"]);
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back_to_input_order() {
        let client = RiskServiceClient::new("http://127.0.0.1:9", 2).unwrap();
        let prioritizer = Prioritizer::with_service(client);

        let planned = prioritizer
            .prioritize(vec![
                TestCase::new("low", "low.js", 1.0),
                TestCase::new("high", "high.js", 9.0),
                TestCase::new("mid", "mid.js", 5.0),
            ])
            .await;

        assert_eq!(names(&planned), vec!["low", "high", "mid"]);
        assert_eq!(planned[1].priority, 9.0);
    }

    #[tokio::test]
    async fn test_service_order_is_followed() {
        let (url, request) = serve_once(
            "200 OK",
            r#"[{"testName":"mid"},{"testName":"low"},{"testName":"high"}]"#,
        )
        .await;
        let prioritizer = Prioritizer::with_service(RiskServiceClient::new(url, 5).unwrap());
        assert!(prioritizer.has_service());

        let planned = prioritizer.prioritize(low_high_mid()).await;

        assert_eq!(names(&planned), vec!["mid", "low", "high"]);
        let priorities: Vec<f64> = planned.iter().map(|p| p.priority).collect();
        assert_eq!(priorities, vec![5.0, 1.0, 9.0]);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /prioritize HTTP/1.1"));
        assert!(request.contains(r#""testName":"high""#));
        assert!(request.contains(r#""filePath":"mid.js""#));
    }

    #[tokio::test]
    async fn test_service_error_status_falls_back_to_input_order() {
        let (url, request) = serve_once("500 Internal Server Error", r#"{"detail":"boom"}"#).await;
        let prioritizer = Prioritizer::with_service(RiskServiceClient::new(url, 5).unwrap());

        let planned = prioritizer.prioritize(low_high_mid()).await;

        assert_eq!(names(&planned), vec!["low", "high", "mid"]);
        request.await.unwrap();
    }

    #[test]
    fn test_match_ranking_by_id_and_name() {
        let tests = vec![
            TestCase::new("a", "a.js", 1.0),
            TestCase::new("b", "b.js", 2.0),
            TestCase::new("c", "c.js", 3.0),
        ];
        let ranked = vec![
            RankedItem {
                id: Some(tests[2].id.clone()),
                test_name: "c".to_string(),
            },
            RankedItem {
                id: None,
                test_name: "a".to_string(),
            },
            RankedItem {
                id: None,
                test_name: "b".to_string(),
            },
        ];
        assert_eq!(match_ranking(&tests, &ranked).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_match_ranking_rejects_partial() {
        let tests = vec![TestCase::new("a", "a.js", 1.0), TestCase::new("b", "b.js", 2.0)];
        let short = vec![RankedItem {
            id: None,
            test_name: "a".to_string(),
        }];
        assert!(match_ranking(&tests, &short).is_err());

        let unknown = vec![
            RankedItem {
                id: None,
                test_name: "a".to_string(),
            },
            RankedItem {
                id: None,
                test_name: "zzz".to_string(),
            },
        ];
        assert!(match_ranking(&tests, &unknown).is_err());
    }

    proptest! {
        #[test]
        fn prop_rank_is_stable_and_descending(risks in proptest::collection::vec(0u8..4, 0..40)) {
            let tests: Vec<TestCase> = risks
                .iter()
                .enumerate()
                .map(|(idx, r)| TestCase::new(idx.to_string(), "t.js", *r as f64 * 2.5))
                .collect();
            let planned = rank(tests);

            for pair in planned.windows(2) {
                prop_assert!(pair[0].priority >= pair[1].priority);
                if pair[0].priority == pair[1].priority {
                    let a: usize = pair[0].test.test_name.parse().unwrap();
                    let b: usize = pair[1].test.test_name.parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}
