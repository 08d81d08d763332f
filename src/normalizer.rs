//! Result normalizer
//!
//! Canonicalizes raw runner output into [`ExecutionResult`]. The mapping is
//! total: any JSON value, however malformed, yields a complete result.
//!
//! | Field        | Default          |
//! |--------------|------------------|
//! | `testId`     | none             |
//! | `testName`   | `Unknown Test`   |
//! | `status`     | `failed` unless exactly `"passed"` |
//! | `duration`   | 0                |
//! | `orderIndex` | `executionOrder`, then 0 |
//! | `riskScore`  | 0                |
//! | `logs`       | empty            |
//! | `metadata`   | empty map        |

use serde_json::{Map, Value};

use crate::models::{ExecutionResult, TestStatus};

const UNKNOWN_TEST: &str = "Unknown Test";

/// Normalize one raw runner result
pub fn normalize(raw: &Value) -> ExecutionResult {
    let field = |name: &str| raw.as_object().and_then(|obj| obj.get(name));

    let order_index = int_field(field("orderIndex"))
        .filter(|v| *v > 0)
        .or_else(|| int_field(field("executionOrder")))
        .unwrap_or(0);

    ExecutionResult {
        test_id: field("testId").and_then(id_field),
        test_name: field("testName")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_TEST)
            .to_string(),
        status: field("status")
            .and_then(Value::as_str)
            .map(TestStatus::from_literal)
            .unwrap_or(TestStatus::Failed),
        duration: int_field(field("duration")).unwrap_or(0),
        order_index: u32::try_from(order_index).unwrap_or(u32::MAX),
        risk_score: float_field(field("riskScore")).unwrap_or(0.0),
        logs: field("logs")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        metadata: field("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new),
    }
}

/// Normalize a batch, filling missing order indexes from batch position
pub fn normalize_batch(raw: &[Value]) -> Vec<ExecutionResult> {
    raw.iter()
        .enumerate()
        .map(|(idx, value)| {
            let mut result = normalize(value);
            if result.order_index == 0 {
                result.order_index = idx as u32 + 1;
            }
            result
        })
        .collect()
}

fn id_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer from a number or numeric string; fractions truncate
fn int_field(value: Option<&Value>) -> Option<u64> {
    let v = float_field(value)?;
    Some(if v <= 0.0 { 0 } else { v.trunc() as u64 })
}

/// Finite float from a number or numeric string
fn float_field(value: Option<&Value>) -> Option<f64> {
    let v = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_complete_input() {
        let raw = json!({
            "testId": "test_1",
            "testName": "Payment Gateway",
            "status": "passed",
            "duration": 1234,
            "orderIndex": 2,
            "riskScore": 9.2,
            "logs": "[LOCAL] ok",
            "metadata": {"containerId": "atx-1"}
        });
        let result = normalize(&raw);
        assert_eq!(result.test_id.as_deref(), Some("test_1"));
        assert_eq!(result.test_name, "Payment Gateway");
        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(result.duration, 1234);
        assert_eq!(result.order_index, 2);
        assert_eq!(result.risk_score, 9.2);
        assert_eq!(result.logs, "[LOCAL] ok");
        assert_eq!(result.metadata["containerId"], "atx-1");
    }

    #[test]
    fn test_empty_object_defaults() {
        let result = normalize(&json!({}));
        assert!(result.test_id.is_none());
        assert_eq!(result.test_name, "Unknown Test");
        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(result.duration, 0);
        assert_eq!(result.order_index, 0);
        assert_eq!(result.risk_score, 0.0);
        assert!(result.logs.is_empty());
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_wrong_types_default() {
        let raw = json!({
            "testName": 42,
            "status": true,
            "duration": "soon",
            "orderIndex": [1],
            "riskScore": {"value": 3},
            "logs": 7,
            "metadata": "none"
        });
        let result = normalize(&raw);
        assert_eq!(result.test_name, "Unknown Test");
        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(result.duration, 0);
        assert_eq!(result.order_index, 0);
        assert_eq!(result.risk_score, 0.0);
        assert!(result.logs.is_empty());
        assert!(result.metadata.is_empty());
    }

    #[test]
    fn test_numeric_strings_and_fractions() {
        let raw = json!({"duration": "850", "orderIndex": 3.9, "riskScore": "7.5"});
        let result = normalize(&raw);
        assert_eq!(result.duration, 850);
        assert_eq!(result.order_index, 3);
        assert_eq!(result.risk_score, 7.5);
    }

    #[test]
    fn test_negative_duration_clamps() {
        assert_eq!(normalize(&json!({"duration": -40})).duration, 0);
    }

    #[test]
    fn test_status_is_exact_literal() {
        assert_eq!(normalize(&json!({"status": "Passed"})).status, TestStatus::Failed);
        assert_eq!(normalize(&json!({"status": "ok"})).status, TestStatus::Failed);
        assert_eq!(normalize(&json!({"status": "passed"})).status, TestStatus::Passed);
    }

    #[test]
    fn test_legacy_execution_order() {
        let result = normalize(&json!({"executionOrder": 4}));
        assert_eq!(result.order_index, 4);

        let both = normalize(&json!({"orderIndex": 2, "executionOrder": 4}));
        assert_eq!(both.order_index, 2);
    }

    #[test]
    fn test_non_object_input() {
        for raw in [json!(null), json!(12), json!("passed"), json!([1, 2])] {
            let result = normalize(&raw);
            assert_eq!(result.test_name, "Unknown Test");
            assert_eq!(result.status, TestStatus::Failed);
        }
    }

    #[test]
    fn test_batch_fills_order_index() {
        let raw = vec![json!({"status": "passed"}), json!({"orderIndex": 7}), json!({})];
        let results = normalize_batch(&raw);
        let order: Vec<u32> = results.iter().map(|r| r.order_index).collect();
        assert_eq!(order, vec![1, 7, 3]);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            any::<f64>().prop_map(|f| json!(f)),
            ".*".prop_map(Value::String),
            Just(json!("passed")),
        ];
        leaf.prop_recursive(3, 32, 8, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::hash_map(
                    prop_oneof![
                        Just("testId".to_string()),
                        Just("testName".to_string()),
                        Just("status".to_string()),
                        Just("duration".to_string()),
                        Just("orderIndex".to_string()),
                        Just("riskScore".to_string()),
                        Just("logs".to_string()),
                        Just("metadata".to_string()),
                        "[a-z]{1,6}",
                    ],
                    inner,
                    0..8
                )
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_total(raw in arb_json()) {
            let result = normalize(&raw);
            prop_assert!(!result.test_name.is_empty());
            prop_assert!(result.risk_score.is_finite());
            let passed = raw.get("status").and_then(Value::as_str) == Some("passed");
            prop_assert_eq!(result.status.is_success(), passed);
        }
    }
}
