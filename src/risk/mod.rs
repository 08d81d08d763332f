//! Risk model and prioritization engine
//!
//! Derives a 0-10 priority from a test's static risk and its historical
//! failure rate, and orders batches of tests by that priority.

mod prioritizer;

pub use prioritizer::{rank, PlannedTest, Prioritizer};

/// Upper bound of the risk scale
pub const MAX_SCORE: f64 = 10.0;

/// Priority of a test: `min(10, base_risk * (1 + 2 * failure_rate))`
///
/// A test that never failed keeps its static risk; one failing half the
/// time has its priority doubled before clamping.
pub fn priority(base_risk: f64, failure_rate: f64) -> f64 {
    let base_risk = clamp_score(base_risk);
    let failure_rate = if failure_rate.is_finite() {
        failure_rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    clamp_score(base_risk * (1.0 + 2.0 * failure_rate))
}

/// Clamp a score into `[0, 10]`; non-finite input maps to 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, MAX_SCORE)
    }
}
