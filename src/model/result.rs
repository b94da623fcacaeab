use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stats::bound_confidence;

/// Diagnostic key/value pairs attached to a check result.
pub type Explanation = HashMap<String, Value>;

/// Result from a single check execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check that produced this result.
    pub check_name: String,
    /// Confidence that this is a violation, in [0, 1].
    pub confidence: f64,
    /// Severity of the violation, in [0, 1].
    pub severity: f64,
    pub explain: Explanation,
}

impl CheckResult {
    /// A result indicating no violation: zero confidence, no explanation.
    pub fn clean(check_name: &str) -> Self {
        Self {
            check_name: check_name.to_string(),
            confidence: 0.0,
            severity: 0.0,
            explain: Explanation::new(),
        }
    }

    /// A violation result. Confidence and severity are clamped into
    /// [0, 1] before exposure.
    pub fn violation(check_name: &str, confidence: f64, severity: f64, explain: Explanation) -> Self {
        Self {
            check_name: check_name.to_string(),
            confidence: bound_confidence(confidence),
            severity: bound_confidence(severity),
            explain,
        }
    }

    /// True if this result's confidence meets the given threshold.
    pub fn is_violation(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}
