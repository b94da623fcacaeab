use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CheckResult, Explanation, PlayerId};

/// Aggregated violation assembled from the significant check results of
/// a single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub player_id: PlayerId,
    pub player_name: String,
    /// Name of the highest-confidence contributing check.
    pub category: String,
    /// Maximum confidence over contributors.
    pub confidence: f64,
    /// Maximum severity over contributors.
    pub severity: f64,
    /// Monotonic timestamp of detection, nanoseconds.
    pub timestamp: i64,
    /// Player ping at detection, milliseconds.
    pub ping: i64,
    pub check_results: Vec<CheckResult>,
    /// Merged explanation from all contributors; the first writer wins on
    /// key collisions.
    pub explanation: Explanation,
}

impl Violation {
    /// Builds a violation from significant check results, fusing with
    /// max-confidence and max-severity.
    pub fn from_results(
        player_id: PlayerId,
        player_name: impl Into<String>,
        category: impl Into<String>,
        check_results: Vec<CheckResult>,
        timestamp: i64,
        ping: i64,
    ) -> Self {
        let confidence = check_results
            .iter()
            .map(|r| r.confidence)
            .fold(0.0, f64::max);
        let severity = check_results.iter().map(|r| r.severity).fold(0.0, f64::max);

        let mut explanation = Explanation::new();
        for result in check_results.iter().filter(|r| r.confidence > 0.0) {
            for (key, value) in &result.explain {
                explanation
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        Self {
            player_id,
            player_name: player_name.into(),
            category: category.into(),
            confidence,
            severity,
            timestamp,
            ping,
            check_results,
            explanation,
        }
    }

    /// Human-readable summary for alerts and console logs.
    pub fn formatted_explanation(&self) -> String {
        let mut out = format!(
            "Category: {}, Confidence: {:.4}, Severity: {:.2}, Ping: {}ms",
            self.category, self.confidence, self.severity, self.ping
        );
        if !self.explanation.is_empty() {
            let mut keys: Vec<&String> = self.explanation.keys().collect();
            keys.sort();
            let signals: Vec<String> = keys
                .into_iter()
                .map(|k| match &self.explanation[k] {
                    Value::Number(n) if n.is_f64() => {
                        format!("{}={:.3}", k, n.as_f64().unwrap_or(0.0))
                    }
                    other => format!("{}={}", k, other),
                })
                .collect();
            out.push_str(" | Signals: ");
            out.push_str(&signals.join(", "));
        }
        out
    }

    /// Names of contributing checks whose confidence meets `threshold`.
    pub fn triggered_check_names(&self, threshold: f64) -> Vec<&str> {
        self.check_results
            .iter()
            .filter(|r| r.confidence >= threshold)
            .map(|r| r.check_name.as_str())
            .collect()
    }
}
