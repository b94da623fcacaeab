//! Property-based tests using proptest.
//!
//! Invariants that must hold for ALL inputs:
//! - Check results: confidence and severity always land in [0, 1]
//! - Ring buffer: size = min(pushes, capacity), get(0) = newest
//! - Sigmoid confidence mapping: monotone, zero at zero, bounded
//! - Fusion: max fusion is commutative and floored at zero
//! - EWMA: first update exact, later updates contract toward the input
//! - Context timestamps: non-decreasing for any event sequence

use proptest::prelude::*;
use uuid::Uuid;

use warden_core::context::PlayerContext;
use warden_core::history::{Ewma, RingBuffer, RollingWindow};
use warden_core::model::{CheckResult, Explanation, TelemetryInput};
use warden_core::stats;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_check_result_scores_always_bounded(
        confidence in -10.0f64..10.0,
        severity in -10.0f64..10.0,
    ) {
        let r = CheckResult::violation("AnyCheck", confidence, severity, Explanation::new());
        prop_assert!(r.confidence >= 0.0 && r.confidence <= 1.0);
        prop_assert!(r.severity >= 0.0 && r.severity <= 1.0);
    }

    #[test]
    fn prop_ring_buffer_size_and_newest(
        capacity in 1usize..64,
        values in proptest::collection::vec(any::<i32>(), 0..200),
    ) {
        let mut rb = RingBuffer::new(capacity);
        for v in &values {
            rb.push(*v);
        }
        prop_assert_eq!(rb.len(), values.len().min(capacity));
        match values.last() {
            Some(last) => prop_assert_eq!(rb.get(0), Some(last)),
            None => prop_assert_eq!(rb.get(0), None),
        }
        // Snapshot preserves arrival order for the retained suffix
        let expected: Vec<i32> = values
            .iter()
            .skip(values.len().saturating_sub(capacity))
            .copied()
            .collect();
        prop_assert_eq!(rb.to_vec(), expected);
    }

    #[test]
    fn prop_anomaly_confidence_monotone_and_bounded(
        a in 0.0f64..100.0,
        b in 0.0f64..100.0,
        scale in 0.1f64..10.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let c_lo = stats::anomaly_to_confidence(lo, scale);
        let c_hi = stats::anomaly_to_confidence(hi, scale);
        prop_assert!(c_lo <= c_hi);
        prop_assert!(c_hi < 1.0);
        prop_assert_eq!(stats::anomaly_to_confidence(0.0, scale), 0.0);
    }

    #[test]
    fn prop_fuse_max_commutative_and_floored(
        mut values in proptest::collection::vec(-1.0f64..1.0, 1..20),
    ) {
        let forward = stats::fuse_max(&values);
        values.reverse();
        let backward = stats::fuse_max(&values);
        prop_assert_eq!(forward, backward);
        prop_assert!(forward >= 0.0);

        let zeros = vec![0.0; values.len()];
        prop_assert_eq!(stats::fuse_max(&zeros), 0.0);
    }

    #[test]
    fn prop_fuse_max_associative(
        a in proptest::collection::vec(0.0f64..1.0, 1..8),
        b in proptest::collection::vec(0.0f64..1.0, 1..8),
    ) {
        let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        let nested = stats::fuse_max(&[stats::fuse_max(&a), stats::fuse_max(&b)]);
        prop_assert_eq!(stats::fuse_max(&combined), nested);
    }

    #[test]
    fn prop_ewma_first_exact_then_contracts(
        alpha in 0.01f64..1.0,
        first in -1000.0f64..1000.0,
        updates in proptest::collection::vec(-1000.0f64..1000.0, 1..20),
    ) {
        let mut ewma = Ewma::new(alpha);
        prop_assert_eq!(ewma.update(first), first);

        for target in updates {
            let before = ewma.get();
            let after = ewma.update(target);
            let dist_before = (before - target).abs();
            let dist_after = (after - target).abs();
            prop_assert!(dist_after <= dist_before * (1.0 - alpha) + 1e-9);
        }
    }

    #[test]
    fn prop_context_timestamps_non_decreasing(
        gaps in proptest::collection::vec(0i64..500, 1..100),
    ) {
        let mut ctx = PlayerContext::new(Uuid::new_v4(), "Steve", 64, 20, 0.3);
        let mut nanos = 1i64;
        let mut last_seen = 0i64;
        for gap_ms in gaps {
            nanos += gap_ms * 1_000_000;
            ctx.add_telemetry(TelemetryInput {
                nano_time: nanos,
                ping: 20,
                ..Default::default()
            });
            prop_assert!(ctx.last_telemetry_nanos() >= last_seen);
            last_seen = ctx.last_telemetry_nanos();
        }
    }

    #[test]
    fn prop_rolling_window_stats_match_free_functions(
        values in proptest::collection::vec(-1000.0f64..1000.0, 0..40),
        capacity in 1usize..40,
    ) {
        let mut window = RollingWindow::new(capacity);
        for v in &values {
            window.add(*v);
        }
        let retained: Vec<f64> = values
            .iter()
            .skip(values.len().saturating_sub(capacity))
            .copied()
            .collect();
        prop_assert!((window.median() - stats::median(&retained)).abs() < 1e-9);
        prop_assert!((window.mad() - stats::mad(&retained)).abs() < 1e-9);
        prop_assert!((window.mean() - stats::mean(&retained)).abs() < 1e-9);
        prop_assert!((window.std_dev() - stats::std_dev(&retained)).abs() < 1e-9);
    }

    #[test]
    fn prop_fuse_weighted_within_input_range(
        pairs in proptest::collection::vec((0.0f64..1.0, 0.01f64..10.0), 1..10),
    ) {
        let confidences: Vec<f64> = pairs.iter().map(|(c, _)| *c).collect();
        let weights: Vec<f64> = pairs.iter().map(|(_, w)| *w).collect();
        let fused = stats::fuse_weighted(&confidences, &weights);
        let min = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        let max = confidences.iter().copied().fold(0.0f64, f64::max);
        prop_assert!(fused >= min - 1e-9 && fused <= max + 1e-9);
    }
}
