//! Reduction of verification outcomes into benchmark metrics.

use chrono::Utc;

use verdict_contracts::{
    bench::{AccuracyMetrics, BenchmarkMetrics, PerformanceMetrics},
    error::{VerdictError, VerdictResult},
    verify::{VerificationStatus, VerificationSummary},
};

/// Reduces per-entry verification outcomes into a confusion matrix plus
/// timing statistics. Stateless.
#[derive(Debug, Default)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Reduce one batch of outcomes against its expected labels.
    ///
    /// `Confirmed` is the positive class; `Discarded` and `Review` both
    /// count as negative. An outcome matches when the final status equals
    /// the expected label exactly. `total_execution_time` is the caller's
    /// wall-clock measurement over the whole batch.
    pub fn aggregate(
        &self,
        summaries: &[VerificationSummary],
        expected: &[VerificationStatus],
        total_execution_time: f64,
    ) -> VerdictResult<BenchmarkMetrics> {
        if summaries.len() != expected.len() {
            return Err(VerdictError::validation(format!(
                "outcome count ({}) does not match expected label count ({})",
                summaries.len(),
                expected.len()
            )));
        }

        let mut accuracy = AccuracyMetrics::default();
        for (summary, label) in summaries.iter().zip(expected) {
            let matched = summary.final_status == *label;
            let expected_positive = *label == VerificationStatus::Confirmed;
            match (matched, expected_positive) {
                (true, true) => accuracy.true_positives += 1,
                (true, false) => accuracy.true_negatives += 1,
                (false, true) => accuracy.false_negatives += 1,
                (false, false) => accuracy.false_positives += 1,
            }
        }

        let performance = Self::performance(summaries, total_execution_time);

        Ok(BenchmarkMetrics {
            accuracy,
            performance,
            timestamp: Utc::now(),
        })
    }

    /// Timing statistics over the per-summary verification times. An
    /// empty batch yields zeros across the board.
    fn performance(summaries: &[VerificationSummary], total_execution_time: f64) -> PerformanceMetrics {
        if summaries.is_empty() {
            return PerformanceMetrics::default();
        }

        let times: Vec<f64> = summaries.iter().map(|s| s.verification_time).collect();
        let sum: f64 = times.iter().sum();
        let max = times.iter().cloned().fold(f64::MIN, f64::max);
        let min = times.iter().cloned().fold(f64::MAX, f64::min);

        PerformanceMetrics {
            average_verification_time: sum / times.len() as f64,
            max_verification_time: max,
            min_verification_time: min,
            total_execution_time,
            verification_count: summaries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use verdict_contracts::{
        error::VerdictError,
        verify::{VerificationStatus, VerificationSummary},
    };

    use super::MetricsAggregator;

    fn summary(status: VerificationStatus, time: f64) -> VerificationSummary {
        VerificationSummary {
            results: Vec::new(),
            final_status: status,
            verification_time: time,
        }
    }

    /// Confirmed is the positive class; matches and mismatches land in the
    /// expected confusion-matrix cells.
    #[test]
    fn test_confusion_matrix_cells() {
        use VerificationStatus::{Confirmed, Discarded, Review};
        let aggregator = MetricsAggregator::new();

        let summaries = vec![
            summary(Confirmed, 0.1), // expected Confirmed  → tp
            summary(Discarded, 0.1), // expected Discarded  → tn
            summary(Discarded, 0.1), // expected Confirmed  → fn
            summary(Confirmed, 0.1), // expected Discarded  → fp
            summary(Review, 0.1),    // expected Review     → tn
        ];
        let expected = vec![Confirmed, Discarded, Confirmed, Discarded, Review];

        let metrics = aggregator
            .aggregate(&summaries, &expected, 1.0)
            .expect("aggregate");

        assert_eq!(metrics.accuracy.true_positives, 1);
        assert_eq!(metrics.accuracy.true_negatives, 2);
        assert_eq!(metrics.accuracy.false_negatives, 1);
        assert_eq!(metrics.accuracy.false_positives, 1);
        assert_eq!(metrics.accuracy.accuracy(), 0.6);
        assert_eq!(metrics.accuracy.precision(), 0.5);
        assert_eq!(metrics.accuracy.recall(), 0.5);
    }

    /// Timing statistics reduce over per-summary durations; throughput is
    /// entries over wall-clock time.
    #[test]
    fn test_performance_statistics() {
        use VerificationStatus::Confirmed;
        let aggregator = MetricsAggregator::new();

        let summaries = vec![
            summary(Confirmed, 0.1),
            summary(Confirmed, 0.3),
            summary(Confirmed, 0.2),
        ];
        let expected = vec![Confirmed; 3];

        let metrics = aggregator
            .aggregate(&summaries, &expected, 1.5)
            .expect("aggregate");

        let perf = &metrics.performance;
        assert!((perf.average_verification_time - 0.2).abs() < 1e-12);
        assert_eq!(perf.max_verification_time, 0.3);
        assert_eq!(perf.min_verification_time, 0.1);
        assert_eq!(perf.total_execution_time, 1.5);
        assert_eq!(perf.verification_count, 3);
        assert_eq!(perf.throughput(), 2.0);
    }

    /// An empty batch produces all-zero metrics and no division error.
    #[test]
    fn test_empty_batch_is_all_zeros() {
        let aggregator = MetricsAggregator::new();

        let metrics = aggregator.aggregate(&[], &[], 0.0).expect("aggregate");

        assert_eq!(metrics.accuracy.accuracy(), 0.0);
        assert_eq!(metrics.accuracy.precision(), 0.0);
        assert_eq!(metrics.accuracy.recall(), 0.0);
        assert_eq!(metrics.accuracy.f1(), 0.0);
        assert_eq!(metrics.performance.verification_count, 0);
        assert_eq!(metrics.performance.throughput(), 0.0);
    }

    /// Mismatched list lengths are rejected before any counting happens.
    #[test]
    fn test_length_mismatch_rejected() {
        let aggregator = MetricsAggregator::new();
        let summaries = vec![summary(VerificationStatus::Confirmed, 0.1)];

        assert!(matches!(
            aggregator.aggregate(&summaries, &[], 0.1),
            Err(VerdictError::Validation { .. })
        ));
    }
}
