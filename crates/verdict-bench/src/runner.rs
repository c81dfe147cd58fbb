//! Benchmark execution over labelled entries.

use std::time::Instant;

use tracing::{info, warn};

use verdict_contracts::{
    bench::{BenchmarkConfig, BenchmarkEntry, BenchmarkReport},
    error::{VerdictError, VerdictResult},
    pipeline::RunId,
    verify::{VerificationStatus, VerificationSummary},
};
use verdict_core::traits::Verifier;

use crate::metrics::MetricsAggregator;

/// Drives a verifier over a batch of labelled entries and reduces the
/// outcomes into a [`BenchmarkReport`].
///
/// Every entry is verified with the one shared method list and threshold
/// pair from the config. A per-entry verification error is recorded and
/// logged, never fatal; errored entries are excluded from the aggregated
/// metrics.
#[derive(Debug, Default)]
pub struct BenchmarkRunner {
    aggregator: MetricsAggregator,
}

impl BenchmarkRunner {
    pub fn new() -> Self {
        Self {
            aggregator: MetricsAggregator::new(),
        }
    }

    pub fn run(
        &self,
        verifier: &dyn Verifier,
        config: &BenchmarkConfig,
        entries: &[BenchmarkEntry],
    ) -> VerdictResult<BenchmarkReport> {
        if entries.is_empty() {
            return Err(VerdictError::validation(
                "benchmark requires at least one entry",
            ));
        }
        if config.methods.is_empty() {
            return Err(VerdictError::validation(
                "benchmark requires at least one verification method",
            ));
        }

        let run_id = RunId::new();
        info!(%run_id, benchmark = %config.name, entries = entries.len(), "benchmark started");

        let started = Instant::now();
        let mut summaries: Vec<VerificationSummary> = Vec::new();
        let mut labels: Vec<VerificationStatus> = Vec::new();
        let mut matched = 0usize;
        let mut mismatched = 0usize;
        let mut errored = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            match verifier.verify(
                &entry.input_text,
                &config.methods,
                config.required_for_confirmed,
                config.required_for_review,
            ) {
                Ok(summary) => {
                    if summary.final_status == entry.expected_status {
                        matched += 1;
                    } else {
                        mismatched += 1;
                    }
                    labels.push(entry.expected_status);
                    summaries.push(summary);
                }
                Err(e) => {
                    warn!(%run_id, entry = index, error = %e, "benchmark entry failed");
                    errored += 1;
                }
            }
        }

        let total_execution_time = started.elapsed().as_secs_f64();
        let metrics = self
            .aggregator
            .aggregate(&summaries, &labels, total_execution_time)?;

        info!(
            %run_id,
            matched,
            mismatched,
            errored,
            accuracy = metrics.accuracy.accuracy(),
            "benchmark complete"
        );

        Ok(BenchmarkReport {
            run_id,
            metrics,
            total_entries: entries.len(),
            matched_entries: matched,
            mismatched_entries: mismatched,
            errored_entries: errored,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use verdict_contracts::{
        bench::{BenchmarkConfig, BenchmarkEntry},
        error::VerdictError,
        verify::{MethodSpec, VerificationMethod, VerificationMode, VerificationStatus},
    };
    use verdict_mock::{ScriptedGenerator, TokenOverlapScorer};
    use verdict_verify::MethodVerifier;

    use super::BenchmarkRunner;

    fn entry(text: &str, expected: VerificationStatus) -> BenchmarkEntry {
        BenchmarkEntry {
            input_text: text.to_string(),
            expected_status: expected,
            metadata: Value::Null,
        }
    }

    fn digit_config() -> BenchmarkConfig {
        BenchmarkConfig {
            name: "digits".to_string(),
            description: String::new(),
            methods: vec![VerificationMethod {
                name: "has-digits".to_string(),
                mode: VerificationMode::Cumulative,
                spec: MethodSpec::Regex {
                    pattern: r"\d".to_string(),
                },
            }],
            required_for_confirmed: 1,
            required_for_review: 0,
        }
    }

    fn verifier() -> MethodVerifier {
        MethodVerifier::new(
            Box::new(ScriptedGenerator::default()),
            Box::new(TokenOverlapScorer::new()),
        )
    }

    /// Entries are verified against the shared config and counted into
    /// matched/mismatched buckets.
    #[test]
    fn test_run_counts_matches_and_mismatches() {
        let runner = BenchmarkRunner::new();
        let entries = vec![
            entry("serial 42", VerificationStatus::Confirmed),
            entry("no digits", VerificationStatus::Discarded),
            entry("also none", VerificationStatus::Confirmed),
        ];

        let report = runner
            .run(&verifier(), &digit_config(), &entries)
            .expect("run");

        assert_eq!(report.total_entries, 3);
        assert_eq!(report.matched_entries, 2);
        assert_eq!(report.mismatched_entries, 1);
        assert_eq!(report.errored_entries, 0);
        assert_eq!(report.metrics.accuracy.true_positives, 1);
        assert_eq!(report.metrics.accuracy.true_negatives, 1);
        assert_eq!(report.metrics.accuracy.false_negatives, 1);
        assert_eq!(report.metrics.performance.verification_count, 3);
    }

    /// A per-entry verification error is recorded, not fatal, and the
    /// entry is excluded from the metrics.
    #[test]
    fn test_errored_entry_is_recorded_not_fatal() {
        let runner = BenchmarkRunner::new();
        // Whitespace-only input fails request validation inside verify.
        let entries = vec![
            entry("serial 42", VerificationStatus::Confirmed),
            entry("   ", VerificationStatus::Discarded),
        ];

        let report = runner
            .run(&verifier(), &digit_config(), &entries)
            .expect("run");

        assert_eq!(report.total_entries, 2);
        assert_eq!(report.matched_entries, 1);
        assert_eq!(report.errored_entries, 1);
        assert_eq!(report.metrics.performance.verification_count, 1);
    }

    /// An empty entry list is rejected up front.
    #[test]
    fn test_empty_entries_rejected() {
        let runner = BenchmarkRunner::new();

        assert!(matches!(
            runner.run(&verifier(), &digit_config(), &[]),
            Err(VerdictError::Validation { .. })
        ));
    }

    /// An empty method list is rejected up front.
    #[test]
    fn test_empty_methods_rejected() {
        let runner = BenchmarkRunner::new();
        let mut config = digit_config();
        config.methods.clear();
        let entries = vec![entry("serial 42", VerificationStatus::Confirmed)];

        assert!(matches!(
            runner.run(&verifier(), &config, &entries),
            Err(VerdictError::Validation { .. })
        ));
    }
}
