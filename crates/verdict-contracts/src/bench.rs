//! Benchmark definitions and aggregate metric types.
//!
//! A benchmark run verifies a list of labelled entries and reduces the
//! outcomes into a confusion matrix plus performance statistics. All
//! derived rates define 0.0 where their denominator is zero — no division
//! error ever surfaces from these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::RunId;
use crate::verify::{VerificationMethod, VerificationStatus};

/// Confusion-matrix counts with `Confirmed` as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub true_positives: u64,
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl AccuracyMetrics {
    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positives + self.true_negatives + self.false_positives + self.false_negatives;
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        let denom = self.true_positives + self.false_positives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    pub fn recall(&self) -> f64 {
        let denom = self.true_positives + self.false_negatives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// Timing statistics over one benchmark batch. All durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub average_verification_time: f64,
    pub max_verification_time: f64,
    pub min_verification_time: f64,
    /// Wall-clock time over the whole batch.
    pub total_execution_time: f64,
    pub verification_count: usize,
}

impl PerformanceMetrics {
    /// Verifications per second; 0.0 when no wall-clock time elapsed.
    pub fn throughput(&self) -> f64 {
        if self.total_execution_time == 0.0 {
            return 0.0;
        }
        self.verification_count as f64 / self.total_execution_time
    }
}

/// The combined metric set produced by one aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub accuracy: AccuracyMetrics,
    pub performance: PerformanceMetrics,
    pub timestamp: DateTime<Utc>,
}

/// The shared verification setup applied to every benchmark entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub methods: Vec<VerificationMethod>,
    pub required_for_confirmed: u32,
    pub required_for_review: u32,
}

/// One labelled input in a benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub input_text: String,
    pub expected_status: VerificationStatus,
    #[serde(default)]
    pub metadata: Value,
}

/// The terminal record of one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub run_id: RunId,
    pub metrics: BenchmarkMetrics,
    pub total_entries: usize,
    /// Entries whose final status equalled the expected label.
    pub matched_entries: usize,
    /// Entries that verified but disagreed with the expected label.
    pub mismatched_entries: usize,
    /// Entries whose verification run itself failed. Excluded from the
    /// aggregated metrics.
    pub errored_entries: usize,
}
