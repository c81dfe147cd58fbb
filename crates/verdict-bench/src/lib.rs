//! # verdict-bench
//!
//! Benchmark execution and metrics aggregation for the verdict pipeline.
//!
//! [`BenchmarkRunner`] drives a verifier over labelled entries;
//! [`MetricsAggregator`] reduces the outcomes into a confusion matrix
//! (with `Confirmed` as the positive class) and timing statistics.

pub mod metrics;
pub mod runner;

pub use metrics::MetricsAggregator;
pub use runner::BenchmarkRunner;
