//! Verification method definitions and per-run result types.
//!
//! A verification run applies an ordered list of `VerificationMethod`s to a
//! piece of text and produces a `VerificationSummary` whose `final_status`
//! is one of CONFIRMED / DISCARDED / REVIEW.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VerdictError, VerdictResult};

/// The terminal classification assigned to a verified text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Enough cumulative methods passed to accept the text outright.
    Confirmed,
    /// An eliminatory method failed, or too few cumulative methods passed.
    Discarded,
    /// The text passed the review threshold but not the confirm threshold.
    Review,
}

impl VerificationStatus {
    /// True for the two statuses that need no further human attention.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Confirmed | Self::Discarded)
    }

    /// True when a human reviewer must look at the text.
    pub fn requires_review(self) -> bool {
        matches!(self, Self::Review)
    }
}

/// How a method's outcome feeds into the final status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// A failure discards the text immediately; later methods never run.
    Eliminatory,
    /// A pass increments the counter compared against the confirm/review
    /// thresholds. A failure contributes nothing.
    Cumulative,
}

/// Inclusive lower/upper bounds for an embedding similarity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Thresholds {
    /// True iff `value` lies within the bounds, both ends inclusive.
    pub fn contains(&self, value: f64) -> bool {
        self.lower_bound <= value && value <= self.upper_bound
    }
}

/// The kind-specific payload of a verification method.
///
/// One concrete shape per kind — a method cannot be constructed with the
/// wrong fields, and an unknown `type` tag is rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MethodSpec {
    /// Semantic similarity against a reference text must fall inside the
    /// configured bounds.
    Embedding {
        /// The text the input is compared against.
        reference_text: String,
        /// Inclusive acceptance window for the similarity value.
        thresholds: Thresholds,
    },

    /// A fixed panel of 5 independent yes/no generations must contain at
    /// least `required_matches` affirmative answers.
    Consensus { required_matches: u32 },

    /// The pattern must match somewhere in the text.
    Regex { pattern: String },

    /// Delegate to a named predicate registered on the verifier.
    Custom { predicate: String },
}

/// A single verification method: a name, a mode, and a kind-specific payload.
///
/// Methods are immutable and constructed by the caller; the verifier only
/// reads them. Declaration order is load-bearing — it determines eliminatory
/// early-exit behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// Referenced in results and logs; should be unique within one run.
    pub name: String,
    pub mode: VerificationMode,
    #[serde(flatten)]
    pub spec: MethodSpec,
}

/// The outcome of evaluating one method against one text.
///
/// Created once per evaluation and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// The `name` of the evaluated method.
    pub method_name: String,
    pub passed: bool,
    /// Method-kind-specific score (similarity value, consensus ratio, ...).
    pub score: Option<f64>,
    /// Method-kind-specific evidence for operators and audit output.
    pub details: Value,
    /// Wall-clock time the result was produced (UTC).
    pub timestamp: DateTime<Utc>,
}

/// The full outcome of one verification run.
///
/// `results` is ordered by evaluation order and may be shorter than the
/// method list — exactly when an eliminatory failure stopped the run early.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub results: Vec<VerificationResult>,
    pub final_status: VerificationStatus,
    /// End-to-end duration of the run, in seconds.
    pub verification_time: f64,
}

impl VerificationSummary {
    /// Names of the methods that passed, in evaluation order.
    pub fn passed_methods(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.passed)
            .map(|r| r.method_name.as_str())
            .collect()
    }

    /// Names of the methods that failed, in evaluation order.
    pub fn failed_methods(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.method_name.as_str())
            .collect()
    }

    /// Passed methods over evaluated methods. 0.0 when nothing was evaluated.
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.results.iter().filter(|r| r.passed).count() as f64 / self.results.len() as f64
    }
}

/// Check a verification request's shape before any method executes.
///
/// Rejects empty text, an empty method list, and a confirm threshold that
/// does not strictly exceed the review threshold.
pub fn validate_verify_request(
    text: &str,
    methods: &[VerificationMethod],
    required_for_confirmed: u32,
    required_for_review: u32,
) -> VerdictResult<()> {
    if text.trim().is_empty() {
        return Err(VerdictError::validation("input text cannot be empty"));
    }
    if methods.is_empty() {
        return Err(VerdictError::validation(
            "at least one verification method must be provided",
        ));
    }
    if required_for_confirmed <= required_for_review {
        return Err(VerdictError::validation(format!(
            "required_for_confirmed ({required_for_confirmed}) must be greater than \
             required_for_review ({required_for_review})"
        )));
    }
    Ok(())
}
