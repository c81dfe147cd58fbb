//! Multi-method verification engine.
//!
//! `MethodVerifier` implements the `Verifier` trait from `verdict-core`.
//! Methods run in declaration order; an eliminatory failure stops the run
//! immediately, a cumulative pass increments the counter compared against
//! the confirm/review thresholds after the loop. The result list is
//! therefore at most as long as the method list, and strictly shorter
//! exactly when an eliminatory method failed before the last one.
//!
//! Custom methods delegate to named predicates registered via
//! `register_predicate` — domain knowledge stays out of the engine.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use verdict_contracts::{
    error::{VerdictError, VerdictResult},
    generation::GenerationRequest,
    verify::{
        validate_verify_request, MethodSpec, Thresholds, VerificationMethod, VerificationMode,
        VerificationResult, VerificationStatus, VerificationSummary,
    },
};
use verdict_core::traits::{Generator, SimilarityScorer, Verifier};

/// Number of independent generations polled for a consensus method.
const CONSENSUS_PANEL_SIZE: u32 = 5;
/// Token cap for consensus answers; "yes"/"no" needs no more.
const CONSENSUS_MAX_TOKENS: u32 = 10;

/// A caller-supplied verification predicate.
///
/// Receives the text under verification and returns whether it passes,
/// optionally with a score. When no score is supplied, it defaults to 1.0
/// on pass and 0.0 on fail.
pub type PredicateFn = Box<dyn Fn(&str) -> (bool, Option<f64>) + Send + Sync>;

/// The verdict verification engine.
///
/// Owns the provider handles it needs (similarity scoring for embedding
/// methods, generation for consensus panels) and a registry of named
/// custom predicates supplied by the hosting application.
pub struct MethodVerifier {
    generator: Box<dyn Generator>,
    scorer: Box<dyn SimilarityScorer>,
    /// Named custom predicates, looked up by `MethodSpec::Custom`.
    predicates: HashMap<String, PredicateFn>,
}

impl MethodVerifier {
    /// Create a verifier with no custom predicates registered.
    pub fn new(generator: Box<dyn Generator>, scorer: Box<dyn SimilarityScorer>) -> Self {
        Self {
            generator,
            scorer,
            predicates: HashMap::new(),
        }
    }

    /// Register a custom predicate under `name`.
    ///
    /// The name must match the `predicate` field used in custom methods.
    /// Registering the same name twice replaces the previous predicate.
    pub fn register_predicate(&mut self, name: impl Into<String>, f: PredicateFn) {
        self.predicates.insert(name.into(), f);
    }

    // ── Method evaluators ─────────────────────────────────────────────────────

    /// Similarity against a reference text must fall inside the bounds,
    /// both ends inclusive.
    fn check_embedding(
        &self,
        text: &str,
        reference_text: &str,
        thresholds: &Thresholds,
    ) -> VerdictResult<(bool, Option<f64>, serde_json::Value)> {
        let score = self.scorer.similarity(reference_text, text)?;
        let passed = thresholds.contains(score.value);
        let details = json!({
            "similarity": score.value,
            "method": score.method,
            "reference_text": reference_text,
            "lower_bound": thresholds.lower_bound,
            "upper_bound": thresholds.upper_bound,
        });
        Ok((passed, Some(score.value), details))
    }

    /// Poll a fixed panel of independent yes/no generations and count the
    /// affirmative answers.
    fn check_consensus(
        &self,
        text: &str,
        required_matches: u32,
    ) -> VerdictResult<(bool, Option<f64>, serde_json::Value)> {
        let request = GenerationRequest {
            system_prompt: format!("Verify the following text:\n{text}"),
            user_prompt: "Is this text valid? Respond with 'yes' or 'no'.".to_string(),
            num_sequences: CONSENSUS_PANEL_SIZE,
            max_tokens: CONSENSUS_MAX_TOKENS,
            temperature: 1.0,
            stop_sequences: None,
        };
        let answers = self.generator.generate(&request)?;

        let positives = answers
            .iter()
            .filter(|a| a.content.trim().eq_ignore_ascii_case("yes"))
            .count() as u32;
        let passed = positives >= required_matches;
        // The panel size is the denominator even if the provider returned
        // fewer sequences; missing answers count against the text.
        let score = f64::from(positives) / f64::from(CONSENSUS_PANEL_SIZE);
        let details = json!({
            "total": CONSENSUS_PANEL_SIZE,
            "positives": positives,
            "required": required_matches,
        });
        Ok((passed, Some(score), details))
    }

    /// The pattern must match somewhere in the text.
    fn check_regex(
        &self,
        text: &str,
        method_name: &str,
        pattern: &str,
    ) -> VerdictResult<(bool, Option<f64>, serde_json::Value)> {
        let re = Regex::new(pattern).map_err(|e| {
            VerdictError::config(format!(
                "verification method '{method_name}' has an invalid pattern: {e}"
            ))
        })?;
        let match_count = re.find_iter(text).count();
        let passed = match_count > 0;
        let details = json!({
            "pattern": pattern,
            "match_count": match_count,
        });
        Ok((passed, Some(if passed { 1.0 } else { 0.0 }), details))
    }

    /// Delegate to a registered predicate.
    fn check_custom(
        &self,
        text: &str,
        method_name: &str,
        predicate: &str,
    ) -> VerdictResult<(bool, Option<f64>, serde_json::Value)> {
        let f = self.predicates.get(predicate).ok_or_else(|| {
            VerdictError::config(format!(
                "verification method '{method_name}' references unregistered predicate \
                 '{predicate}'"
            ))
        })?;
        let (passed, score) = f(text);
        let score = score.unwrap_or(if passed { 1.0 } else { 0.0 });
        let details = json!({ "predicate": predicate });
        Ok((passed, Some(score), details))
    }
}

impl Verifier for MethodVerifier {
    fn verify(
        &self,
        text: &str,
        methods: &[VerificationMethod],
        required_for_confirmed: u32,
        required_for_review: u32,
    ) -> VerdictResult<VerificationSummary> {
        validate_verify_request(text, methods, required_for_confirmed, required_for_review)?;

        let started = Instant::now();
        let mut results: Vec<VerificationResult> = Vec::new();
        let mut cumulative_passes: u32 = 0;
        let mut discarded_early = false;

        for method in methods {
            debug!(method = %method.name, mode = ?method.mode, "evaluating verification method");

            let (passed, score, details) = match &method.spec {
                MethodSpec::Embedding {
                    reference_text,
                    thresholds,
                } => self.check_embedding(text, reference_text, thresholds)?,
                MethodSpec::Consensus { required_matches } => {
                    self.check_consensus(text, *required_matches)?
                }
                MethodSpec::Regex { pattern } => self.check_regex(text, &method.name, pattern)?,
                MethodSpec::Custom { predicate } => {
                    self.check_custom(text, &method.name, predicate)?
                }
            };

            results.push(VerificationResult {
                method_name: method.name.clone(),
                passed,
                score,
                details,
                timestamp: Utc::now(),
            });

            match (method.mode, passed) {
                (VerificationMode::Eliminatory, false) => {
                    warn!(method = %method.name, "eliminatory method failed, discarding");
                    discarded_early = true;
                    break;
                }
                (VerificationMode::Cumulative, true) => cumulative_passes += 1,
                _ => {}
            }
        }

        let final_status = if discarded_early {
            VerificationStatus::Discarded
        } else if cumulative_passes >= required_for_confirmed {
            VerificationStatus::Confirmed
        } else if cumulative_passes >= required_for_review {
            VerificationStatus::Review
        } else {
            VerificationStatus::Discarded
        };

        info!(
            status = ?final_status,
            evaluated = results.len(),
            cumulative_passes,
            "verification run complete"
        );

        Ok(VerificationSummary {
            results,
            final_status,
            verification_time: started.elapsed().as_secs_f64(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
