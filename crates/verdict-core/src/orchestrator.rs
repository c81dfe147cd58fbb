//! The pipeline orchestrator: the declarative stage runner.
//!
//! A pipeline is an ordered list of stages (generate, parse, verify); each
//! stage's output becomes the next stage's input. Stage failures are data:
//! every attempted stage produces exactly one `StageResult`, provider errors
//! included. Only the orchestrator's own bookkeeping can abort a run.
//!
//! Per stage the orchestrator enforces:
//!
//! - `retry_count` — the dispatch is re-attempted on failure; the last
//!   error is recorded when all attempts are exhausted. Configuration and
//!   validation errors are deterministic and consume only one attempt.
//! - `timeout_seconds` — a measured deadline. Providers block and there is
//!   no cancellation primitive, so an attempt whose elapsed time exceeds
//!   the budget is recorded as failed even though the call ran to
//!   completion, and its output is discarded.
//! - `error_handling` — `FailFast` stops at the first failed stage;
//!   `ContinueAll` attempts every stage, feeding later stages the most
//!   recent successful output.

use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use verdict_contracts::{
    error::{VerdictError, VerdictResult},
    generation::GenerationRequest,
    parse::ParseRule,
    pipeline::{ErrorStrategy, PipelineConfig, PipelineResult, RunId, StageKind, StageResult},
    verify::VerificationMethod,
};

use crate::traits::{Generator, Parser, Verifier};

/// Parameters of a `parse` stage.
#[derive(Debug, Deserialize)]
struct ParseParams {
    rules: Vec<ParseRule>,
}

fn default_required_for_confirmed() -> u32 {
    1
}

/// Parameters of a `verify` stage.
#[derive(Debug, Deserialize)]
struct VerifyParams {
    methods: Vec<VerificationMethod>,
    #[serde(default = "default_required_for_confirmed")]
    required_for_confirmed: u32,
    #[serde(default)]
    required_for_review: u32,
}

/// The central orchestrator that drives one pipeline run at a time.
///
/// Owns the injected capabilities and holds no other state; a single
/// instance can serve concurrent runs as long as the providers themselves
/// are safe for concurrent use.
pub struct PipelineOrchestrator {
    generator: Box<dyn Generator>,
    parser: Box<dyn Parser>,
    verifier: Box<dyn Verifier>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator with the given capabilities.
    pub fn new(
        generator: Box<dyn Generator>,
        parser: Box<dyn Parser>,
        verifier: Box<dyn Verifier>,
    ) -> Self {
        Self {
            generator,
            parser,
            verifier,
        }
    }

    /// Execute `config`'s stages in order, starting from `initial_input`.
    ///
    /// Always returns a `PipelineResult`; `success` is true iff no stage
    /// failed. Under `FailFast`, stages after the first failure are never
    /// attempted and do not appear in `stages`.
    pub fn execute(&self, config: &PipelineConfig, initial_input: Value) -> PipelineResult {
        let run_id = RunId::new();
        let start_time = Utc::now();
        let run_started = Instant::now();

        let mut stages: Vec<StageResult> = Vec::with_capacity(config.stages.len());
        let mut stages_completed = 0usize;
        let mut stages_failed = 0usize;
        let mut current_input = initial_input;
        let mut pipeline_error: Option<String> = None;

        info!(
            %run_id,
            stage_count = config.stages.len(),
            strategy = ?config.error_handling,
            "pipeline starting"
        );

        for (index, stage) in config.stages.iter().enumerate() {
            let attempts_allowed = 1 + stage.retry_count.unwrap_or(0);
            let stage_started = Instant::now();

            let mut last_error: Option<VerdictError> = None;
            let mut success_payload: Option<(Value, Value)> = None;
            let mut attempts_used = 0u32;

            for attempt in 1..=attempts_allowed {
                attempts_used = attempt;
                let attempt_started = Instant::now();
                let dispatched = self.run_stage(stage.kind, &stage.parameters, &current_input);
                let elapsed = attempt_started.elapsed().as_secs_f64();

                match dispatched {
                    Ok(payload) => {
                        if let Some(limit) = stage.timeout_seconds {
                            if elapsed > limit {
                                warn!(
                                    %run_id,
                                    stage = %stage.kind,
                                    attempt,
                                    elapsed,
                                    limit,
                                    "stage attempt exceeded timeout, output discarded"
                                );
                                last_error = Some(VerdictError::StageTimeout {
                                    stage: stage.kind.to_string(),
                                    elapsed,
                                    limit,
                                });
                                continue;
                            }
                        }
                        success_payload = Some(payload);
                        last_error = None;
                        break;
                    }
                    Err(err) => {
                        warn!(
                            %run_id,
                            stage = %stage.kind,
                            attempt,
                            error = %err,
                            "stage attempt failed"
                        );
                        // Configuration and Validation errors are
                        // deterministic; re-attempting cannot change the
                        // outcome.
                        let fatal = matches!(
                            err,
                            VerdictError::Configuration { .. } | VerdictError::Validation { .. }
                        );
                        last_error = Some(err);
                        if fatal {
                            break;
                        }
                    }
                }
            }

            let execution_time = stage_started.elapsed().as_secs_f64();

            match success_payload {
                Some((output, mut metadata)) => {
                    debug!(%run_id, stage = %stage.kind, execution_time, "stage completed");
                    if let Value::Object(map) = &mut metadata {
                        map.insert("attempts".to_string(), attempts_used.into());
                    }
                    stages.push(StageResult {
                        kind: stage.kind,
                        input: current_input.clone(),
                        output: Some(output.clone()),
                        execution_time,
                        metadata,
                        error: None,
                    });
                    current_input = output;
                    stages_completed += 1;
                }
                None => {
                    let message = last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "stage produced no result".to_string());
                    stages.push(StageResult {
                        kind: stage.kind,
                        input: current_input.clone(),
                        output: None,
                        execution_time,
                        metadata: json!({ "attempts": attempts_used }),
                        error: Some(message.clone()),
                    });
                    stages_failed += 1;

                    if config.error_handling == ErrorStrategy::FailFast {
                        warn!(
                            %run_id,
                            stage_index = index,
                            "fail-fast triggered, aborting remaining stages"
                        );
                        pipeline_error = Some(message);
                        break;
                    }
                    // ContinueAll: current_input is left unchanged so later
                    // stages receive the most recent successful output.
                }
            }
        }

        let end_time = Utc::now();
        let total_time = run_started.elapsed().as_secs_f64();
        let success = stages_failed == 0;

        info!(
            %run_id,
            stages_completed,
            stages_failed,
            total_time,
            success,
            "pipeline finished"
        );

        PipelineResult {
            run_id,
            stages,
            start_time,
            end_time,
            total_time,
            stages_completed,
            stages_failed,
            success,
            error: pipeline_error,
        }
    }

    // ── Stage dispatch ────────────────────────────────────────────────────────

    /// Dispatch one attempt of one stage. Returns `(output, metadata)`.
    fn run_stage(
        &self,
        kind: StageKind,
        parameters: &Value,
        input: &Value,
    ) -> VerdictResult<(Value, Value)> {
        match kind {
            StageKind::Generate => {
                let request: GenerationRequest =
                    serde_json::from_value(parameters.clone()).map_err(|e| {
                        VerdictError::validation(format!("invalid generate parameters: {e}"))
                    })?;
                request.validate()?;

                let texts = self.generator.generate(&request)?;
                let first = texts.first().ok_or_else(|| {
                    VerdictError::execution("generation provider returned no sequences")
                })?;
                let output = Value::String(first.content.clone());
                let total_tokens: u32 = texts.iter().map(|t| t.tokens_used).sum();
                let metadata = json!({
                    "sequences": texts,
                    "total_tokens": total_tokens,
                });
                Ok((output, metadata))
            }

            StageKind::Parse => {
                let text = expect_text(input, kind)?;
                let params: ParseParams =
                    serde_json::from_value(parameters.clone()).map_err(|e| {
                        VerdictError::validation(format!("invalid parse parameters: {e}"))
                    })?;
                self.parser.validate(&params.rules)?;

                let result = self.parser.parse(text, &params.rules);
                let metadata = json!({
                    "total_matches": result.metrics.total_matches,
                    "rules_matched": result.metrics.rules_matched,
                });
                let output = serde_json::to_value(&result)
                    .map_err(|e| VerdictError::execution(format!("parse result encoding: {e}")))?;
                Ok((output, metadata))
            }

            StageKind::Verify => {
                let text = expect_text(input, kind)?;
                let params: VerifyParams =
                    serde_json::from_value(parameters.clone()).map_err(|e| {
                        VerdictError::validation(format!("invalid verify parameters: {e}"))
                    })?;

                let summary = self.verifier.verify(
                    text,
                    &params.methods,
                    params.required_for_confirmed,
                    params.required_for_review,
                )?;
                let metadata = json!({
                    "final_status": summary.final_status,
                    "success_rate": summary.success_rate(),
                });
                let output = serde_json::to_value(&summary).map_err(|e| {
                    VerdictError::execution(format!("verification summary encoding: {e}"))
                })?;
                Ok((output, metadata))
            }
        }
    }
}

/// Require the flowing value to be a JSON string.
fn expect_text(input: &Value, kind: StageKind) -> VerdictResult<&str> {
    input.as_str().ok_or_else(|| {
        VerdictError::validation(format!(
            "{kind} stage expects text input, got a non-string value"
        ))
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::{json, Value};

    use verdict_contracts::{
        error::{VerdictError, VerdictResult},
        generation::{GeneratedText, GenerationRequest},
        parse::{ParseMetrics, ParseResult, ParseRule},
        pipeline::{ErrorStrategy, PipelineConfig, StageConfig, StageKind},
        verify::{VerificationMethod, VerificationStatus, VerificationSummary},
    };

    use crate::traits::{Generator, Parser, Verifier};

    use super::PipelineOrchestrator;

    // ── Mock capabilities ─────────────────────────────────────────────────────

    /// A generator that always returns one fixed sequence.
    struct FixedGenerator {
        content: String,
    }

    impl Generator for FixedGenerator {
        fn generate(&self, _request: &GenerationRequest) -> VerdictResult<Vec<GeneratedText>> {
            Ok(vec![GeneratedText {
                content: self.content.clone(),
                tokens_used: 3,
                model_name: "fixed".to_string(),
            }])
        }

        fn token_count(&self, text: &str) -> VerdictResult<usize> {
            Ok(text.split_whitespace().count())
        }
    }

    /// A generator that fails its first `failures` calls, then succeeds.
    struct FlakyGenerator {
        failures: u32,
        calls: AtomicU32,
    }

    impl Generator for FlakyGenerator {
        fn generate(&self, _request: &GenerationRequest) -> VerdictResult<Vec<GeneratedText>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(VerdictError::execution("model temporarily unavailable"));
            }
            Ok(vec![GeneratedText {
                content: "recovered".to_string(),
                tokens_used: 1,
                model_name: "flaky".to_string(),
            }])
        }

        fn token_count(&self, _text: &str) -> VerdictResult<usize> {
            Ok(0)
        }
    }

    /// A generator that takes a measurable amount of wall-clock time.
    struct SlowGenerator;

    impl Generator for SlowGenerator {
        fn generate(&self, _request: &GenerationRequest) -> VerdictResult<Vec<GeneratedText>> {
            std::thread::sleep(Duration::from_millis(5));
            Ok(vec![GeneratedText {
                content: "slow".to_string(),
                tokens_used: 1,
                model_name: "slow".to_string(),
            }])
        }

        fn token_count(&self, _text: &str) -> VerdictResult<usize> {
            Ok(0)
        }
    }

    /// A parser that returns an empty result and accepts any rules.
    struct NullParser;

    impl Parser for NullParser {
        fn validate(&self, _rules: &[ParseRule]) -> VerdictResult<()> {
            Ok(())
        }

        fn parse(&self, text: &str, _rules: &[ParseRule]) -> ParseResult {
            ParseResult {
                matches: vec![],
                metrics: ParseMetrics {
                    total_matches: 0,
                    execution_time: 0.0,
                    chars_processed: text.len(),
                    rules_matched: vec![],
                },
            }
        }
    }

    /// A verifier that records every text it receives and always confirms.
    struct RecordingVerifier {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Verifier for RecordingVerifier {
        fn verify(
            &self,
            text: &str,
            _methods: &[VerificationMethod],
            _required_for_confirmed: u32,
            _required_for_review: u32,
        ) -> VerdictResult<VerificationSummary> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(VerificationSummary {
                results: vec![],
                final_status: VerificationStatus::Confirmed,
                verification_time: 0.0,
            })
        }
    }

    // ── Config helpers ────────────────────────────────────────────────────────

    fn generate_stage() -> StageConfig {
        StageConfig {
            kind: StageKind::Generate,
            parameters: json!({ "system_prompt": "s", "user_prompt": "u" }),
            timeout_seconds: None,
            retry_count: None,
        }
    }

    fn verify_stage() -> StageConfig {
        StageConfig {
            kind: StageKind::Verify,
            parameters: json!({
                "methods": [
                    { "name": "m", "mode": "cumulative", "type": "regex", "pattern": "." }
                ],
                "required_for_confirmed": 1
            }),
            timeout_seconds: None,
            retry_count: None,
        }
    }

    fn orchestrator_with(
        generator: Box<dyn Generator>,
        verifier_log: &Arc<Mutex<Vec<String>>>,
    ) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            generator,
            Box::new(NullParser),
            Box::new(RecordingVerifier {
                seen: verifier_log.clone(),
            }),
        )
    }

    // ── Test cases ────────────────────────────────────────────────────────────

    /// A generate stage outputs the first sequence's content as a string.
    #[test]
    fn test_generate_stage_outputs_first_sequence() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FixedGenerator {
                content: "hello world".to_string(),
            }),
            &log,
        );

        let config = PipelineConfig {
            stages: vec![generate_stage()],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert!(result.success);
        assert_eq!(result.stages_completed, 1);
        assert_eq!(result.stages[0].output, Some(json!("hello world")));
        assert_eq!(result.stages[0].metadata["attempts"], json!(1));
        assert_eq!(result.stages[0].metadata["total_tokens"], json!(3));
    }

    /// Each stage's output becomes the next stage's input.
    #[test]
    fn test_stage_output_feeds_next_stage() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FixedGenerator {
                content: "generated text".to_string(),
            }),
            &log,
        );

        let config = PipelineConfig {
            stages: vec![generate_stage(), verify_stage()],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert!(result.success);
        assert_eq!(result.stages_completed, 2);
        assert_eq!(result.stages_failed, 0);
        assert_eq!(*log.lock().unwrap(), vec!["generated text".to_string()]);

        // The verify stage's recorded input is the generate stage's output.
        assert_eq!(result.stages[1].input, json!("generated text"));
    }

    /// Under fail-fast, stages after the first failure are never attempted.
    #[test]
    fn test_fail_fast_stops_after_failure() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FlakyGenerator {
                failures: u32::MAX,
                calls: AtomicU32::new(0),
            }),
            &log,
        );

        let config = PipelineConfig {
            stages: vec![generate_stage(), verify_stage(), verify_stage()],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert!(!result.success);
        assert_eq!(result.stages.len(), 1, "later stages must not be attempted");
        assert_eq!(result.stages_completed, 0);
        assert_eq!(result.stages_failed, 1);
        assert!(result.error.as_deref().unwrap().contains("execution error"));
        assert!(log.lock().unwrap().is_empty(), "verify must never run");
    }

    /// Under continue-all, a failed stage leaves the flowing input unchanged.
    #[test]
    fn test_continue_all_preserves_last_successful_input() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FixedGenerator {
                content: "unused".to_string(),
            }),
            &log,
        );

        // The parse stage has malformed parameters (no rules field) and
        // fails; the verify stage must still receive the initial input.
        let broken_parse = StageConfig {
            kind: StageKind::Parse,
            parameters: json!({}),
            timeout_seconds: None,
            retry_count: None,
        };
        let config = PipelineConfig {
            stages: vec![broken_parse, verify_stage()],
            error_handling: ErrorStrategy::ContinueAll,
        };
        let result = orchestrator.execute(&config, json!("seed text"));

        assert!(!result.success);
        assert_eq!(result.stages.len(), 2, "continue-all attempts every stage");
        assert_eq!(result.stages_failed, 1);
        assert_eq!(result.stages_completed, 1);
        assert_eq!(*log.lock().unwrap(), vec!["seed text".to_string()]);
        // No pipeline-level abort under continue-all.
        assert!(result.error.is_none());
    }

    /// Retries re-attempt the same dispatch and succeed within the budget.
    #[test]
    fn test_retry_recovers_after_transient_failures() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FlakyGenerator {
                failures: 2,
                calls: AtomicU32::new(0),
            }),
            &log,
        );

        let mut stage = generate_stage();
        stage.retry_count = Some(2); // 3 attempts total
        let config = PipelineConfig {
            stages: vec![stage],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert!(result.success);
        assert_eq!(result.stages[0].metadata["attempts"], json!(3));
        assert_eq!(result.stages[0].output, Some(json!("recovered")));
    }

    /// When all attempts fail, the last error is recorded on the stage.
    #[test]
    fn test_retries_exhausted_records_last_error() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FlakyGenerator {
                failures: u32::MAX,
                calls: AtomicU32::new(0),
            }),
            &log,
        );

        let mut stage = generate_stage();
        stage.retry_count = Some(1);
        let config = PipelineConfig {
            stages: vec![stage],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert!(!result.success);
        assert_eq!(result.stages[0].metadata["attempts"], json!(2));
        let error = result.stages[0].error.as_deref().unwrap();
        assert!(error.contains("model temporarily unavailable"), "{error}");
    }

    /// A deterministic validation failure consumes a single attempt even
    /// when a retry budget is configured.
    #[test]
    fn test_deterministic_failure_is_not_retried() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FixedGenerator {
                content: "unused".to_string(),
            }),
            &log,
        );

        // Malformed parse parameters fail validation identically on every
        // attempt.
        let broken_parse = StageConfig {
            kind: StageKind::Parse,
            parameters: json!({}),
            timeout_seconds: None,
            retry_count: Some(3),
        };
        let config = PipelineConfig {
            stages: vec![broken_parse],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, json!("seed text"));

        assert!(!result.success);
        assert_eq!(result.stages[0].metadata["attempts"], json!(1));
        let error = result.stages[0].error.as_deref().unwrap();
        assert!(error.contains("invalid parse parameters"), "{error}");
    }

    /// An attempt that runs past its timeout budget is recorded as failed
    /// and its output is discarded.
    #[test]
    fn test_timeout_marks_stage_failed() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(Box::new(SlowGenerator), &log);

        let mut stage = generate_stage();
        stage.timeout_seconds = Some(0.0);
        let config = PipelineConfig {
            stages: vec![stage],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert!(!result.success);
        assert_eq!(result.stages[0].output, None);
        let error = result.stages[0].error.as_deref().unwrap();
        assert!(error.contains("exceeded timeout"), "{error}");
    }

    /// Parse and verify stages reject a non-string flowing value as a
    /// stage error, not a panic.
    #[test]
    fn test_non_string_input_is_a_stage_error() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FixedGenerator {
                content: "unused".to_string(),
            }),
            &log,
        );

        let config = PipelineConfig {
            stages: vec![verify_stage()],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, json!({ "not": "text" }));

        assert!(!result.success);
        let error = result.stages[0].error.as_deref().unwrap();
        assert!(error.contains("expects text input"), "{error}");
    }

    /// Attempted-stage accounting: completed + failed equals the number of
    /// stages attempted, which fail-fast keeps below the configured count.
    #[test]
    fn test_stage_accounting_under_fail_fast() {
        let log = Arc::new(Mutex::new(vec![]));
        let orchestrator = orchestrator_with(
            Box::new(FixedGenerator {
                content: "ok".to_string(),
            }),
            &log,
        );

        let broken_parse = StageConfig {
            kind: StageKind::Parse,
            parameters: json!({}),
            timeout_seconds: None,
            retry_count: None,
        };
        let config = PipelineConfig {
            stages: vec![generate_stage(), broken_parse, verify_stage()],
            error_handling: ErrorStrategy::FailFast,
        };
        let result = orchestrator.execute(&config, Value::Null);

        assert_eq!(result.stages.len(), 2);
        assert_eq!(result.stages_completed + result.stages_failed, 2);
        assert!(result.stages.len() < config.stages.len());
    }
}
