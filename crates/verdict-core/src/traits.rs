//! Core trait definitions for the verdict pipeline.
//!
//! These four traits define the seams of the system:
//!
//! - `Generator`        — the text-generation model (opaque capability)
//! - `SimilarityScorer` — the embedding/similarity model (opaque capability)
//! - `Parser`           — rule-based structured extraction
//! - `Verifier`         — the multi-method decision state machine
//!
//! The orchestrator wires them together. Provider calls block the calling
//! context; the core applies no implicit timeout and no internal retry or
//! caching. Implementations must be safe for concurrent use — the core
//! components themselves hold no mutable shared state.

use verdict_contracts::{
    error::VerdictResult,
    generation::{GeneratedText, GenerationRequest, SimilarityScore},
    parse::{ParseResult, ParseRule},
    verify::{VerificationMethod, VerificationSummary},
};

/// The text-generation capability.
///
/// Implementations may be backed by a local model, a remote API, or a test
/// double. `generate` returns the sequences in provider order.
pub trait Generator: Send + Sync {
    /// Produce `request.num_sequences` generations for the given prompts.
    fn generate(&self, request: &GenerationRequest) -> VerdictResult<Vec<GeneratedText>>;

    /// Count the tokens the provider's tokenizer sees in `text`.
    fn token_count(&self, text: &str) -> VerdictResult<usize>;
}

/// The embedding/similarity capability.
pub trait SimilarityScorer: Send + Sync {
    /// Score the similarity between two texts.
    fn similarity(&self, text_a: &str, text_b: &str) -> VerdictResult<SimilarityScore>;

    /// Score one reference against many texts, preserving input order.
    fn batch_similarities(
        &self,
        reference: &str,
        texts: &[String],
    ) -> VerdictResult<Vec<SimilarityScore>>;
}

/// Rule-based structured extraction.
///
/// `parse` is total: it never fails on malformed rule fields. Shape
/// problems are surfaced by `validate`, which callers run before invoking
/// the engine.
pub trait Parser: Send + Sync {
    /// Check rule well-formedness (non-empty names/patterns, compilable
    /// regex patterns) without touching any input text.
    fn validate(&self, rules: &[ParseRule]) -> VerdictResult<()>;

    /// Apply `rules` in declaration order and collect surviving matches.
    fn parse(&self, text: &str, rules: &[ParseRule]) -> ParseResult;
}

/// The multi-method verification state machine.
pub trait Verifier: Send + Sync {
    /// Evaluate `methods` in declaration order against `text` and derive
    /// the final status from the confirm/review thresholds.
    ///
    /// Validates the request shape (including
    /// `required_for_confirmed > required_for_review`) before any method
    /// executes.
    fn verify(
        &self,
        text: &str,
        methods: &[VerificationMethod],
        required_for_confirmed: u32,
        required_for_review: u32,
    ) -> VerdictResult<VerificationSummary>;
}
