//! # verdict-mock
//!
//! Deterministic mock providers for the verdict pipeline.
//!
//! [`ScriptedGenerator`] replays a configured response script;
//! [`TokenOverlapScorer`] scores Jaccard similarity over lowercase
//! whitespace tokens. Both are deterministic, make no external calls, and
//! are safe for concurrent use. The CLI and the test suites run against
//! these in place of real model providers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use verdict_contracts::{
    error::VerdictResult,
    generation::{GeneratedText, GenerationRequest, SimilarityScore},
};
use verdict_core::traits::{Generator, SimilarityScorer};

/// A generator that cycles through a fixed response script.
///
/// Each produced sequence consumes the next script entry, wrapping around
/// at the end. The cursor is shared across calls, so consecutive requests
/// continue where the previous one stopped.
pub struct ScriptedGenerator {
    script: Vec<String>,
    cursor: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<String>) -> Self {
        let script = if script.is_empty() {
            vec!["yes".to_string()]
        } else {
            script
        };
        Self {
            script,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for ScriptedGenerator {
    /// A script that always answers "yes".
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> VerdictResult<Vec<GeneratedText>> {
        request.validate()?;
        let texts = (0..request.num_sequences)
            .map(|_| {
                let at = self.cursor.fetch_add(1, Ordering::Relaxed) % self.script.len();
                let content = self.script[at].clone();
                let tokens_used = content.split_whitespace().count() as u32;
                GeneratedText {
                    content,
                    tokens_used,
                    model_name: "scripted".to_string(),
                }
            })
            .collect();
        Ok(texts)
    }

    fn token_count(&self, text: &str) -> VerdictResult<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Jaccard similarity over lowercase whitespace tokens.
///
/// Two texts with no tokens at all are treated as identical (score 1.0).
#[derive(Debug, Default)]
pub struct TokenOverlapScorer;

impl TokenOverlapScorer {
    pub fn new() -> Self {
        Self
    }

    fn tokens(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

impl SimilarityScorer for TokenOverlapScorer {
    fn similarity(&self, text_a: &str, text_b: &str) -> VerdictResult<SimilarityScore> {
        let a = Self::tokens(text_a);
        let b = Self::tokens(text_b);
        let union = a.union(&b).count();
        let value = if union == 0 {
            1.0
        } else {
            a.intersection(&b).count() as f64 / union as f64
        };
        Ok(SimilarityScore {
            value,
            method: "token-overlap".to_string(),
        })
    }

    fn batch_similarities(
        &self,
        reference: &str,
        texts: &[String],
    ) -> VerdictResult<Vec<SimilarityScore>> {
        texts
            .iter()
            .map(|t| self.similarity(reference, t))
            .collect()
    }
}
