//! Provider-facing generation and similarity types.
//!
//! The generation and embedding models are external collaborators; these
//! are the only shapes the core exchanges with them.

use serde::{Deserialize, Serialize};

use crate::error::{VerdictError, VerdictResult};

/// Most sequences a single request may ask a provider for.
pub const MAX_SEQUENCES: u32 = 10;
/// Most tokens a single request may ask a provider for.
pub const MAX_TOKENS: u32 = 1000;

fn default_num_sequences() -> u32 {
    1
}

fn default_max_tokens() -> u32 {
    100
}

fn default_temperature() -> f64 {
    1.0
}

/// A single request to the generation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default = "default_num_sequences")]
    pub num_sequences: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub stop_sequences: Option<Vec<String>>,
}

impl GenerationRequest {
    /// Check the request shape before it reaches a provider.
    pub fn validate(&self) -> VerdictResult<()> {
        if self.system_prompt.trim().is_empty() {
            return Err(VerdictError::validation("system prompt cannot be empty"));
        }
        if self.user_prompt.trim().is_empty() {
            return Err(VerdictError::validation("user prompt cannot be empty"));
        }
        if self.num_sequences > MAX_SEQUENCES {
            return Err(VerdictError::validation(format!(
                "num_sequences {} exceeds the limit of {MAX_SEQUENCES}",
                self.num_sequences
            )));
        }
        if self.max_tokens > MAX_TOKENS {
            return Err(VerdictError::validation(format!(
                "max_tokens {} exceeds the limit of {MAX_TOKENS}",
                self.max_tokens
            )));
        }
        Ok(())
    }
}

/// One generated sequence returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub content: String,
    pub tokens_used: u32,
    pub model_name: String,
}

impl GeneratedText {
    /// Case-insensitive containment check against the generated content.
    pub fn contains_reference(&self, text: &str) -> bool {
        self.content.to_lowercase().contains(&text.to_lowercase())
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// The full outcome of one generation call, as surfaced to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    pub texts: Vec<GeneratedText>,
    pub total_tokens: u32,
    /// Duration of the provider call, in seconds.
    pub generation_time: f64,
    pub model_name: String,
}

/// A similarity judgement between two texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Typically in [0, 1]; the provider defines the scale.
    pub value: f64,
    /// Which similarity measure produced the value.
    pub method: String,
}
