//! Pipeline stage configuration and result types.
//!
//! A pipeline is a declarative ordered list of stages. Each stage consumes
//! the previous stage's output, and every stage produces exactly one
//! `StageResult` whether it succeeded or failed — stage failures are data,
//! not exceptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The capability a stage dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Generate,
    Parse,
    Verify,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Generate => "generate",
            Self::Parse => "parse",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// What the orchestrator does after a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Stop immediately; later stages are never attempted.
    #[default]
    FailFast,
    /// Attempt every stage regardless of failures. After a failed stage the
    /// flowing input is left unchanged, so downstream stages receive the
    /// most recent successful output (or the initial input when nothing has
    /// succeeded yet).
    ContinueAll,
}

/// One declarative stage within a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub kind: StageKind,
    /// Stage-kind-specific parameters (generation request fields, parse
    /// rules, verification methods and thresholds).
    #[serde(default)]
    pub parameters: Value,
    /// Soft per-attempt budget in seconds. An attempt that runs longer is
    /// recorded as failed; the blocking call itself is not cancelled.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Additional attempts after the first failure. The last error wins
    /// when all attempts are exhausted. Deterministic configuration and
    /// validation failures are never re-attempted.
    #[serde(default)]
    pub retry_count: Option<u32>,
}

/// A full pipeline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered stages; order determines data flow.
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub error_handling: ErrorStrategy,
}

/// The recorded outcome of one attempted stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub kind: StageKind,
    /// Snapshot of the input the stage received.
    pub input: Value,
    /// The stage's output; absent when the stage failed.
    pub output: Option<Value>,
    /// Duration across all attempts, in seconds.
    pub execution_time: f64,
    /// Stage-kind-specific extras (attempt count, generation batch, ...).
    pub metadata: Value,
    /// Human-readable error with its taxonomy code; `None` on success.
    pub error: Option<String>,
}

/// Unique identifier for one pipeline or benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The terminal record of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: RunId,
    /// One entry per attempted stage, in execution order. Under fail-fast
    /// this list is shorter than the configured stage list once a stage
    /// has failed.
    pub stages: Vec<StageResult>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration of the whole run, in seconds.
    pub total_time: f64,
    pub stages_completed: usize,
    pub stages_failed: usize,
    /// True iff `stages_failed == 0`.
    pub success: bool,
    /// The error that stopped the run, when fail-fast triggered.
    pub error: Option<String>,
}
