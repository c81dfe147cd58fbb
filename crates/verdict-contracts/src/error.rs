//! Error taxonomy for the verdict pipeline.
//!
//! All fallible operations in the workspace return `VerdictResult<T>`.
//! The three public categories map directly onto how callers must react:
//!
//! - `Configuration` — the method/rule definition itself is broken. Fatal,
//!   never retried.
//! - `Execution` — a provider call failed. Propagated to the caller, except
//!   inside the orchestrator where it becomes a per-stage error value.
//! - `Validation` — the request shape is malformed. Rejected before any
//!   engine logic runs.

use thiserror::Error;

/// The unified error type for the verdict workspace.
#[derive(Debug, Error)]
pub enum VerdictError {
    /// A verification method or parse rule carries invalid parameters
    /// (uncompilable regex, unregistered custom predicate, unknown kind).
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// A generation or similarity provider call failed.
    #[error("execution error: {reason}")]
    Execution { reason: String },

    /// The request shape is malformed (empty text, empty rule or method
    /// set, inverted confirm/review thresholds, prompt limits exceeded).
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// A pipeline stage ran longer than its configured budget. The
    /// orchestrator converts this into a per-stage error string.
    #[error("stage '{stage}' exceeded timeout: {elapsed:.3}s > {limit:.3}s")]
    StageTimeout {
        stage: String,
        elapsed: f64,
        limit: f64,
    },
}

impl VerdictError {
    /// Shorthand for a `Configuration` error from any displayable reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Shorthand for an `Execution` error from any displayable reason.
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `Validation` error from any displayable reason.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the verdict crates.
pub type VerdictResult<T> = Result<T, VerdictError>;
