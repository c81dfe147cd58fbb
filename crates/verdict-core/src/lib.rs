//! # verdict-core
//!
//! Trait seams and the stage orchestrator for the verdict pipeline.
//!
//! This crate provides:
//! - The four core traits (`Generator`, `SimilarityScorer`, `Parser`,
//!   `Verifier`)
//! - The `PipelineOrchestrator` that sequences generate → parse → verify
//!   stages with per-stage retry, timeout, and error capture
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verdict_core::{PipelineOrchestrator, traits::{Generator, Parser, Verifier}};
//! ```

pub mod orchestrator;
pub mod traits;

pub use orchestrator::PipelineOrchestrator;
