//! # verdict-verify
//!
//! Multi-method verification for the verdict pipeline.
//!
//! This crate provides [`engine::MethodVerifier`], which implements the
//! [`verdict_core::traits::Verifier`] trait. A run applies an ordered list
//! of methods to a text:
//!
//! - **embedding** — semantic similarity against a reference text,
//!   accepted within inclusive bounds.
//! - **consensus** — a fixed panel of 5 independent yes/no generations.
//! - **regex** — pattern presence.
//! - **custom** — a named predicate registered by the host.
//!
//! Eliminatory methods discard on failure and stop the run; cumulative
//! passes are counted against the confirm/review thresholds.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use verdict_verify::MethodVerifier;
//!
//! let mut verifier = MethodVerifier::new(generator, scorer);
//! verifier.register_predicate("non_empty", Box::new(|text: &str| {
//!     (!text.trim().is_empty(), None)
//! }));
//! ```

pub mod engine;

pub use engine::{MethodVerifier, PredicateFn};
