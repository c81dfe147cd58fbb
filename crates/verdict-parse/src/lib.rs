//! Rule-based text extraction for the verdict pipeline.

pub mod engine;

pub use engine::{validate_rules, RuleParser};
