//! # verdict-contracts
//!
//! Shared types, schemas, and the error taxonomy for the verdict pipeline.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, shape validation helpers, and error
//! types.

pub mod bench;
pub mod error;
pub mod generation;
pub mod parse;
pub mod pipeline;
pub mod verify;
