//! # forge_normalize
//!
//! Normalizes the unpredictably shaped output of an agent executor into a
//! canonical `filename -> source text` mapping, and repairs
//! obviously-incomplete generated code.
//!
//! Agents return free text, JSON, nested objects, or markdown-fenced code
//! blocks. The [`normalize`] entry point absorbs all of these through an
//! ordered chain of extraction strategies; the first strategy that matches
//! wins. Every extracted file is passed through [`repair`] so that no
//! placeholder markers survive into job results.
//!
//! Normalization never fails: malformed input degrades to the next strategy
//! in the chain, and the final fallback stores the stringified value as a
//! plain text artifact.

pub mod markdown;
pub mod normalizer;
pub mod repair;

pub use markdown::extract_code_blocks;
pub use normalizer::{normalize, FileMap};
pub use repair::{has_placeholders, repair};
