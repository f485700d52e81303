//! # mrdigest Core
//!
//! Domain types, traits, and error definitions for the mrdigest diff
//! budgeting engine. This crate has **no engine logic**; it defines the
//! model that the diff engine and its callers agree on.
//!
//! ## Design Philosophy
//!
//! Every outside capability is a trait here:
//! - [`Tokenizer`]: how many model tokens a piece of text costs
//! - [`MergeRequestSource`]: where file changes and language statistics come from
//!
//! Implementations live elsewhere, which keeps the engine testable with
//! deterministic stubs.

pub mod change;
pub mod error;
pub mod source;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use change::{EditType, FileChange};
pub use error::{DiffError, Error, Result, SourceError, TokenizerError};
pub use source::{LanguageStats, MergeRequestSource};
pub use tokenizer::Tokenizer;
