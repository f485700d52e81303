//! Tokenizer trait: how much of the model's context a piece of text costs.
//!
//! The engine never tokenizes on its own: callers inject a capability that
//! matches the model they are about to call. A failed count is fatal for the
//! current invocation because budget accounting cannot continue without it.

use crate::error::TokenizerError;

/// Counts model tokens for a string.
///
/// Implementations must be deterministic and side-effect free: the same
/// text always yields the same count.
pub trait Tokenizer: Send + Sync {
    /// A human-readable name for this tokenizer (e.g., "chars-estimate", "hf:tokenizer.json").
    fn name(&self) -> &str;

    /// Number of tokens `text` occupies.
    fn count(&self, text: &str) -> std::result::Result<usize, TokenizerError>;
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn count(&self, text: &str) -> std::result::Result<usize, TokenizerError> {
        (**self).count(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn count(&self, text: &str) -> std::result::Result<usize, TokenizerError> {
        (**self).count(text)
    }
}
