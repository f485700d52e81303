//! Tokenizer implementations and token-aware text clipping.
//!
//! [`CharEstimateTokenizer`] uses a character-based heuristic: ~4 characters
//! per token. It is deterministic, has no model files to load, and is what
//! the tests run against. Builds with the `hf` feature can load a real
//! Hugging Face `tokenizer.json` through [`HfTokenizer`].

use mrdigest_core::{Tokenizer, TokenizerError};

/// Heuristic tokenizer: 1 token ≈ `chars_per_token` characters, rounded up.
#[derive(Debug, Clone, Copy)]
pub struct CharEstimateTokenizer {
    chars_per_token: usize,
}

impl CharEstimateTokenizer {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharEstimateTokenizer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Tokenizer for CharEstimateTokenizer {
    fn name(&self) -> &str {
        "chars-estimate"
    }

    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.chars().count().div_ceil(self.chars_per_token))
    }
}

/// Tokenizer backed by a Hugging Face `tokenizer.json`.
#[cfg(feature = "hf")]
pub struct HfTokenizer {
    name: String,
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "hf")]
impl HfTokenizer {
    pub fn from_file(path: &std::path::Path) -> Result<Self, TokenizerError> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            TokenizerError::NotAvailable(format!("Failed to load {}: {e}", path.display()))
        })?;
        Ok(Self {
            name: format!("hf:{}", path.display()),
            inner,
        })
    }
}

#[cfg(feature = "hf")]
impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        self.inner
            .encode(text, false)
            .map(|enc| enc.len())
            .map_err(|e| TokenizerError::Encode(e.to_string()))
    }
}

/// Shorten `text` to roughly `max_tokens` tokens.
///
/// Text that already fits is returned unchanged. Otherwise it is cut to
/// `chars × max_tokens / tokens` characters, the average character density
/// of the whole text, on a char boundary.
pub fn clip_tokens<T: Tokenizer + ?Sized>(
    tokenizer: &T,
    text: &str,
    max_tokens: usize,
) -> Result<String, TokenizerError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let tokens = tokenizer.count(text)?;
    if tokens <= max_tokens {
        return Ok(text.to_string());
    }

    let chars = text.chars().count();
    let keep = chars * max_tokens / tokens;
    Ok(text.chars().take(keep).collect())
}
