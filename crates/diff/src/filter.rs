//! Ignore filter: keep configured files away from the model.
//!
//! Patterns come in two flavours: regular expressions (matched from the
//! start of the filename) and shell globs (matched against the whole
//! filename, `*` crossing directory separators). Globs are translated to
//! regular expressions so both are checked the same way. A pattern that
//! fails to compile is skipped with a warning; the rest still apply.

use globset::Glob;
use mrdigest_core::FileChange;
use regex::bytes::Regex;
use tracing::{debug, warn};

/// Compiled set of ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Regex>,
}

impl IgnoreFilter {
    /// Compile `regexes` and `globs`, skipping any pattern that is invalid.
    pub fn new<R, G>(regexes: &[R], globs: &[G]) -> Self
    where
        R: AsRef<str>,
        G: AsRef<str>,
    {
        let mut patterns = Vec::with_capacity(regexes.len() + globs.len());

        for raw in regexes.iter().map(AsRef::as_ref) {
            match Regex::new(&format!("^(?:{raw})")) {
                Ok(re) => patterns.push(re),
                Err(e) => warn!(pattern = raw, "Skipping invalid ignore regex: {e}"),
            }
        }

        for raw in globs.iter().map(AsRef::as_ref) {
            let translated = Glob::new(raw)
                .map_err(|e| e.to_string())
                .and_then(|g| Regex::new(g.regex()).map_err(|e| e.to_string()));
            match translated {
                Ok(re) => patterns.push(re),
                Err(e) => warn!(pattern = raw, "Skipping invalid ignore glob: {e}"),
            }
        }

        Self { patterns }
    }

    /// Number of patterns that compiled.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `filename` matches any pattern. Empty names never match.
    pub fn is_ignored(&self, filename: &str) -> bool {
        !filename.is_empty()
            && self
                .patterns
                .iter()
                .any(|re| re.is_match(filename.as_bytes()))
    }

    /// Drop every file whose name matches a pattern, preserving order.
    pub fn apply(&self, files: Vec<FileChange>) -> Vec<FileChange> {
        if self.patterns.is_empty() {
            return files;
        }
        files
            .into_iter()
            .filter(|f| {
                let ignored = self.is_ignored(&f.filename);
                if ignored {
                    debug!(file = %f.filename, "Ignored by pattern");
                }
                !ignored
            })
            .collect()
    }
}
