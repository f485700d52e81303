//! Unified-diff hunk headers.
//!
//! A header looks like `@@ -start1,size1 +start2,size2 @@ section`. Sizes
//! default to 1 when omitted, and a header carrying only `+` coordinates
//! describes an all-addition hunk with an empty old side.

use std::fmt;
use std::sync::LazyLock;

use mrdigest_core::DiffError;
use regex::Regex;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@(?: -(\d+)(?:,(\d+))?)? \+(\d+)(?:,(\d+))? @@[ ]?(.*)$")
        .expect("hunk header regex is valid")
});

/// Parsed `@@ ... @@` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    /// Trailing text after the closing `@@`, usually the enclosing function.
    pub section: String,
}

impl HunkHeader {
    /// Parse a header line.
    pub fn parse(line: &str) -> Result<Self, DiffError> {
        let caps = HUNK_HEADER
            .captures(line)
            .ok_or_else(|| DiffError::MalformedHunkHeader(line.to_string()))?;

        let num = |idx: usize, default: usize| -> Result<usize, DiffError> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse().map_err(|_| DiffError::RangeOverflow {
                    header: line.to_string(),
                }),
                None => Ok(default),
            }
        };

        let (old_start, old_len) = if caps.get(1).is_some() {
            (num(1, 0)?, num(2, 1)?)
        } else {
            (0, 0)
        };

        Ok(Self {
            old_start,
            old_len,
            new_start: num(3, 0)?,
            new_len: num(4, 1)?,
            section: caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }
}

/// Whether a patch line opens a new hunk.
pub fn is_header_line(line: &str) -> bool {
    line.starts_with("@@")
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_len, self.new_start, self.new_len
        )?;
        if !self.section.is_empty() {
            write!(f, " {}", self.section)?;
        }
        Ok(())
    }
}
