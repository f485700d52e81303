//! Patch extension: grow each hunk with context from the original file.
//!
//! Minimal diffs often show a changed line with too little around it for a
//! reviewer (or a model) to follow. Given the merge-base content, each hunk
//! is widened by `n` lines on both ends and its range header recomputed:
//!
//! ```text
//! extended_start = max(1, start - n)
//! extended_size  = size + (start - extended_start) + n
//! ```
//!
//! Counts are clamped to the lines that really exist, so a hunk near the end
//! of the file gets fewer trailing lines and a header that still adds up.
//! A range that gains lines never starts before line 1. Ranges too large to
//! extend are reported as [`DiffError::RangeOverflow`].
//! Spliced lines are emitted as ordinary context lines (leading space).

use std::ops::Range;

use mrdigest_core::DiffError;

use crate::hunk::{HunkHeader, is_header_line};

/// Extend every hunk of `patch` with `num_lines` lines of surrounding context.
///
/// Returns the patch unchanged when `num_lines` is zero or the patch is
/// empty. A malformed hunk header or a range that overflows aborts with an
/// error; callers fall back to the original patch.
pub fn extend_patch(
    original: Option<&str>,
    patch: &str,
    num_lines: usize,
) -> Result<String, DiffError> {
    if patch.is_empty() || num_lines == 0 {
        return Ok(patch.to_string());
    }

    let original_lines: Vec<&str> = original.map(|s| s.lines().collect()).unwrap_or_default();
    let mut out: Vec<String> = Vec::new();
    let mut pending_tail: Option<Range<usize>> = None;

    for line in patch.lines() {
        if !is_header_line(line) {
            out.push(line.to_string());
            continue;
        }

        let header = HunkHeader::parse(line)?;

        // finish previous hunk
        if let Some(tail) = pending_tail.take() {
            push_context(&mut out, &original_lines[tail]);
        }

        let window = ContextWindow::around(&header, num_lines, original_lines.len())
            .ok_or_else(|| DiffError::RangeOverflow {
                header: line.to_string(),
            })?;
        out.push(window.header.to_string());
        push_context(&mut out, &original_lines[window.lead]);
        pending_tail = Some(window.tail);
    }

    if let Some(tail) = pending_tail {
        push_context(&mut out, &original_lines[tail]);
    }

    Ok(out.join("\n"))
}

/// Extended header plus the original-file line ranges (0-based, exclusive)
/// to splice before and after the hunk body.
struct ContextWindow {
    header: HunkHeader,
    lead: Range<usize>,
    tail: Range<usize>,
}

impl ContextWindow {
    /// `None` when the extended ranges do not fit in `usize`.
    fn around(header: &HunkHeader, n: usize, available: usize) -> Option<Self> {
        let body_start = lines_before(header.old_start, header.old_len).min(available);
        let lead = body_start.saturating_sub(n)..body_start;
        let tail_start = body_start.checked_add(header.old_len)?.min(available);
        let tail = tail_start..tail_start.saturating_add(n).min(available);

        let grown = lead.len() + tail.len();
        let old_len = header.old_len.checked_add(grown)?;
        let new_len = header.new_len.checked_add(grown)?;
        let old_start = shifted_start(header.old_start, header.old_len, lead.len());
        let new_start = shifted_start(header.new_start, header.new_len, lead.len());
        let extended = HunkHeader {
            old_start: range_start(old_start, old_len),
            old_len,
            new_start: range_start(new_start, new_len),
            new_len,
            section: header.section.clone(),
        };

        Some(Self {
            header: extended,
            lead,
            tail,
        })
    }
}

/// Number of file lines strictly before a range. An empty range's start
/// names the line it follows, a non-empty one names its own first line.
fn lines_before(start: usize, len: usize) -> usize {
    if len == 0 {
        start
    } else {
        start.saturating_sub(1)
    }
}

fn shifted_start(start: usize, len: usize, lead: usize) -> usize {
    if lead == 0 {
        return start;
    }
    lines_before(start, len).saturating_sub(lead) + 1
}

/// Non-empty ranges are 1-based.
fn range_start(start: usize, len: usize) -> usize {
    if len == 0 { start } else { start.max(1) }
}

fn push_context(out: &mut Vec<String>, lines: &[&str]) {
    out.extend(lines.iter().map(|l| format!(" {l}")));
}
