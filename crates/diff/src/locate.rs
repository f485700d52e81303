//! Map a line quoted back by the model onto the patch it came from.
//!
//! Models rarely quote a line byte for byte. The quoted text is first
//! snapped to the closest patch line (if exactly one added line is close
//! enough), then searched for hunk by hunk while tracking the new-file
//! line number.

use mrdigest_core::FileChange;
use serde::Serialize;
use similar::get_close_matches;

use crate::hunk::{HunkHeader, is_header_line};

/// Minimum similarity for a fuzzy match to replace the quoted line.
pub const MATCH_CUTOFF: f32 = 0.93;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineLocation {
    /// Zero-based index of the line within the patch text.
    pub position: usize,
    /// Line number in the new version of the file.
    pub line_number: usize,
}

/// Locate `quoted` in the patch of `filename`.
///
/// Deleted lines and hunk headers never match. If nothing is found and the
/// quote starts with `+`, the search is repeated without it. A match whose
/// line number does not fit in `usize` is not located.
pub fn locate_line(files: &[FileChange], filename: &str, quoted: &str) -> Option<LineLocation> {
    let filename = filename.trim();
    if quoted.is_empty() {
        return None;
    }

    let file = files.iter().find(|f| f.filename.trim() == filename)?;
    let lines: Vec<&str> = file.patch.lines().collect();

    let close = get_close_matches(quoted, &lines, 3, MATCH_CUTOFF);
    let needle = match close.as_slice() {
        [only] if only.starts_with('+') => *only,
        _ => quoted,
    };

    find_in_hunks(&lines, needle).or_else(|| {
        let stripped = needle.strip_prefix('+')?.trim_start();
        if stripped.is_empty() {
            return None;
        }
        find_in_hunks(&lines, stripped)
    })
}

fn find_in_hunks(lines: &[&str], needle: &str) -> Option<LineLocation> {
    let mut new_start: Option<usize> = None;
    let mut offset = 0;

    for (position, line) in lines.iter().enumerate() {
        if is_header_line(line) {
            new_start = HunkHeader::parse(line).ok().map(|h| h.new_start);
            offset = 0;
            continue;
        }
        let Some(start) = new_start else {
            continue;
        };
        if line.starts_with('-') {
            continue;
        }
        if line.contains(needle) {
            return Some(LineLocation {
                position,
                line_number: start.checked_add(offset)?,
            });
        }
        offset += 1;
    }
    None
}
