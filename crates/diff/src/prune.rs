//! Deletion pruning: drop hunks that only take code away.
//!
//! Under budget pressure the added code is what a reviewer needs most.
//! Hunks without a single `+` line are removed; hunks with at least one
//! addition are kept whole, context and deletions included.

use crate::hunk::is_header_line;

/// Patch with every addition-free hunk removed.
///
/// Returns `None` when nothing is left, i.e. the change is effectively a
/// pure deletion. A preamble before the first hunk (`---`/`+++` lines) is
/// kept only if some hunk survives.
pub fn omit_deletion_hunks(patch: &str) -> Option<String> {
    let mut preamble: Vec<&str> = Vec::new();
    let mut kept: Vec<&str> = Vec::new();
    let mut hunk: Vec<&str> = Vec::new();
    let mut has_addition = false;
    let mut inside_hunk = false;

    for line in patch.lines() {
        if is_header_line(line) {
            if has_addition {
                kept.append(&mut hunk);
            }
            hunk.clear();
            has_addition = false;
            inside_hunk = true;
            hunk.push(line);
        } else if inside_hunk {
            has_addition |= line.starts_with('+');
            hunk.push(line);
        } else {
            preamble.push(line);
        }
    }
    if has_addition {
        kept.append(&mut hunk);
    }

    if kept.is_empty() {
        return None;
    }

    preamble.extend(kept);
    Some(preamble.join("\n"))
}
