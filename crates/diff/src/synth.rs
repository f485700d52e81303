//! Patch synthesis for files the host sent without a diff.
//!
//! Hosting providers omit the patch for very large changes. When both sides
//! of a modified or renamed file are present we can diff them ourselves.

use mrdigest_core::{EditType, FileChange};
use similar::TextDiff;
use tracing::{debug, warn};

/// Lines of context around each synthesized hunk.
pub const SYNTH_CONTEXT_LINES: usize = 3;

/// Unified diff of `old` against `new`, hunks only (no `---`/`+++` lines).
pub fn synthesize_patch(old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(SYNTH_CONTEXT_LINES)
        .to_string()
}

/// Fill an empty patch from the file contents when that is possible.
///
/// Only modified and renamed files qualify. A content that fails to decode
/// leaves the patch empty.
pub fn fill_missing_patch(file: &mut FileChange) {
    if !file.patch.is_empty() || !matches!(file.edit_type, EditType::Modified | EditType::Renamed)
    {
        return;
    }

    let synthesized = match (file.old_text(), file.new_text()) {
        (Ok(Some(old)), Ok(Some(new))) => synthesize_patch(old, new),
        (Err(e), _) | (_, Err(e)) => {
            warn!(file = %file.filename, "Cannot synthesize patch: {e}");
            return;
        }
        _ => return,
    };

    debug!(file = %file.filename, "Synthesized patch from file contents");
    file.patch = synthesized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_patch_has_hunk_header_and_lines() {
        let patch = synthesize_patch("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(patch, "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n");
    }

    #[test]
    fn identical_contents_give_empty_patch() {
        assert_eq!(synthesize_patch("same\n", "same\n"), "");
    }

    #[test]
    fn fills_modified_file_without_patch() {
        let mut file = FileChange::new("a.rs", EditType::Modified, "")
            .with_old_content("x\n")
            .with_new_content("y\n");
        fill_missing_patch(&mut file);
        assert!(file.patch.starts_with("@@ -1 +1 @@"));
        assert!(file.patch.contains("-x\n+y"));
    }

    #[test]
    fn leaves_existing_patch_alone() {
        let mut file = FileChange::new("a.rs", EditType::Modified, "@@ -1 +1 @@\n+keep")
            .with_old_content("x\n")
            .with_new_content("y\n");
        fill_missing_patch(&mut file);
        assert_eq!(file.patch, "@@ -1 +1 @@\n+keep");
    }

    #[test]
    fn added_files_are_not_synthesized() {
        let mut file = FileChange::new("a.rs", EditType::Added, "").with_new_content("y\n");
        fill_missing_patch(&mut file);
        assert!(file.patch.is_empty());
    }

    #[test]
    fn undecodable_content_leaves_patch_empty() {
        let mut file = FileChange::new("a.rs", EditType::Renamed, "")
            .with_old_content(vec![0xff, 0xfe])
            .with_new_content("y\n");
        fill_missing_patch(&mut file);
        assert!(file.patch.is_empty());
    }
}
