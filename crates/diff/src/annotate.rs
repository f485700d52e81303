//! Hunk annotation in the numbered `__new hunk__` / `__old hunk__` layout.
//!
//! Models are bad at counting lines in a raw unified diff. This layout
//! splits each hunk into the code as it reads after the change, prefixed
//! with absolute new-file line numbers, and the code as it read before:
//!
//! ```text
//! ## src/file.ts
//!
//! @@ -880,5 +881,7 @@ fn render()
//! __new hunk__
//! 881  line1
//! 882 +line2
//! 883  line3
//! __old hunk__
//!  line1
//! -old line2
//!  line3
//! ```
//!
//! Line references the model makes against the new block can then be
//! mapped straight back to the file.

use mrdigest_core::DiffError;

use crate::hunk::{HunkHeader, is_header_line};

/// Rewrite `patch` into the dual-block layout under a `## filename` header.
///
/// Lines before the first hunk header (`---`/`+++` file headers) and
/// "no newline at end of file" markers are dropped.
pub fn annotate_hunks(patch: &str, filename: &str) -> Result<String, DiffError> {
    let mut out = format!("## {filename}\n");
    let mut open: Option<OpenHunk> = None;

    for line in patch.lines() {
        if line.starts_with('\\') {
            continue;
        }

        if is_header_line(line) {
            let header = HunkHeader::parse(line)?;
            if let Some(hunk) = open.take() {
                hunk.write_to(&mut out)?;
            }
            open = Some(OpenHunk::new(line, header.new_start));
            continue;
        }

        if let Some(hunk) = open.as_mut() {
            hunk.push(line);
        }
    }

    if let Some(hunk) = open {
        hunk.write_to(&mut out)?;
    }

    Ok(out.trim_end().to_string())
}

struct OpenHunk<'a> {
    header_line: &'a str,
    new_start: usize,
    new_lines: Vec<&'a str>,
    old_lines: Vec<&'a str>,
}

impl<'a> OpenHunk<'a> {
    fn new(header_line: &'a str, new_start: usize) -> Self {
        Self {
            header_line,
            new_start,
            new_lines: Vec::new(),
            old_lines: Vec::new(),
        }
    }

    fn push(&mut self, line: &'a str) {
        if line.starts_with('+') {
            self.new_lines.push(line);
        } else if line.starts_with('-') {
            self.old_lines.push(line);
        } else {
            self.new_lines.push(line);
            self.old_lines.push(line);
        }
    }

    /// Fails if a new-side line number does not fit in `usize`.
    fn write_to(self, out: &mut String) -> Result<(), DiffError> {
        out.push('\n');
        out.push_str(self.header_line);
        out.push('\n');

        if !self.new_lines.is_empty() {
            out.push_str("__new hunk__\n");
            for (i, line) in self.new_lines.iter().enumerate() {
                let number = self
                    .new_start
                    .checked_add(i)
                    .ok_or_else(|| DiffError::RangeOverflow {
                        header: self.header_line.to_string(),
                    })?;
                out.push_str(&format!("{number} {line}\n"));
            }
        }

        if !self.old_lines.is_empty() {
            out.push_str("__old hunk__\n");
            for line in &self.old_lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_new_side_from_range_start() {
        let patch = "@@ -8,3 +10,5 @@\n a\n b\n c\n+d\n+e";
        let out = annotate_hunks(patch, "src/lib.rs").unwrap();
        let numbered: Vec<&str> = out
            .lines()
            .skip_while(|l| *l != "__new hunk__")
            .skip(1)
            .take_while(|l| *l != "__old hunk__")
            .collect();
        assert_eq!(numbered, vec!["10  a", "11  b", "12  c", "13 +d", "14 +e"]);
    }

    #[test]
    fn full_layout_for_mixed_hunk() {
        let patch = "--- a/x.py\n+++ b/x.py\n@@ -1,3 +1,3 @@ def f():\n keep\n-old\n+new\n tail\n\\ No newline at end of file";
        let out = annotate_hunks(patch, "x.py").unwrap();
        let expected = "## x.py\n\
                        \n\
                        @@ -1,3 +1,3 @@ def f():\n\
                        __new hunk__\n\
                        1  keep\n\
                        2 +new\n\
                        3  tail\n\
                        __old hunk__\n \
                        keep\n\
                        -old\n \
                        tail";
        assert_eq!(out, expected);
    }

    #[test]
    fn each_hunk_is_flushed_in_order() {
        let patch = "@@ -1,1 +1,1 @@\n-a\n+b\n@@ -20,1 +20,2 @@\n x\n+y";
        let out = annotate_hunks(patch, "f.rs").unwrap();
        let first = out.find("@@ -1,1").unwrap();
        let second = out.find("@@ -20,1").unwrap();
        assert!(first < second);
        assert!(out.contains("1 +b"));
        assert!(out.contains("20  x\n21 +y"));
        assert_eq!(out.matches("__new hunk__").count(), 2);
        assert_eq!(out.matches("__old hunk__").count(), 2);
    }

    #[test]
    fn pure_deletion_hunk_has_only_old_block() {
        let patch = "@@ -4,2 +3,0 @@\n-gone\n-also gone";
        let out = annotate_hunks(patch, "d.rs").unwrap();
        assert!(!out.contains("__new hunk__"));
        assert!(out.ends_with("__old hunk__\n-gone\n-also gone"));
    }

    #[test]
    fn patch_without_hunks_yields_only_the_heading() {
        assert_eq!(annotate_hunks("Binary files differ", "a.png").unwrap(), "## a.png");
    }

    #[test]
    fn malformed_header_is_an_error() {
        assert!(annotate_hunks("@@ nope\n+x", "a.rs").is_err());
    }

    #[test]
    fn line_numbers_past_usize_are_an_error() {
        let err = annotate_hunks("@@ -1 +18446744073709551615,2 @@\n+a\n+b", "a.rs").unwrap_err();
        assert!(matches!(err, DiffError::RangeOverflow { .. }));

        // The last representable line still numbers fine.
        let out = annotate_hunks("@@ -1 +18446744073709551615 @@\n+a", "a.rs").unwrap();
        assert!(out.contains("18446744073709551615 +a"));
    }
}
