//! Per-file chunk rendering.
//!
//! A chunk is what one file contributes to the final text: a `## filename`
//! heading followed by either the plain patch or its annotated layout.
//! Stage failures never surface from here; each one degrades to the next
//! simpler rendering and is logged.

use std::borrow::Cow;

use mrdigest_core::FileChange;
use tracing::warn;

use crate::annotate::annotate_hunks;
use crate::extend::extend_patch;

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkRenderer {
    /// Extra context lines per hunk on the full pass.
    pub context_lines: usize,
    /// Use the numbered new/old hunk layout.
    pub annotate: bool,
}

impl ChunkRenderer {
    pub fn new(context_lines: usize, annotate: bool) -> Self {
        Self {
            context_lines,
            annotate,
        }
    }

    /// Chunk for the full pass: extended patch, annotated if configured.
    pub fn full_chunk(&self, file: &FileChange) -> String {
        let patch = self.extended_patch(file);
        self.chunk_for(&file.filename, &patch)
    }

    /// Chunk for an already prepared patch.
    pub fn chunk_for(&self, filename: &str, patch: &str) -> String {
        if self.annotate {
            match annotate_hunks(patch, filename) {
                Ok(annotated) => return annotated,
                Err(e) => warn!(file = filename, "Failed to annotate hunks, using plain patch: {e}"),
            }
        }
        format!("## {filename}\n\n{}", patch.trim_end())
    }

    /// The file's patch with extra context, or the raw patch if that fails
    /// or there is no original content to take context from.
    pub fn extended_patch<'f>(&self, file: &'f FileChange) -> Cow<'f, str> {
        if self.context_lines == 0 || file.patch.is_empty() {
            return Cow::Borrowed(&file.patch);
        }

        let extended = match file.old_text() {
            Ok(None) => return Cow::Borrowed(&file.patch),
            Ok(original) => extend_patch(original, &file.patch, self.context_lines),
            Err(e) => Err(e),
        };
        match extended {
            Ok(patch) => Cow::Owned(patch),
            Err(e) => {
                warn!(file = %file.filename, "Failed to extend patch, using it as provided: {e}");
                Cow::Borrowed(&file.patch)
            }
        }
    }
}
