//! The diff engine: from a merge request's file changes to one bounded text.
//!
//! Stages, in the order the [`DiffPipeline`] runs them:
//!
//! 1. **Synthesize** patches the host left out ([`synth`])
//! 2. **Filter** ignored and binary files ([`filter`], [`language`])
//! 3. **Group** files by repository language priority ([`language`])
//! 4. **Render** each file with extra context, optionally annotated
//!    ([`extend`], [`annotate`], [`render`])
//! 5. **Allocate** the token budget, clipping when needed ([`budget`], [`prune`])
//!
//! Every stage is a plain function over owned or borrowed input. Only token
//! counting crosses a trait boundary ([`mrdigest_core::Tokenizer`]).

pub mod annotate;
pub mod budget;
pub mod extend;
pub mod filter;
pub mod hunk;
pub mod language;
pub mod locate;
pub mod pipeline;
pub mod prune;
pub mod render;
pub mod synth;
pub mod token;

pub use annotate::annotate_hunks;
pub use budget::{
    ADDED_FILES_LABEL, BoundedDiff, BudgetState, DELETED_FILES_LABEL, Disposition, FileOutcome,
    MODIFIED_FILES_LABEL, NameList, SECTION_SEPARATOR, TokenBudgetAllocator,
};
pub use extend::extend_patch;
pub use filter::IgnoreFilter;
pub use hunk::HunkHeader;
pub use language::{LanguageGroup, LanguageTable, OTHER_GROUP, group_by_language, main_language};
pub use locate::{LineLocation, locate_line};
pub use pipeline::{DiffOptions, DiffPipeline};
pub use prune::omit_deletion_hunks;
pub use render::ChunkRenderer;
pub use synth::{fill_missing_patch, synthesize_patch};
pub use token::{CharEstimateTokenizer, clip_tokens};

#[cfg(feature = "hf")]
pub use token::HfTokenizer;
