//! Diff pipeline, the orchestrator tying the stages together.
//!
//! ```text
//! files ──► synthesize missing patches ──► ignore filter ──► language groups
//!                                                               │
//!        BoundedDiff ◄── allocator (full pass │ clipping) ◄─────┘
//! ```
//!
//! The pipeline owns compiled configuration (patterns, extension tables,
//! budget) and a shared tokenizer; each [`DiffPipeline::run`] works on an
//! input owned by that call and performs no I/O.

use std::collections::HashSet;
use std::sync::Arc;

use mrdigest_config::AppConfig;
use mrdigest_core::{FileChange, LanguageStats, MergeRequestSource, Result, Tokenizer};
use tracing::{debug, info};

use crate::budget::{BoundedDiff, BudgetState, DEFAULT_HARD_BUFFER, DEFAULT_SOFT_BUFFER, TokenBudgetAllocator};
use crate::filter::IgnoreFilter;
use crate::language::{LanguageTable, group_by_language};
use crate::render::ChunkRenderer;
use crate::synth::fill_missing_patch;

/// Per-pipeline rendering and budget settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Context lines added around each hunk on the full pass.
    pub context_lines: usize,
    /// Render hunks in the numbered new/old layout.
    pub annotate: bool,
    pub hard_limit: usize,
    pub soft_buffer: usize,
    pub hard_buffer: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 0,
            annotate: false,
            hard_limit: 32_000,
            soft_buffer: DEFAULT_SOFT_BUFFER,
            hard_buffer: DEFAULT_HARD_BUFFER,
        }
    }
}

impl DiffOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            context_lines: config.diff.patch_extra_lines,
            annotate: config.diff.add_line_numbers,
            hard_limit: config.budget.max_model_tokens,
            soft_buffer: config.budget.soft_buffer,
            hard_buffer: config.budget.hard_buffer,
        }
    }
}

pub struct DiffPipeline {
    tokenizer: Arc<dyn Tokenizer>,
    ignore: IgnoreFilter,
    languages: LanguageTable,
    bad_extensions: HashSet<String>,
    options: DiffOptions,
}

impl DiffPipeline {
    /// A pipeline with no ignore patterns, extension tables, or bad extensions.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, options: DiffOptions) -> Self {
        Self {
            tokenizer,
            ignore: IgnoreFilter::default(),
            languages: LanguageTable::default(),
            bad_extensions: HashSet::new(),
            options,
        }
    }

    /// A pipeline configured from every section of `config`.
    pub fn from_config(config: &AppConfig, tokenizer: Arc<dyn Tokenizer>) -> Self {
        let ignore = IgnoreFilter::new(&config.ignore.regex, &config.ignore.glob);
        debug!(patterns = ignore.len(), "Compiled ignore patterns");

        Self::new(tokenizer, DiffOptions::from_config(config))
            .with_ignore(ignore)
            .with_languages(LanguageTable::new(&config.language_extensions))
            .with_bad_extensions(config.bad_extensions.all())
    }

    pub fn with_ignore(mut self, ignore: IgnoreFilter) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_languages(mut self, languages: LanguageTable) -> Self {
        self.languages = languages;
        self
    }

    /// Extensions without the leading dot, e.g. `"png"`.
    pub fn with_bad_extensions(mut self, bad_extensions: HashSet<String>) -> Self {
        self.bad_extensions = bad_extensions;
        self
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Turn `files` into one bounded text block.
    ///
    /// `prompt_tokens` is what the surrounding prompt already costs; it seeds
    /// the running total.
    pub fn run(
        &self,
        mut files: Vec<FileChange>,
        stats: &LanguageStats,
        prompt_tokens: usize,
    ) -> Result<BoundedDiff> {
        files.iter_mut().for_each(fill_missing_patch);

        let received = files.len();
        let files = self.ignore.apply(files);
        let mut groups = group_by_language(stats, files, &self.languages, &self.bad_extensions);
        debug!(
            received,
            kept = groups.iter().map(|g| g.files.len()).sum::<usize>(),
            groups = groups.len(),
            "Prepared files"
        );

        let state = BudgetState::new(self.options.hard_limit, prompt_tokens)
            .with_buffers(self.options.soft_buffer, self.options.hard_buffer);
        let renderer = ChunkRenderer::new(self.options.context_lines, self.options.annotate);
        let allocator = TokenBudgetAllocator::new(self.tokenizer.as_ref(), renderer);

        let diff = allocator.allocate(&mut groups, state)?;
        info!(
            tokenizer = self.tokenizer.name(),
            total_tokens = diff.total_tokens,
            clipped = diff.clipped,
            files = diff.outcomes.len(),
            "Bounded diff ready"
        );
        Ok(diff)
    }

    /// Fetch files and language statistics from `source`, then [`run`](Self::run).
    pub async fn run_for_source(
        &self,
        source: &dyn MergeRequestSource,
        prompt_tokens: usize,
    ) -> Result<BoundedDiff> {
        debug!(source = source.name(), "Fetching merge request");
        let files = source.diff_files().await?;
        let stats = source.languages().await?;
        self.run(files, &stats, prompt_tokens)
    }
}
