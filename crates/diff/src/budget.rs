//! Token budget allocation and the clipping fallback.
//!
//! The allocator first tries to show everything: each file rendered with
//! extended context (and annotated, if configured), counted, and summed on
//! top of the prompt overhead. If that total leaves `soft_buffer` tokens of
//! headroom the chunks are returned as is.
//!
//! Otherwise the clipping pass takes over. Files are visited largest first
//! and each one is degraded just as far as needed:
//!
//! ```text
//! pure deletion            → name in the deleted list
//! past the hard ceiling    → dropped
//! reduced chunk too large  → name in the added / modified list
//! otherwise                → reduced chunk (deletion-only hunks removed)
//! ```
//!
//! Name lists are appended after the accepted chunks under fixed labels.
//!
//! Sections are joined by a blank line, and every join is charged like any
//! other text, so the running total covers the assembled output.

use mrdigest_core::{EditType, FileChange, Result, Tokenizer};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::language::LanguageGroup;
use crate::prune::omit_deletion_hunks;
use crate::render::ChunkRenderer;

pub const ADDED_FILES_LABEL: &str = "其他新增的文件:\n";
pub const DELETED_FILES_LABEL: &str = "其他删除的文件:\n";
pub const MODIFIED_FILES_LABEL: &str = "其他修改的文件:\n";

/// Joins chunks and name-list blocks in the bounded text.
pub const SECTION_SEPARATOR: &str = "\n\n";

pub const DEFAULT_SOFT_BUFFER: usize = 1000;
pub const DEFAULT_HARD_BUFFER: usize = 600;

// ── Budget state ──────────────────────────────────────────────

/// Running token account for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetState {
    pub running_total: usize,
    pub hard_limit: usize,
    pub soft_buffer: usize,
    pub hard_buffer: usize,
}

impl BudgetState {
    /// Start an account at the prompt overhead with default buffers.
    pub fn new(hard_limit: usize, prompt_tokens: usize) -> Self {
        Self {
            running_total: prompt_tokens,
            hard_limit,
            soft_buffer: DEFAULT_SOFT_BUFFER,
            hard_buffer: DEFAULT_HARD_BUFFER,
        }
    }

    pub fn with_buffers(mut self, soft_buffer: usize, hard_buffer: usize) -> Self {
        self.soft_buffer = soft_buffer;
        self.hard_buffer = hard_buffer;
        self
    }

    pub fn charge(&mut self, tokens: usize) {
        self.running_total = self.running_total.saturating_add(tokens);
    }

    /// Whether the current total leaves the soft buffer free.
    pub fn fits_with_soft_buffer(&self) -> bool {
        self.running_total.saturating_add(self.soft_buffer) < self.hard_limit
    }

    /// Whether the total is already inside the hard buffer.
    pub fn past_hard_ceiling(&self) -> bool {
        self.running_total > self.hard_limit.saturating_sub(self.hard_buffer)
    }

    /// Whether adding `cost` would eat into the soft buffer.
    pub fn exceeds_soft_ceiling(&self, cost: usize) -> bool {
        self.running_total.saturating_add(cost) > self.hard_limit.saturating_sub(self.soft_buffer)
    }

    /// Whether adding `cost` would pass the hard limit itself.
    pub fn exceeds_hard_limit(&self, cost: usize) -> bool {
        self.running_total.saturating_add(cost) > self.hard_limit
    }
}

// ── Allocation report ─────────────────────────────────────────

/// Which fallback list a name-only file was put in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameList {
    Added,
    Modified,
    Deleted,
}

impl NameList {
    pub fn label(self) -> &'static str {
        match self {
            NameList::Added => ADDED_FILES_LABEL,
            NameList::Modified => MODIFIED_FILES_LABEL,
            NameList::Deleted => DELETED_FILES_LABEL,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "list")]
pub enum Disposition {
    /// Shown with extended context on the full pass.
    Full,
    /// Shown with deletion-only hunks removed while clipping.
    Reduced,
    /// Listed by name only.
    NameOnly(NameList),
    /// Left out entirely, budget exhausted.
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    /// Tokens of the full-pass chunk.
    pub tokens: usize,
    pub disposition: Disposition,
}

/// The bounded text and how it was put together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundedDiff {
    pub text: String,
    /// Final running total, prompt overhead included.
    pub total_tokens: usize,
    pub clipped: bool,
    pub outcomes: Vec<FileOutcome>,
}

impl BoundedDiff {
    pub fn count(&self, disposition: Disposition) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == disposition)
            .count()
    }
}

// ── Allocator ─────────────────────────────────────────────────

pub struct TokenBudgetAllocator<'t> {
    tokenizer: &'t dyn Tokenizer,
    renderer: ChunkRenderer,
}

impl<'t> TokenBudgetAllocator<'t> {
    pub fn new(tokenizer: &'t dyn Tokenizer, renderer: ChunkRenderer) -> Self {
        Self {
            tokenizer,
            renderer,
        }
    }

    /// Fit `groups` into `state`, clipping if the full rendering is too large.
    ///
    /// Every file's `token_count` is set from its full-pass chunk before any
    /// clipping decision is made. Tokenizer errors abort the invocation.
    pub fn allocate(
        &self,
        groups: &mut [LanguageGroup],
        mut state: BudgetState,
    ) -> Result<BoundedDiff> {
        let prompt_tokens = state.running_total;
        let separator = self.tokenizer.count(SECTION_SEPARATOR)?;
        let mut chunks: Vec<String> = Vec::new();
        let mut outcomes = Vec::new();

        for group in groups.iter_mut() {
            for file in group.files.iter_mut() {
                if file.patch.is_empty() {
                    debug!(file = %file.filename, "Skipping file without a patch");
                    continue;
                }
                let chunk = self.renderer.full_chunk(file);
                let tokens = self.tokenizer.count(&chunk)?;
                file.token_count = Some(tokens);
                if !chunks.is_empty() {
                    state.charge(separator);
                }
                state.charge(tokens);
                chunks.push(chunk);
                outcomes.push(FileOutcome {
                    filename: file.filename.clone(),
                    tokens,
                    disposition: Disposition::Full,
                });
            }
        }

        if state.fits_with_soft_buffer() {
            debug!(
                total = state.running_total,
                limit = state.hard_limit,
                "Full diff fits the budget"
            );
            return Ok(BoundedDiff {
                text: chunks.join(SECTION_SEPARATOR),
                total_tokens: state.running_total,
                clipped: false,
                outcomes,
            });
        }

        info!(
            total = state.running_total,
            limit = state.hard_limit,
            "Diff exceeds the token budget, clipping"
        );
        state.running_total = prompt_tokens;
        self.clip(groups, state, separator)
    }

    fn clip(
        &self,
        groups: &[LanguageGroup],
        mut state: BudgetState,
        separator: usize,
    ) -> Result<BoundedDiff> {
        let mut order: Vec<&FileChange> = groups
            .iter()
            .flat_map(|g| g.files.iter())
            .filter(|f| !f.patch.is_empty())
            .collect();
        order.sort_by(|a, b| b.token_count.cmp(&a.token_count));

        let mut sections = Sections::default();
        let mut outcomes = Vec::with_capacity(order.len());

        for file in order {
            let reduced = if file.edit_type == EditType::Deleted && !file.has_head_content() {
                None
            } else {
                omit_deletion_hunks(&file.patch)
            };

            let disposition = match reduced {
                None => {
                    debug!(file = %file.filename, "Listing deleted file by name");
                    self.list_name(
                        &mut state,
                        &mut sections,
                        NameList::Deleted,
                        &file.filename,
                        separator,
                    )?
                }
                Some(_) if state.past_hard_ceiling() => {
                    warn!(file = %file.filename, "Token budget exhausted, file ignored");
                    Disposition::Dropped
                }
                Some(reduced) => {
                    let chunk = self.renderer.chunk_for(&file.filename, &reduced);
                    let cost = self.tokenizer.count(&chunk)? + sections.join_cost(separator);
                    if state.exceeds_soft_ceiling(cost) {
                        let list = if file.edit_type == EditType::Added {
                            NameList::Added
                        } else {
                            NameList::Modified
                        };
                        debug!(file = %file.filename, cost, "Patch too large, listing name only");
                        self.list_name(&mut state, &mut sections, list, &file.filename, separator)?
                    } else {
                        state.charge(cost);
                        sections.accepted.push(chunk);
                        Disposition::Reduced
                    }
                }
            };

            outcomes.push(FileOutcome {
                filename: file.filename.clone(),
                tokens: file.token_count.unwrap_or_default(),
                disposition,
            });
        }

        Ok(BoundedDiff {
            text: sections.render(),
            total_tokens: state.running_total,
            clipped: true,
            outcomes,
        })
    }

    /// Put a filename in a fallback list, charging the label and the
    /// section join on first use.
    fn list_name(
        &self,
        state: &mut BudgetState,
        sections: &mut Sections,
        list: NameList,
        filename: &str,
        separator: usize,
    ) -> Result<Disposition> {
        let mut cost = self.tokenizer.count(filename)? + 1;
        if sections.get(list).is_empty() {
            cost += self.tokenizer.count(list.label())? + sections.join_cost(separator);
        }
        if state.exceeds_hard_limit(cost) {
            warn!(file = filename, "No budget left even for the filename, file ignored");
            return Ok(Disposition::Dropped);
        }
        state.charge(cost);
        sections.get_mut(list).push(filename.to_string());
        Ok(Disposition::NameOnly(list))
    }
}

/// Output of the clipping pass: accepted chunks, then the name lists.
#[derive(Debug, Default)]
struct Sections {
    accepted: Vec<String>,
    added: Vec<String>,
    modified: Vec<String>,
    deleted: Vec<String>,
}

impl Sections {
    /// Sections opened so far. Each one after the first costs a separator.
    fn opened(&self) -> usize {
        self.accepted.len()
            + [&self.added, &self.modified, &self.deleted]
                .iter()
                .filter(|l| !l.is_empty())
                .count()
    }

    fn join_cost(&self, separator: usize) -> usize {
        if self.opened() == 0 { 0 } else { separator }
    }

    fn get(&self, list: NameList) -> &Vec<String> {
        match list {
            NameList::Added => &self.added,
            NameList::Modified => &self.modified,
            NameList::Deleted => &self.deleted,
        }
    }

    fn get_mut(&mut self, list: NameList) -> &mut Vec<String> {
        match list {
            NameList::Added => &mut self.added,
            NameList::Modified => &mut self.modified,
            NameList::Deleted => &mut self.deleted,
        }
    }

    /// Accepted chunks, then non-empty lists in added, modified, deleted order.
    fn render(&self) -> String {
        let lists = [NameList::Added, NameList::Modified, NameList::Deleted]
            .into_iter()
            .filter(|l| !self.get(*l).is_empty())
            .map(|l| format!("{}{}", l.label(), self.get(l).join("\n")));
        self.accepted
            .iter()
            .cloned()
            .chain(lists)
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::OTHER_GROUP;
    use crate::token::CharEstimateTokenizer;
    use mrdigest_core::TokenizerError;

    /// One token per added line; headings, labels and names are free.
    struct AdditionTokenizer;

    impl Tokenizer for AdditionTokenizer {
        fn name(&self) -> &str {
            "additions"
        }

        fn count(&self, text: &str) -> std::result::Result<usize, TokenizerError> {
            Ok(text.lines().filter(|l| l.starts_with('+')).count())
        }
    }

    fn additions(n: usize) -> String {
        let mut patch = format!("@@ -1,0 +1,{n} @@");
        for i in 0..n {
            patch.push_str(&format!("\n+line {i}"));
        }
        patch
    }

    fn group(name: &str, files: Vec<FileChange>) -> LanguageGroup {
        LanguageGroup {
            name: name.to_string(),
            files,
        }
    }

    fn dispositions(diff: &BoundedDiff) -> Vec<(&str, Disposition)> {
        diff.outcomes
            .iter()
            .map(|o| (o.filename.as_str(), o.disposition))
            .collect()
    }

    #[test]
    fn budget_state_thresholds() {
        let mut s = BudgetState::new(2000, 0).with_buffers(100, 60);
        assert!(s.fits_with_soft_buffer());
        s.charge(1950);
        assert!(!s.fits_with_soft_buffer());
        assert!(s.past_hard_ceiling());
        assert!(s.exceeds_soft_ceiling(1));
        assert!(!s.exceeds_hard_limit(50));
        assert!(s.exceeds_hard_limit(51));
    }

    #[test]
    fn everything_fits_returns_full_concatenation() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let mut groups = vec![
            group("Rust", vec![FileChange::new("a.rs", EditType::Modified, "@@ -1 +1 @@\n-x\n+y")]),
            group(OTHER_GROUP, vec![FileChange::new("b.md", EditType::Added, "@@ -0,0 +1 @@\n+z")]),
        ];
        let diff = alloc.allocate(&mut groups, BudgetState::new(32000, 10)).unwrap();

        assert!(!diff.clipped);
        assert_eq!(
            diff.text,
            "## a.rs\n\n@@ -1 +1 @@\n-x\n+y\n\n## b.md\n\n@@ -0,0 +1 @@\n+z"
        );
        assert!(groups.iter().flat_map(|g| &g.files).all(|f| f.token_count.is_some()));
        assert_eq!(diff.count(Disposition::Full), 2);
        assert!(diff.total_tokens > 10);
    }

    #[test]
    fn greedy_largest_first() {
        let tok = AdditionTokenizer;
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let mut groups = vec![group(
            OTHER_GROUP,
            vec![
                FileChange::new("small.rs", EditType::Modified, additions(500)),
                FileChange::new("big.rs", EditType::Modified, additions(1500)),
            ],
        )];
        let state = BudgetState::new(1200, 0).with_buffers(0, 0);
        let diff = alloc.allocate(&mut groups, state).unwrap();

        assert!(diff.clipped);
        assert_eq!(
            dispositions(&diff),
            vec![
                ("big.rs", Disposition::NameOnly(NameList::Modified)),
                ("small.rs", Disposition::Reduced),
            ]
        );
        assert!(diff.text.starts_with("## small.rs\n\n@@ -1,0 +1,500 @@"));
        assert!(diff.text.ends_with("\n\n其他修改的文件:\nbig.rs"));
        assert_eq!(diff.total_tokens, 501);
    }

    #[test]
    fn pure_deletion_collapses_to_name() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let body: String = (0..400).map(|i| format!("\n-gone {i}")).collect();
        let mut groups = vec![group(
            OTHER_GROUP,
            vec![
                FileChange::new("old.rs", EditType::Deleted, format!("@@ -1,400 +0,0 @@{body}")),
                FileChange::new("rem.rs", EditType::Modified, format!("@@ -1,400 +1,0 @@{body}")),
                FileChange::new("kept.rs", EditType::Modified, "@@ -1 +1 @@\n-a\n+b"),
            ],
        )];
        let state = BudgetState::new(1500, 0).with_buffers(100, 60);
        let diff = alloc.allocate(&mut groups, state).unwrap();

        assert!(diff.clipped);
        assert_eq!(diff.count(Disposition::NameOnly(NameList::Deleted)), 2);
        assert!(!diff.text.contains("-gone"));
        assert!(diff.text.starts_with("## kept.rs"));
        assert!(diff.text.ends_with("其他删除的文件:\nold.rs\nrem.rs"));
    }

    #[test]
    fn addition_files_go_to_added_list() {
        let tok = AdditionTokenizer;
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let mut groups = vec![group(
            OTHER_GROUP,
            vec![
                FileChange::new("new.rs", EditType::Added, additions(300)),
                FileChange::new("mod.rs", EditType::Modified, additions(200)),
            ],
        )];
        let state = BudgetState::new(300, 0).with_buffers(100, 0);
        let diff = alloc.allocate(&mut groups, state).unwrap();

        assert_eq!(
            dispositions(&diff),
            vec![
                ("new.rs", Disposition::NameOnly(NameList::Added)),
                ("mod.rs", Disposition::NameOnly(NameList::Modified)),
            ]
        );
        assert_eq!(diff.text, "其他新增的文件:\nnew.rs\n\n其他修改的文件:\nmod.rs");
    }

    #[test]
    fn files_past_hard_ceiling_are_dropped() {
        let tok = AdditionTokenizer;
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let mut groups = vec![group(
            OTHER_GROUP,
            vec![
                FileChange::new("a.rs", EditType::Modified, additions(90)),
                FileChange::new("b.rs", EditType::Modified, additions(80)),
            ],
        )];
        // a.rs fits under the soft ceiling and leaves the total past the hard one.
        let state = BudgetState::new(100, 0).with_buffers(5, 20);
        let diff = alloc.allocate(&mut groups, state).unwrap();

        assert_eq!(
            dispositions(&diff),
            vec![("a.rs", Disposition::Reduced), ("b.rs", Disposition::Dropped)]
        );
        assert!(!diff.text.contains("b.rs"));
    }

    #[test]
    fn clipping_removes_deletion_only_hunks() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let dels: String = (0..200).map(|i| format!("\n-old {i}")).collect();
        let patch = format!("@@ -1,200 +1,0 @@{dels}\n@@ -300 +100 @@\n-x\n+y");
        let mut groups = vec![group(
            OTHER_GROUP,
            vec![FileChange::new("m.rs", EditType::Modified, patch)],
        )];
        let state = BudgetState::new(1400, 0).with_buffers(1000, 600);
        let diff = alloc.allocate(&mut groups, state).unwrap();

        assert!(diff.clipped);
        assert_eq!(diff.text, "## m.rs\n\n@@ -300 +100 @@\n-x\n+y");
    }

    #[test]
    fn clipped_total_stays_under_the_ceiling() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let files = (0..30)
            .map(|i| {
                let edit = if i % 3 == 0 { EditType::Added } else { EditType::Modified };
                FileChange::new(format!("src/file_{i}.rs"), edit, additions(5 + (i * 7) % 40))
            })
            .collect();
        let mut groups = vec![group(OTHER_GROUP, files)];
        let state = BudgetState::new(600, 50).with_buffers(100, 60);
        let diff = alloc.allocate(&mut groups, state).unwrap();

        assert!(diff.clipped);
        assert!(diff.total_tokens <= 600);
        assert!(tok.count(&diff.text).unwrap() + 50 <= 600 + 60);
        assert_eq!(diff.outcomes.len(), 30);
    }

    fn small_files(n: usize) -> Vec<FileChange> {
        // Each chunk is 24 chars, six tokens with the char estimate.
        (1..=n)
            .map(|i| FileChange::new(format!("f{i}.rs"), EditType::Modified, "@@ -1 +1 @@\n+x"))
            .collect()
    }

    #[test]
    fn separators_count_towards_the_full_pass() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());

        let mut groups = vec![group(OTHER_GROUP, small_files(9))];
        let diff = alloc
            .allocate(&mut groups, BudgetState::new(63, 0).with_buffers(0, 0))
            .unwrap();
        assert!(!diff.clipped);
        assert_eq!(diff.total_tokens, 9 * 6 + 8);

        let mut groups = vec![group(OTHER_GROUP, small_files(9))];
        let diff = alloc
            .allocate(&mut groups, BudgetState::new(62, 0).with_buffers(0, 0))
            .unwrap();
        assert!(diff.clipped);
    }

    #[test]
    fn assembled_text_never_exceeds_the_limit_without_buffers() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        for limit in 1..=80 {
            let mut groups = vec![group(OTHER_GROUP, small_files(9))];
            let state = BudgetState::new(limit, 0).with_buffers(0, 0);
            let diff = alloc.allocate(&mut groups, state).unwrap();

            let measured = tok.count(&diff.text).unwrap();
            assert!(
                measured <= diff.total_tokens,
                "limit {limit}: measured {measured} > charged {}",
                diff.total_tokens
            );
            assert!(diff.total_tokens <= limit, "limit {limit}: total {}", diff.total_tokens);
        }
    }

    #[test]
    fn name_list_blocks_pay_for_their_join() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let mut files = small_files(1);
        files.push(FileChange::new("big.rs", EditType::Added, additions(200)));
        let mut groups = vec![group(OTHER_GROUP, files)];
        let diff = alloc
            .allocate(&mut groups, BudgetState::new(20, 0).with_buffers(0, 0))
            .unwrap();

        assert_eq!(diff.text, "## f1.rs\n\n@@ -1 +1 @@\n+x\n\n其他新增的文件:\nbig.rs");
        // Label, name and newline 6, chunk 6, one join 1.
        assert_eq!(diff.total_tokens, 13);
        assert!(tok.count(&diff.text).unwrap() <= diff.total_tokens);
        assert!(diff.total_tokens <= 20);
    }

    #[test]
    fn priority_order_is_kept_on_full_pass() {
        let tok = CharEstimateTokenizer::default();
        let alloc = TokenBudgetAllocator::new(&tok, ChunkRenderer::default());
        let mut groups = vec![
            group("Rust", vec![FileChange::new("z.rs", EditType::Modified, "@@ -1 +1 @@\n+r")]),
            group("Python", vec![FileChange::new("a.py", EditType::Modified, "@@ -1 +1 @@\n+p")]),
            group(OTHER_GROUP, vec![FileChange::new("m.md", EditType::Modified, "@@ -1 +1 @@\n+o")]),
        ];
        let diff = alloc.allocate(&mut groups, BudgetState::new(32000, 0)).unwrap();
        let z = diff.text.find("z.rs").unwrap();
        let a = diff.text.find("a.py").unwrap();
        let m = diff.text.find("m.md").unwrap();
        assert!(z < a && a < m);
    }

    #[test]
    fn tokenizer_failure_is_fatal() {
        struct Broken;
        impl Tokenizer for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn count(&self, _: &str) -> std::result::Result<usize, TokenizerError> {
                Err(TokenizerError::Encode("vocab missing".into()))
            }
        }
        let alloc = TokenBudgetAllocator::new(&Broken, ChunkRenderer::default());
        let mut groups = vec![group(
            OTHER_GROUP,
            vec![FileChange::new("a.rs", EditType::Modified, "@@ -1 +1 @@\n+x")],
        )];
        let err = alloc.allocate(&mut groups, BudgetState::new(100, 0)).unwrap_err();
        assert!(matches!(err, mrdigest_core::Error::Tokenizer(_)));
    }
}
