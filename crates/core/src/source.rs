//! MergeRequestSource trait: where the engine's input comes from.
//!
//! A source knows how to fetch the changed files of one merge request and
//! the repository's language statistics. The git hosting client is the
//! production implementation; tests and the CLI read local JSON.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::change::FileChange;
use crate::error::SourceError;

/// Language name → bytes of code in the repository.
pub type LanguageStats = HashMap<String, u64>;

#[async_trait]
pub trait MergeRequestSource: Send + Sync {
    /// A human-readable name for this source (e.g., "gitlab", "file").
    fn name(&self) -> &str;

    /// Changed files with their patches and, where available, contents.
    async fn diff_files(&self) -> std::result::Result<Vec<FileChange>, SourceError>;

    /// Repository language statistics. An empty map means "unknown".
    async fn languages(&self) -> std::result::Result<LanguageStats, SourceError>;
}
