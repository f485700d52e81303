//! JSON file source: a merge request exported to disk.
//!
//! ```json
//! {
//!   "title": "Speed up the parser",
//!   "description": "…",
//!   "languages": { "Rust": 120000, "Python": 800 },
//!   "files": [
//!     { "filename": "src/lib.rs", "edit_type": "modified", "patch": "@@ -1 +1 @@\n-a\n+b",
//!       "old_content": "a\n", "new_content": "b\n" }
//!   ]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use mrdigest_core::{FileChange, LanguageStats, MergeRequestSource, SourceError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeRequestPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub languages: LanguageStats,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

pub struct JsonFileSource {
    path: String,
    payload: MergeRequestPayload,
}

impl JsonFileSource {
    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        let display = path.display().to_string();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(display.clone())
            } else {
                SourceError::Read {
                    path: display.clone(),
                    reason: e.to_string(),
                }
            }
        })?;
        let payload = Self::parse(&raw)?;
        let loaded_path = &display;
        debug!(path = %loaded_path, files = payload.files.len(), "Loaded merge request");
        Ok(Self {
            path: display,
            payload,
        })
    }

    pub fn parse(raw: &str) -> Result<MergeRequestPayload, SourceError> {
        serde_json::from_str(raw).map_err(|e| SourceError::InvalidPayload(e.to_string()))
    }

    pub fn payload(&self) -> &MergeRequestPayload {
        &self.payload
    }
}

#[async_trait]
impl MergeRequestSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.path
    }

    async fn diff_files(&self) -> Result<Vec<FileChange>, SourceError> {
        Ok(self.payload.files.clone())
    }

    async fn languages(&self) -> Result<LanguageStats, SourceError> {
        Ok(self.payload.languages.clone())
    }
}
