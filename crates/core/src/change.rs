//! File change domain types.
//!
//! A [`FileChange`] is one entry of a merge request's change list: the
//! unified-diff text plus, when the source could fetch them, the full file
//! contents before and after the change.

use serde::{Deserialize, Deserializer};

use crate::error::DiffError;

/// How a file changed in a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
    Added,
    Deleted,
    Modified,
    Renamed,
    #[default]
    Unknown,
}

/// A single changed file.
///
/// Contents are kept as raw bytes: the hosting provider may hand back
/// binary or non-UTF-8 data, and decoding is only attempted by the stages
/// that actually need text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileChange {
    /// Path of the file after the change.
    #[serde(default)]
    pub filename: String,

    /// Path before the change, set only for renames.
    #[serde(default)]
    pub old_filename: Option<String>,

    #[serde(default)]
    pub edit_type: EditType,

    /// Full content at the merge base.
    #[serde(default, deserialize_with = "content")]
    pub old_content: Option<Vec<u8>>,

    /// Full content at the head of the source branch.
    #[serde(default, deserialize_with = "content")]
    pub new_content: Option<Vec<u8>>,

    /// Unified-diff text as provided by the source (may be empty).
    #[serde(default)]
    pub patch: String,

    /// Measured token cost of this file's rendered chunk. `None` until the
    /// budget allocator has measured it.
    #[serde(skip)]
    pub token_count: Option<usize>,
}

impl FileChange {
    /// Create a change with a patch and no contents.
    pub fn new(filename: impl Into<String>, edit_type: EditType, patch: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            edit_type,
            patch: patch.into(),
            ..Self::default()
        }
    }

    /// Attach the content at the merge base.
    pub fn with_old_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.old_content = Some(content.into());
        self
    }

    /// Attach the content at the head of the source branch.
    pub fn with_new_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.new_content = Some(content.into());
        self
    }

    /// Mark this change as a rename from `old`.
    pub fn renamed_from(mut self, old: impl Into<String>) -> Self {
        self.old_filename = Some(old.into());
        self.edit_type = EditType::Renamed;
        self
    }

    /// The merge-base content decoded as UTF-8.
    pub fn old_text(&self) -> Result<Option<&str>, DiffError> {
        self.decode(self.old_content.as_deref())
    }

    /// The head content decoded as UTF-8.
    pub fn new_text(&self) -> Result<Option<&str>, DiffError> {
        self.decode(self.new_content.as_deref())
    }

    /// Whether any head content could be retrieved for this file.
    pub fn has_head_content(&self) -> bool {
        self.new_content.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Extension including the leading dot, taken after the last `.`.
    ///
    /// A name without a dot yields `.` + the whole name, so `Makefile`
    /// becomes `.Makefile` and matches nothing in a normal extension map.
    pub fn extension(&self) -> String {
        let tail = self.filename.rsplit('.').next().unwrap_or_default();
        format!(".{tail}")
    }

    fn decode<'a>(&self, bytes: Option<&'a [u8]>) -> Result<Option<&'a str>, DiffError> {
        bytes
            .map(|b| {
                std::str::from_utf8(b).map_err(|_| DiffError::Decode {
                    filename: self.filename.clone(),
                })
            })
            .transpose()
    }
}

/// File content as it appears in JSON payloads: either text or a byte array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Bytes(Vec<u8>),
}

fn content<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawContent>::deserialize(deserializer)?;
    Ok(raw.map(|r| match r {
        RawContent::Text(s) => s.into_bytes(),
        RawContent::Bytes(b) => b,
    }))
}
