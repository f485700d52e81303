//! Language prioritization: put the repository's main languages first.
//!
//! Repository statistics (language → bytes of code) rank the languages.
//! Each changed file joins the group of the highest-ranked language whose
//! extension set contains its extension. Everything else lands in a single
//! trailing "Other" group. When the allocator has to cut, files earlier in
//! this order are the ones most likely to survive.

use std::collections::{HashMap, HashSet};

use mrdigest_core::{FileChange, LanguageStats};
use tracing::debug;

/// Name of the trailing catch-all group.
pub const OTHER_GROUP: &str = "Other";

/// Files sharing a language, in input order.
#[derive(Debug, Clone)]
pub struct LanguageGroup {
    pub name: String,
    pub files: Vec<FileChange>,
}

impl LanguageGroup {
    fn other(files: Vec<FileChange>) -> Self {
        Self {
            name: OTHER_GROUP.to_string(),
            files,
        }
    }
}

/// Language name → extension set, looked up case-insensitively by name.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    extensions: HashMap<String, HashSet<String>>,
}

impl LanguageTable {
    pub fn new<I, K, E, X>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: AsRef<str>,
        E: IntoIterator<Item = X>,
        X: Into<String>,
    {
        let mut extensions: HashMap<String, HashSet<String>> = HashMap::new();
        for (lang, exts) in entries {
            extensions
                .entry(lang.as_ref().to_lowercase())
                .or_default()
                .extend(exts.into_iter().map(Into::into));
        }
        Self { extensions }
    }

    pub fn extensions_for(&self, language: &str) -> Option<&HashSet<String>> {
        self.extensions.get(&language.to_lowercase())
    }
}

/// Whether a file is worth showing at all: it has a name and its
/// extension is not one of the binary/generated ones.
pub fn is_valid_file(filename: &str, bad_extensions: &HashSet<String>) -> bool {
    if filename.is_empty() {
        return false;
    }
    let ext = filename.rsplit('.').next().unwrap_or_default();
    !bad_extensions.contains(ext)
}

/// Group `files` by language priority.
///
/// Groups come out ordered by descending language size (ties by name), only
/// non-empty ranked groups are returned, and exactly one "Other" group is
/// appended last. A filename is placed at most once.
pub fn group_by_language(
    stats: &LanguageStats,
    files: Vec<FileChange>,
    table: &LanguageTable,
    bad_extensions: &HashSet<String>,
) -> Vec<LanguageGroup> {
    let mut seen: HashSet<String> = HashSet::new();
    let valid = files.into_iter().filter(|f| {
        if !is_valid_file(&f.filename, bad_extensions) {
            debug!(file = %f.filename, "Skipping file with unsupported extension");
            return false;
        }
        if !seen.insert(f.filename.clone()) {
            debug!(file = %f.filename, "Skipping duplicate file entry");
            return false;
        }
        true
    });

    if stats.is_empty() {
        return vec![LanguageGroup::other(valid.collect())];
    }

    let ranked = rank_languages(stats);
    let ranked_sets: Vec<Option<&HashSet<String>>> =
        ranked.iter().map(|lang| table.extensions_for(lang)).collect();

    let mut buckets: Vec<Vec<FileChange>> = vec![Vec::new(); ranked.len()];
    let mut rest = Vec::new();

    for file in valid {
        let ext = file.extension();
        match ranked_sets
            .iter()
            .position(|set| set.is_some_and(|s| s.contains(&ext)))
        {
            Some(idx) => buckets[idx].push(file),
            None => rest.push(file),
        }
    }

    let mut groups: Vec<LanguageGroup> = ranked
        .into_iter()
        .zip(buckets)
        .filter(|(_, files)| !files.is_empty())
        .map(|(name, files)| LanguageGroup {
            name: name.to_string(),
            files,
        })
        .collect();
    groups.push(LanguageGroup::other(rest));
    groups
}

/// Language names by descending size, ties broken by name.
fn rank_languages(stats: &LanguageStats) -> Vec<&str> {
    let mut ranked: Vec<(&String, &u64)> = stats.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(name, _)| name.as_str()).collect()
}

/// Extension ↔ language pairs that identify a main language.
const KNOWN_PAIRS: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("go", "go"),
    ("java", "java"),
    ("c", "c"),
    ("cpp", "c++"),
    ("cs", "c#"),
    ("swift", "swift"),
    ("php", "php"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("scala", "scala"),
    ("kt", "kotlin"),
    ("pl", "perl"),
];

/// The merge request's main language, lower-cased.
///
/// The repository's largest language is reported only when the most common
/// extension among the changed files agrees with it; a docs-only change in
/// a Rust repository has no main language.
pub fn main_language<S: AsRef<str>>(stats: &LanguageStats, filenames: &[S]) -> Option<String> {
    let top = rank_languages(stats).first()?.to_lowercase();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in filenames.iter().map(AsRef::as_ref).filter(|n| !n.is_empty()) {
        let ext = name.rsplit('.').next().unwrap_or_default();
        *counts.entry(ext).or_default() += 1;
    }
    let (ext, _) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))?;

    let agrees = ext == top || KNOWN_PAIRS.iter().any(|(e, l)| *e == ext && *l == top);
    agrees.then_some(top)
}
