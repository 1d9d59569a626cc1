//! Generated files and the insertion-ordered [`FileSet`] accumulator.
//!
//! The model names files itself, so every path goes through
//! [`sanitize_path`] before it is stored: generated projects are later served
//! over HTTP and written to disk by the CLI, and a path like `../../etc/x`
//! must never make it that far.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One file produced by a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Path → content mapping that remembers first-insertion order.
///
/// Re-inserting an existing path replaces its content in place (last write
/// wins) without moving it to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet {
    entries: IndexMap<String, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a file. Returns the previous content, if any.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.entries.insert(path.into(), content.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(path, content)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Total content size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(String::len).sum()
    }

    /// Snapshot as a list of [`GeneratedFile`]s in insertion order.
    pub fn to_generated(&self) -> Vec<GeneratedFile> {
        self.iter()
            .map(|(path, content)| GeneratedFile {
                path: path.to_string(),
                content: content.to_string(),
            })
            .collect()
    }

    /// Render every file as a fenced listing, used to give the model full
    /// context in update mode.
    pub fn render_listing(&self) -> String {
        let mut out = String::new();
        for (path, content) in self.iter() {
            out.push_str(&format!("--- FILE: {path} ---\n{content}\n--- END FILE ---\n\n"));
        }
        out
    }
}

impl FromIterator<GeneratedFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = GeneratedFile>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for file in iter {
            set.insert(file.path, file.content);
        }
        set
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for (path, content) in iter {
            set.insert(path, content);
        }
        set
    }
}

/// Normalize a model-supplied relative path, or explain why it is refused.
///
/// Accepts `a/b.css` and `./a/b.css` (normalized to `a/b.css`). Refuses
/// empty paths, absolute paths, backslashes, drive prefixes, `..` segments,
/// empty segments (`a//b`), and control characters.
pub fn sanitize_path(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("path is empty".into());
    }
    if trimmed.chars().any(char::is_control) {
        return Err(format!("path {raw:?} contains control characters"));
    }
    if trimmed.contains('\\') {
        return Err(format!("path {raw:?} must use forward slashes"));
    }
    if trimmed.starts_with('/') {
        return Err(format!("path {raw:?} must be relative"));
    }
    if trimmed.len() >= 2 && trimmed.as_bytes()[1] == b':' {
        return Err(format!("path {raw:?} must not carry a drive prefix"));
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "." => continue,
            ".." => return Err(format!("path {raw:?} escapes the project root")),
            "" => return Err(format!("path {raw:?} contains an empty segment")),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(format!("path {raw:?} names no file"));
    }
    Ok(segments.join("/"))
}
