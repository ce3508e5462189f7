//! File storage backends used by the filesystem tools.
//!
//! A backend only has to provide storage primitives; reading with line
//! numbers, create-only writes, exact string edits and globbing are shared
//! default methods so every backend behaves the same way towards the model.

mod filesystem;
mod memory;

pub use filesystem::FilesystemBackend;
pub use memory::InMemoryBackend;

use globset::GlobBuilder;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_READ_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("File '{0}' not found")]
    NotFound(String),

    #[error("Cannot write to {0} because it already exists. Read and then make an edit, or write to a new path.")]
    AlreadyExists(String),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("String not found in file '{path}': '{needle}'")]
    StringNotFound { path: String, needle: String },

    #[error("String appears {occurrences} times in file '{path}'. Use replace_all=true to replace all instances, or provide a more specific string with surrounding context.")]
    AmbiguousMatch { path: String, occurrences: usize },

    #[error("old_string must not be empty")]
    EmptyPattern,

    #[error("Line offset {offset} exceeds file length ({lines} lines)")]
    OffsetOutOfRange { offset: usize, lines: usize },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        BackendError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

pub trait Backend: Send + Sync {
    /// Direct children of `path`, sorted by path.
    fn ls(&self, path: &str) -> Result<Vec<FileInfo>, BackendError>;

    fn read_to_string(&self, path: &str) -> Result<String, BackendError>;

    fn exists(&self, path: &str) -> Result<bool, BackendError>;

    /// Creates or overwrites `path`.
    fn put(&self, path: &str, content: &str) -> Result<(), BackendError>;

    /// Every file path in the backend, in display form.
    fn file_paths(&self) -> Result<Vec<String>, BackendError>;

    /// Reads `limit` lines starting at `offset`, numbered from 1 in `cat -n` style.
    fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, BackendError> {
        let contents = self.read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok("System reminder: File exists but has empty contents".to_string());
        }

        let lines: Vec<&str> = contents.lines().collect();
        if offset >= lines.len() {
            return Err(BackendError::OffsetOutOfRange {
                offset,
                lines: lines.len(),
            });
        }

        let end = offset.saturating_add(limit).min(lines.len());
        let mut formatted = String::new();
        for (idx, line) in lines[offset..end].iter().enumerate() {
            let mut content = line.to_string();
            if content.len() > MAX_LINE_LENGTH {
                let mut truncate_at = MAX_LINE_LENGTH;
                while !content.is_char_boundary(truncate_at) {
                    truncate_at -= 1;
                }
                content.truncate(truncate_at);
            }
            formatted.push_str(&format!("{:6}\t{}\n", offset + idx + 1, content));
        }
        Ok(formatted.trim_end().to_string())
    }

    /// Creates a new file. Existing files are never overwritten.
    fn write(&self, path: &str, content: &str) -> Result<(), BackendError> {
        if self.exists(path)? {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        self.put(path, content)
    }

    /// Replaces `old` with `new` and returns the number of replacements.
    /// Without `replace_all` the match must be unique.
    fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError> {
        if old.is_empty() {
            return Err(BackendError::EmptyPattern);
        }
        let existing = self.read_to_string(path)?;
        let occurrences = existing.matches(old).count();
        if occurrences == 0 {
            return Err(BackendError::StringNotFound {
                path: path.to_string(),
                needle: old.to_string(),
            });
        }
        if occurrences > 1 && !replace_all {
            return Err(BackendError::AmbiguousMatch {
                path: path.to_string(),
                occurrences,
            });
        }

        let updated = if replace_all {
            existing.replace(old, new)
        } else {
            existing.replacen(old, new, 1)
        };
        self.put(path, &updated)?;
        Ok(occurrences)
    }

    /// File paths matching `pattern`, sorted.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let anchored = if pattern.starts_with('/') || pattern.starts_with("**") {
            pattern.to_string()
        } else {
            format!("/**/{pattern}")
        };
        let matcher = GlobBuilder::new(&anchored)
            .literal_separator(true)
            .build()
            .map_err(|err| BackendError::InvalidGlob {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            })?
            .compile_matcher();
        let mut matches: Vec<String> = self
            .file_paths()?
            .into_iter()
            .filter(|path| matcher.is_match(path.as_str()))
            .collect();
        matches.sort();
        Ok(matches)
    }
}

/// Normalizes a sandbox path to `/a/b` form. Traversal (`..`) and home
/// expansion (`~`) are rejected.
pub(crate) fn normalize_virtual_path(path: &str) -> Result<String, BackendError> {
    let trimmed = path.trim();
    if trimmed.starts_with('~') {
        return Err(BackendError::invalid_path(path, "home directory paths are not allowed"));
    }

    let mut parts = Vec::new();
    for part in trimmed.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                return Err(BackendError::invalid_path(path, "path traversal is not allowed"));
            }
            other => parts.push(other),
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_virtual_paths() {
        assert_eq!(normalize_virtual_path("notes/a.txt").unwrap(), "/notes/a.txt");
        assert_eq!(normalize_virtual_path("/notes//./a.txt").unwrap(), "/notes/a.txt");
        assert_eq!(normalize_virtual_path("/").unwrap(), "/");
        assert_eq!(normalize_virtual_path("").unwrap(), "/");
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(matches!(
            normalize_virtual_path("/../etc/passwd"),
            Err(BackendError::InvalidPath { .. })
        ));
        assert!(matches!(
            normalize_virtual_path("~/secrets"),
            Err(BackendError::InvalidPath { .. })
        ));
    }

    #[test]
    fn shared_read_numbers_lines_and_honours_offset() {
        let backend = InMemoryBackend::new();
        backend.put("/a.txt", "one\ntwo\nthree").unwrap();

        let text = backend.read("/a.txt", 1, 1).unwrap();
        assert_eq!(text, "     2\ttwo");

        let err = backend.read("/a.txt", 5, 10).unwrap_err();
        assert!(matches!(err, BackendError::OffsetOutOfRange { offset: 5, lines: 3 }));
    }

    #[test]
    fn shared_read_reports_empty_files() {
        let backend = InMemoryBackend::new();
        backend.put("/empty.txt", "  \n").unwrap();
        let text = backend.read("/empty.txt", 0, DEFAULT_READ_LIMIT).unwrap();
        assert!(text.contains("empty contents"));
    }

    #[test]
    fn shared_edit_requires_unique_match_unless_replace_all() {
        let backend = InMemoryBackend::new();
        backend.put("/a.txt", "x x").unwrap();

        let err = backend.edit("/a.txt", "x", "y", false).unwrap_err();
        assert!(matches!(err, BackendError::AmbiguousMatch { occurrences: 2, .. }));

        assert_eq!(backend.edit("/a.txt", "x", "y", true).unwrap(), 2);
        assert_eq!(backend.read_to_string("/a.txt").unwrap(), "y y");

        let err = backend.edit("/a.txt", "missing", "z", false).unwrap_err();
        assert!(matches!(err, BackendError::StringNotFound { .. }));
        assert!(matches!(
            backend.edit("/a.txt", "", "z", false),
            Err(BackendError::EmptyPattern)
        ));
    }

    #[test]
    fn shared_glob_matches_relative_and_anchored_patterns() {
        let backend = InMemoryBackend::new();
        backend.put("/src/main.rs", "").unwrap();
        backend.put("/src/lib/mod.rs", "").unwrap();
        backend.put("/README.md", "").unwrap();

        assert_eq!(
            backend.glob("*.rs").unwrap(),
            vec!["/src/lib/mod.rs".to_string(), "/src/main.rs".to_string()]
        );
        assert_eq!(backend.glob("/*.md").unwrap(), vec!["/README.md".to_string()]);
        assert!(matches!(
            backend.glob("[").unwrap_err(),
            BackendError::InvalidGlob { .. }
        ));
    }
}
