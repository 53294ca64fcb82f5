//! Store-relative path parsing
//!
//! Turns the tail of a request path into a list of plain segments. Empty and
//! `.` segments are dropped, `..` is rejected outright rather than collapsed,
//! so a path can never climb above the store root.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path traversal rejected")]
    Traversal,
    #[error("invalid character {0:?} in path")]
    InvalidCharacter(char),
}

/// Normalized path inside a store, `/`-separated, no leading slash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
    joined: String,
}

impl StorePath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(PathError::Traversal),
                s => {
                    if let Some(c) = s.chars().find(|c| matches!(c, '\\' | '\0')) {
                        return Err(PathError::InvalidCharacter(c));
                    }
                    segments.push(s.to_string());
                }
            }
        }
        let joined = segments.join("/");
        Ok(Self { segments, joined })
    }

    /// The store root itself (empty relative path)
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.joined
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            None
        } else {
            Some(ext)
        }
    }

    /// Join onto a filesystem root, segment by segment
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in &self.segments {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.joined)
    }
}
