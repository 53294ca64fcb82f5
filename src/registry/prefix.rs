//! Mount prefix normalization and matching
//!
//! A prefix always starts with `/`, never ends with `/` or a `*` wildcard
//! marker, and the root prefix is `/`. Matching respects segment boundaries:
//! `/files` matches `/files` and `/files/a.txt`, but not `/filesystem`.

use std::fmt;

use super::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix(String);

impl Prefix {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix('*').unwrap_or(trimmed);
        let trimmed = trimmed.trim_matches('/');

        if let Some(c) = trimmed.chars().find(|c| matches!(c, '?' | '#' | '*' | '\\' | '\0')) {
            return Err(RegistryError::InvalidPrefix {
                prefix: raw.to_string(),
                reason: format!("contains {c:?}"),
            });
        }
        if !trimmed.is_empty() && trimmed.split('/').any(|s| matches!(s, "" | "." | "..")) {
            return Err(RegistryError::InvalidPrefix {
                prefix: raw.to_string(),
                reason: "empty or dot segment".to_string(),
            });
        }

        Ok(Self(format!("/{trimmed}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Number of bytes matched, used to rank candidates
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Store-relative remainder of `path` when this prefix matches it
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.is_root() {
            return path.strip_prefix('/');
        }
        let rest = path.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Prefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(Prefix::parse("/files").unwrap().as_str(), "/files");
        assert_eq!(Prefix::parse("/files/").unwrap().as_str(), "/files");
        assert_eq!(Prefix::parse("/files/*").unwrap().as_str(), "/files");
        assert_eq!(Prefix::parse("files").unwrap().as_str(), "/files");
        assert_eq!(Prefix::parse("/a/b").unwrap().as_str(), "/a/b");
    }

    #[test]
    fn test_parse_root() {
        for raw in ["", "/", "*", "/*", " / "] {
            let p = Prefix::parse(raw).unwrap();
            assert!(p.is_root(), "{raw:?} should be root");
        }
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(Prefix::parse("/a//b").is_err());
        assert!(Prefix::parse("/a/../b").is_err());
        assert!(Prefix::parse("/a/./b").is_err());
        assert!(Prefix::parse("/a?x=1").is_err());
        assert!(Prefix::parse("/a*/b").is_err());
    }

    #[test]
    fn test_strip_respects_segment_boundary() {
        let p = Prefix::parse("/files").unwrap();
        assert_eq!(p.strip("/files"), Some(""));
        assert_eq!(p.strip("/files/"), Some(""));
        assert_eq!(p.strip("/files/a.txt"), Some("a.txt"));
        assert_eq!(p.strip("/files/a/b"), Some("a/b"));
        assert_eq!(p.strip("/filesystem/a"), None);
        assert_eq!(p.strip("/other/a"), None);
    }

    #[test]
    fn test_root_strips_everything() {
        let p = Prefix::parse("/").unwrap();
        assert_eq!(p.strip("/a.txt"), Some("a.txt"));
        assert_eq!(p.strip("/"), Some(""));
    }
}
