use std::fmt::{Display, Formatter};
use std::ops::Deref;

use crate::firestore::error::{invalid_argument, FirestoreResult};

/// Slash-delimited path to a collection or a document.
///
/// Odd lengths address collections, even lengths address documents. The
/// empty path is the database root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `users/u1/posts`. Leading and trailing slashes are ignored;
    /// `a//b` is rejected.
    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid_argument(format!(
                "Path '{path}' contains an empty segment"
            )));
        }
        Ok(Self::from_segments(segments))
    }

    pub fn child<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_segments(
            self.segments
                .iter()
                .cloned()
                .chain(segments.into_iter().map(Into::into)),
        )
    }

    pub fn without_last(&self) -> Self {
        let keep = self.segments.len().saturating_sub(1);
        Self::from_segments(self.segments[..keep].iter().cloned())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

impl Deref for ResourcePath {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders() {
        let path = ResourcePath::from_string("/users/u1/posts/p1/").unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.last_segment(), Some("p1"));
        assert_eq!(path.to_string(), "users/u1/posts/p1");
        assert_eq!(path.without_last().to_string(), "users/u1/posts");
        assert!(ResourcePath::from_string("  ").unwrap().is_empty());
    }

    #[test]
    fn rejects_empty_segments() {
        let err = ResourcePath::from_string("users//u1").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn child_extends_prefix() {
        let parent = ResourcePath::from_string("users/u1").unwrap();
        let child = parent.child(["posts", "p1"]);
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
        assert!(ResourcePath::root().without_last().is_empty());
    }
}
