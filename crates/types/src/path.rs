//! Block path validation and normalisation.

use std::fmt;
use std::str::FromStr;

/// Maximum number of segments a block path may contain.
pub const MAX_PATH_DEPTH: usize = 10;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Errors raised while validating a block path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path is unsafe or malformed (traversal, absolute, null byte)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The path has more segments than [`MAX_PATH_DEPTH`]
    #[error("Path too deep: {depth} segments (maximum {max})")]
    PathTooDeep { depth: usize, max: usize },
}

/// A validated, normalised block path.
///
/// Paths are relative and slash-delimited (`a/b/c`). The empty path is the root of the
/// store. Construction goes through [`BlockPath::parse`], which:
///
/// - rejects null bytes and absolute paths (leading `/`)
/// - removes `.` segments and redundant separators
/// - resolves `..` lexically, rejecting the path if any `..` survives cleaning
/// - rejects paths deeper than [`MAX_PATH_DEPTH`] segments
///
/// Ordering is lexical on the cleaned string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockPath(String);

impl BlockPath {
    /// Returns the root path (the empty path).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Validates and normalises a raw path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPath`] for null bytes, absolute paths and paths that
    /// escape the root, and [`PathError::PathTooDeep`] for paths with more than
    /// [`MAX_PATH_DEPTH`] segments.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, PathError> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Ok(Self::root());
        }

        if raw.contains('\0') {
            return Err(PathError::InvalidPath("path contains a null byte".into()));
        }

        if raw.starts_with(SEPARATOR) {
            return Err(PathError::InvalidPath(format!(
                "absolute paths are not allowed: {raw}"
            )));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(last) if *last != ".." => {
                        segments.pop();
                    }
                    _ => segments.push(".."),
                },
                other => segments.push(other),
            }
        }

        if segments.contains(&"..") {
            return Err(PathError::InvalidPath(format!(
                "path escapes the root: {raw}"
            )));
        }

        if segments.len() > MAX_PATH_DEPTH {
            return Err(PathError::PathTooDeep {
                depth: segments.len(),
                max: MAX_PATH_DEPTH,
            });
        }

        Ok(Self(segments.join("/")))
    }

    /// Returns the cleaned path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the root (empty) path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the path segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments in the path.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Returns the last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Returns the lexical parent: the path with its last segment removed.
    ///
    /// A single-segment path has the root as its parent; the root has no parent.
    pub fn parent(&self) -> Option<BlockPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
            None => Some(Self::root()),
        }
    }

    /// Iterates over the ancestors of this path, nearest first, excluding the root.
    pub fn ancestors(&self) -> impl Iterator<Item = BlockPath> {
        std::iter::successors(self.parent(), BlockPath::parent).filter(|p| !p.is_root())
    }

    /// Appends a single segment to this path.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] if `name` contains a separator, is `.`/`..`, or the
    /// resulting path would be too deep.
    pub fn child(&self, name: &str) -> Result<BlockPath, PathError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(SEPARATOR) {
            return Err(PathError::InvalidPath(format!(
                "invalid path segment: {name:?}"
            )));
        }
        if self.is_root() {
            Self::parse(name)
        } else {
            Self::parse(format!("{}{}{}", self.0, SEPARATOR, name))
        }
    }

    /// Returns `true` when `other` is nested strictly beneath this path.
    ///
    /// The root is an ancestor of every other path.
    pub fn is_ancestor_of(&self, other: &BlockPath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BlockPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for BlockPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for BlockPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for BlockPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BlockPath::parse(&s).map_err(serde::de::Error::custom)
    }
}
