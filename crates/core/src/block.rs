//! Storage-agnostic block records.

use crate::constants::DIRECTORY_CONTENT_TYPE;
use blocks_types::{BlockPath, ContentType};
use serde::{Deserialize, Serialize};

/// The canonical record stored under a path.
///
/// `size` is always the byte length of the content at write time and stays populated
/// when the content itself is elided from a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub path: BlockPath,
    /// `None` when the caller asked for metadata only, or for directory markers
    pub content: Option<Vec<u8>>,
    pub content_type: String,
    pub size: u64,
    /// Immediate descendants; only filled in by callers that also listed the path
    pub children: Option<Vec<BlockReference>>,
}

impl Block {
    pub fn new(path: BlockPath, content: Vec<u8>, content_type: &ContentType) -> Self {
        Self {
            path,
            size: content.len() as u64,
            content: Some(content),
            content_type: content_type.as_str().to_owned(),
            children: None,
        }
    }

    /// A content-less entry standing in for an intermediate path segment.
    pub fn directory(path: BlockPath) -> Self {
        Self {
            path,
            content: None,
            content_type: DIRECTORY_CONTENT_TYPE.to_owned(),
            size: 0,
            children: None,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.content_type == DIRECTORY_CONTENT_TYPE
    }

    /// Drops the payload, keeping `size` and `content_type`.
    pub fn without_content(mut self) -> Self {
        self.content = None;
        self
    }

    pub fn with_children(mut self, children: Vec<BlockReference>) -> Self {
        self.children = Some(children);
        self
    }
}

/// A lightweight pointer to a child block, used by listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockReference {
    pub path: BlockPath,
}

impl From<BlockPath> for BlockReference {
    fn from(path: BlockPath) -> Self {
        Self { path }
    }
}

/// On-disk JSON envelope written by the filesystem backend.
///
/// `content` is base64 encoded in the JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    pub content_type: String,
    pub size: u64,
}

impl FileContent {
    pub fn new(content: Vec<u8>, content_type: &ContentType) -> Self {
        Self {
            size: content.len() as u64,
            content,
            content_type: content_type.as_str().to_owned(),
        }
    }

    pub fn into_block(self, path: BlockPath, with_content: bool) -> Block {
        Block {
            path,
            content: with_content.then_some(self.content),
            content_type: self.content_type,
            size: self.size,
            children: None,
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
