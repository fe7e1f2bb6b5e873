//! Storage configuration.
//!
//! Resolved once at process startup and handed to [`crate::new_block_manager`]; the
//! selected backend is fixed for the lifetime of the process.

use crate::constants::{DEFAULT_BASE_DIR, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which block manager backend to construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    #[serde(alias = "fs")]
    Filesystem,
    #[default]
    #[serde(alias = "memory", alias = "in_memory")]
    InMemory,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => write!(f, "filesystem"),
            Self::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Backend selection plus the filesystem backend's settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: StorageKind,
    /// Base directory of the filesystem backend; ignored by the in-memory backend
    pub path: PathBuf,
    /// Permission bits applied to sidecar files
    pub file_mode: u32,
    /// Permission bits applied to directories created for blocks
    pub dir_mode: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            path: PathBuf::from(DEFAULT_BASE_DIR),
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn filesystem(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StorageKind::Filesystem,
            path: path.into(),
            ..Self::default()
        }
    }
}
