//! Filesystem-backed block manager.
//!
//! # Storage Layout
//!
//! Every path segment is a real directory under the base directory, and each block's
//! payload lives in a hidden sidecar file inside its own directory:
//!
//! ```text
//! <base_dir>/
//! └── a/
//!     ├── .content      # JSON envelope for block "a" (only if "a" was written)
//!     └── b/
//!         └── .content  # JSON envelope for block "a/b"
//! ```
//!
//! Because the hierarchy is made of directories, listing needs no index: it reads the
//! directory entries, skips hidden entries (the sidecar itself) and returns one
//! reference per subdirectory. Creating the directory for a block on `set` is what
//! makes its ancestors listable; removing it on `delete` removes all descendants.
//!
//! # Concurrency
//!
//! There is no cross-call locking. Concurrent writers to the same path race (last
//! writer wins), and a `set` racing a `delete` on overlapping directories can leave a
//! partially created or partially removed tree.

use crate::block::FileContent;
use crate::config::StorageConfig;
use crate::constants::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, HIDDEN_FILE_PREFIX, SIDECAR_FILE_NAME,
};
use crate::{Block, BlockError, BlockManager, BlockReference, BlockResult};
use blocks_types::{BlockPath, ContentType};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Durable block manager storing one directory per path segment.
#[derive(Debug)]
pub struct FsBlockManager {
    /// Root directory containing all blocks
    base_dir: PathBuf,

    /// Permission bits for sidecar files
    file_mode: u32,

    /// Permission bits for created directories
    dir_mode: u32,
}

impl FsBlockManager {
    /// Creates a manager rooted at `base_dir` with the default permission bits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBaseDirectory` if `base_dir` does not exist or is not a
    /// directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> BlockResult<Self> {
        Self::with_modes(base_dir.into(), DEFAULT_FILE_MODE, DEFAULT_DIR_MODE)
    }

    /// Creates a manager from storage configuration, creating the base directory if
    /// it is missing.
    pub fn from_config(config: &StorageConfig) -> BlockResult<Self> {
        if !config.path.exists() {
            fs::create_dir_all(&config.path).map_err(|e| {
                BlockError::InvalidBaseDirectory(format!(
                    "cannot create {}: {}",
                    config.path.display(),
                    e
                ))
            })?;
        }
        Self::with_modes(config.path.clone(), config.file_mode, config.dir_mode)
    }

    fn with_modes(base_dir: PathBuf, file_mode: u32, dir_mode: u32) -> BlockResult<Self> {
        if !base_dir.exists() {
            return Err(BlockError::InvalidBaseDirectory(format!(
                "Directory does not exist: {}",
                base_dir.display()
            )));
        }

        if !base_dir.is_dir() {
            return Err(BlockError::InvalidBaseDirectory(format!(
                "Path is not a directory: {}",
                base_dir.display()
            )));
        }

        tracing::debug!(base_dir = %base_dir.display(), "filesystem block manager opened");

        Ok(Self {
            base_dir,
            file_mode,
            dir_mode,
        })
    }

    /// Directory backing `path`; the root maps to the base directory itself.
    ///
    /// A segment named like the sidecar file would resolve onto another block's
    /// payload, so such paths are refused before the filesystem is touched.
    fn block_dir(&self, path: &BlockPath) -> BlockResult<PathBuf> {
        if let Some(segment) = path.segments().find(|s| *s == SIDECAR_FILE_NAME) {
            return Err(log_failure(BlockError::ReservedName {
                path: path.clone(),
                segment: segment.to_owned(),
            }));
        }
        Ok(path
            .segments()
            .fold(self.base_dir.clone(), |dir, segment| dir.join(segment)))
    }

    fn sidecar_path(&self, path: &BlockPath) -> BlockResult<PathBuf> {
        Ok(self.block_dir(path)?.join(SIDECAR_FILE_NAME))
    }

    fn create_block_dir(&self, dir: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }
        builder.create(dir)
    }

    fn write_sidecar(&self, file: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut handle = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(file)?;
        handle.write_all(bytes)?;
        handle.sync_all()?;

        // `mode` on open only applies to new files and is masked by the umask.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(file, fs::Permissions::from_mode(self.file_mode))?;
        }
        Ok(())
    }

    /// Removes everything inside the base directory but keeps the directory.
    fn clear_base_dir(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let result = if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())
            } else {
                fs::remove_file(entry.path())
            };
            match result {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

fn log_failure(err: BlockError) -> BlockError {
    if !matches!(err, BlockError::NotFound { .. }) {
        tracing::warn!(error = %err, "filesystem block operation failed");
    }
    err
}

impl BlockManager for FsBlockManager {
    fn get(&self, path: &BlockPath, with_content: bool) -> BlockResult<Block> {
        let sidecar = self.sidecar_path(path)?;
        let bytes = fs::read(&sidecar)
            .map_err(|e| log_failure(BlockError::from_io(path, "read", e)))?;

        let envelope: FileContent = serde_json::from_slice(&bytes)
            .map_err(|e| log_failure(BlockError::unknown(path, "decode", e)))?;

        tracing::debug!(%path, size = envelope.size, with_content, "read block");
        Ok(envelope.into_block(path.clone(), with_content))
    }

    fn set(
        &self,
        path: &BlockPath,
        content: &[u8],
        content_type: &ContentType,
    ) -> BlockResult<()> {
        let dir = self.block_dir(path)?;
        self.create_block_dir(&dir).map_err(|e| {
            log_failure(match e.kind() {
                io::ErrorKind::PermissionDenied => BlockError::from_io(path, "create", e),
                _ => BlockError::unknown(path, "create directory for", e),
            })
        })?;

        let envelope = FileContent::new(content.to_vec(), content_type);
        let json = serde_json::to_vec(&envelope)
            .map_err(|e| log_failure(BlockError::unknown(path, "encode", e)))?;

        self.write_sidecar(&dir.join(SIDECAR_FILE_NAME), &json)
            .map_err(|e| {
                log_failure(match e.kind() {
                    io::ErrorKind::PermissionDenied => BlockError::from_io(path, "write", e),
                    _ => BlockError::unknown(path, "write", e),
                })
            })?;

        tracing::debug!(%path, size = envelope.size, content_type = %content_type, "wrote block");
        Ok(())
    }

    fn delete(&self, path: &BlockPath) -> BlockResult<()> {
        let dir = self.block_dir(path)?;
        let result = if path.is_root() {
            self.clear_base_dir()
        } else {
            fs::remove_dir_all(dir)
        };

        match result {
            Ok(()) => {
                tracing::debug!(%path, "deleted block tree");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(log_failure(BlockError::from_io(path, "delete", e)))
            }
            Err(e) => Err(log_failure(BlockError::unknown(path, "delete", e))),
        }
    }

    fn list(&self, path: &BlockPath) -> BlockResult<Vec<BlockReference>> {
        let entries = fs::read_dir(self.block_dir(path)?)
            .map_err(|e| log_failure(BlockError::from_io(path, "list", e)))?;

        let mut references = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| log_failure(BlockError::from_io(path, "list", e)))?;

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                tracing::warn!(%path, entry = ?file_name, "skipping non UTF-8 directory entry");
                continue;
            };
            if name.starts_with(HIDDEN_FILE_PREFIX) {
                continue;
            }

            let is_dir = entry
                .file_type()
                .map_err(|e| log_failure(BlockError::from_io(path, "list", e)))?
                .is_dir();
            if !is_dir {
                continue;
            }

            match path.child(name) {
                Ok(child) => references.push(BlockReference::from(child)),
                Err(e) => {
                    tracing::warn!(%path, entry = name, error = %e, "skipping unaddressable directory");
                }
            }
        }

        references.sort();
        tracing::debug!(%path, children = references.len(), "listed block");
        Ok(references)
    }
}
