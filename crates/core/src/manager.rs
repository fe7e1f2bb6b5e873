//! The block manager contract and backend selection.

use crate::config::{StorageConfig, StorageKind};
use crate::fs::FsBlockManager;
use crate::memory::InMemoryBlockManager;
use crate::{Block, BlockReference, BlockResult};
use blocks_types::{BlockPath, ContentType};
use std::fmt;
use std::sync::Arc;

/// The four-operation storage contract implemented by every backend.
///
/// Paths and content types arrive already validated, so backends never see a path that
/// could escape their root. All operations are synchronous and run to completion.
pub trait BlockManager: Send + Sync + fmt::Debug {
    /// Returns the block stored at `path`.
    ///
    /// With `with_content == false` the payload is omitted but `size` and
    /// `content_type` are still populated.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored at `path`, `Forbidden` on permission failures,
    /// `Unknown` for anything else.
    fn get(&self, path: &BlockPath, with_content: bool) -> BlockResult<Block>;

    /// Creates or fully replaces the block at `path`, making every missing ancestor
    /// listable.
    fn set(&self, path: &BlockPath, content: &[u8], content_type: &ContentType)
        -> BlockResult<()>;

    /// Removes the block at `path` and everything nested beneath it.
    ///
    /// Deleting a path that does not exist succeeds.
    fn delete(&self, path: &BlockPath) -> BlockResult<()>;

    /// Returns references to the immediate children of `path`, sorted by path.
    ///
    /// # Errors
    ///
    /// `NotFound` if `path` does not exist.
    fn list(&self, path: &BlockPath) -> BlockResult<Vec<BlockReference>>;
}

/// Constructs the backend named by `config`.
///
/// # Errors
///
/// Returns `InvalidBaseDirectory` if the filesystem backend's base directory cannot
/// be created or is not a directory.
pub fn new_block_manager(config: &StorageConfig) -> BlockResult<Arc<dyn BlockManager>> {
    let manager: Arc<dyn BlockManager> = match config.kind {
        StorageKind::Filesystem => Arc::new(FsBlockManager::from_config(config)?),
        StorageKind::InMemory => Arc::new(InMemoryBlockManager::new()),
    };
    tracing::info!(storage = %config.kind, "block manager ready");
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::TempDir;

    fn path(raw: &str) -> BlockPath {
        BlockPath::parse(raw).unwrap()
    }

    fn text_plain() -> ContentType {
        ContentType::parse("text/plain").unwrap()
    }

    /// Behaviour both backends must share.
    fn exercise_contract(manager: &dyn BlockManager) {
        let json = ContentType::parse("application/json").unwrap();

        // round trip
        manager.set(&path("a/file1"), b"one", &text_plain()).unwrap();
        let block = manager.get(&path("a/file1"), true).unwrap();
        assert_eq!(block.path, path("a/file1"));
        assert_eq!(block.content.as_deref(), Some(&b"one"[..]));
        assert_eq!(block.content_type, "text/plain");
        assert_eq!(block.size, 3);

        // metadata only
        let block = manager.get(&path("a/file1"), false).unwrap();
        assert_eq!(block.content, None);
        assert_eq!(block.size, 3);
        assert_eq!(block.content_type, "text/plain");

        // overwrite is a full replace
        manager.set(&path("a/file1"), b"{}", &json).unwrap();
        let block = manager.get(&path("a/file1"), true).unwrap();
        assert_eq!(block.content.as_deref(), Some(&b"{}"[..]));
        assert_eq!(block.content_type, "application/json");
        assert_eq!(block.size, 2);

        // listing is one level deep
        manager.set(&path("a/file2"), b"two", &text_plain()).unwrap();
        manager.set(&path("a/b/file3"), b"three", &text_plain()).unwrap();
        let children = manager.list(&path("a")).unwrap();
        let expected: Vec<BlockReference> = ["a/b", "a/file1", "a/file2"]
            .into_iter()
            .map(|p| path(p).into())
            .collect();
        assert_eq!(children, expected);

        let root_children = manager.list(&BlockPath::root()).unwrap();
        assert_eq!(root_children, vec![BlockReference::from(path("a"))]);

        // missing paths
        assert_eq!(
            manager.get(&path("nonexistent"), true).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            manager.list(&path("nonexistent")).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        // recursive, idempotent delete
        manager.delete(&path("a/b")).unwrap();
        assert_eq!(
            manager.get(&path("a/b/file3"), false).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        manager.delete(&path("a/b")).unwrap();
        manager.delete(&path("never/existed")).unwrap();

        let children = manager.list(&path("a")).unwrap();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_in_memory_backend_contract() {
        let manager = new_block_manager(&StorageConfig::in_memory()).unwrap();
        exercise_contract(manager.as_ref());
    }

    #[test]
    fn test_filesystem_backend_contract() {
        let temp = TempDir::new().unwrap();
        let manager = new_block_manager(&StorageConfig::filesystem(temp.path())).unwrap();
        exercise_contract(manager.as_ref());
    }

    #[test]
    fn test_factory_creates_missing_base_directory() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("nested").join("store");

        let manager = new_block_manager(&StorageConfig::filesystem(&base)).unwrap();
        assert!(base.is_dir());
        assert!(manager.list(&BlockPath::root()).unwrap().is_empty());
    }

    #[test]
    fn test_factory_rejects_file_as_base_directory() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("not-a-dir");
        std::fs::write(&base, "file").unwrap();

        let result = new_block_manager(&StorageConfig::filesystem(&base));
        assert!(matches!(
            result,
            Err(crate::BlockError::InvalidBaseDirectory(_))
        ));
    }
}
