//! Volatile, in-memory block manager.
//!
//! Blocks live in a sharded concurrent map keyed by path. There are no real
//! directories, so `set` synthesises a directory marker for every missing ancestor;
//! `list` then finds children by comparing each key's lexical parent with the queried
//! path.
//!
//! Single-key operations are atomic. Multi-step operations are not: the ancestor walk
//! in `set` and the descendant sweep in `delete` interleave freely with concurrent
//! callers, and a concurrent `list` may observe a partially synthesised ancestor chain.

use crate::{Block, BlockError, BlockManager, BlockReference, BlockResult};
use blocks_types::{BlockPath, ContentType};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryBlockManager {
    blocks: DashMap<BlockPath, Block>,
}

impl InMemoryBlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, directory markers included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockManager for InMemoryBlockManager {
    fn get(&self, path: &BlockPath, with_content: bool) -> BlockResult<Block> {
        let block = self
            .blocks
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlockError::not_found(path))?;

        Ok(if with_content {
            block
        } else {
            block.without_content()
        })
    }

    fn set(
        &self,
        path: &BlockPath,
        content: &[u8],
        content_type: &ContentType,
    ) -> BlockResult<()> {
        self.blocks.insert(
            path.clone(),
            Block::new(path.clone(), content.to_vec(), content_type),
        );

        // Existing ancestors, real blocks or markers, are left untouched.
        for ancestor in path.ancestors() {
            self.blocks
                .entry(ancestor.clone())
                .or_insert_with(|| Block::directory(ancestor));
        }

        tracing::debug!(%path, size = content.len(), "stored block");
        Ok(())
    }

    fn delete(&self, path: &BlockPath) -> BlockResult<()> {
        if path.is_root() {
            self.blocks.clear();
        } else {
            self.blocks.remove(path);
            self.blocks.retain(|key, _| !path.is_ancestor_of(key));
        }

        tracing::debug!(%path, "deleted block tree");
        Ok(())
    }

    fn list(&self, path: &BlockPath) -> BlockResult<Vec<BlockReference>> {
        if !path.is_root() && !self.blocks.contains_key(path) {
            return Err(BlockError::not_found(path));
        }

        let mut references: Vec<BlockReference> = self
            .blocks
            .iter()
            .filter(|entry| entry.key().parent().as_ref() == Some(path))
            .map(|entry| BlockReference::from(entry.key().clone()))
            .collect();

        references.sort();
        Ok(references)
    }
}
