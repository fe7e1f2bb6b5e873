//! # Blocks Core
//!
//! Storage layer of the hierarchical, path-addressed block store.
//!
//! Clients write and read opaque byte payloads ("blocks") under slash-delimited paths
//! and list the immediate children of any path. This crate contains:
//! - The [`BlockManager`] contract (`get`, `set`, `delete`, `list`)
//! - [`FsBlockManager`]: durable backend, one directory per path segment
//! - [`InMemoryBlockManager`]: volatile backend over a concurrent map
//! - [`new_block_manager`]: picks a backend from [`StorageConfig`] at startup
//! - The [`BlockError`] taxonomy shared by both backends
//!
//! **No API concerns**: HTTP routing, status codes and process wiring belong in
//! `api-rest` and the `blocks-run` binary.
//!
//! ## Example Usage
//!
//! ```
//! use blocks_core::{new_block_manager, BlockPath, ContentType, StorageConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = new_block_manager(&StorageConfig::in_memory())?;
//! let path = BlockPath::parse("notes/today")?;
//!
//! manager.set(&path, b"hello", &ContentType::parse("text/plain")?)?;
//! let block = manager.get(&path, false)?;
//! assert_eq!(block.size, 5);
//!
//! let children = manager.list(&BlockPath::parse("notes")?)?;
//! assert_eq!(children.len(), 1);
//! # Ok(())
//! # }
//! ```

mod block;
pub mod config;
pub mod constants;
mod error;
mod fs;
mod manager;
mod memory;

pub use block::{Block, BlockReference, FileContent};
pub use config::{StorageConfig, StorageKind};
pub use error::{BlockError, BlockResult, ErrorKind};
pub use fs::FsBlockManager;
pub use manager::{new_block_manager, BlockManager};
pub use memory::InMemoryBlockManager;

pub use blocks_types::{BlockPath, ContentType, ContentTypeError, PathError, MAX_PATH_DEPTH};
