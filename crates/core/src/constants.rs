//! Constants used throughout the blocks core crate.
//!
//! This module contains file naming and permission constants to ensure consistency
//! between the storage backends and their configuration.

/// Name of the sidecar file holding a block's JSON envelope inside its directory.
pub const SIDECAR_FILE_NAME: &str = ".content";

/// Directory entries starting with this prefix are never listed as children.
pub const HIDDEN_FILE_PREFIX: &str = ".";

/// Type given to the directory markers synthesised by the in-memory backend.
pub const DIRECTORY_CONTENT_TYPE: &str = "directory";

/// Default base directory for the filesystem backend.
pub const DEFAULT_BASE_DIR: &str = "blocks_data";

/// Default permission bits for sidecar files (Unix only).
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default permission bits for block directories (Unix only).
pub const DEFAULT_DIR_MODE: u32 = 0o755;
