use blocks_types::{BlockPath, ContentTypeError, PathError};
use std::io;

/// Programmatic classification of a [`BlockError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidPath,
    PathTooDeep,
    InvalidContentType,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block not found: {path}")]
    NotFound {
        path: BlockPath,
        #[source]
        source: Option<io::Error>,
    },
    #[error("access to {path} is forbidden")]
    Forbidden {
        path: BlockPath,
        #[source]
        source: io::Error,
    },
    #[error("path {path} uses the reserved name {segment}")]
    ReservedName { path: BlockPath, segment: String },
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error(transparent)]
    InvalidContentType(#[from] ContentTypeError),
    #[error("invalid base directory: {0}")]
    InvalidBaseDirectory(String),
    #[error("failed to {context} {path}: {source}")]
    Unknown {
        path: BlockPath,
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type BlockResult<T> = std::result::Result<T, BlockError>;

impl BlockError {
    pub fn not_found(path: &BlockPath) -> Self {
        Self::NotFound {
            path: path.clone(),
            source: None,
        }
    }

    /// Classifies an I/O failure raised while `context`-ing the block at `path`.
    ///
    /// `NotFound` and `PermissionDenied` keep their meaning; everything else is
    /// reported as `Unknown` with the original error attached.
    pub fn from_io(path: &BlockPath, context: &'static str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.clone(),
                source: Some(err),
            },
            io::ErrorKind::PermissionDenied => Self::Forbidden {
                path: path.clone(),
                source: err,
            },
            _ => Self::unknown(path, context, err),
        }
    }

    pub fn unknown(
        path: &BlockPath,
        context: &'static str,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unknown {
            path: path.clone(),
            context,
            source: err.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } | Self::ReservedName { .. } => ErrorKind::Forbidden,
            Self::InvalidPath(PathError::PathTooDeep { .. }) => ErrorKind::PathTooDeep,
            Self::InvalidPath(PathError::InvalidPath(_)) => ErrorKind::InvalidPath,
            Self::InvalidContentType(_) => ErrorKind::InvalidContentType,
            Self::InvalidBaseDirectory(_) | Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Storage denials and validator rejections, which callers see as "forbidden".
    pub fn is_forbidden_class(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Forbidden
                | ErrorKind::InvalidPath
                | ErrorKind::PathTooDeep
                | ErrorKind::InvalidContentType
        )
    }
}
