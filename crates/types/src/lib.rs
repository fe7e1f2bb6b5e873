//! # Blocks Types
//!
//! Validated input types shared by the block store crates.
//!
//! Every value of these types has already passed validation, so code that accepts a
//! [`BlockPath`] or a [`ContentType`] never has to re-check its input:
//!
//! - [`BlockPath`] is a lexically cleaned, relative, slash-delimited path of at most
//!   [`MAX_PATH_DEPTH`] segments. It can never address anything outside the store root.
//! - [`ContentType`] is a `type/subtype` MIME string (parameters allowed) that is safe to
//!   echo back in an HTTP header.
//!
//! Neither type touches the filesystem; validation is purely syntactic.

mod content_type;
mod path;

pub use content_type::{ContentType, ContentTypeError, DEFAULT_CONTENT_TYPE};
pub use path::{BlockPath, PathError, MAX_PATH_DEPTH, SEPARATOR};
