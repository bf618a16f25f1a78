//! Durable per-file identity: GUID, audio checksum and creation timestamp.
//!
//! The resolver reads what a file already carries, fills in whatever is
//! missing and, when asked to, persists the result back into the file's tag.

mod guid;
mod resolver;

use std::path::PathBuf;

use thiserror::Error;

use crate::tags::TagError;

pub use guid::{is_canonical_guid, new_guid, normalize_checksum, normalize_guid};
pub use resolver::{Identity, IdentityResolver};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("cannot read {path}: {source}")]
    Unreadable { path: PathBuf, source: TagError },

    #[error("cannot write {path}: {source}")]
    WriteFailed { path: PathBuf, source: TagError },

    #[error("invalid GUID {0:?}")]
    InvalidGuid(String),
}
