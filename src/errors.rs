//! Crate-wide error type.
//!
//! The core recovers nothing: every failure is reported to the caller as one
//! of these variants. Filesystem errors travel through `Io` verbatim so
//! callers can still match on `std::io::ErrorKind`.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Format errors
    #[error("invalid hex length {0}")]
    InvalidHexLength(usize),

    #[error("invalid hex character {0:?}")]
    InvalidHexCharacter(char),

    #[error("invalid buffer length {0}")]
    InvalidBufferLength(usize),

    #[error("invalid format")]
    InvalidFormat,

    #[error("invalid index signature")]
    InvalidSignature,

    #[error("unsupported index version {0}")]
    UnsupportedVersion(u32),

    #[error("index checksum mismatch")]
    InvalidChecksum,

    #[error("malformed commit object")]
    InvalidCommitFormat,

    #[error("malformed tag object")]
    InvalidTagFormat,

    #[error("object header is missing its NUL terminator")]
    MissingHeader,

    #[error("malformed object header")]
    MalformedHeader,

    #[error("unexpected end of file")]
    UnexpectedEndOfFile,

    #[error("object header carries a bad length field")]
    BadLength,

    #[error("object length does not match its header")]
    LengthMismatch,

    // Semantic errors
    #[error("invalid object type {0:?}")]
    InvalidType(String),

    #[error("unknown object type {0:?}")]
    UnknownType(String),

    #[error("unknown index extension {0:?}")]
    UnknownExtension(String),

    #[error("object type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("object id mismatch: expected {expected}, computed {computed}")]
    ObjectIdMismatch { expected: String, computed: String },

    #[error("invalid object")]
    InvalidObject,

    // Resource errors
    #[error("not a git repository (or any of the parent directories)")]
    GitDirNotFound,

    #[error("this operation must be run in a work tree")]
    MissingWorktree,

    #[error("environment variable {0} is set but empty")]
    EmptyValue(String),

    #[error("object exceeds the maximum supported size ({0} bytes)")]
    ObjectTooLarge(u64),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }
}
