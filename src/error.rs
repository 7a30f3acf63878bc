//! # Error Types
//!
//! All operations return [`Result<T, DecryptError>`](DecryptError). The variants
//! keep three failure families apart: a wrong key, corrupt data, and
//! disk or I/O problems.

use std::path::PathBuf;
use thiserror::Error;

/// The error type for all decryption operations.
#[derive(Error, Debug)]
pub enum DecryptError {
    /// The raw key does not decode to exactly 32 bytes.
    ///
    /// Raised before any file is touched.
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The raw key has the right length but is not valid hexadecimal.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The input container does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input is not an encrypted container (too short to carry a salt,
    /// or already a plaintext database).
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// Page 0 failed its authentication check.
    ///
    /// This is the "wrong key" case; the whole job is aborted without
    /// touching further pages.
    #[error("key validation failed: page 0 authentication tag mismatch")]
    KeyValidationFailed,

    /// A page after page 0 failed its authentication check.
    #[error("page {0} is corrupt: authentication tag mismatch")]
    PageCorrupt(u32),

    /// Writing or persisting the reconstructed container failed.
    #[error("failed to write output: {0}")]
    OutputWriteFailed(#[source] std::io::Error),

    /// I/O error while reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cryptographic primitive rejected its parameters.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// The job was cancelled before it finished.
    #[error("job cancelled")]
    Cancelled,

    /// The worker thread ended without reporting a result.
    #[error("worker error: {0}")]
    Worker(String),

    /// Registering or unregistering the interception VFS failed.
    #[cfg(feature = "live")]
    #[error("VFS error: {0}")]
    Vfs(String),

    /// SQLite rejected an operation on a live connection.
    #[cfg(feature = "live")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl DecryptError {
    /// `true` when the failure means the supplied key does not fit the file.
    pub fn is_wrong_key(&self) -> bool {
        matches!(self, DecryptError::KeyValidationFailed)
    }

    /// Page index associated with the failure, if any.
    pub fn page_index(&self) -> Option<u32> {
        match self {
            DecryptError::PageCorrupt(index) => Some(*index),
            DecryptError::KeyValidationFailed => Some(0),
            _ => None,
        }
    }
}
