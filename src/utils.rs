//! Utility functions used across the library.

use crate::aliases::RawKey32;
use crate::consts::KEY_SIZE;
use crate::error::DecryptError;
use std::path::Path;

/// Decodes a 64-character hex key into a secure 32-byte buffer.
///
/// Surrounding whitespace is ignored. Any other length fails with
/// [`DecryptError::InvalidKeyLength`] (reported in bytes) before the hex digits
/// are even looked at.
pub fn decode_raw_key(hex_key: &str) -> Result<RawKey32, DecryptError> {
    let hex_key = hex_key.trim();
    if hex_key.len() != KEY_SIZE * 2 {
        return Err(DecryptError::InvalidKeyLength(hex_key.len() / 2));
    }

    let mut key = RawKey32::new([0u8; KEY_SIZE]);
    hex::decode_to_slice(hex_key, key.expose_secret_mut())
        .map_err(|e| DecryptError::InvalidKeyEncoding(e.to_string()))?;
    Ok(key)
}

/// XORs two 16-byte blocks and writes the result to `output`.
///
/// # Panics (by contract)
///
/// Panics if any of the slices is shorter than 16 bytes. All callers pass
/// exact AES blocks.
#[inline(always)]
pub const fn xor_blocks(block_a: &[u8], block_b: &[u8], output: &mut [u8]) {
    let mut i = 0;
    while i < 16 {
        output[i] = block_a[i] ^ block_b[i];
        i += 1;
    }
}

/// `true` if every byte of `page` is zero (the "unallocated" sentinel).
#[inline]
pub fn is_zero_page(page: &[u8]) -> bool {
    page.iter().all(|&b| b == 0)
}

/// Registry key for a database path.
///
/// Backslashes become forward slashes; on Windows the path is also
/// lower-cased since the filesystem is case-insensitive there. Existing files
/// are canonicalized first so the caller's spelling and SQLite's full
/// pathname land on the same key.
pub fn normalize_path(path: &Path) -> String {
    let resolved = match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "cannot canonicalize, using path as given");
            path.to_path_buf()
        }
    };
    let mut normalized = resolved.to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        normalized = normalized.to_lowercase();
        // canonicalize() yields verbatim paths on Windows; SQLite never does
        if let Some(stripped) = normalized.strip_prefix("//?/") {
            normalized = stripped.to_string();
        }
    }
    normalized
}
