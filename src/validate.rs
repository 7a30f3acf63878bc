//! # Key Validation
//!
//! Decides whether a key fits a container by authenticating page 0 only. No
//! page is decrypted and nothing is written.

use crate::aliases::{PageBuffer, RawKey32};
use crate::consts::{PAGE_SIZE, SALT_SIZE};
use crate::decryption::read::read_page;
use crate::error::DecryptError;
use crate::header::read_salt;
use crate::kdf::{derive_keys, KdfParams, KeyContext};
use crate::page::verify_page;
use crate::utils::{decode_raw_key, is_zero_page};
use std::fs::File;
use std::path::Path;

/// `true` if `hex_key` authenticates page 0 of the container at `path`.
///
/// Every failure (malformed key, missing or short file, tag mismatch) is
/// `false`. Use [`validate_key_with`] to learn which one it was.
///
/// ```no_run
/// if wxdb_rs::validate_key("MSG0.db".as_ref(), &"00".repeat(32)) {
///     println!("key fits");
/// }
/// ```
pub fn validate_key(path: &Path, hex_key: &str) -> bool {
    validate_key_with(path, hex_key, &KdfParams::default()).is_ok()
}

/// Same check as [`validate_key`] with explicit KDF parameters and the
/// failure reason.
pub fn validate_key_with(path: &Path, hex_key: &str, params: &KdfParams) -> Result<(), DecryptError> {
    let raw_key = decode_raw_key(hex_key)?;
    load_key_context(path, &raw_key, params).map(|_| ())
}

/// Derive the keys for the container at `path` and prove them on page 0.
///
/// The returned context is ready for decrypting any page of that container.
pub fn load_key_context(
    path: &Path,
    raw_key: &RawKey32,
    params: &KdfParams,
) -> Result<KeyContext, DecryptError> {
    let page = read_first_page(path)?;
    let salt = read_salt(&page.expose_secret()[..SALT_SIZE])?;
    if is_zero_page(page.expose_secret()) {
        return Err(DecryptError::KeyValidationFailed);
    }
    let keys = derive_keys(raw_key, &salt, params)?;
    verify_page(page.expose_secret(), &keys, 0)?;

    tracing::debug!(path = %path.display(), "key validated against page 0");
    Ok(keys)
}

/// Check already-derived keys against page 0 of the container at `path`.
pub fn verify_key_context(path: &Path, keys: &KeyContext) -> Result<(), DecryptError> {
    let page = read_first_page(path)?;
    read_salt(&page.expose_secret()[..SALT_SIZE])?;
    if is_zero_page(page.expose_secret()) {
        return Err(DecryptError::KeyValidationFailed);
    }
    verify_page(page.expose_secret(), keys, 0)
}

fn read_first_page(path: &Path) -> Result<PageBuffer, DecryptError> {
    if !path.is_file() {
        return Err(DecryptError::FileNotFound(path.to_path_buf()));
    }
    let mut file = File::open(path)?;
    let mut page = PageBuffer::new([0u8; PAGE_SIZE]);
    let n = read_page(&mut file, page.expose_secret_mut())?;
    if n < SALT_SIZE {
        return Err(DecryptError::InvalidContainer(format!(
            "file is {n} bytes, shorter than the {SALT_SIZE}-byte salt"
        )));
    }
    Ok(page)
}
