//! src/kdf/pbkdf2.rs

use crate::error::DecryptError;

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha512;

/// Derive PBKDF2-HMAC-SHA512 directly into a caller-provided buffer.
///
/// The output length is the length of `out_key`; callers pass the
/// `expose_secret_mut()` view of a secure-gate buffer so the result is wiped
/// together with it.
#[inline(always)]
pub fn derive_pbkdf2_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out_key: &mut [u8],
) -> Result<(), DecryptError> {
    if iterations == 0 {
        return Err(DecryptError::Crypto("PBKDF2 iterations must be ≥1".into()));
    }

    pbkdf2::<Hmac<Sha512>>(password, salt, iterations, out_key)
        .map_err(|e| DecryptError::Crypto(format!("PBKDF2 failed: {e}")))?;
    Ok(())
}
