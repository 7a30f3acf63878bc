//! src/kdf/keys.rs
//! Two-stage page key derivation

use crate::aliases::{Aes256Key32, MacKey32, RawKey32, Salt16};
use crate::consts::{
    DEFAULT_KDF_ITERATIONS, DEFAULT_MAC_KDF_ITERATIONS, KEY_SIZE, MAC_SALT_MASK, SALT_SIZE,
};
use crate::error::DecryptError;
use crate::kdf::pbkdf2::derive_pbkdf2_key;
use std::fmt;

/// Iteration counts for the two PBKDF2 stages.
///
/// [`Default`] is the container format's fixed parameter set; anything else
/// only makes sense for fixtures and benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
    pub mac_iterations: u32,
}

impl KdfParams {
    #[must_use]
    pub const fn new(iterations: u32, mac_iterations: u32) -> Self {
        Self {
            iterations,
            mac_iterations,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(DEFAULT_KDF_ITERATIONS, DEFAULT_MAC_KDF_ITERATIONS)
    }
}

/// The derived (encryption key, authentication key) pair for one container.
///
/// Immutable once built. Both keys live in secure-gate buffers and are wiped
/// when the context is dropped.
pub struct KeyContext {
    enc_key: Aes256Key32,
    mac_key: MacKey32,
}

impl KeyContext {
    /// Wrap keys that were derived elsewhere (e.g. handed over as hex by a
    /// key provider that already ran the KDF).
    #[must_use]
    pub fn from_parts(enc_key: Aes256Key32, mac_key: MacKey32) -> Self {
        Self { enc_key, mac_key }
    }

    #[inline(always)]
    pub fn enc_key(&self) -> &Aes256Key32 {
        &self.enc_key
    }

    #[inline(always)]
    pub fn mac_key(&self) -> &MacKey32 {
        &self.mac_key
    }
}

impl fmt::Debug for KeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyContext")
            .field("enc_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}

/// Salt for the second stage: every salt byte XOR `0x3a`.
#[inline]
pub fn mac_salt(salt: &Salt16) -> Salt16 {
    let mut out = Salt16::new([0u8; SALT_SIZE]);
    for (dst, src) in out.expose_secret_mut().iter_mut().zip(salt.expose_secret()) {
        *dst = src ^ MAC_SALT_MASK;
    }
    out
}

/// Derive the page keys for a container.
///
/// - `enc_key = PBKDF2-HMAC-SHA512(raw_key, salt, params.iterations)`
/// - `mac_key = PBKDF2-HMAC-SHA512(enc_key, salt ^ 0x3a, params.mac_iterations)`
///
/// Pure: the same inputs always give the same keys.
pub fn derive_keys(
    raw_key: &RawKey32,
    salt: &Salt16,
    params: &KdfParams,
) -> Result<KeyContext, DecryptError> {
    let mut enc_key = Aes256Key32::new([0u8; KEY_SIZE]);
    derive_pbkdf2_key(
        raw_key.expose_secret(),
        salt.expose_secret(),
        params.iterations,
        enc_key.expose_secret_mut(),
    )?;

    let mut mac_key = MacKey32::new([0u8; KEY_SIZE]);
    derive_pbkdf2_key(
        enc_key.expose_secret(),
        mac_salt(salt).expose_secret(),
        params.mac_iterations,
        mac_key.expose_secret_mut(),
    )?;

    Ok(KeyContext { enc_key, mac_key })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams::new(8, 2);

    #[test]
    fn mac_salt_masks_every_byte() {
        let salt = Salt16::new(core::array::from_fn(|i| i as u8));
        let masked = mac_salt(&salt);
        for (i, b) in masked.expose_secret().iter().enumerate() {
            assert_eq!(*b, (i as u8) ^ 0x3a);
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let raw = RawKey32::new([0x42; 32]);
        let salt = Salt16::new([0x11; 16]);

        let a = derive_keys(&raw, &salt, &FAST).unwrap();
        let b = derive_keys(&raw, &salt, &FAST).unwrap();
        assert_eq!(a.enc_key().expose_secret(), b.enc_key().expose_secret());
        assert_eq!(a.mac_key().expose_secret(), b.mac_key().expose_secret());
    }

    #[test]
    fn mac_key_is_cascaded_from_enc_key() {
        let raw = RawKey32::new([0x42; 32]);
        let salt = Salt16::new([0x11; 16]);
        let keys = derive_keys(&raw, &salt, &FAST).unwrap();

        let mut expected = [0u8; 32];
        derive_pbkdf2_key(
            keys.enc_key().expose_secret(),
            &[0x11 ^ 0x3a; 16],
            FAST.mac_iterations,
            &mut expected,
        )
        .unwrap();
        assert_eq!(keys.mac_key().expose_secret(), &expected);
        assert_ne!(keys.enc_key().expose_secret(), keys.mac_key().expose_secret());
    }

    #[test]
    fn salt_changes_both_keys() {
        let raw = RawKey32::new([0x42; 32]);
        let a = derive_keys(&raw, &Salt16::new([0x11; 16]), &FAST).unwrap();
        let b = derive_keys(&raw, &Salt16::new([0x12; 16]), &FAST).unwrap();
        assert_ne!(a.enc_key().expose_secret(), b.enc_key().expose_secret());
        assert_ne!(a.mac_key().expose_secret(), b.mac_key().expose_secret());
    }

    #[test]
    fn zero_iterations_rejected() {
        let raw = RawKey32::new([0x42; 32]);
        let salt = Salt16::new([0x11; 16]);
        let err = derive_keys(&raw, &salt, &KdfParams::new(0, 2)).unwrap_err();
        assert!(matches!(err, DecryptError::Crypto(_)));
    }

    /// Reference values from an independent PBKDF2-HMAC-SHA512 implementation,
    /// both stages at the production iteration counts.
    #[test]
    fn known_answer_at_default_params() {
        let raw = RawKey32::new(core::array::from_fn(|i| i as u8));
        let salt = Salt16::new([0x9e; 16]);
        let keys = derive_keys(&raw, &salt, &KdfParams::default()).unwrap();

        assert_eq!(
            hex::encode(keys.enc_key().expose_secret()),
            "b37999d76f70c71d7461666ea28e23e48aa52816f8d4b926961b82e6fb7c7c1a"
        );
        assert_eq!(
            hex::encode(keys.mac_key().expose_secret()),
            "6af7179ef8e6f35ea645e46dafed5ce70994688c4b6a5d42df04f7c16d5dba3f"
        );
    }

    #[test]
    fn default_params_match_container_format() {
        assert_eq!(KdfParams::default(), KdfParams::new(256_000, 2));
    }

    #[test]
    fn debug_output_is_redacted() {
        let keys = KeyContext::from_parts(Aes256Key32::new([7; 32]), MacKey32::new([9; 32]));
        let dbg = format!("{keys:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("7, 7"));
    }
}
