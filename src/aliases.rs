//! # Secure-Gate Type Aliases
//!
//! Every buffer that holds key material, or bytes that key material was
//! mixed into, is a [`secure_gate::Fixed`] so it is wiped on drop and can only
//! be read through an explicit `.expose_secret()`.
//!
//! ## Type Categories
//!
//! ### HMAC Primitive
//! - [`HmacSha512`] - page authentication and the PBKDF2 PRF
//!
//! ### Generic Secure Buffers
//! - [`SpanBuffer<N>`] - secure stack buffer of any size `N`
//! - [`PageBuffer`] - one full container page
//!
//! ### Dynamic Secrets
//! - [`HexKeyString`] - raw key as 64 hex characters, before decoding
//!
//! ### Fixed-Size Secrets
//! - [`RawKey32`] - raw passphrase as supplied by the key provider
//! - [`Aes256Key32`] - derived page encryption key
//! - [`MacKey32`] - derived page authentication key
//! - [`Salt16`] - per-container salt from page 0
//! - [`Iv16`] - per-page CBC initialization vector
//! - [`Block16`] - one AES block
//! - [`PageTag64`] - stored HMAC-SHA512 tag of a page

use crate::consts::PAGE_SIZE;
use secure_gate::dynamic_alias;
use secure_gate::fixed_alias;

use hmac::Hmac;
use sha2::Sha512;

pub type HmacSha512 = Hmac<Sha512>;

// ─────────────────────────────────────────────────────────────────────────────
// SpanBuffer — generic secure stack buffer (direct alias to secure-gate's Fixed)
// ─────────────────────────────────────────────────────────────────────────────
pub type SpanBuffer<const N: usize> = secure_gate::Fixed<[u8; N]>;

pub type PageBuffer = SpanBuffer<PAGE_SIZE>;
pub type Block16 = SpanBuffer<16>; // one AES block
pub type PageTag64 = SpanBuffer<64>; // trailing HMAC-SHA512 of a page

// ─────────────────────────────────────────────────────────────────────────────
// Dynamic secrets
// ─────────────────────────────────────────────────────────────────────────────
dynamic_alias!(HexKeyString, String);

// ─────────────────────────────────────────────────────────────────────────────
// Fixed-size concrete secrets — alphabetical order
// ─────────────────────────────────────────────────────────────────────────────
fixed_alias!(Aes256Key32, 32); // page cipher key
fixed_alias!(Iv16, 16); // per-page IV from the reserve region
fixed_alias!(MacKey32, 32); // page HMAC key
fixed_alias!(RawKey32, 32); // decoded 64-hex-char passphrase
fixed_alias!(Salt16, 16); // page-0 salt
