//! # Key Derivation
//!
//! Turns the raw 32-byte passphrase and the container salt into the two page
//! keys.
//!
//! ## Modules
//!
//! - [`pbkdf2`] - PBKDF2-HMAC-SHA512 into a secure output buffer
//! - [`keys`] - the two-stage cascade producing a [`KeyContext`]
//!
//! Most callers never touch this module directly: bulk jobs, key validation and
//! the live registry all derive keys on their own.

pub mod keys;
pub mod pbkdf2;

pub use keys::{derive_keys, mac_salt, KdfParams, KeyContext};
