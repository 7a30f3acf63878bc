//! # Constants
//!
//! Page geometry, KDF parameters and the plaintext container magic.

/// Size of one container page, encrypted or plaintext.
pub const PAGE_SIZE: usize = 4096;

/// Salt prefix carried by page 0 of an encrypted container.
pub const SALT_SIZE: usize = 16;

/// CBC initialization vector stored at the start of each reserve region.
pub const IV_SIZE: usize = 16;

/// HMAC-SHA512 tag stored after the IV.
pub const HMAC_SIZE: usize = 64;

/// Trailing bytes of every page that are never encrypted (IV + tag).
pub const RESERVE_SIZE: usize = 80;

/// Offset of the reserve region (and of the IV) inside a page.
pub const RESERVE_OFFSET: usize = PAGE_SIZE - RESERVE_SIZE;

/// Offset of the stored tag inside a page.
pub const HMAC_OFFSET: usize = RESERVE_OFFSET + IV_SIZE;

/// AES block size.
pub const BLOCK_SIZE: usize = 16;

/// Derived key length for both the cipher and the MAC key.
pub const KEY_SIZE: usize = 32;

/// PBKDF2-HMAC-SHA512 rounds for the page encryption key.
pub const DEFAULT_KDF_ITERATIONS: u32 = 256_000;

/// PBKDF2-HMAC-SHA512 rounds for the MAC key (derived from the encryption key).
pub const DEFAULT_MAC_KDF_ITERATIONS: u32 = 2;

/// Byte mask applied to the salt before deriving the MAC key.
pub const MAC_SALT_MASK: u8 = 0x3a;

/// Literal header of a plaintext SQLite 3 database; replaces the salt on page 0.
pub const SQLITE_HEADER: &[u8; SALT_SIZE] = b"SQLite format 3\0";

/// Default progress cadence for bulk jobs, in pages.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10;

/// Name under which the live VFS registers with SQLite unless configured otherwise.
pub const DEFAULT_VFS_NAME: &str = "wxdb";

const _: () = assert!(RESERVE_SIZE >= IV_SIZE + HMAC_SIZE);
const _: () = assert!((RESERVE_OFFSET - SALT_SIZE) % BLOCK_SIZE == 0);
