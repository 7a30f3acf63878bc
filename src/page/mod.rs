//! # Page Codec
//!
//! Pages are independently decryptable: the IV and the tag travel inside the
//! page they protect, so page N never needs anything from page N-1. Bulk
//! reconstruction and live interception both build on that.
//!
//! ## Modules
//!
//! - [`layout`] - byte ranges of the salt, ciphertext and reserve regions
//! - [`codec`] - authentication and AES-256-CBC decryption of one page

pub mod codec;
pub mod layout;

pub use codec::{compute_page_tag, decrypt_page, reconstruct_page, verify_page};
pub use layout::PageLayout;
