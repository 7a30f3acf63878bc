// src/lib.rs

pub mod aliases;
#[cfg(feature = "batch-ops")]
pub mod batch_ops;
pub mod builders;
pub mod consts;
pub mod decryption;
pub mod error;
pub mod header;
pub mod kdf;
#[cfg(feature = "live")]
pub mod live;
pub mod page;
pub mod utils;
pub mod validate;
pub mod worker;

// High-level API
pub use builders::{DecryptJob, DecryptJobBuilder, OutputTarget, ValidationPolicy};
pub use error::DecryptError;
pub use validate::{validate_key, validate_key_with};
pub use worker::{JobEvent, JobHandle, WorkerDispatch};

// Key derivation and the page codec, for callers driving pages themselves
pub use kdf::{derive_keys, KdfParams, KeyContext};
pub use kdf::pbkdf2::derive_pbkdf2_key;
pub use page::{decrypt_page, reconstruct_page, verify_page};

#[cfg(feature = "batch-ops")]
pub use batch_ops::decrypt_batch;

#[cfg(feature = "live")]
pub use live::{LiveConfig, LiveConnection, LivePageServer};

pub use header::read_salt; // quick salt / plaintext check
