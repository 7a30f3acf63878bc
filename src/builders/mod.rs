//! # Builders
//!
//! Fluent construction of bulk decryption jobs.
//!
//! ## Modules
//!
//! - [`job_builder`] - [`DecryptJobBuilder`] and the [`DecryptJob`] it produces

pub mod job_builder;

pub use job_builder::{DecryptJob, DecryptJobBuilder, OutputTarget, ValidationPolicy};
