//! # Bulk Decryption
//!
//! Turns a whole encrypted container into a standard database file, one page
//! at a time with a single page buffer.
//!
//! ## Modules
//!
//! - [`decrypt`] - [`run`], [`run_cancellable`] and [`decrypt_to_writer`]
//! - [`output`] - temporary-file staging and unique output names
//! - [`progress`] - progress callback throttling
//! - [`read`] - page reader with zero-padding of a short final page

pub mod decrypt;
pub mod output;
pub mod progress;
pub mod read;

pub use decrypt::{decrypt_to_writer, run, run_cancellable};
pub use output::unique_output_name;
pub use progress::ProgressTracker;
pub use read::PageReader;
