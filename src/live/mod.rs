//! # Live Page Server
//!
//! Lets SQLite query an encrypted container in place. A process-wide
//! registry maps container paths to their derived keys, and a VFS layered
//! over SQLite's default one decrypts every page SQLite reads from a
//! registered path. Nothing is written to disk.
//!
//! ## Modules
//!
//! - [`registry`] - path -> keys map shared with the VFS
//! - [`server`] - [`LivePageServer`], [`LiveConfig`] and [`LiveConnection`]
//! - `vfs` - the `sqlite3_vfs` / `sqlite3_io_methods` shims

pub mod registry;
pub mod server;
mod vfs;

pub use registry::{KeyRegistry, RegisteredKeys};
pub use server::{global, LiveConfig, LiveConnection, LivePageServer};
