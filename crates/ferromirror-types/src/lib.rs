//! Core type system and error handling for FerroMirror
//!
//! This crate provides the foundational types shared by every FerroMirror
//! crate:
//!
//! - **Error handling**: one error enum whose variants separate fatal
//!   configuration problems from per-file failures and benign races
//! - **Identities**: [`FileIdentity`], the root-relative path that snapshots
//!   are keyed by
//! - **Fingerprints**: [`Fingerprint`], a 128-bit content hash
//! - **Statistics**: [`SyncStats`] collected while a change set is applied
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use ferromirror_types::{FileIdentity, Result, SyncStats};
//! use std::path::Path;
//!
//! fn example_operation() -> Result<SyncStats> {
//!     let identity = FileIdentity::from_relative_path(Path::new("docs/a.txt"));
//!     assert_eq!(identity.unwrap().as_str(), "docs/a.txt");
//!
//!     let mut stats = SyncStats::new();
//!     stats.files_created = 1;
//!     Ok(stats)
//! }
//! # example_operation().unwrap();
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use types::*;
