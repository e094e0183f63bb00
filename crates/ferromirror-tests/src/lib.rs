//! FerroMirror integration testing suite
//!
//! Fixtures shared by the end-to-end tests in `tests/`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Tree builders, readers and engine fixtures
pub mod test_utils;
