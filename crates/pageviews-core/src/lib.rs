//! pageviews core: error types and the counter store contract.
//!
//! This crate carries no transport or database dependencies. The HTTP server
//! and the MySQL backend live in `pageviews-server`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PageviewsError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod counter;
pub mod error;

pub use counter::{CounterStore, MemoryCounterStore};
/// Shared result type.
pub use error::{ErrorKind, PageviewsError, Result};
