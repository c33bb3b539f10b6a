//! pageviews server library entry.
//!
//! Wires config, the MySQL counter store, and the HTTP handler into a
//! service. Consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod handler;
pub mod router;
pub mod storage;
