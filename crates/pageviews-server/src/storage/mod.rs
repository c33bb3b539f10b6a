//! Counter store backends that need external services.

pub mod mysql;

pub use mysql::MySqlCounterStore;
