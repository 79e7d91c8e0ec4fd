//! annal-stores - durable version store backends for annal.
//!
//! This crate provides [`VersionStore`](annal_core::VersionStore)
//! implementations backed by real databases. The in-memory reference
//! store lives in `annal-core`; this crate is for history that must
//! survive a restart.
//!
//! # Backends
//!
//! - **SQLite** ([`SqliteVersionStore`]) - single-file or in-memory,
//!   bundled driver, no external services.

mod sqlite;

pub use sqlite::SqliteVersionStore;
