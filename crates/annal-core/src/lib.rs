//! annal-core - version history engine for annal.
//!
//! This crate attaches version history to a primary entity: callers can
//! inspect prior states, diff them, and revert or undo changes. Entities
//! participate by implementing [`Versioned`]; version rows are persisted
//! through a [`VersionStore`] collaborator.
//!
//! # Example
//!
//! ```ignore
//! use annal_core::{MemoryVersionStore, VersionConfig, VersionMutator};
//! use std::sync::Arc;
//!
//! let config = VersionConfig::new("article_versions", "article_id", ["title", "body"]);
//! let store = Arc::new(MemoryVersionStore::new());
//! let mutator = VersionMutator::new(config, store);
//!
//! // Inspect history
//! let previous = mutator.query().previous_version(&article)?;
//!
//! // Roll the entity back, snapshotting the overwritten state
//! mutator.revert_to(&mut article, previous.as_ref(), true, Some("editor"))?;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod mutator;
pub mod query;
pub mod store;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::VersionConfig;
pub use entity::{EntityStore, Versioned};
pub use error::{AnnalError, AnnalResult, ErrorCode};
pub use mutator::{CompareMode, Diff, FieldDelta, VersionMutator};
pub use query::VersionQuery;
pub use store::{MemoryVersionStore, VersionStore};
pub use version::VersionRecord;
