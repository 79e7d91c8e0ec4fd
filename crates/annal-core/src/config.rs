//! Per-entity-type versioning configuration.

use serde::{Deserialize, Serialize};

use crate::error::{AnnalError, AnnalResult};

/// Declares how one entity type is versioned.
///
/// One instance is built per entity type and handed to the engine at
/// construction. The configuration is immutable; multiple entity types
/// each get their own isolated instance rather than sharing any
/// process-wide registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Names the concrete store (table, collection) holding version rows
    /// for this entity type.
    pub record_type: String,
    /// Column on the version row that references the entity's id.
    pub foreign_key: String,
    /// Field names subject to snapshotting and diffing, in declaration
    /// order. Must exist on both the entity and its version rows.
    pub tracked_columns: Vec<String>,
}

impl VersionConfig {
    /// Create a new configuration.
    pub fn new(
        record_type: impl Into<String>,
        foreign_key: impl Into<String>,
        tracked_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            foreign_key: foreign_key.into(),
            tracked_columns: tracked_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the configuration is usable: names non-empty, at least one
    /// tracked column, no duplicate columns.
    pub fn validate(&self) -> AnnalResult<()> {
        if self.record_type.is_empty() {
            return Err(AnnalError::Configuration(
                "record_type must not be empty".to_string(),
            ));
        }
        if self.foreign_key.is_empty() {
            return Err(AnnalError::Configuration(
                "foreign_key must not be empty".to_string(),
            ));
        }
        if self.tracked_columns.is_empty() {
            return Err(AnnalError::Configuration(
                "at least one tracked column is required".to_string(),
            ));
        }
        for (i, col) in self.tracked_columns.iter().enumerate() {
            if self.tracked_columns[..i].contains(col) {
                return Err(AnnalError::Configuration(format!(
                    "duplicate tracked column '{col}'"
                )));
            }
        }
        Ok(())
    }
}
