//! Version snapshot types.
//!
//! A [`VersionRecord`] is an immutable snapshot of an entity's tracked
//! fields at one point in time. Records are only ever created, never
//! edited or deleted by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::VersionConfig;
use crate::entity::Versioned;

/// A snapshot of an entity's tracked fields at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Unique version row identifier.
    pub version_id: Uuid,
    /// Value of the configured foreign key: the entity this version
    /// belongs to.
    pub entity_id: String,
    /// Sequential number within the entity's history (1, 2, 3...).
    /// `None` marks an uncommitted staging row; such rows never appear
    /// in history queries.
    pub version_number: Option<u32>,
    /// Tracked-field values at this version.
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
    /// Who produced this version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    /// Create a version record with explicit field values.
    pub fn new(
        entity_id: impl Into<String>,
        version_number: u32,
        fields: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            version_id: Uuid::new_v4(),
            entity_id: entity_id.into(),
            version_number: Some(version_number),
            fields,
            author: None,
            created_at: Utc::now(),
        }
    }

    /// Snapshot the entity's current tracked fields.
    ///
    /// Fields the entity does not expose are recorded as JSON null so the
    /// snapshot always carries every tracked column.
    pub fn snapshot_of<E: Versioned>(
        entity: &E,
        config: &VersionConfig,
        version_number: u32,
    ) -> Self {
        let fields = config
            .tracked_columns
            .iter()
            .map(|col| {
                (
                    col.clone(),
                    entity.field(col).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();

        Self::new(entity.id(), version_number, fields)
    }

    /// Builder: set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Get a snapshot field value.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Whether this row is a committed history entry (has a version number).
    pub fn is_committed(&self) -> bool {
        self.version_number.is_some()
    }
}
