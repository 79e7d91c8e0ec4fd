//! Entity-side capabilities required by the versioning engine.

use chrono::{DateTime, Utc};

use crate::error::AnnalResult;

/// Capability set an entity needs to participate in versioning: a stable
/// id, tracked-field access by name, and creation/modification timestamps.
///
/// Field values cross the trait boundary as [`serde_json::Value`] so the
/// engine stays generic over concrete field types. Implementations return
/// `None` from [`field`](Versioned::field) for names that are not fields
/// of the entity, and ignore unknown names in
/// [`set_field`](Versioned::set_field).
pub trait Versioned {
    /// Stable identifier, matched against version rows' foreign key value.
    fn id(&self) -> &str;

    /// Current value of a field, or `None` if the entity has no such field.
    fn field(&self, name: &str) -> Option<serde_json::Value>;

    /// Overwrite a field. Unknown names are ignored.
    fn set_field(&mut self, name: &str, value: serde_json::Value);

    /// When the entity was created.
    fn created_at(&self) -> DateTime<Utc>;

    /// When the entity was last modified.
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Persistence collaborator for entities themselves.
///
/// The engine never saves entities on its own; only the `*_saved` mutation
/// variants call through this trait, and storage failures propagate
/// unchanged.
pub trait EntityStore<E: Versioned>: Send + Sync {
    /// Persist the entity's current in-memory state.
    fn save(&self, entity: &E) -> AnnalResult<()>;
}
