//! Diff computation and the reversible mutations (revert, undo).

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::VersionConfig;
use crate::entity::{EntityStore, Versioned};
use crate::error::{AnnalError, AnnalResult};
use crate::query::VersionQuery;
use crate::store::VersionStore;
use crate::version::VersionRecord;

/// Which transformation a version comparison simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Full overwrite of every tracked field.
    Revert,
    /// Selective rollback of only the fields that differ.
    Undo,
}

impl CompareMode {
    /// Convert to string for logging and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revert => "revert",
            Self::Undo => "undo",
        }
    }

    /// Parse from string. Anything other than `"revert"` or `"undo"` is
    /// a comparison error.
    pub fn parse(s: &str) -> AnnalResult<Self> {
        match s {
            "revert" => Ok(Self::Revert),
            "undo" => Ok(Self::Undo),
            other => Err(AnnalError::comparison(format!(
                "valid comparisons are either \"revert\" or \"undo\", got \"{other}\""
            ))),
        }
    }
}

/// One tracked field's values in a diff: the version's value paired with
/// the entity's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDelta {
    /// Value from the version being compared against.
    pub from: Option<Value>,
    /// The entity's current value.
    pub to: Option<Value>,
}

impl FieldDelta {
    /// Whether the two sides differ.
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Field name to delta, one entry per tracked column.
pub type Diff = HashMap<String, FieldDelta>;

/// Applies diffs, reverts, and undos to entities, guarded against
/// writing redundant version snapshots.
///
/// All mutations happen on the in-memory entity; nothing is persisted
/// unless a `*_saved` variant is called. A snapshot of the state being
/// overwritten is only written when `force` is set, an author is given,
/// and the resulting state genuinely differs.
#[derive(Clone)]
pub struct VersionMutator {
    query: VersionQuery,
}

impl VersionMutator {
    /// Create a mutator over one entity type's history.
    pub fn new(config: VersionConfig, store: Arc<dyn VersionStore>) -> Self {
        Self {
            query: VersionQuery::new(config, store),
        }
    }

    /// Build from an existing query.
    pub fn from_query(query: VersionQuery) -> Self {
        Self { query }
    }

    /// The navigation queries this mutator reads through.
    pub fn query(&self) -> &VersionQuery {
        &self.query
    }

    /// Differences between a version and the entity's current state, one
    /// [`FieldDelta`] per tracked column.
    ///
    /// With no `version`, the previous version is re-derived at call time
    /// and used as the base; with no history at all the diff is empty.
    pub fn diff<E: Versioned>(
        &self,
        entity: &E,
        version: Option<&VersionRecord>,
    ) -> AnnalResult<Diff> {
        let base = match version {
            Some(v) => Some(v.clone()),
            None => self.query.previous_version(entity)?,
        };
        let Some(base) = base else {
            return Ok(Diff::new());
        };

        Ok(self
            .query
            .config()
            .tracked_columns
            .iter()
            .map(|col| {
                (
                    col.clone(),
                    FieldDelta {
                        from: base.field(col).cloned(),
                        to: entity.field(col),
                    },
                )
            })
            .collect())
    }

    /// Revert the entity to a version: every tracked field is overwritten
    /// with the version's snapshot value.
    ///
    /// The entity is only mutated in memory; see
    /// [`revert_to_saved`](Self::revert_to_saved) for the persisting
    /// variant. With `force` and an author, the pre-mutation state is
    /// snapshotted first unless it would equal the state being restored.
    /// `None` for `version` targets the previous version; with no history
    /// this is a no-op.
    pub fn revert_to<E: Versioned>(
        &self,
        entity: &mut E,
        version: Option<&VersionRecord>,
        force: bool,
        author: Option<&str>,
    ) -> AnnalResult<()> {
        let Some(version) = self.resolve_target(entity, version)? else {
            return Ok(());
        };
        self.check_ownership(entity, &version)?;

        if force {
            if let Some(author) = author {
                if !self.is_identical_version(entity, &version, CompareMode::Revert)? {
                    self.snapshot_current(entity, author)?;
                }
            }
        }

        self.apply_revert(entity, &version);
        tracing::debug!(
            entity_id = entity.id(),
            version = ?version.version_number,
            "reverted entity to version"
        );
        Ok(())
    }

    /// Undo a version's changes: only the tracked fields that differ
    /// between the version and the current state are rolled back.
    ///
    /// Same snapshot-before-overwrite behavior and defaults as
    /// [`revert_to`](Self::revert_to).
    pub fn undo<E: Versioned>(
        &self,
        entity: &mut E,
        version: Option<&VersionRecord>,
        force: bool,
        author: Option<&str>,
    ) -> AnnalResult<()> {
        let Some(version) = self.resolve_target(entity, version)? else {
            return Ok(());
        };
        self.check_ownership(entity, &version)?;

        if force {
            if let Some(author) = author {
                if !self.is_identical_version(entity, &version, CompareMode::Undo)? {
                    self.snapshot_current(entity, author)?;
                }
            }
        }

        self.apply_undo(entity, &version)?;
        tracing::debug!(
            entity_id = entity.id(),
            version = ?version.version_number,
            "undid version changes"
        );
        Ok(())
    }

    /// Revert and persist. Requires both a target version and an author;
    /// refuses to act otherwise rather than mutating partially.
    pub fn revert_to_saved<E: Versioned>(
        &self,
        entity: &mut E,
        version: Option<&VersionRecord>,
        author: Option<&str>,
        entities: &dyn EntityStore<E>,
    ) -> AnnalResult<()> {
        let (Some(version), Some(author)) = (version, author) else {
            return Err(AnnalError::missing_parameter(
                "revert_to_saved requires both a target version and an author",
            ));
        };
        self.revert_to(entity, Some(version), true, Some(author))?;
        entities.save(entity)
    }

    /// Undo and persist. Requires both a target version and an author;
    /// refuses to act otherwise rather than mutating partially.
    pub fn undo_saved<E: Versioned>(
        &self,
        entity: &mut E,
        version: Option<&VersionRecord>,
        author: Option<&str>,
        entities: &dyn EntityStore<E>,
    ) -> AnnalResult<()> {
        let (Some(version), Some(author)) = (version, author) else {
            return Err(AnnalError::missing_parameter(
                "undo_saved requires both a target version and an author",
            ));
        };
        self.undo(entity, Some(version), true, Some(author))?;
        entities.save(entity)
    }

    /// Whether applying `mode`'s transformation against `version` would
    /// leave the entity's tracked state unchanged.
    ///
    /// Runs against pristine state: the entity is not mutated. This is
    /// the guard that keeps no-op version snapshots out of the store.
    pub fn is_identical_version<E: Versioned>(
        &self,
        entity: &E,
        version: &VersionRecord,
        mode: CompareMode,
    ) -> AnnalResult<bool> {
        let old_state = self.tracked_state(entity);
        let mut new_state = old_state.clone();

        match mode {
            CompareMode::Revert => {
                for col in &self.query.config().tracked_columns {
                    new_state.insert(col.clone(), version.field(col).cloned());
                }
            }
            CompareMode::Undo => {
                for (col, delta) in self.diff(entity, Some(version))? {
                    if delta.is_change() {
                        new_state.insert(col, delta.from);
                    }
                }
            }
        }

        Ok(old_state == new_state)
    }

    /// Step the entity back to the version just before `version`.
    ///
    /// Unchanged (returns `false`) when the entity is at its first
    /// version, when `version` is the first version, or when the lookup
    /// finds nothing or fails. Best-effort convenience: failures are
    /// logged and swallowed, never propagated.
    pub fn version_before<E: Versioned>(&self, entity: &mut E, version: &VersionRecord) -> bool {
        let target = (|| -> AnnalResult<Option<VersionRecord>> {
            if self.query.is_first_version(entity)? {
                return Ok(None);
            }
            if let Some(first) = self.query.first_version(entity)? {
                if first.version_number == version.version_number {
                    return Ok(None);
                }
            }
            self.query.find_before(entity, version)
        })();

        self.step_to(entity, target, "version_before")
    }

    /// Step the entity forward to the version just after `version`.
    ///
    /// Unchanged (returns `false`) when the entity is at its first
    /// version, when `version` is the current version, or when the lookup
    /// finds nothing or fails.
    pub fn version_after<E: Versioned>(&self, entity: &mut E, version: &VersionRecord) -> bool {
        let target = (|| -> AnnalResult<Option<VersionRecord>> {
            if self.query.is_first_version(entity)? {
                return Ok(None);
            }
            if let Some(current) = self.query.current_version(entity)? {
                if current.version_number == version.version_number {
                    return Ok(None);
                }
            }
            self.query.find_after(entity, version)
        })();

        self.step_to(entity, target, "version_after")
    }

    fn step_to<E: Versioned>(
        &self,
        entity: &mut E,
        target: AnnalResult<Option<VersionRecord>>,
        op: &str,
    ) -> bool {
        match target {
            Ok(Some(version)) => match self.revert_to(entity, Some(&version), false, None) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(entity_id = entity.id(), %err, "{op} revert failed");
                    false
                }
            },
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(entity_id = entity.id(), %err, "{op} lookup failed");
                false
            }
        }
    }

    /// Resolve the explicit target, or fall back to the previous version
    /// re-derived at call time.
    fn resolve_target<E: Versioned>(
        &self,
        entity: &E,
        version: Option<&VersionRecord>,
    ) -> AnnalResult<Option<VersionRecord>> {
        match version {
            Some(v) => Ok(Some(v.clone())),
            None => self.query.previous_version(entity),
        }
    }

    /// A version belonging to a different entity must never be applied.
    fn check_ownership<E: Versioned>(
        &self,
        entity: &E,
        version: &VersionRecord,
    ) -> AnnalResult<()> {
        if version.entity_id != entity.id() {
            return Err(AnnalError::mismatch(
                entity.id(),
                format!(
                    "version {:?} belongs to entity '{}', not '{}'",
                    version.version_number,
                    version.entity_id,
                    entity.id()
                ),
            ));
        }
        Ok(())
    }

    /// Snapshot the entity's current tracked state, attributed to `author`.
    fn snapshot_current<E: Versioned>(&self, entity: &E, author: &str) -> AnnalResult<()> {
        let number = self.query.next_version_number(entity)?;
        let record = VersionRecord::snapshot_of(entity, self.query.config(), number)
            .with_author(author);
        self.query.store().create_version(self.query.config(), &record)?;
        tracing::debug!(
            entity_id = entity.id(),
            version = number,
            author,
            "snapshotted pre-mutation state"
        );
        Ok(())
    }

    fn apply_revert<E: Versioned>(&self, entity: &mut E, version: &VersionRecord) {
        for col in &self.query.config().tracked_columns {
            let value = version.field(col).cloned().unwrap_or(Value::Null);
            entity.set_field(col, value);
        }
    }

    fn apply_undo<E: Versioned>(&self, entity: &mut E, version: &VersionRecord) -> AnnalResult<()> {
        for (col, delta) in self.diff(entity, Some(version))? {
            if delta.is_change() {
                entity.set_field(&col, delta.from.unwrap_or(Value::Null));
            }
        }
        Ok(())
    }

    fn tracked_state<E: Versioned>(&self, entity: &E) -> HashMap<String, Option<Value>> {
        self.query
            .config()
            .tracked_columns
            .iter()
            .map(|col| (col.clone(), entity.field(col)))
            .collect()
    }
}
