//! Navigational queries over an entity's version history.

use std::sync::Arc;

use crate::config::VersionConfig;
use crate::entity::Versioned;
use crate::error::AnnalResult;
use crate::store::VersionStore;
use crate::version::VersionRecord;

/// Derives navigational facts (current/first/previous, counts) from the
/// ordered set of versions for one entity.
///
/// Every operation re-derives from the store; nothing is cached across
/// calls, so results stay fresh after a write within the same request.
#[derive(Clone)]
pub struct VersionQuery {
    config: VersionConfig,
    store: Arc<dyn VersionStore>,
}

impl VersionQuery {
    /// Create a query over one entity type's history.
    pub fn new(config: VersionConfig, store: Arc<dyn VersionStore>) -> Self {
        Self { config, store }
    }

    /// The entity-type configuration this query reads.
    pub fn config(&self) -> &VersionConfig {
        &self.config
    }

    /// The underlying version store.
    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// All committed versions for the entity, newest first.
    ///
    /// This is the single source of truth the other accessors read from.
    /// Rows without a version number are excluded even if the store were
    /// to return them.
    pub fn versions<E: Versioned>(&self, entity: &E) -> AnnalResult<Vec<VersionRecord>> {
        let mut versions: Vec<VersionRecord> = self
            .store
            .find_versions(&self.config, entity.id())?
            .into_iter()
            .filter(VersionRecord::is_committed)
            .collect();

        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    /// The latest version, or `None` with no history.
    pub fn current_version<E: Versioned>(&self, entity: &E) -> AnnalResult<Option<VersionRecord>> {
        Ok(self.versions(entity)?.into_iter().next())
    }

    /// The earliest version, or `None` with no history.
    pub fn first_version<E: Versioned>(&self, entity: &E) -> AnnalResult<Option<VersionRecord>> {
        Ok(self.versions(entity)?.pop())
    }

    /// The version immediately before the current one, or `None` with
    /// fewer than two versions.
    pub fn previous_version<E: Versioned>(&self, entity: &E) -> AnnalResult<Option<VersionRecord>> {
        Ok(self.versions(entity)?.into_iter().nth(1))
    }

    /// The current version's number, or `None` with no history. Never
    /// conflated with 0: an entity without history has no number at all.
    pub fn version_number<E: Versioned>(&self, entity: &E) -> AnnalResult<Option<u32>> {
        Ok(self
            .current_version(entity)?
            .and_then(|v| v.version_number))
    }

    /// The number the next snapshot will carry: current + 1, or 1 with no
    /// history.
    pub fn next_version_number<E: Versioned>(&self, entity: &E) -> AnnalResult<u32> {
        Ok(self.version_number(entity)?.map_or(1, |n| n + 1))
    }

    /// Current number minus one, or `None` if the entity is at version 1
    /// or has no history.
    pub fn previous_version_number<E: Versioned>(&self, entity: &E) -> AnnalResult<Option<u32>> {
        Ok(self
            .version_number(entity)?
            .and_then(|n| if n > 1 { Some(n - 1) } else { None }))
    }

    /// How many committed versions the entity has.
    pub fn version_count<E: Versioned>(&self, entity: &E) -> AnnalResult<usize> {
        Ok(self.versions(entity)?.len())
    }

    /// Nothing to undo with a single version.
    pub fn can_be_undone<E: Versioned>(&self, entity: &E) -> AnnalResult<bool> {
        Ok(self.version_count(entity)? > 1)
    }

    /// Whether the entity has no version before the current one.
    pub fn is_first_version<E: Versioned>(&self, entity: &E) -> AnnalResult<bool> {
        Ok(self.previous_version(entity)?.is_none())
    }

    /// Whether the entity was modified after creation.
    pub fn is_revised<E: Versioned>(&self, entity: &E) -> bool {
        entity.updated_at() > entity.created_at()
    }

    /// The greatest version strictly below the given one, or `None`.
    pub fn find_before<E: Versioned>(
        &self,
        entity: &E,
        version: &VersionRecord,
    ) -> AnnalResult<Option<VersionRecord>> {
        let Some(number) = version.version_number else {
            return Ok(None);
        };
        // versions() is newest-first, so the first match is the greatest.
        Ok(self
            .versions(entity)?
            .into_iter()
            .find(|v| v.version_number < Some(number)))
    }

    /// The least version strictly above the given one, or `None`.
    pub fn find_after<E: Versioned>(
        &self,
        entity: &E,
        version: &VersionRecord,
    ) -> AnnalResult<Option<VersionRecord>> {
        let Some(number) = version.version_number else {
            return Ok(None);
        };
        Ok(self
            .versions(entity)?
            .into_iter()
            .rev()
            .find(|v| v.version_number > Some(number)))
    }
}
