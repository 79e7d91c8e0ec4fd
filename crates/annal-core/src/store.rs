//! Version storage contract and the in-memory reference store.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::VersionConfig;
use crate::error::{AnnalError, AnnalResult};
use crate::version::VersionRecord;

/// Storage collaborator for version rows.
///
/// The engine only ever appends: it asks for an entity's committed
/// history and requests new immutable snapshots. Ordering and uniqueness
/// of version numbers under concurrent writers are the store's
/// responsibility (a uniqueness constraint on `(entity, version_number)`).
#[cfg_attr(test, mockall::automock)]
pub trait VersionStore: Send + Sync {
    /// All committed versions for an entity, ordered by version number
    /// descending. Staging rows (unset version number) are excluded.
    fn find_versions(
        &self,
        config: &VersionConfig,
        entity_id: &str,
    ) -> AnnalResult<Vec<VersionRecord>>;

    /// Persist a new immutable version row.
    ///
    /// A duplicate `(entity_id, version_number)` pair fails with a
    /// conflict error; existing rows are never overwritten.
    fn create_version(&self, config: &VersionConfig, record: &VersionRecord) -> AnnalResult<()>;
}

/// In-memory [`VersionStore`], keyed by `(record_type, entity_id)`.
///
/// Enforces the same uniqueness and ordering guarantees as a durable
/// backend. Suitable for tests and single-process use.
#[derive(Default)]
pub struct MemoryVersionStore {
    records: Mutex<HashMap<(String, String), Vec<VersionRecord>>>,
}

impl MemoryVersionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows held, staging rows included.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().values().map(Vec::len).sum()
    }

    /// Whether the store holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VersionStore for MemoryVersionStore {
    fn find_versions(
        &self,
        config: &VersionConfig,
        entity_id: &str,
    ) -> AnnalResult<Vec<VersionRecord>> {
        let records = self.records.lock().unwrap();
        let key = (config.record_type.clone(), entity_id.to_string());

        let mut versions: Vec<VersionRecord> = records
            .get(&key)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.is_committed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    fn create_version(&self, config: &VersionConfig, record: &VersionRecord) -> AnnalResult<()> {
        let mut records = self.records.lock().unwrap();
        let key = (config.record_type.clone(), record.entity_id.clone());
        let rows = records.entry(key).or_default();

        if let Some(number) = record.version_number {
            if rows.iter().any(|r| r.version_number == Some(number)) {
                return Err(AnnalError::conflict(format!(
                    "version {number} already exists for entity '{}'",
                    record.entity_id
                )));
            }
        }

        rows.push(record.clone());
        Ok(())
    }
}
