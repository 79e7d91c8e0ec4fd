//! SQLite-backed version store.
//!
//! One `versions` table holds the history of every configured entity
//! type, discriminated by `record_type`. A UNIQUE constraint over
//! `(record_type, entity_id, version_number)` enforces the append-only
//! numbering guarantee; SQLite treats NULLs as distinct there, so
//! uncommitted staging rows never collide.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use annal_core::{AnnalError, AnnalResult, VersionConfig, VersionRecord, VersionStore};

/// SQLite-backed [`VersionStore`].
pub struct SqliteVersionStore {
    conn: Mutex<Connection>,
}

fn db_err(err: rusqlite::Error) -> AnnalError {
    let conflict = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    );
    if conflict {
        AnnalError::conflict(err.to_string())
    } else {
        AnnalError::storage_with_source(err.to_string(), Box::new(err))
    }
}

impl SqliteVersionStore {
    /// Create a new store at the given path.
    pub fn new(path: impl AsRef<Path>) -> AnnalResult<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> AnnalResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> AnnalResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                version_id TEXT PRIMARY KEY,
                record_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                version_number INTEGER,
                fields TEXT NOT NULL,
                author TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(record_type, entity_id, version_number)
            );

            -- Index for newest-first history queries
            CREATE INDEX IF NOT EXISTS idx_versions_entity_num
                ON versions(record_type, entity_id, version_number DESC);
        "#,
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn row_to_version(row: &rusqlite::Row<'_>) -> AnnalResult<VersionRecord> {
        let version_id: String = row.get(0).map_err(db_err)?;
        let entity_id: String = row.get(1).map_err(db_err)?;
        let version_number: Option<u32> = row.get(2).map_err(db_err)?;
        let fields: String = row.get(3).map_err(db_err)?;
        let author: Option<String> = row.get(4).map_err(db_err)?;
        let created_at: String = row.get(5).map_err(db_err)?;

        Ok(VersionRecord {
            version_id: Uuid::parse_str(&version_id)
                .map_err(|e| AnnalError::storage(format!("bad version id: {e}")))?,
            entity_id,
            version_number,
            fields: serde_json::from_str(&fields)?,
            author,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| AnnalError::storage(format!("bad timestamp: {e}")))?,
        })
    }

    /// Delete all version rows for an entity. Returns the number removed.
    pub fn delete_versions(&self, config: &VersionConfig, entity_id: &str) -> AnnalResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn
            .execute(
                "DELETE FROM versions WHERE record_type = ?1 AND entity_id = ?2",
                params![config.record_type, entity_id],
            )
            .map_err(db_err)?;
        tracing::debug!(entity_id, count, "deleted version history");
        Ok(count)
    }

    /// Prune old versions, keeping the `keep_count` most recent. Returns
    /// the number removed.
    pub fn prune_old_versions(
        &self,
        config: &VersionConfig,
        entity_id: &str,
        keep_count: usize,
    ) -> AnnalResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn
            .execute(
                r#"DELETE FROM versions
                   WHERE record_type = ?1 AND entity_id = ?2
                   AND version_number IS NOT NULL
                   AND version_number NOT IN (
                       SELECT version_number
                       FROM versions
                       WHERE record_type = ?1 AND entity_id = ?2
                       AND version_number IS NOT NULL
                       ORDER BY version_number DESC
                       LIMIT ?3
                   )"#,
                params![config.record_type, entity_id, keep_count as i64],
            )
            .map_err(db_err)?;
        Ok(count)
    }

    /// Count total version rows in the store, across all record types.
    pub fn count_all(&self) -> AnnalResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

impl VersionStore for SqliteVersionStore {
    fn find_versions(
        &self,
        config: &VersionConfig,
        entity_id: &str,
    ) -> AnnalResult<Vec<VersionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"SELECT version_id, entity_id, version_number, fields, author, created_at
                   FROM versions
                   WHERE record_type = ?1 AND entity_id = ?2 AND version_number IS NOT NULL
                   ORDER BY version_number DESC"#,
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![config.record_type, entity_id], |row| {
                Ok(Self::row_to_version(row))
            })
            .map_err(db_err)?;

        rows.map(|r| r.map_err(db_err).and_then(|inner| inner))
            .collect()
    }

    fn create_version(&self, config: &VersionConfig, record: &VersionRecord) -> AnnalResult<()> {
        let fields = serde_json::to_string(&record.fields)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"INSERT INTO versions
               (version_id, record_type, entity_id, version_number, fields, author, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                record.version_id.to_string(),
                config.record_type,
                record.entity_id,
                record.version_number,
                fields,
                record.author,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn article_config() -> VersionConfig {
        VersionConfig::new("article_versions", "article_id", ["title", "body"])
    }

    fn version(entity_id: &str, number: u32, title: &str) -> VersionRecord {
        let mut fields = HashMap::new();
        fields.insert("title".to_string(), json!(title));
        fields.insert("body".to_string(), json!("Some body"));
        VersionRecord::new(entity_id, number, fields)
    }

    #[test]
    fn test_version_store_crud() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let config = article_config();

        store.create_version(&config, &version("a-1", 1, "A")).unwrap();
        store.create_version(&config, &version("a-1", 2, "B")).unwrap();

        let versions = store.find_versions(&config, "a-1").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_number, Some(2));
        assert_eq!(versions[0].field("title"), Some(&json!("B")));
        assert_eq!(versions[1].version_number, Some(1));
    }

    #[test]
    fn test_duplicate_version_number_conflicts() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let config = article_config();

        store.create_version(&config, &version("a-1", 1, "A")).unwrap();
        let err = store
            .create_version(&config, &version("a-1", 1, "A again"))
            .unwrap_err();

        assert!(err.is_conflict());
        // The original row survives untouched.
        let versions = store.find_versions(&config, "a-1").unwrap();
        assert_eq!(versions[0].field("title"), Some(&json!("A")));
    }

    #[test]
    fn test_staging_rows_are_excluded_but_stored() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let config = article_config();

        store.create_version(&config, &version("a-1", 1, "A")).unwrap();
        let mut staging = version("a-1", 0, "draft one");
        staging.version_number = None;
        let mut staging_two = version("a-1", 0, "draft two");
        staging_two.version_number = None;
        store.create_version(&config, &staging).unwrap();
        store.create_version(&config, &staging_two).unwrap();

        assert_eq!(store.find_versions(&config, "a-1").unwrap().len(), 1);
        assert_eq!(store.count_all().unwrap(), 3);
    }

    #[test]
    fn test_record_types_are_isolated() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let articles = article_config();
        let posts = VersionConfig::new("post_versions", "post_id", ["title", "body"]);

        store.create_version(&articles, &version("id-1", 1, "A")).unwrap();

        assert!(store.find_versions(&posts, "id-1").unwrap().is_empty());
        // Same entity id and number under another record type is fine.
        store.create_version(&posts, &version("id-1", 1, "P")).unwrap();
    }

    #[test]
    fn test_author_round_trips() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let config = article_config();

        store
            .create_version(&config, &version("a-1", 1, "A").with_author("editor"))
            .unwrap();

        let versions = store.find_versions(&config, "a-1").unwrap();
        assert_eq!(versions[0].author.as_deref(), Some("editor"));
    }

    #[test]
    fn test_prune_old_versions() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let config = article_config();

        for n in 1..=5 {
            store
                .create_version(&config, &version("a-1", n, &format!("T{n}")))
                .unwrap();
        }

        let pruned = store.prune_old_versions(&config, "a-1", 2).unwrap();
        assert_eq!(pruned, 3);

        let remaining = store.find_versions(&config, "a-1").unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].version_number, Some(5));
        assert_eq!(remaining[1].version_number, Some(4));
    }

    #[test]
    fn test_delete_versions() {
        let store = SqliteVersionStore::in_memory().unwrap();
        let config = article_config();

        store.create_version(&config, &version("a-1", 1, "A")).unwrap();
        store.create_version(&config, &version("a-1", 2, "B")).unwrap();
        store.create_version(&config, &version("a-2", 1, "X")).unwrap();

        assert_eq!(store.delete_versions(&config, "a-1").unwrap(), 2);
        assert!(store.find_versions(&config, "a-1").unwrap().is_empty());
        assert_eq!(store.find_versions(&config, "a-2").unwrap().len(), 1);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.db");
        let config = article_config();

        {
            let store = SqliteVersionStore::new(&path).unwrap();
            store.create_version(&config, &version("a-1", 1, "A")).unwrap();
        }

        let reopened = SqliteVersionStore::new(&path).unwrap();
        let versions = reopened.find_versions(&config, "a-1").unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].field("title"), Some(&json!("A")));
    }
}
