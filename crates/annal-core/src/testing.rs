//! Shared test fixtures: a small article entity and seeding helpers.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::VersionConfig;
use crate::entity::{EntityStore, Versioned};
use crate::error::AnnalResult;
use crate::store::{MemoryVersionStore, VersionStore};
use crate::version::VersionRecord;

/// Versioned article with two tracked fields, title and body.
pub(crate) struct Article {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Versioned for Article {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "title" => Some(json!(self.title)),
            "body" => Some(json!(self.body)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) {
        let text = value.as_str().unwrap_or_default().to_string();
        match name {
            "title" => self.title = text,
            "body" => self.body = text,
            _ => {}
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// The article configuration mirrored by [`Article`].
pub(crate) fn article_config() -> VersionConfig {
    VersionConfig::new("article_versions", "article_id", ["title", "body"])
}

/// A committed version row with the given title and body.
pub(crate) fn version(entity_id: &str, number: u32, title: &str, body: &str) -> VersionRecord {
    let mut fields = HashMap::new();
    fields.insert("title".to_string(), json!(title));
    fields.insert("body".to_string(), json!(body));
    VersionRecord::new(entity_id, number, fields)
}

/// Seed versions 1..=N, one per title, all with body "body".
pub(crate) fn seed_versions(
    store: &MemoryVersionStore,
    config: &VersionConfig,
    entity_id: &str,
    titles: &[String],
) {
    for (i, title) in titles.iter().enumerate() {
        store
            .create_version(config, &version(entity_id, i as u32 + 1, title, "body"))
            .unwrap();
    }
}

/// Entity store that records which entities were saved.
#[derive(Default)]
pub(crate) struct RecordingEntityStore {
    pub saved: Mutex<Vec<String>>,
}

impl EntityStore<Article> for RecordingEntityStore {
    fn save(&self, entity: &Article) -> AnnalResult<()> {
        self.saved.lock().unwrap().push(entity.id.clone());
        Ok(())
    }
}
