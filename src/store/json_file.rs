//! Flat-file document store: `{ "<collection>": [ {..}, .. ] }` in one JSON file.
//!
//! The whole file is held in memory behind a `RwLock` and rewritten after every
//! mutation (write to a sibling `.tmp` file, then rename over the original).

use super::{matcher, Document, FindQuery, RecordId, Store, ID_FIELD};
use crate::error::AppError;
use crate::query::Filter;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

type Collections = BTreeMap<String, Vec<Document>>;

pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<Collections>,
}

impl JsonFileStore {
    /// Load `path`, creating an empty store file when it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let data = if fs::try_exists(&path).await? {
            read_collections(&path).await?
        } else {
            let empty = Collections::new();
            write_collections(&path, &empty).await?;
            info!(path = %path.display(), "created empty json store");
            empty
        };
        Ok(JsonFileStore {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy of the data, persist it, then publish it. A failed write leaves the store unchanged.
    async fn mutate<R>(&self, f: impl FnOnce(&mut Collections) -> R) -> Result<R, AppError> {
        let mut guard = self.data.write().await;
        let mut next = guard.clone();
        let out = f(&mut next);
        write_collections(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn read_collections(path: &Path) -> Result<Collections, AppError> {
    let raw = fs::read_to_string(path).await?;
    if raw.trim().is_empty() {
        return Ok(Collections::new());
    }
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Persistence(format!("{} is not a valid store file: {}", path.display(), e)))
}

async fn write_collections(path: &Path, data: &Collections) -> Result<(), AppError> {
    let json = serde_json::to_vec_pretty(data)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

fn has_id(doc: &Document, id: RecordId) -> bool {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<RecordId>().ok())
        == Some(id)
}

#[async_trait]
impl Store for JsonFileStore {
    fn kind(&self) -> &'static str {
        "json_file"
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<RecordId, AppError> {
        let id = RecordId::generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        self.mutate(|data| data.entry(collection.to_string()).or_default().push(doc))
            .await?;
        debug!(collection, %id, "inserted");
        Ok(id)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, AppError> {
        let data = self.data.read().await;
        let Some(docs) = data.get(collection) else {
            return Ok(Vec::new());
        };
        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|d| matcher::matches_all(d, &query.filters))
            .cloned()
            .collect();
        matcher::sort_documents(&mut matched, &query.sort);
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, AppError> {
        let data = self.data.read().await;
        let n = data
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matcher::matches_all(d, filters)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn get(&self, collection: &str, id: RecordId) -> Result<Option<Document>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| has_id(d, id)))
            .cloned())
    }

    async fn update(&self, collection: &str, id: RecordId, patch: Document) -> Result<bool, AppError> {
        {
            let data = self.data.read().await;
            let exists = data
                .get(collection)
                .is_some_and(|docs| docs.iter().any(|d| has_id(d, id)));
            if !exists {
                return Ok(false);
            }
        }
        self.mutate(|data| {
            let target = data
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)));
            match target {
                Some(doc) => {
                    doc.extend(patch);
                    true
                }
                None => false,
            }
        })
        .await
    }

    async fn delete(&self, collection: &str, id: RecordId) -> Result<bool, AppError> {
        {
            let data = self.data.read().await;
            let exists = data
                .get(collection)
                .is_some_and(|docs| docs.iter().any(|d| has_id(d, id)));
            if !exists {
                return Ok(false);
            }
        }
        self.mutate(|data| {
            let Some(docs) = data.get_mut(collection) else {
                return false;
            };
            let before = docs.len();
            docs.retain(|d| !has_id(d, id));
            docs.len() != before
        })
        .await
    }

    /// Re-reads the backing file and checks that it still parses.
    async fn health_check(&self) -> Result<(), AppError> {
        read_collections(&self.path).await.map(|_| ())
    }
}
