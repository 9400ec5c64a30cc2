//! Generic repository: typed CRUD over one collection of a `Store`.

use crate::config::TimestampConfig;
use crate::error::AppError;
use crate::query::{Filter, ListQuery, PaginationParams};
use crate::response::Paginated;
use crate::store::{Document, FindQuery, IntoRecordId, Store, ID_FIELD};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Repository<T = Document> {
    store: Arc<dyn Store>,
    collection: String,
    timestamps: TimestampConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            timestamps: self.timestamps,
            _record: PhantomData,
        }
    }
}

fn now_rfc3339() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl<T> Repository<T>
where
    T: DeserializeOwned,
{
    pub fn new(store: Arc<dyn Store>, collection: impl Into<String>, timestamps: TimestampConfig) -> Self {
        Repository {
            store,
            collection: collection.into(),
            timestamps,
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Same collection, decoded as another record type.
    pub fn typed<U: DeserializeOwned>(&self) -> Repository<U> {
        Repository::new(Arc::clone(&self.store), self.collection.clone(), self.timestamps)
    }

    fn decode(&self, doc: Document) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(doc)).map_err(|e| {
            AppError::Persistence(format!("record in '{}' has unexpected shape: {}", self.collection, e))
        })
    }

    /// Insert `input` and return the stored record as re-read from the store.
    pub async fn create(&self, mut input: Document) -> Result<T, AppError> {
        input.remove(ID_FIELD);
        let now = now_rfc3339();
        if self.timestamps.created_at {
            input.insert(TimestampConfig::FIELD_CREATED_AT.into(), now.clone());
        }
        if self.timestamps.updated_at {
            input.insert(TimestampConfig::FIELD_UPDATED_AT.into(), now);
        }
        let id = self.store.insert(&self.collection, input).await?;
        let stored = self.store.get(&self.collection, id).await?.ok_or_else(|| {
            AppError::Persistence(format!("record {} in '{}' vanished after insert", id, self.collection))
        })?;
        self.decode(stored)
    }

    /// Filter and sort `query`; with `paginated`, only the `pagination` window (default page 1 of 10).
    pub async fn get_all(
        &self,
        paginated: bool,
        query: &ListQuery,
        pagination: Option<PaginationParams>,
    ) -> Result<Paginated<T>, AppError> {
        let total = self.store.count(&self.collection, &query.filters).await?;
        let mut find = FindQuery {
            filters: query.filters.clone(),
            sort: query.sort.clone(),
            ..Default::default()
        };
        let (page, per_page, total_pages) = if paginated {
            let p = pagination.unwrap_or_default();
            find.skip = p.skip();
            find.limit = Some(p.per_page);
            (p.page, p.per_page, p.total_pages(total))
        } else {
            (1, total.max(1), u64::from(total > 0))
        };
        let records = self
            .store
            .find(&self.collection, &find)
            .await?
            .into_iter()
            .map(|d| self.decode(d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated {
            records,
            page,
            per_page,
            total,
            total_pages,
        })
    }

    pub async fn get_by_id(&self, id: impl IntoRecordId) -> Result<Option<T>, AppError> {
        let id = id.into_record_id()?;
        match self.store.get(&self.collection, id).await? {
            Some(doc) => self.decode(doc).map(Some),
            None => Ok(None),
        }
    }

    /// Merge `partial` into the record. `id` and `createdAt` in the patch are ignored.
    pub async fn update_by_id(&self, id: impl IntoRecordId, mut partial: Document) -> Result<Option<T>, AppError> {
        let id = id.into_record_id()?;
        partial.remove(ID_FIELD);
        partial.remove(TimestampConfig::FIELD_CREATED_AT);
        if self.timestamps.updated_at {
            partial.insert(TimestampConfig::FIELD_UPDATED_AT.into(), now_rfc3339());
        }
        if !self.store.update(&self.collection, id, partial).await? {
            return Ok(None);
        }
        match self.store.get(&self.collection, id).await? {
            Some(doc) => self.decode(doc).map(Some),
            None => Ok(None),
        }
    }

    /// `Ok(false)` when there was nothing to delete.
    pub async fn delete_by_id(&self, id: impl IntoRecordId) -> Result<bool, AppError> {
        let id = id.into_record_id()?;
        self.store.delete(&self.collection, id).await
    }

    pub async fn find_one(&self, filters: &[Filter]) -> Result<Option<T>, AppError> {
        let query = FindQuery {
            filters: filters.to_vec(),
            limit: Some(1),
            ..Default::default()
        };
        match self.store.find(&self.collection, &query).await?.into_iter().next() {
            Some(doc) => self.decode(doc).map(Some),
            None => Ok(None),
        }
    }
}
