//! Backing-store capability: the uniform document contract behind every repository.
//! `PgStore` keeps documents as JSONB rows; `JsonFileStore` keeps them in one flat JSON file.

pub mod json_file;
pub mod matcher;
pub mod pg;

use crate::error::AppError;
use crate::query::{Filter, SortField};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use json_file::JsonFileStore;
pub use pg::{ensure_database_exists, PgSettings, PgStore};

/// Untyped record as persisted: field name -> value.
pub type Document = Map<String, Value>;

/// Name of the identifier field in every stored document.
pub const ID_FIELD: &str = "id";

/// Store-assigned record identifier (UUID v4, stored as its hyphenated string).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(RecordId)
            .map_err(|_| AppError::BadRequest(format!("Invalid resource identifier: {}", s)))
    }
}

/// Anything a caller may hand in as an id: the native id or its string encoding.
pub trait IntoRecordId {
    fn into_record_id(self) -> Result<RecordId, AppError>;
}

impl IntoRecordId for RecordId {
    fn into_record_id(self) -> Result<RecordId, AppError> {
        Ok(self)
    }
}

impl IntoRecordId for Uuid {
    fn into_record_id(self) -> Result<RecordId, AppError> {
        Ok(RecordId(self))
    }
}

impl IntoRecordId for &str {
    fn into_record_id(self) -> Result<RecordId, AppError> {
        self.parse()
    }
}

impl IntoRecordId for String {
    fn into_record_id(self) -> Result<RecordId, AppError> {
        self.parse()
    }
}

impl IntoRecordId for &String {
    fn into_record_id(self) -> Result<RecordId, AppError> {
        self.parse()
    }
}

/// One listing request against a collection. `limit = None` means unbounded.
#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortField>,
    pub skip: u64,
    pub limit: Option<u64>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Short name for logs.
    fn kind(&self) -> &'static str;

    /// Persist a new document and return the id the store assigned. Any `id` in `doc` is replaced.
    async fn insert(&self, collection: &str, doc: Document) -> Result<RecordId, AppError>;

    /// Filter, then sort (ties in insertion order), then skip/limit.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, AppError>;

    /// Number of documents matching `filters`, ignoring any window.
    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, AppError>;

    async fn get(&self, collection: &str, id: RecordId) -> Result<Option<Document>, AppError>;

    /// Overwrite only the supplied fields. Returns false when no such record exists.
    async fn update(&self, collection: &str, id: RecordId, patch: Document) -> Result<bool, AppError>;

    async fn delete(&self, collection: &str, id: RecordId) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
