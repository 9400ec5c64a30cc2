//! Document store on PostgreSQL: one JSONB table per collection in a configurable schema.

use super::{Document, FindQuery, RecordId, Store, ID_FIELD};
use crate::error::AppError;
use crate::query::Filter;
use crate::sql;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool, Row};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct PgSettings {
    pub database_url: String,
    pub schema: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

pub struct PgStore {
    pool: PgPool,
    schema: String,
    /// Collections whose table is known to exist.
    ready: RwLock<HashSet<String>>,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
            ready: RwLock::new(HashSet::new()),
        }
    }

    /// Create the database if missing, build the pool and ensure the schema exists.
    pub async fn connect(settings: &PgSettings) -> Result<Self, AppError> {
        ensure_database_exists(&settings.database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.database_url)
            .await?;
        sqlx::query(&sql::create_schema(&settings.schema))
            .execute(&pool)
            .await?;
        Ok(PgStore::new(pool, settings.schema.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Qualified table for `collection`, created on first use.
    async fn table(&self, collection: &str) -> Result<String, AppError> {
        let table = sql::collection_table(&self.schema, collection)?;
        if self.ready.read().await.contains(collection) {
            return Ok(table);
        }
        let ddl = sql::create_table(&table);
        debug!(sql = %ddl, collection, "ensure table");
        sqlx::query(&ddl).execute(&self.pool).await?;
        self.ready.write().await.insert(collection.to_string());
        Ok(table)
    }
}

fn into_document(v: Value) -> Result<Document, AppError> {
    match v {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Persistence(format!("stored document is not an object: {}", other))),
    }
}

#[async_trait]
impl Store for PgStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<RecordId, AppError> {
        let table = self.table(collection).await?;
        let id = RecordId::generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let q = sql::insert(&table, id, doc);
        debug!(sql = %q.sql, collection, "insert");
        q.build().execute(&self.pool).await?;
        Ok(id)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, AppError> {
        let table = self.table(collection).await?;
        let q = sql::select_list(&table, &query.filters, &query.sort, query.skip, query.limit);
        debug!(sql = %q.sql, collection, "find");
        let rows = q.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| into_document(row.try_get::<Value, _>("doc")?))
            .collect()
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, AppError> {
        let table = self.table(collection).await?;
        let q = sql::count(&table, filters);
        debug!(sql = %q.sql, collection, "count");
        let row = q.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn get(&self, collection: &str, id: RecordId) -> Result<Option<Document>, AppError> {
        let table = self.table(collection).await?;
        let q = sql::select_by_id(&table, id);
        debug!(sql = %q.sql, collection, %id, "get");
        match q.build().fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(into_document(row.try_get::<Value, _>("doc")?)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, collection: &str, id: RecordId, patch: Document) -> Result<bool, AppError> {
        let table = self.table(collection).await?;
        let q = sql::update_by_id(&table, id, patch);
        debug!(sql = %q.sql, collection, %id, "update");
        let done = q.build().execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: RecordId) -> Result<bool, AppError> {
        let table = self.table(collection).await?;
        let q = sql::delete_by_id(&table, id);
        debug!(sql = %q.sql, collection, %id, "delete");
        let done = q.build().execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

/// `(admin url pointing at the postgres database, target database name)`.
fn split_database_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim().to_string();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres{}", base, query), db_name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
