//! Builds parameterized statements against per-collection document tables
//! `(seq BIGSERIAL, id UUID PRIMARY KEY, doc JSONB NOT NULL)`.
//! Only the table name is interpolated; field names and values are always parameters.

use super::params::PgBindValue;
use crate::error::{AppError, ConfigError};
use crate::query::{Filter, FilterOp, SortField};
use crate::store::{Document, RecordId};
use regex::Regex;
use serde_json::Value;

const COLLECTION_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified, quoted table for a collection. Rejects names that are not plain identifiers.
pub fn collection_table(schema: &str, collection: &str) -> Result<String, AppError> {
    let re = Regex::new(COLLECTION_PATTERN).map_err(|e| AppError::Internal(e.to_string()))?;
    if !re.is_match(collection) {
        return Err(ConfigError::InvalidResourceName(collection.to_string()).into());
    }
    Ok(format!("{}.{}", quoted(schema), quoted(collection)))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: impl Into<PgBindValue>) -> usize {
        self.params.push(v.into());
        self.params.len()
    }

    /// Bind every collected parameter, in order.
    pub fn build(&self) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |q, p| q.bind(p.clone()))
    }
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (seq BIGSERIAL, id UUID PRIMARY KEY, doc JSONB NOT NULL)",
        table
    )
}

pub fn insert(table: &str, id: RecordId, doc: Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_ph = q.push_param(id.0);
    let doc_ph = q.push_param(Value::Object(doc));
    q.sql = format!("INSERT INTO {} (id, doc) VALUES (${}, ${})", table, id_ph, doc_ph);
    q
}

pub fn select_by_id(table: &str, id: RecordId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.0);
    q.sql = format!("SELECT doc FROM {} WHERE id = ${}", table, ph);
    q
}

/// Shallow merge: supplied top-level fields replace stored ones.
pub fn update_by_id(table: &str, id: RecordId, patch: Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_ph = q.push_param(id.0);
    let patch_ph = q.push_param(Value::Object(patch));
    q.sql = format!("UPDATE {} SET doc = doc || ${} WHERE id = ${}", table, patch_ph, id_ph);
    q
}

pub fn delete_by_id(table: &str, id: RecordId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id.0);
    q.sql = format!("DELETE FROM {} WHERE id = ${}", table, ph);
    q
}

fn where_clause(q: &mut QueryBuf, filters: &[Filter]) -> String {
    let mut parts = Vec::new();
    for f in filters.iter().filter(|f| f.op.is_supported()) {
        let field = q.push_param(f.field.as_str());
        let value = q.push_param(f.value.as_str());
        let scalar = format!("jsonb_typeof(doc -> ${}) IN ('string', 'number', 'boolean')", field);
        let cmp = if f.op == FilterOp::Like {
            format!("strpos(lower(doc ->> ${}), lower(${})) > 0", field, value)
        } else {
            format!("doc ->> ${} = ${}", field, value)
        };
        parts.push(format!("({} AND {})", scalar, cmp));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT doc ... WHERE filters ORDER BY sort, seq OFFSET skip [LIMIT limit].
pub fn select_list(
    table: &str,
    filters: &[Filter],
    sort: &[SortField],
    skip: u64,
    limit: Option<u64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, filters);
    let mut order = Vec::with_capacity(sort.len() + 1);
    for s in sort {
        let ph = q.push_param(s.field.as_str());
        let dir = if s.descending { "DESC" } else { "ASC" };
        order.push(format!("doc -> ${} {}", ph, dir));
    }
    order.push("seq ASC".to_string());
    let offset_ph = q.push_param(skip);
    let mut sql = format!(
        "SELECT doc FROM {}{} ORDER BY {} OFFSET ${}",
        table,
        where_sql,
        order.join(", "),
        offset_ph
    );
    if let Some(limit) = limit {
        let ph = q.push_param(limit);
        sql.push_str(&format!(" LIMIT ${}", ph));
    }
    q.sql = sql;
    q
}

pub fn count(table: &str, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_sql);
    q
}
