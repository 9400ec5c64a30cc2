//! Values bound to document-table queries.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;
use uuid::Uuid;

/// A value that can be bound to a PostgreSQL query. Each variant reports its own type so
/// the same placeholder list can mix field names, ids, patches and window bounds.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Text(String),
    Uuid(Uuid),
    Json(Value),
    I64(i64),
}

impl From<&str> for PgBindValue {
    fn from(s: &str) -> Self {
        PgBindValue::Text(s.to_string())
    }
}

impl From<String> for PgBindValue {
    fn from(s: String) -> Self {
        PgBindValue::Text(s)
    }
}

impl From<Uuid> for PgBindValue {
    fn from(u: Uuid) -> Self {
        PgBindValue::Uuid(u)
    }
}

impl From<Value> for PgBindValue {
    fn from(v: Value) -> Self {
        PgBindValue::Json(v)
    }
}

impl From<u64> for PgBindValue {
    fn from(n: u64) -> Self {
        PgBindValue::I64(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
            PgBindValue::Uuid(u) => <Uuid as Encode<Postgres>>::encode_by_ref(u, buf),
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Text(_) => <String as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <Uuid as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::Json(_) => <Value as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as sqlx::Type<Postgres>>::type_info(),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}
