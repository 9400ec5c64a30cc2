//! In-memory filter and sort evaluation, mirroring what `PgStore` compiles to SQL
//! (`doc ->> field` comparison and `jsonb` ordering).

use super::Document;
use crate::query::{Filter, FilterOp, SortField};
use serde_json::Value;
use std::cmp::Ordering;

/// Text form of a scalar field, as `->>` yields it. `None` for null, objects, arrays and missing fields.
fn scalar_text(doc: &Document, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    match filter.op {
        FilterOp::Eq => scalar_text(doc, &filter.field).is_some_and(|t| t == filter.value),
        FilterOp::Like => scalar_text(doc, &filter.field)
            .is_some_and(|t| t.to_lowercase().contains(&filter.value.to_lowercase())),
        FilterOp::Gte | FilterOp::Lte | FilterOp::Start | FilterOp::End => true,
    }
}

pub fn matches_all(doc: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_filter(doc, f))
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type rank, then by value within a type.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| {
                x.iter()
                    .zip(y)
                    .map(|(l, r)| compare_values(l, r))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => Ordering::Equal,
    }
}

/// Missing fields sort like SQL NULL: last ascending, first descending.
fn compare_field(a: &Document, b: &Document, sort: &SortField) -> Ordering {
    let ord = match (a.get(&sort.field), b.get(&sort.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_values(x, y),
    };
    if sort.descending {
        ord.reverse()
    } else {
        ord
    }
}

/// Stable sort, so documents that compare equal keep their insertion order.
pub fn sort_documents(docs: &mut [Document], sort: &[SortField]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        sort.iter()
            .map(|s| compare_field(a, b, s))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
