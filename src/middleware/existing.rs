//! Guard for `/{resource}/:id` routes: the id must parse and the record must exist.

use crate::error::AppError;
use crate::repository::Repository;
use crate::store::{Document, RecordId};
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;

/// Path parameter holding the record id.
pub const ID_PARAM: &str = "id";

/// Id taken from the path, already parsed.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedId(pub RecordId);

/// Record loaded by the guard, as stored.
#[derive(Clone, Debug)]
pub struct LoadedRecord(pub Document);

/// 400 for a malformed id, 404 for a missing record; otherwise inserts
/// `ResolvedId` and `LoadedRecord` into the request extensions.
pub async fn require_existing(
    State(repo): State<Repository<Document>>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw = params.get(ID_PARAM).map(String::as_str).unwrap_or_default();
    let id: RecordId = raw.parse()?;
    let record = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found.".into()))?;
    req.extensions_mut().insert(ResolvedId(id));
    req.extensions_mut().insert(LoadedRecord(record));
    Ok(next.run(req).await)
}
