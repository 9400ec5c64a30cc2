//! Default handlers behind the generated resource routes.

use crate::config::{InputSchema, OutputSchema};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::middleware::{LoadedRecord, ResolvedId};
use crate::query::{parse_pagination, parse_query_params};
use crate::repository::Repository;
use crate::response::{success_created, success_ok, Paginated};
use crate::service::RequestValidator;
use crate::store::Document;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A record type that can be served by the generated routes.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Resource for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// What one default handler needs: the repository and the operation's schemas.
pub struct OperationContext<T> {
    pub repository: Repository<T>,
    pub input: Option<InputSchema>,
    pub output: Option<OutputSchema>,
}

type Ctx<T> = State<Arc<OperationContext<T>>>;

impl<T: Resource> OperationContext<T> {
    fn bind(&self, body: Value) -> Result<Document, AppError> {
        match (&self.input, body) {
            (Some(schema), body) => RequestValidator::bind(body, schema),
            (None, Value::Object(map)) => Ok(map),
            (None, _) => Err(AppError::BadRequest("Request body must be a JSON object.".into())),
        }
    }

    fn present(&self, record: &T) -> Result<Value, AppError> {
        let v = serde_json::to_value(record)?;
        Ok(match &self.output {
            Some(schema) => schema.project_value(v),
            None => v,
        })
    }
}

pub async fn create<T: Resource>(
    State(ctx): Ctx<T>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let input = ctx.bind(body)?;
    let created = ctx.repository.create(input).await?;
    Ok(success_created(ctx.present(&created)?))
}

pub async fn get_all<T: Resource>(
    State(ctx): Ctx<T>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let query = parse_query_params(&params);
    let pagination = parse_pagination(&params)?;
    let page = ctx.repository.get_all(true, &query, Some(pagination)).await?;
    let records = page
        .records
        .iter()
        .map(|r| ctx.present(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(success_ok(Paginated {
        records,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        total_pages: page.total_pages,
    }))
}

pub async fn get_by_id<T: Resource>(
    State(ctx): Ctx<T>,
    Extension(LoadedRecord(doc)): Extension<LoadedRecord>,
) -> Result<impl IntoResponse, AppError> {
    let record: T = serde_json::from_value(Value::Object(doc))
        .map_err(|e| AppError::Persistence(format!("record has unexpected shape: {}", e)))?;
    Ok(success_ok(ctx.present(&record)?))
}

pub async fn update_by_id<T: Resource>(
    State(ctx): Ctx<T>,
    Extension(ResolvedId(id)): Extension<ResolvedId>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let patch = ctx.bind(body)?;
    let updated = ctx
        .repository
        .update_by_id(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found.".into()))?;
    Ok(success_ok(ctx.present(&updated)?))
}

pub async fn delete_by_id<T: Resource>(
    State(ctx): Ctx<T>,
    Extension(ResolvedId(id)): Extension<ResolvedId>,
) -> Result<StatusCode, AppError> {
    ctx.repository.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
