//! 通用表接口：列表、新建、部分更新、删除。

use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{FromRef, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use softclin_protocol::codes;
use tracing::info;

use crate::{
    api::error::ApiError,
    auth::{authority::Identity, handlers::invalid_body},
    records::{
        OneOrMany, Record,
        query::{ListQuery, id_filter},
        table::Table,
    },
    state::AppState,
};

/// 在 `path` 上挂载一张表的全部接口；鉴权由外层 `route_layer` 负责。
pub(crate) fn routes<T>(path: &str) -> Router<AppState>
where
    T: Record,
    Table<T>: FromRef<AppState>,
{
    Router::new().route(
        path,
        get(list_handler::<T>)
            .post(create_handler::<T>)
            .patch(update_handler::<T>)
            .delete(delete_handler::<T>),
    )
}

async fn list_handler<T: Record>(
    State(table): State<Table<T>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<T>>, ApiError> {
    let query = ListQuery::parse(&params, T::COLUMNS)?;
    Ok(Json(table.list(&query).await?))
}

async fn create_handler<T: Record>(
    State(table): State<Table<T>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<OneOrMany<T::New>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<T>>), ApiError> {
    let Json(body) = payload.map_err(invalid_body)?;
    let rows = table.insert_many(body.into_vec()).await?;
    info!(
        subject = %identity.subject,
        table = T::TABLE,
        "{} rows inserted",
        rows.len()
    );
    Ok((StatusCode::CREATED, Json(rows)))
}

async fn update_handler<T: Record>(
    State(table): State<Table<T>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<HashMap<String, String>>,
    payload: Result<Json<T::Patch>, JsonRejection>,
) -> Result<Json<Vec<T>>, ApiError> {
    let id = id_filter(&params)?;
    let Json(patch) = payload.map_err(invalid_body)?;
    if T::patch_is_empty(&patch) {
        return Err(ApiError::bad_request(codes::NO_FIELDS, "No fields to update"));
    }
    let rows = table.update(id, patch).await?;
    info!(subject = %identity.subject, table = T::TABLE, id, updated = rows.len(), "row update");
    Ok(Json(rows))
}

async fn delete_handler<T: Record>(
    State(table): State<Table<T>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<T>>, ApiError> {
    let id = id_filter(&params)?;
    let rows = table.delete(id).await;
    info!(subject = %identity.subject, table = T::TABLE, id, deleted = rows.len(), "row delete");
    Ok(Json(rows))
}
