// src/routes/resource_routes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::{
    error::ApiError,
    models::AppState,
    store::public_view,
};

/*
Generic CRUD over the array resources of the data file:
  doctors, appointments, users (read-only here; accounts go through /auth)
*/

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{resource}", get(list_records).post(create_record))
        .route(
            "/{resource}/{id}",
            get(get_record)
                .put(update_record)
                .patch(update_record)
                .delete(delete_record),
        )
}

fn ensure_writable(resource: &str) -> Result<(), ApiError> {
    if resource == "users" {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "user accounts are managed through /auth".into(),
        ))
    } else {
        Ok(())
    }
}

/* ============================================================
   GET /{resource}?field=value
   ============================================================ */

pub async fn list_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(filters): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let rows = state.store.list(&resource, &filters)?;
    Ok(Json(
        rows.into_iter()
            .map(|row| public_view(&resource, row))
            .collect(),
    ))
}

/* ============================================================
   GET /{resource}/{id}
   ============================================================ */

pub async fn get_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let row = state.store.get(&resource, &id)?;
    Ok(Json(public_view(&resource, row)))
}

/* ============================================================
   POST /{resource}
   ============================================================ */

pub async fn create_record(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    ensure_writable(&resource)?;
    let created = state.store.insert(&resource, body)?;
    tracing::info!(resource = %resource, id = %created["id"], "record created");
    Ok((StatusCode::CREATED, Json(created)))
}

/* ============================================================
   PUT|PATCH /{resource}/{id}  (shallow merge)
   ============================================================ */

pub async fn update_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    ensure_writable(&resource)?;
    let updated = state.store.patch(&resource, &id, body)?;
    tracing::info!(resource = %resource, id = %id, "record updated");
    Ok(Json(updated))
}

/* ============================================================
   DELETE /{resource}/{id}
   ============================================================ */

pub async fn delete_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    ensure_writable(&resource)?;
    let removed = state.store.delete(&resource, &id)?;
    tracing::info!(resource = %resource, id = %id, "record deleted");
    Ok(Json(removed))
}
