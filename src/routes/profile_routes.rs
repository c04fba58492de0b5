// src/routes/profile_routes.rs

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::{error::ApiError, models::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_profile).patch(update_profile).put(update_profile),
    )
}

pub async fn get_profile(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.store.profile()?))
}

/// Top-level fields are replaced; `personalInfo` is merged key by key.
pub async fn update_profile(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.store.patch_profile(body)?;
    tracing::info!("profile updated");
    Ok(Json(profile))
}
