use crate::models::AppState;
use axum::Router;

pub mod auth_routes;
pub mod profile_routes;
pub mod resource_routes;

pub fn router(state: AppState) -> Router {
    // `/profile` and `/auth/*` are matched before the generic `/{resource}` routes.
    let api = Router::new()
        .nest("/auth", auth_routes::router())
        .merge(profile_routes::router())
        .merge(resource_routes::router());

    Router::new().nest("/api", api).with_state(state)
}
