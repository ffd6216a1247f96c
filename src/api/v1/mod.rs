//! Versioned REST API

pub mod users;

use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};

use super::middleware::{list_rate_limit, read_rate_limit};
use super::state::AppState;

/// Create v1 API router. Only the read endpoints are rate limited.
pub fn create_v1_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(users::list_users)
                .layer(from_fn_with_state(state.clone(), list_rate_limit))
                .post(users::create_user),
        )
        .route(
            "/users/summary",
            get(users::summarize_users)
                .layer(from_fn_with_state(state.clone(), read_rate_limit)),
        )
        .route(
            "/users/{id}",
            get(users::get_user)
                .layer(from_fn_with_state(state.clone(), read_rate_limit))
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
}
