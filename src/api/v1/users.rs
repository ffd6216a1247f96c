//! User directory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::user::{Page, User, UserQueryParams, UserSummary};

/// User representation returned by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub city: String,
    pub state: String,
    pub zip: u32,
    pub email: String,
    pub web: String,
    pub age: u32,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().value(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
            company_name: user.company_name().to_string(),
            city: user.city().to_string(),
            state: user.state().to_string(),
            zip: user.zip(),
            email: user.email().to_string(),
            web: user.web().to_string(),
            age: user.age(),
        }
    }
}

/// Page of users
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub data: Vec<UserResponse>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_users: u64,
}

impl From<Page<User>> for PageResponse {
    fn from(page: Page<User>) -> Self {
        Self {
            data: page.items.iter().map(UserResponse::from).collect(),
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
            total_users: page.total_count,
        }
    }
}

/// Single resource envelope
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Envelope for mutations
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse<T> {
    pub message: String,
    pub data: T,
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserQueryParams>,
) -> Result<Json<PageResponse>, ApiError> {
    debug!(?params, "Listing users");

    let page = state
        .user_service
        .list(&params)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(PageResponse::from(page)))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<UserResponse>>, ApiError> {
    debug!(id = %id, "Getting user");

    let user = state.user_service.get(&id).await.map_err(ApiError::from)?;

    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    debug!("Creating user");

    let user = state
        .user_service
        .create(&payload)
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created".to_string(),
            data: UserResponse::from(&user),
        }),
    ))
}

/// PUT /api/v1/users/{id}
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<MessageResponse<UserResponse>>, ApiError> {
    debug!(id = %id, "Replacing user");

    let user = state
        .user_service
        .replace(&id, &payload)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse {
        message: "User updated".to_string(),
        data: UserResponse::from(&user),
    }))
}

/// PATCH /api/v1/users/{id}
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<MessageResponse<UserResponse>>, ApiError> {
    debug!(id = %id, "Patching user");

    let user = state
        .user_service
        .patch(&id, &payload)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse {
        message: "User updated".to_string(),
        data: UserResponse::from(&user),
    }))
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    debug!(id = %id, "Deleting user");

    state
        .user_service
        .delete(&id)
        .await
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users/summary
pub async fn summarize_users(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<UserSummary>>, ApiError> {
    debug!("Summarizing users");

    let summary = state
        .user_service
        .summarize()
        .await
        .map_err(ApiError::from)?;

    Ok(Json(DataResponse { data: summary }))
}
