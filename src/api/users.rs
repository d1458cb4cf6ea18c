use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto};
use crate::api::listings::SortQuery;
use crate::db::SortKey;

/// GET /users?sort=
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SortQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let sort = SortKey::parse(params.sort.as_deref());

    let users = state.store().list_users(sort).await?;
    let dtos: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

/// DELETE /users/{id}
/// Admin principals are protected from deletion
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = state
        .store()
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(id))?;

    if user.role.is_protected() {
        return Err(ApiError::forbidden("Admin accounts cannot be deleted"));
    }

    state.store().remove_user(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted",
    ))))
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Option<Vec<i32>>,
}

/// POST /users/bulk-delete
/// One protected id anywhere in the batch rejects the whole request
pub async fn bulk_delete_users(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let ids = payload
        .ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::validation("A non-empty list of user ids is required"))?;

    let targets = state.store().get_users_by_ids(&ids).await?;

    if targets.iter().any(|u| u.role.is_protected()) {
        return Err(ApiError::forbidden(
            "Batch contains an admin account; nothing was deleted",
        ));
    }

    let deleted = state.store().remove_users(&ids).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Deleted {deleted} users"
    )))))
}

/// DELETE /users/inactive
/// Removes non-admin accounts that never supplied an email
pub async fn prune_inactive_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let pruned = state.store().prune_inactive_users().await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Removed {pruned} inactive users"
    )))))
}
