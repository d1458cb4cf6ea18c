use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, TrashedListingDto};
use crate::api::listings::SortQuery;
use crate::api::validation::validate_listing_id;
use crate::db::SortKey;

/// GET /trash?sort=
/// Trashed listings, most recently deleted first unless sorted otherwise
pub async fn list_trash(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SortQuery>,
) -> Result<Json<ApiResponse<Vec<TrashedListingDto>>>, ApiError> {
    let sort = params
        .sort
        .as_deref()
        .map_or(SortKey::Newest, |raw| SortKey::parse(Some(raw)));

    let trashed = state.store().list_trash(sort).await?;
    let dtos: Vec<TrashedListingDto> = trashed.into_iter().map(TrashedListingDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /trash/{id}/restore
/// Recreates the active listing with its original timestamps
pub async fn restore_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_listing_id(&id)?;

    if !state.store().restore_listing(id).await? {
        return Err(ApiError::trash_not_found(id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Listing restored",
    ))))
}

/// DELETE /trash/{id}
/// Permanent removal. The database row is the contract; image cleanup is
/// best-effort and never fails the request.
pub async fn purge_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_listing_id(&id)?;

    let Some(image) = state.store().purge_listing(id).await? else {
        return Err(ApiError::trash_not_found(id));
    };

    state.image_service.remove(&image).await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Listing permanently deleted",
    ))))
}

/// DELETE /trash
/// Empties the trash; an already-empty trash is a client-visible error
pub async fn purge_all_listings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let images = state.store().purge_all_listings().await?;

    if images.is_empty() {
        return Err(ApiError::validation("Trash is empty"));
    }

    let count = images.len();
    for image in images {
        state.image_service.remove(&image).await;
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Permanently deleted {count} listings"
    )))))
}
