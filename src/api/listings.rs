use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ListingDto, MessageResponse};
use crate::api::validation::{validate_listing_id, validate_listing_name};
use crate::db::{BulkUpdateEntry, SortKey};
use crate::entities::listings::ListingStatus;

#[derive(Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /listings?sort=newest|oldest|a-z|z-a
/// Unrecognized or absent sort keys fall back to a-z
pub async fn list_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SortQuery>,
) -> Result<Json<ApiResponse<Vec<ListingDto>>>, ApiError> {
    let sort = SortKey::parse(params.sort.as_deref());

    let listings = state.store().list_listings(sort).await?;
    let dtos: Vec<ListingDto> = listings.into_iter().map(ListingDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

// ============================================================================
// Create (multipart upload)
// ============================================================================

#[derive(Serialize)]
pub struct CreateListingResponse {
    pub message: String,
    pub image: String,
}

struct UploadFields {
    id: Option<String>,
    name: Option<String>,
    status: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn collect_upload_fields(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut fields = UploadFields {
        id: None,
        name: None,
        status: None,
        image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("id") => {
                fields.id = Some(field.text().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read id field: {e}"))
                })?);
            }
            Some("name") => {
                fields.name = Some(field.text().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read name field: {e}"))
                })?);
            }
            Some("status") => {
                fields.status = Some(field.text().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read status field: {e}"))
                })?);
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::validation(format!("Failed to read image upload: {e}"))
                })?;
                fields.image = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    Ok(fields)
}

/// POST /listings (multipart: id, name, status?, image)
/// Re-encodes the upload to WebP and creates the active listing
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<CreateListingResponse>>), ApiError> {
    let fields = collect_upload_fields(multipart).await?;

    let id = fields
        .id
        .as_deref()
        .ok_or_else(|| ApiError::validation("Listing ID is required"))?;
    let name = fields
        .name
        .as_deref()
        .ok_or_else(|| ApiError::validation("Listing name is required"))?;
    let (original_name, bytes) = fields
        .image
        .ok_or_else(|| ApiError::validation("An image upload is required"))?;

    let id = validate_listing_id(id)?;
    let name = validate_listing_name(name)?;

    let status = match fields.status.as_deref() {
        None | Some("") => ListingStatus::Available,
        Some(raw) => ListingStatus::from_str(raw)
            .map_err(|()| ApiError::validation(format!("Unknown status: {raw}")))?,
    };

    if bytes.is_empty() {
        return Err(ApiError::validation("Image upload is empty"));
    }

    // An identity lives in either the active set or the trash, never both;
    // a trashed id must be restored or purged before it can be re-created.
    if state.store().listing_id_in_use(id).await? {
        return Err(ApiError::conflict(format!("Listing {id} already exists")));
    }

    let filename = state
        .image_service
        .store_webp(&original_name, bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store image: {e}")))?;

    // The file is already on disk; clean it up if the insert does not commit
    match state.store().create_listing(id, name, &filename, status).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            state.image_service.remove(&filename).await;
            return Err(ApiError::conflict(format!("Listing {id} already exists")));
        }
        Err(e) => {
            state.image_service.remove(&filename).await;
            return Err(ApiError::internal(format!("Failed to create listing: {e}")));
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateListingResponse {
            message: "Listing created".to_string(),
            image: filename,
        })),
    ))
}

// ============================================================================
// Update
// ============================================================================

#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<ListingStatus>,
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct UpdateListingResponse {
    pub message: String,
    pub data: ListingDto,
}

/// PATCH /listings
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<Json<ApiResponse<UpdateListingResponse>>, ApiError> {
    let id = payload
        .id
        .as_deref()
        .ok_or_else(|| ApiError::validation("Listing ID is required"))?;
    let name = payload
        .name
        .as_deref()
        .ok_or_else(|| ApiError::validation("Listing name is required"))?;
    let status = payload
        .status
        .ok_or_else(|| ApiError::validation("Status is required"))?;
    let image = payload
        .image
        .as_deref()
        .ok_or_else(|| ApiError::validation("Image reference is required"))?;

    let id = validate_listing_id(id)?;
    let name = validate_listing_name(name)?;

    let updated = state
        .store()
        .update_listing(id, name, status, image)
        .await?
        .ok_or_else(|| ApiError::listing_not_found(id))?;

    Ok(Json(ApiResponse::success(UpdateListingResponse {
        message: "Listing updated".to_string(),
        data: ListingDto::from(updated),
    })))
}

// ============================================================================
// Bulk update
// ============================================================================

#[derive(Deserialize)]
pub struct BulkUpdateItem {
    pub id: String,
    pub name: String,
    pub status: ListingStatus,
}

#[derive(Deserialize)]
pub struct BulkUpdateRequest {
    pub data: Option<Vec<BulkUpdateItem>>,
}

/// PATCH /listings/bulk
/// The whole batch commits as one transaction; entries with unknown ids
/// are silent no-ops.
pub async fn bulk_update_listings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let items = payload
        .data
        .ok_or_else(|| ApiError::validation("Invalid payload format: expected a data array"))?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let id = validate_listing_id(&item.id)?.to_string();
        let name = validate_listing_name(&item.name)?.to_string();
        entries.push(BulkUpdateEntry {
            id,
            name,
            status: item.status,
        });
    }

    let applied = state.store().bulk_update_listings(&entries).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Updated {applied} listings"
    )))))
}

// ============================================================================
// Soft delete
// ============================================================================

/// DELETE /listings/{id}
/// Moves the listing to the trash as one atomic state transfer
pub async fn soft_delete_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_listing_id(&id)?;

    if !state.store().soft_delete_listing(id).await? {
        return Err(ApiError::listing_not_found(id));
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Listing moved to trash",
    ))))
}

/// DELETE /listings
/// Moves every active listing to the trash, all-or-nothing
pub async fn soft_delete_all_listings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let count = state.store().soft_delete_all_listings().await?;

    let message = if count == 0 {
        "No active listings".to_string()
    } else {
        format!("Moved {count} listings to trash")
    };

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}
