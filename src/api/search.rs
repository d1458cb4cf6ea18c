use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ListingDto};
use crate::api::validation::validate_search_query;
use crate::entities::listings::ListingStatus;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub groups: Vec<SearchGroup>,
}

#[derive(Serialize)]
pub struct SearchGroup {
    pub status: ListingStatus,
    pub listings: Vec<ListingDto>,
}

/// GET /search?q=
/// Case-insensitive match on name or id over the active set. Results are
/// partitioned by status explicitly rather than letting the caller guess
/// a grouping from the first match.
pub async fn search_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let query = validate_search_query(&params.q)?;

    let matches = state.store().search_listings(query).await?;
    let total = matches.len();

    let mut groups = Vec::new();
    for status in [
        ListingStatus::Available,
        ListingStatus::Sold,
        ListingStatus::Hacked,
    ] {
        let listings: Vec<ListingDto> = matches
            .iter()
            .filter(|m| m.status == status)
            .cloned()
            .map(ListingDto::from)
            .collect();

        if !listings.is_empty() {
            groups.push(SearchGroup { status, listings });
        }
    }

    Ok(Json(ApiResponse::success(SearchResponse { total, groups })))
}
