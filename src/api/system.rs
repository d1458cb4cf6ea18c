use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::SortKey;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database_ok: bool,
    pub active_listings: usize,
    pub trashed_listings: usize,
    pub users: usize,
}

/// GET /system/status
/// Back-office dashboard numbers plus a database liveness probe
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let store = state.store();

    let database_ok = store.ping().await.is_ok();
    let active_listings = store.list_listings(SortKey::NameAsc).await?.len();
    let trashed_listings = store.list_trash(SortKey::Newest).await?.len();
    let users = store.list_users(SortKey::NameAsc).await?.len();

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database_ok,
        active_listings,
        trashed_listings,
        users,
    })))
}
