use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::ImageService;
use crate::state::SharedState;

mod assets;
pub mod auth;
mod error;
pub mod listings;
pub mod search;
pub mod system;
pub mod trash;
mod types;
mod validation;
pub mod users;

pub use error::ApiError;
pub use types::*;

use tokio::sync::RwLock;

/// Uploads are small listing screenshots; 16 MiB is generous.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub image_service: Arc<ImageService>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    let images_path = shared.config.read().await.general.images_path.clone();

    let image_service = Arc::new(ImageService::new(&images_path));

    Ok(Arc::new(AppState {
        shared,
        image_service,
        start_time: std::time::Instant::now(),
    }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (images_path, cors_origins, secure_cookies, session_days) = {
        let config = state.config().read().await;
        (
            config.general.images_path.clone(),
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_max_age_days,
        )
    };

    let admin_routes = create_admin_router();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(session_days)));

    let api_router = Router::new()
        .merge(admin_routes)
        .route("/listings", get(listings::list_listings))
        .route("/search", get(search::search_listings))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session_check))
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .nest_service("/img", tower_http::services::ServeDir::new(images_path))
        .fallback(assets::serve_asset)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// Back-office routes; everything here requires an admin session.
fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listings", post(listings::create_listing))
        .route("/listings", patch(listings::update_listing))
        .route("/listings", delete(listings::soft_delete_all_listings))
        .route("/listings/bulk", patch(listings::bulk_update_listings))
        .route("/listings/{id}", delete(listings::soft_delete_listing))
        .route("/trash", get(trash::list_trash))
        .route("/trash", delete(trash::purge_all_listings))
        .route("/trash/{id}", delete(trash::purge_listing))
        .route("/trash/{id}/restore", post(trash::restore_listing))
        .route("/users", get(users::list_users))
        .route("/users/inactive", delete(users::prune_inactive_users))
        .route("/users/bulk-delete", post(users::bulk_delete_users))
        .route("/users/{id}", delete(users::delete_user))
        .route("/system/status", get(system::get_status))
        .route_layer(middleware::from_fn(auth::require_admin))
}
