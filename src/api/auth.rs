use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::api::validation::{validate_password, validate_username};
use crate::entities::users::UserRole;

const SESSION_PRINCIPAL_KEY: &str = "principal";

/// The authenticated identity attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub role: UserRole,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub role: UserRole,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Guard for the admin back office: the session must carry a principal
/// (401 otherwise) whose role is admin (403 otherwise).
pub async fn require_admin(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = session
        .get::<Principal>(SESSION_PRINCIPAL_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    match principal {
        None => Err(ApiError::Unauthorized("Not authenticated".to_string())),
        Some(p) if p.role != UserRole::Admin => {
            Err(ApiError::forbidden("Admin access required"))
        }
        Some(p) => {
            tracing::debug!(user = %p.username, "Admin request authorized");
            Ok(next.run(request).await)
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
/// Register a new account; duplicate username or email is a conflict
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    let username = payload
        .username
        .as_deref()
        .ok_or_else(|| ApiError::validation("Username is required"))?;
    let email = payload
        .email
        .as_deref()
        .ok_or_else(|| ApiError::validation("Email is required"))?;
    let password = payload
        .password
        .as_deref()
        .ok_or_else(|| ApiError::validation("Password is required"))?;

    let username = validate_username(username)?;
    validate_password(password)?;
    let role = payload.role.unwrap_or(UserRole::User);

    let security = state.config().read().await.security.clone();

    let created = state
        .store()
        .create_user(username, email.trim(), password, role, &security)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create account: {e}")))?;

    if created.is_none() {
        return Err(ApiError::conflict("Username or email already in use"));
    }

    tracing::info!("New account registered: {username}");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::new(
            "Account created",
        ))),
    ))
}

/// POST /auth/login
/// Authenticate with username and password, stores the principal in the session
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let principal = Principal {
        username: user.username.clone(),
        role: user.role,
    };

    if let Err(e) = session.insert(SESSION_PRINCIPAL_KEY, &principal).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    tracing::info!("User logged in: {}", user.username);

    Ok(Json(ApiResponse::success(LoginResponse {
        username: user.username,
        role: user.role,
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/session
/// Report the current principal; anonymous is not an error
pub async fn session_check(
    session: Session,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let principal = session
        .get::<Principal>(SESSION_PRINCIPAL_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    let response = principal.map_or(
        SessionResponse {
            is_logged_in: false,
            username: None,
            role: None,
        },
        |p| SessionResponse {
            is_logged_in: true,
            username: Some(p.username),
            role: Some(p.role),
        },
    );

    Ok(Json(ApiResponse::success(response)))
}
