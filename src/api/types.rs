use serde::Serialize;

use crate::db::User;
use crate::entities::listings::{self, ListingStatus};
use crate::entities::trashed_listings;
use crate::entities::users::UserRole;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingDto {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ListingStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<listings::Model> for ListingDto {
    fn from(model: listings::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: format!("/img/{}", model.image),
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrashedListingDto {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ListingStatus,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: String,
}

impl From<trashed_listings::Model> for TrashedListingDto {
    fn from(model: trashed_listings::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: format!("/img/{}", model.image),
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}
