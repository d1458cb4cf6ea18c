use sea_orm::entity::prelude::*;

use super::listings::ListingStatus;

/// Soft-deleted listings. A listing id lives either here or in `listings`,
/// never in both; the lifecycle operations move rows in one transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "trashed_listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    pub image: String,

    pub status: ListingStatus,

    pub created_at: String,

    pub updated_at: String,

    pub deleted_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
